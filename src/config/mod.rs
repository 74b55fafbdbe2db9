//! Monitor Configuration Module
//!
//! Settings loaded from TOML, with built-in defaults for every key.
//!
//! ## Loading Order
//!
//! 1. `DALI_MONITOR_CONFIG` environment variable (path to TOML file)
//! 2. `dali_monitor.toml` in the current working directory
//! 3. Built-in defaults
//!
//! The loaded config is passed explicitly to the components that need it;
//! there is no process-wide instance.

mod monitor_config;
pub mod defaults;

pub use monitor_config::*;
