//! System-wide default constants.
//!
//! Grouped by subsystem for easy discovery. Every value here can be
//! overridden from `dali_monitor.toml` unless noted otherwise.

// ============================================================================
// Config Discovery
// ============================================================================

/// Environment variable naming an explicit config file.
pub const CONFIG_ENV_VAR: &str = "DALI_MONITOR_CONFIG";

/// Config file looked up in the working directory.
pub const LOCAL_CONFIG_FILE: &str = "dali_monitor.toml";

// ============================================================================
// UDP Listener
// ============================================================================

/// Address gateways broadcast telemetry to.
pub const UDP_BIND_ADDR: &str = "0.0.0.0:6666";

/// Socket receive buffer (bytes). 1 MiB holds several thousand frames.
pub const UDP_RECV_BUFFER_BYTES: usize = 1 << 20;

/// Receive errors in a row after which a frame source is given up.
/// Not configurable from TOML.
pub const MAX_CONSECUTIVE_SOURCE_ERRORS: u32 = 100;

/// Delay between frames in replay mode (ms). Not configurable from TOML.
pub const REPLAY_DELAY_MS: u64 = 0;

// ============================================================================
// HTTP Server
// ============================================================================

/// HTTP API bind address.
pub const HTTP_BIND_ADDR: &str = "0.0.0.0:8000";

// ============================================================================
// Storage & Registry
// ============================================================================

/// Sled database directory.
pub const STORAGE_PATH: &str = "./data/dali_samples.db";

/// Gear inventory export.
pub const REGISTRY_PATH: &str = "./registry.toml";

// ============================================================================
// Analytics
// ============================================================================

/// Site UTC offset used for day/hour/weekday boundaries (minutes).
pub const UTC_OFFSET_MINUTES: i32 = 0;

/// Largest UTC offset magnitude accepted (minutes), just under a day.
pub const MAX_UTC_OFFSET_MINUTES: i32 = 24 * 60 - 1;

/// Window of the minute-step history view (hours).
pub const MINUTE_HISTORY_HOURS: i64 = 3;

/// Window of the hour-step history view (hours).
pub const HOUR_HISTORY_HOURS: i64 = 24;

/// Window scanned for per-gear fault maxima (calendar months).
pub const FAULT_WINDOW_MONTHS: u32 = 2;

/// Half-width of the window around an error point (hours).
pub const ERROR_CONTEXT_HOURS: i64 = 24;

/// Upper bound for every `*_hours` window (one leap year).
pub const MAX_WINDOW_HOURS: i64 = 24 * 366;

/// Hard cap on raw samples returned by one listing.
pub const RAW_SAMPLE_LIMIT: usize = 1_000;
