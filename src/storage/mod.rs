//! Sample storage
//!
//! Persists decoded telemetry samples and serves time-range queries to the
//! analytics layer. Two backends implement [`SampleStore`]:
//! - [`InMemorySampleStore`]: tests and ephemeral deployments
//! - [`SledSampleStore`]: embedded on-disk store

pub mod persistence;
pub mod sled_store;

pub use persistence::{InMemorySampleStore, PersistenceError, SampleQuery, SampleStore, TimeOrder};
pub use sled_store::SledSampleStore;
