//! Transactional persistence for IoT alarm records.
//!
//! This crate stores [`Alarm`](alarms_types::Alarm)s in SQLite and serves
//! them back by id or as paginated, sorted and filtered listings scoped to a
//! device ("thing") or a group.
//!
//! # Features
//!
//! - Atomic batch saves (all alarms in a batch are stored, or none are)
//! - Listings by thing or group with offset/limit pagination and totals
//! - Sorting restricted to an allow-list of columns
//! - Equality filters on nested payload fields
//! - Storage failures classified into a small, stable error taxonomy
//! - Cancellation of any operation through a [`CancellationToken`]
//!
//! # Example
//!
//! ```
//! use alarms_store::{AlarmRepository, CancellationToken, Store};
//! use alarms_types::{Alarm, PageMetadata, Payload};
//!
//! let store = Store::open_in_memory()?;
//! let ctx = CancellationToken::new();
//!
//! let thing = "6f0b7a2e-8c39-4c47-b4d2-5d0d3b1f7c11";
//! let group = "0c4a3b9e-1d2f-4e5a-8b7c-9d0e1f2a3b4c";
//!
//! let mut payload = Payload::new();
//! payload.insert("level".to_string(), "high".into());
//! store.save(&ctx, &[Alarm::new(thing, group, "temperature", "mqtt", payload)])?;
//!
//! let pm = PageMetadata::new().limit(10).payload_filter("level", "high");
//! let page = store.retrieve_by_thing(&ctx, thing, &pm)?;
//! assert_eq!(page.page.total, 1);
//! # Ok::<(), alarms_store::Error>(())
//! ```

pub mod classify;
mod config;
mod error;
mod models;
pub mod queries;
mod repository;
mod schema;
mod store;

pub use classify::Operation;
pub use config::{ConfigError, JournalMode, StoreConfig, ValidationError, default_config_path};
pub use error::{Cancelled, Error, ErrorKind, Result};
pub use models::StoredAlarm;
pub use repository::AlarmRepository;
pub use schema::MAX_LABEL_LEN;
pub use store::Store;
pub use tokio_util::sync::CancellationToken;

/// Default database path following platform conventions.
///
/// - Linux: `~/.local/share/alarms/alarms.db`
/// - macOS: `~/Library/Application Support/alarms/alarms.db`
/// - Windows: `C:\Users\<user>\AppData\Local\alarms\alarms.db`
pub fn default_db_path() -> std::path::PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| std::path::PathBuf::from("."))
        .join("alarms")
        .join("alarms.db")
}
