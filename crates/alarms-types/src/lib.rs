//! Platform-agnostic types for IoT alarm records.
//!
//! This crate provides the domain types shared by the alarm store and its
//! callers.
//!
//! # Features
//!
//! - The [`Alarm`] record and its JSON [`Payload`]
//! - [`PageMetadata`] for pagination, sorting and payload filtering
//! - [`AlarmsPage`] result pages
//! - UUID validation helpers in [`ids`]
//!
//! # Example
//!
//! ```
//! use alarms_types::{Alarm, PageMetadata, Payload};
//!
//! let alarm = Alarm::new(
//!     "6f0b7a2e-8c39-4c47-b4d2-5d0d3b1f7c11",
//!     "0c4a3b9e-1d2f-4e5a-8b7c-9d0e1f2a3b4c",
//!     "temperature",
//!     "mqtt",
//!     Payload::new(),
//! );
//! let pm = PageMetadata::new().limit(10);
//! # let _ = (alarm, pm);
//! ```

pub mod error;
pub mod ids;
pub mod types;

pub use error::{ParseError, ParseResult};
pub use types::{Alarm, AlarmsPage, PageMetadata, Payload};
