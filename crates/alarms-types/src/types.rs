//! Core types for alarm records.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use time::OffsetDateTime;

use crate::ids;

/// Arbitrary JSON object carried by an alarm.
///
/// Keys are kept sorted, so two payloads with the same entries compare equal
/// and serialize identically.
pub type Payload = Map<String, Value>;

/// An alarm raised by a device.
///
/// Alarms are immutable once created and are only ever removed as a whole.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Alarm {
    /// Unique identifier (UUID), assigned before persistence.
    pub id: String,
    /// Identifier (UUID) of the device that raised the alarm.
    pub thing_id: String,
    /// Identifier (UUID) of the group the device belongs to.
    pub group_id: String,
    /// Message subtopic the alarm originated from.
    pub subtopic: String,
    /// Protocol the originating message arrived over.
    pub protocol: String,
    /// Alarm payload.
    pub payload: Payload,
    /// Creation time in nanoseconds since the Unix epoch.
    pub created: i64,
}

impl Alarm {
    /// Create a new alarm with a fresh id, stamped with the current time.
    ///
    /// # Example
    ///
    /// ```
    /// use alarms_types::{Alarm, Payload};
    ///
    /// let mut payload = Payload::new();
    /// payload.insert("level".to_string(), "high".into());
    ///
    /// let alarm = Alarm::new(
    ///     "6f0b7a2e-8c39-4c47-b4d2-5d0d3b1f7c11",
    ///     "0c4a3b9e-1d2f-4e5a-8b7c-9d0e1f2a3b4c",
    ///     "temperature",
    ///     "mqtt",
    ///     payload,
    /// );
    /// assert_eq!(alarm.id.len(), 36);
    /// assert!(alarm.created > 0);
    /// ```
    pub fn new(
        thing_id: impl Into<String>,
        group_id: impl Into<String>,
        subtopic: impl Into<String>,
        protocol: impl Into<String>,
        payload: Payload,
    ) -> Self {
        Self {
            id: ids::new_id(),
            thing_id: thing_id.into(),
            group_id: group_id.into(),
            subtopic: subtopic.into(),
            protocol: protocol.into(),
            payload,
            created: now_nanos(),
        }
    }

    /// Override the creation timestamp.
    #[must_use]
    pub fn with_created(mut self, created: i64) -> Self {
        self.created = created;
        self
    }
}

fn now_nanos() -> i64 {
    i64::try_from(OffsetDateTime::now_utc().unix_timestamp_nanos()).unwrap_or(i64::MAX)
}

/// Pagination, sorting and filtering metadata.
///
/// On input this describes the requested window; on output (inside an
/// [`AlarmsPage`]) it carries the total match count and the sort that was
/// actually applied.
///
/// # Example
///
/// ```
/// use alarms_types::PageMetadata;
///
/// let pm = PageMetadata::new()
///     .offset(20)
///     .limit(10)
///     .order("created")
///     .dir("desc")
///     .payload_filter("level", "high");
///
/// assert_eq!(pm.limit, 10);
/// assert!(pm.payload.is_some());
/// ```
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PageMetadata {
    /// Number of alarms matching the filter, regardless of offset and limit.
    pub total: u64,
    /// Number of matching alarms to skip.
    pub offset: u64,
    /// Maximum number of alarms to return; `0` means unbounded.
    pub limit: u64,
    /// Sort field.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub order: Option<String>,
    /// Sort direction (`asc` or `desc`).
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub dir: Option<String>,
    /// Payload filter; see the store's query builder for the key grammar.
    #[cfg_attr(feature = "serde", serde(skip_serializing_if = "Option::is_none"))]
    pub payload: Option<Payload>,
}

impl PageMetadata {
    /// Create metadata for an unbounded, unfiltered listing.
    pub fn new() -> Self {
        Self::default()
    }

    /// Skip the first N matching alarms.
    #[must_use]
    pub fn offset(mut self, offset: u64) -> Self {
        self.offset = offset;
        self
    }

    /// Return at most N alarms (`0` for no limit).
    #[must_use]
    pub fn limit(mut self, limit: u64) -> Self {
        self.limit = limit;
        self
    }

    /// Sort by the given field.
    #[must_use]
    pub fn order(mut self, order: impl Into<String>) -> Self {
        self.order = Some(order.into());
        self
    }

    /// Sort in the given direction.
    #[must_use]
    pub fn dir(mut self, dir: impl Into<String>) -> Self {
        self.dir = Some(dir.into());
        self
    }

    /// Require the payload value at `key` to equal `value`.
    ///
    /// Can be called repeatedly; all constraints must hold.
    #[must_use]
    pub fn payload_filter(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload
            .get_or_insert_with(Payload::new)
            .insert(key.into(), value.into());
        self
    }
}

/// A page of alarms plus the metadata it was produced with.
#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AlarmsPage {
    /// Alarms in the requested window, in sort order.
    pub alarms: Vec<Alarm>,
    /// Pagination metadata.
    pub page: PageMetadata,
}
