//! Row model for stored alarms.

use alarms_types::{Alarm, Payload};
use rusqlite::Row;

use crate::error::{Error, Result};

/// An alarm as stored in the database, with its payload serialized.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredAlarm {
    pub id: String,
    pub thing_id: String,
    pub group_id: String,
    pub subtopic: String,
    pub protocol: String,
    /// Payload as serialized JSON text.
    pub payload: String,
    pub created: i64,
}

impl StoredAlarm {
    /// Create a StoredAlarm from an Alarm, serializing its payload.
    pub fn from_alarm(alarm: &Alarm) -> serde_json::Result<Self> {
        Ok(Self {
            id: alarm.id.clone(),
            thing_id: alarm.thing_id.clone(),
            group_id: alarm.group_id.clone(),
            subtopic: alarm.subtopic.clone(),
            protocol: alarm.protocol.clone(),
            payload: serde_json::to_string(&alarm.payload)?,
            created: alarm.created,
        })
    }

    /// Scan a row selected with [`ALARM_COLUMNS`](crate::queries::ALARM_COLUMNS).
    pub fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get("id")?,
            thing_id: row.get("thing_id")?,
            group_id: row.get("group_id")?,
            subtopic: row.get("subtopic")?,
            protocol: row.get("protocol")?,
            payload: row.get("payload")?,
            created: row.get("created")?,
        })
    }

    /// Convert to an Alarm.
    ///
    /// A payload that is not a valid JSON object is reported as
    /// [`Error::MalformedEntity`].
    pub fn into_alarm(self) -> Result<Alarm> {
        let payload: Payload = serde_json::from_str(&self.payload)
            .map_err(|e| Error::MalformedEntity(Box::new(e)))?;

        Ok(Alarm {
            id: self.id,
            thing_id: self.thing_id,
            group_id: self.group_id,
            subtopic: self.subtopic,
            protocol: self.protocol,
            payload,
            created: self.created,
        })
    }
}
