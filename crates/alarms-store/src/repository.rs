//! The alarm repository contract.

use alarms_types::{Alarm, AlarmsPage, PageMetadata};
use tokio_util::sync::CancellationToken;

use crate::error::Result;

/// Persistence operations for alarms.
///
/// Every operation takes a cancellation token. Implementations check it
/// before each storage call and abort with the operation's generic failure
/// once it is cancelled.
pub trait AlarmRepository: Send + Sync {
    /// Persist a batch of alarms atomically.
    ///
    /// Either every alarm is stored or none is. A duplicate id fails the
    /// whole batch with [`Error::Conflict`](crate::Error::Conflict).
    fn save(&self, ctx: &CancellationToken, alarms: &[Alarm]) -> Result<()>;

    /// Fetch a single alarm.
    ///
    /// A malformed or unknown id is [`Error::NotFound`](crate::Error::NotFound).
    fn retrieve_by_id(&self, ctx: &CancellationToken, id: &str) -> Result<Alarm>;

    /// List the alarms raised by one device.
    fn retrieve_by_thing(
        &self,
        ctx: &CancellationToken,
        thing_id: &str,
        pm: &PageMetadata,
    ) -> Result<AlarmsPage>;

    /// List the alarms raised within one group.
    fn retrieve_by_group(
        &self,
        ctx: &CancellationToken,
        group_id: &str,
        pm: &PageMetadata,
    ) -> Result<AlarmsPage>;

    /// Delete alarms by id. Unknown ids are ignored.
    fn remove(&self, ctx: &CancellationToken, ids: &[String]) -> Result<()>;
}
