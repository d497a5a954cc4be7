mod dry_run;
mod error;
mod local;
mod reconciler;
mod types;

pub use dry_run::DryRun;
pub use error::CalendarError;
pub use local::LocalCalendar;
pub use reconciler::{event_intent, reconcile, SyncAction, SyncReport};
pub use types::{CalendarEvent, CalendarEventIntent, TimeWindow};

/// The external calendar the passes are published to.
pub trait CalendarService {
    /// Entries overlapping `window`, ordered by start.
    fn list(&self, window: &TimeWindow) -> Result<Vec<CalendarEvent>, CalendarError>;
    /// Creates an entry and returns its id.
    fn insert(&self, intent: &CalendarEventIntent) -> Result<String, CalendarError>;
    fn delete(&self, id: &str) -> Result<(), CalendarError>;
}

#[cfg(test)]
pub(crate) use reconciler::tests::MemoryCalendar;
