use crate::calendar::{CalendarError, CalendarEvent, CalendarEventIntent, CalendarService, TimeWindow};

/// Reads through to the wrapped calendar but only logs mutations.
///
/// Ids returned from `insert` are synthetic and refer to nothing stored.
pub struct DryRun<C> {
    inner: C,
}

impl<C> DryRun<C> {
    pub fn new(inner: C) -> Self {
        Self { inner }
    }
}

impl<C: CalendarService> CalendarService for DryRun<C> {
    fn list(&self, window: &TimeWindow) -> Result<Vec<CalendarEvent>, CalendarError> {
        self.inner.list(window)
    }

    fn insert(&self, intent: &CalendarEventIntent) -> Result<String, CalendarError> {
        log::info!("[dry run] would create: {}", intent.summary);
        Ok(format!("dry-run-{}", uuid::Uuid::new_v4()))
    }

    fn delete(&self, id: &str) -> Result<(), CalendarError> {
        log::info!("[dry run] would delete: {}", id);
        Ok(())
    }
}
