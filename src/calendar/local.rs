use chrono::{DateTime, Utc};
use log::error;
use std::path::PathBuf;

use crate::calendar::{CalendarError, CalendarEvent, CalendarEventIntent, CalendarService, TimeWindow};

/// Calendar kept as one YAML document per entry in a folder.
pub struct LocalCalendar {
    base: PathBuf,
}

impl LocalCalendar {
    pub fn new(base: PathBuf) -> Self {
        LocalCalendar { base }
    }

    fn event_path(&self, id: &str) -> PathBuf {
        self.base.join(format!("{}.yaml", id))
    }

    fn generate_id(&self, start: DateTime<Utc>) -> String {
        let uuid = uuid::Uuid::new_v4();
        let timestamp = start.format("%Y%m%dT%H%M%SZ");
        format!("{}_{}", timestamp, uuid)
    }
}

impl CalendarService for LocalCalendar {
    fn list(&self, window: &TimeWindow) -> Result<Vec<CalendarEvent>, CalendarError> {
        if !self.base.exists() {
            return Ok(Vec::new());
        }

        let mut events = Vec::new();
        for entry in self.base.read_dir()? {
            let path = entry?.path();
            if !path.is_file() || !path.extension().is_some_and(|ext| ext == "yaml") {
                continue;
            }

            let content = match std::fs::read_to_string(&path) {
                Ok(content) => content,
                Err(e) => {
                    error!("Failed to read calendar entry {}: {}", path.display(), e);
                    continue;
                }
            };

            let event: CalendarEvent = match serde_yaml::from_str(&content) {
                Ok(event) => event,
                Err(e) => {
                    error!("Failed to parse calendar entry {}: {}", path.display(), e);
                    continue;
                }
            };

            if window.overlaps(event.start, event.end) {
                events.push(event);
            }
        }

        events.sort_by_key(|e| e.start);
        Ok(events)
    }

    fn insert(&self, intent: &CalendarEventIntent) -> Result<String, CalendarError> {
        std::fs::create_dir_all(&self.base)?;

        let id = self.generate_id(intent.start);
        let event = CalendarEvent {
            id: id.clone(),
            summary: intent.summary.clone(),
            description: intent.description.clone(),
            start: intent.start,
            end: intent.end,
            timezone: Some(intent.timezone.clone()),
        };
        std::fs::write(self.event_path(&id), serde_yaml::to_string(&event)?)?;
        Ok(id)
    }

    fn delete(&self, id: &str) -> Result<(), CalendarError> {
        let path = self.event_path(id);
        if !path.exists() {
            return Err(CalendarError::NotFound(id.to_string()));
        }

        std::fs::remove_file(path)?;
        Ok(())
    }
}
