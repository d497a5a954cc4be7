use chrono::Duration;
use log::{error, info};
use serde::Serialize;

use crate::calendar::{CalendarEvent, CalendarEventIntent, CalendarService};
use crate::predict::{Pass, SatelliteRecord};

const MATCH_WINDOW_MINUTES: i64 = 2;

/// Outcome of reconciling one pass against the calendar.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum SyncAction {
    Created {
        summary: String,
        id: String,
    },
    Unchanged {
        summary: String,
        id: String,
    },
    Replaced {
        summary: String,
        previous_summary: String,
        old_id: String,
        new_id: String,
    },
    Failed {
        summary: String,
        error: String,
    },
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub satellite: String,
    pub actions: Vec<SyncAction>,
}

impl SyncReport {
    fn count(&self, f: impl Fn(&SyncAction) -> bool) -> usize {
        self.actions.iter().filter(|a| f(*a)).count()
    }

    pub fn created(&self) -> usize {
        self.count(|a| matches!(a, SyncAction::Created { .. }))
    }

    pub fn unchanged(&self) -> usize {
        self.count(|a| matches!(a, SyncAction::Unchanged { .. }))
    }

    pub fn replaced(&self) -> usize {
        self.count(|a| matches!(a, SyncAction::Replaced { .. }))
    }

    pub fn failed(&self) -> usize {
        self.count(|a| matches!(a, SyncAction::Failed { .. }))
    }
}

/// `"<id> <satellite> (<el>°, <el>°)"`, elevations in station order.
pub fn summary(satellite: &str, pass: &Pass) -> String {
    let elevations: Vec<String> = pass
        .elevations
        .values()
        .filter_map(|samples| samples.first())
        .map(|el| format!("{:.1}°", el))
        .collect();
    format!("{} {} ({})", pass.id, satellite, elevations.join(", "))
}

/// `"<station>: <el>° "` for every contributing station.
pub fn description(pass: &Pass) -> String {
    pass.elevations
        .iter()
        .filter_map(|(station, samples)| samples.first().map(|el| (station, el)))
        .map(|(station, el)| format!("{}: {:.1}° ", station, el))
        .collect()
}

pub fn event_intent(satellite: &str, pass: &Pass, timezone: &str) -> CalendarEventIntent {
    CalendarEventIntent {
        summary: summary(satellite, pass),
        description: description(pass),
        start: pass.start,
        end: pass.end,
        timezone: timezone.to_string(),
    }
}

/// First existing entry for the same daily id and satellite starting within
/// two minutes of `pass`. Later candidates are not considered.
fn find_counterpart(existing: &[CalendarEvent], satellite: &str, pass: &Pass) -> Option<usize> {
    let prefix = format!("{} {}", pass.id, satellite);
    existing.iter().position(|e| {
        e.summary.starts_with(&prefix)
            && (e.start - pass.start).abs() <= Duration::minutes(MATCH_WINDOW_MINUTES)
    })
}

/// Bring the calendar in line with the finalized passes of one satellite.
///
/// `existing` is the calendar state listed up front; it is kept current as
/// entries are deleted and created so later passes never match a removed
/// entry. A failed insert or delete is recorded and the remaining passes are
/// still processed.
pub fn reconcile<C: CalendarService + ?Sized>(
    calendar: &C,
    record: &SatelliteRecord,
    existing: &mut Vec<CalendarEvent>,
    timezone: &str,
) -> SyncReport {
    let mut report = SyncReport {
        satellite: record.name.clone(),
        actions: Vec::new(),
    };

    for pass in record.groups.values().flatten() {
        let intent = event_intent(&record.name, pass, timezone);
        let action = match find_counterpart(existing, &record.name, pass) {
            Some(i) if existing[i].summary == intent.summary => {
                info!("Event already exists: {}", intent.summary);
                SyncAction::Unchanged {
                    summary: intent.summary,
                    id: existing[i].id.clone(),
                }
            }
            Some(i) => replace(calendar, existing, i, intent),
            None => create(calendar, existing, intent),
        };
        report.actions.push(action);
    }

    report
}

fn create<C: CalendarService + ?Sized>(
    calendar: &C,
    existing: &mut Vec<CalendarEvent>,
    intent: CalendarEventIntent,
) -> SyncAction {
    match calendar.insert(&intent) {
        Ok(id) => {
            info!("Event created: {}", intent.summary);
            existing.push(stored(&id, &intent));
            SyncAction::Created {
                summary: intent.summary,
                id,
            }
        }
        Err(e) => {
            error!("Failed to create {}: {}", intent.summary, e);
            SyncAction::Failed {
                summary: intent.summary,
                error: e.to_string(),
            }
        }
    }
}

fn replace<C: CalendarService + ?Sized>(
    calendar: &C,
    existing: &mut Vec<CalendarEvent>,
    index: usize,
    intent: CalendarEventIntent,
) -> SyncAction {
    let old = &existing[index];
    if let Err(e) = calendar.delete(&old.id) {
        error!("Failed to delete {} ({}): {}", old.summary, old.id, e);
        return SyncAction::Failed {
            summary: intent.summary,
            error: e.to_string(),
        };
    }
    let old = existing.remove(index);

    match calendar.insert(&intent) {
        Ok(new_id) => {
            info!("Event updated: {} (was {})", intent.summary, old.summary);
            existing.push(stored(&new_id, &intent));
            SyncAction::Replaced {
                summary: intent.summary,
                previous_summary: old.summary,
                old_id: old.id,
                new_id,
            }
        }
        Err(e) => {
            error!(
                "Deleted {} but failed to create {}: {}",
                old.summary, intent.summary, e
            );
            SyncAction::Failed {
                summary: intent.summary,
                error: e.to_string(),
            }
        }
    }
}

fn stored(id: &str, intent: &CalendarEventIntent) -> CalendarEvent {
    CalendarEvent {
        id: id.to_string(),
        summary: intent.summary.clone(),
        description: intent.description.clone(),
        start: intent.start,
        end: intent.end,
        timezone: Some(intent.timezone.clone()),
    }
}
