use chrono::TimeZone;
use indexmap::IndexMap;

use crate::predict::{Pass, SatelliteRecord};

/// Renumber every pass of a satellite per local calendar day and re-file it
/// under the group its stations spell.
///
/// Ids start at 1 with the earliest pass and reset whenever the date of a
/// pass start in `tz` differs from the previous one. Existing group keys keep
/// their position, even if they end up empty.
pub fn assign_daily_ids<Tz: TimeZone>(record: &mut SatelliteRecord, tz: &Tz) {
    let mut all: Vec<Pass> = record
        .groups
        .values_mut()
        .flat_map(std::mem::take)
        .collect();

    if all.is_empty() {
        return;
    }

    // Starts are UTC instants, so the sort is chronological.
    all.sort_by_key(|p| p.start);

    let mut current_day = all[0].start.with_timezone(tz).date_naive();
    let mut next_id = 1;
    for pass in &mut all {
        let day = pass.start.with_timezone(tz).date_naive();
        if day != current_day {
            next_id = 1;
            current_day = day;
        }
        pass.id = next_id;
        next_id += 1;
    }

    let mut groups: IndexMap<String, Vec<Pass>> = record
        .groups
        .keys()
        .map(|k| (k.clone(), Vec::new()))
        .collect();
    for pass in all {
        groups.entry(pass.group_key()).or_default().push(pass);
    }
    for passes in groups.values_mut() {
        passes.sort_by_key(|p| p.start);
    }

    record.groups = groups;
}
