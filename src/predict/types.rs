use chrono::{DateTime, Utc};
use serde::Serialize;
use strum_macros::Display;

use indexmap::IndexMap;

/// Kind of a propagator-reported visibility event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum EventKind {
    Rise,
    Culminate,
    Set,
}

/// One rise/culminate/set event as seen from a single station.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawEvent {
    pub kind: EventKind,
    pub timestamp: DateTime<Utc>,
    pub elevation_deg: f64,
}

impl RawEvent {
    pub fn new(kind: EventKind, timestamp: DateTime<Utc>, elevation_deg: f64) -> Self {
        Self {
            kind,
            timestamp,
            elevation_deg,
        }
    }
}

/// A visibility window, seen by one station or merged across several.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Pass {
    pub id: u32,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    /// Max-elevation samples per station, in the order stations joined the pass.
    pub elevations: IndexMap<String, Vec<f64>>,
}

impl Pass {
    pub fn single(
        station: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        max_elevation_deg: f64,
        id: u32,
    ) -> Self {
        let mut pass = Self {
            id,
            start,
            end,
            elevations: IndexMap::new(),
        };
        pass.add_elevation(station, max_elevation_deg);
        pass
    }

    pub fn add_elevation(&mut self, station: &str, elevation_deg: f64) {
        self.elevations
            .entry(station.to_string())
            .or_default()
            .push(elevation_deg);
    }

    /// First recorded max elevation for `station`.
    #[cfg(test)]
    pub fn max_elevation(&self, station: &str) -> Option<f64> {
        self.elevations.get(station).and_then(|v| v.first().copied())
    }

    pub fn stations(&self) -> impl Iterator<Item = &str> {
        self.elevations.keys().map(String::as_str)
    }

    pub fn group_key(&self) -> String {
        group_label(self.stations())
    }
}

/// Group key for a set of stations: the bare name for one station,
/// `"(A, B, ...)"` in the given order otherwise.
pub fn group_label<'a>(stations: impl IntoIterator<Item = &'a str>) -> String {
    let names: Vec<&str> = stations.into_iter().collect();
    match names.as_slice() {
        [single] => single.to_string(),
        _ => format!("({})", names.join(", ")),
    }
}

/// All passes computed for one satellite, filed by group key.
#[derive(Debug, Clone, Serialize)]
pub struct SatelliteRecord {
    pub name: String,
    /// Catalog id, used as the handle into the element source.
    pub norad_id: u32,
    pub groups: IndexMap<String, Vec<Pass>>,
}

impl SatelliteRecord {
    pub fn new(name: &str, norad_id: u32) -> Self {
        Self {
            name: name.to_string(),
            norad_id,
            groups: IndexMap::new(),
        }
    }

    pub fn pass_count(&self) -> usize {
        self.groups.values().map(Vec::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn group_label_for_single_and_joint() {
        assert_eq!(group_label(["Sydney"]), "Sydney");
        assert_eq!(group_label(["Sydney", "Perth"]), "(Sydney, Perth)");
    }

    #[test]
    fn joint_pass_group_key_follows_insertion_order() {
        let t = Utc.with_ymd_and_hms(2025, 3, 1, 10, 0, 0).unwrap();
        let mut pass = Pass::single("Perth", t, t, 38.1, 1);
        pass.add_elevation("Sydney", 45.3);

        assert_eq!(pass.group_key(), "(Perth, Sydney)");
        assert_eq!(pass.max_elevation("Sydney"), Some(45.3));
    }

    #[test]
    fn groups_serialize_in_insertion_order() {
        let mut record = SatelliteRecord::new("SAT1", 1);
        record.groups.insert("Sydney".into(), vec![]);
        record.groups.insert("Perth".into(), vec![]);
        record.groups.insert("(Sydney, Perth)".into(), vec![]);

        let json = serde_json::to_string(&record.groups).unwrap();
        assert_eq!(json, r#"{"Sydney":[],"Perth":[],"(Sydney, Perth)":[]}"#);
    }

    #[test]
    fn event_kind_displays_lowercase() {
        assert_eq!(EventKind::Culminate.to_string(), "culminate");
    }
}
