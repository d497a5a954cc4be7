use chrono::{DateTime, Utc};

use crate::passes::error::PassError;
use crate::predict::{EventKind, Pass, RawEvent};

/// Group one station's ordered event stream into closed passes.
///
/// Passes are numbered from 1 in the order they close. A `rise` while a pass
/// is open drops that pass and starts over. A `set` without an open pass and
/// a stream that ends with a pass open are rejected.
pub fn detect_passes(
    station: &str,
    events: &[RawEvent],
    min_elevation: f64,
) -> Result<Vec<Pass>, PassError> {
    let mut passes = Vec::new();
    let mut pass_start: Option<DateTime<Utc>> = None;
    let mut max_elevation = 0.0;

    for event in events {
        if event.kind == EventKind::Rise {
            if let Some(open) = pass_start {
                log::warn!(
                    "{}: rise at {} restarts pass from {}",
                    station,
                    event.timestamp,
                    open
                );
            }
            pass_start = Some(event.timestamp);
            max_elevation = 0.0;
        }

        if pass_start.is_none() {
            if event.kind == EventKind::Set {
                return Err(PassError::incomplete(
                    station,
                    format!("set at {} without a rise", event.timestamp),
                ));
            }
            log::debug!(
                "{}: ignoring {} at {} outside a pass",
                station,
                event.kind,
                event.timestamp
            );
            continue;
        }

        if event.elevation_deg > max_elevation {
            max_elevation = event.elevation_deg;
        }

        if event.kind == EventKind::Set {
            if let Some(start) = pass_start.take() {
                let max = round1(max_elevation);
                if max < min_elevation {
                    log::warn!(
                        "{}: pass at {} peaks at {:.1}°, below the {:.1}° threshold",
                        station,
                        start,
                        max,
                        min_elevation
                    );
                }
                let id = passes.len() as u32 + 1;
                passes.push(Pass::single(station, start, event.timestamp, max, id));
            }
        }
    }

    if let Some(open) = pass_start {
        return Err(PassError::incomplete(
            station,
            format!("pass from {} never sets", open),
        ));
    }

    Ok(passes)
}

fn round1(v: f64) -> f64 {
    (v * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(h: u32, m: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 3, 1, h, m, s).unwrap()
    }

    fn event(kind: EventKind, t: DateTime<Utc>, el: f64) -> RawEvent {
        RawEvent::new(kind, t, el)
    }

    #[test]
    fn single_pass_from_rise_culminate_set() {
        let events = [
            event(EventKind::Rise, at(10, 0, 0), 0.0),
            event(EventKind::Culminate, at(10, 5, 0), 45.3),
            event(EventKind::Set, at(10, 10, 0), 0.0),
        ];

        let passes = detect_passes("Sydney", &events, 0.0).unwrap();
        assert_eq!(passes.len(), 1);

        let pass = &passes[0];
        assert_eq!(pass.start, at(10, 0, 0));
        assert_eq!(pass.end, at(10, 10, 0));
        assert_eq!(pass.id, 1);
        assert_eq!(pass.max_elevation("Sydney"), Some(45.3));
        assert_eq!(pass.group_key(), "Sydney");
    }

    #[test]
    fn ids_increment_and_elevation_is_rounded() {
        let events = [
            event(EventKind::Rise, at(1, 0, 0), 5.0),
            event(EventKind::Culminate, at(1, 4, 0), 12.34),
            event(EventKind::Set, at(1, 8, 0), 5.0),
            event(EventKind::Rise, at(2, 30, 0), 5.0),
            event(EventKind::Culminate, at(2, 36, 0), 61.97),
            event(EventKind::Set, at(2, 42, 0), 5.0),
        ];

        let passes = detect_passes("Perth", &events, 5.0).unwrap();
        assert_eq!(passes.iter().map(|p| p.id).collect::<Vec<_>>(), [1, 2]);
        assert_eq!(passes[0].max_elevation("Perth"), Some(12.3));
        assert_eq!(passes[1].max_elevation("Perth"), Some(62.0));
        for pass in &passes {
            assert!(pass.start <= pass.end);
            assert!(pass.max_elevation("Perth").unwrap() >= 5.0);
        }
    }

    #[test]
    fn set_without_rise_is_rejected() {
        let events = [
            event(EventKind::Culminate, at(10, 0, 0), 30.0),
            event(EventKind::Set, at(10, 5, 0), 0.0),
        ];

        let err = detect_passes("Sydney", &events, 0.0).unwrap_err();
        assert!(matches!(
            err,
            PassError::IncompleteEventStream { ref station, .. } if station == "Sydney"
        ));
    }

    #[test]
    fn unclosed_pass_is_rejected() {
        let events = [
            event(EventKind::Rise, at(10, 0, 0), 0.0),
            event(EventKind::Culminate, at(10, 5, 0), 20.0),
        ];

        assert!(detect_passes("Sydney", &events, 0.0).is_err());
    }

    #[test]
    fn second_rise_restarts_the_open_pass() {
        let events = [
            event(EventKind::Rise, at(10, 0, 0), 0.0),
            event(EventKind::Culminate, at(10, 2, 0), 50.0),
            event(EventKind::Rise, at(10, 5, 0), 0.0),
            event(EventKind::Culminate, at(10, 7, 0), 30.0),
            event(EventKind::Set, at(10, 10, 0), 0.0),
        ];

        let passes = detect_passes("Sydney", &events, 0.0).unwrap();
        assert_eq!(passes.len(), 1);
        assert_eq!(passes[0].start, at(10, 5, 0));
        assert_eq!(passes[0].end, at(10, 10, 0));
        assert_eq!(passes[0].max_elevation("Sydney"), Some(30.0));
        assert_eq!(passes[0].id, 1);
    }

    #[test]
    fn empty_stream_yields_no_passes() {
        assert!(detect_passes("Sydney", &[], 5.0).unwrap().is_empty());
    }
}
