use chrono::{DateTime, Duration, Utc};

use crate::predict::error::PredictError;
use crate::predict::ground_station::GroundStation;
use crate::predict::propagation::look_angles;
use crate::predict::tle_loader::{TleEntry, TleLoader};
use crate::predict::types::{EventKind, RawEvent};

const COARSE_STEP_SECONDS: i64 = 60; // 1 minute for initial scan
const FINE_STEP_SECONDS: i64 = 1; // 1 second for refinement
const MAX_OVERRUN_HOURS: i64 = 24;

/// Produces rise/culminate/set events for a satellite seen from a station.
pub trait EventSource {
    fn events(
        &self,
        norad_id: u32,
        station: &GroundStation,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        min_elevation: f64,
    ) -> Result<Vec<RawEvent>, PredictError>;
}

/// SGP4-backed event source over a loaded set of TLEs.
pub struct Sgp4EventSource {
    loader: TleLoader,
}

impl Sgp4EventSource {
    pub fn new(loader: TleLoader) -> Self {
        Self { loader }
    }
}

impl EventSource for Sgp4EventSource {
    fn events(
        &self,
        norad_id: u32,
        station: &GroundStation,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        min_elevation: f64,
    ) -> Result<Vec<RawEvent>, PredictError> {
        let entry = self.loader.elements(norad_id)?;
        find_events(station, entry, start, end, min_elevation)
    }
}

struct OpenPass {
    rise: DateTime<Utc>,
    peak: (DateTime<Utc>, f64),
}

/// Scan `[start, end]` for passes above `min_elevation`.
///
/// Only passes that rise inside the window are reported; one already in
/// progress at `start` is skipped. A pass that rises before `end` is followed
/// past it until it sets, so every reported pass is a complete
/// rise/culminate/set triple.
pub fn find_events(
    station: &GroundStation,
    entry: &TleEntry,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    min_elevation: f64,
) -> Result<Vec<RawEvent>, PredictError> {
    let elevation = |t: DateTime<Utc>| look_angles(station, entry, t).map(|a| a.elevation_deg);
    let coarse_step = Duration::seconds(COARSE_STEP_SECONDS);
    let limit = end + Duration::hours(MAX_OVERRUN_HOURS);

    let mut events = Vec::new();
    let mut open: Option<OpenPass> = None;
    let mut prev_time = start;
    let mut prev_above = elevation(start)? >= min_elevation;

    loop {
        let cursor = prev_time + coarse_step;
        if open.is_none() && cursor > end {
            break;
        }
        if cursor > limit {
            log::warn!(
                "{} still above {:.1}° from {} at {}, dropping open pass",
                entry.name,
                min_elevation,
                station.name,
                limit
            );
            break;
        }

        let el = elevation(cursor)?;
        let above = el >= min_elevation;

        open = match open.take() {
            None if above && !prev_above => {
                let rise = refine_crossing(&elevation, prev_time, cursor, min_elevation, true)?;
                Some(OpenPass {
                    rise,
                    peak: (cursor, el),
                })
            }
            None => None,
            Some(mut pass) if above => {
                if el > pass.peak.1 {
                    pass.peak = (cursor, el);
                }
                Some(pass)
            }
            Some(pass) => {
                let set = refine_crossing(&elevation, prev_time, cursor, min_elevation, false)?;
                let lo = (pass.peak.0 - coarse_step).max(pass.rise);
                let hi = (pass.peak.0 + coarse_step).min(set);
                let mut culmination = refine_peak(&elevation, lo, hi)?;
                if culmination.1 < pass.peak.1 {
                    culmination = pass.peak;
                }

                let at_rise = look_angles(station, entry, pass.rise)?;
                log::debug!(
                    "{} rises over {} at {} (az {:.0}°, {:.0} km)",
                    entry.name,
                    station.name,
                    pass.rise,
                    at_rise.azimuth_deg,
                    at_rise.range_km
                );
                events.push(RawEvent::new(
                    EventKind::Rise,
                    pass.rise,
                    at_rise.elevation_deg,
                ));
                events.push(RawEvent::new(
                    EventKind::Culminate,
                    culmination.0,
                    culmination.1,
                ));
                events.push(RawEvent::new(EventKind::Set, set, elevation(set)?));
                None
            }
        };

        prev_above = above;
        prev_time = cursor;
    }

    Ok(events)
}

/// Binary search to find the threshold crossing time.
///
/// Returns the first instant of the bracket on the "after" side: above the
/// threshold when rising, below it when setting.
fn refine_crossing<F>(
    elevation: &F,
    before: DateTime<Utc>,
    after: DateTime<Utc>,
    min_elevation: f64,
    rising: bool,
) -> Result<DateTime<Utc>, PredictError>
where
    F: Fn(DateTime<Utc>) -> Result<f64, PredictError>,
{
    let mut low = before;
    let mut high = after;

    while (high - low).num_seconds() > FINE_STEP_SECONDS {
        let mid = low + (high - low) / 2;
        let above = elevation(mid)? >= min_elevation;
        if above == rising {
            high = mid;
        } else {
            low = mid;
        }
    }

    Ok(high)
}

/// Ternary search for the elevation maximum inside `[lo, hi]`.
fn refine_peak<F>(
    elevation: &F,
    lo: DateTime<Utc>,
    hi: DateTime<Utc>,
) -> Result<(DateTime<Utc>, f64), PredictError>
where
    F: Fn(DateTime<Utc>) -> Result<f64, PredictError>,
{
    let mut lo = lo;
    let mut hi = hi;

    while (hi - lo).num_seconds() > 2 * FINE_STEP_SECONDS {
        let third = (hi - lo) / 3;
        let m1 = lo + third;
        let m2 = hi - third;
        if elevation(m1)? < elevation(m2)? {
            lo = m1;
        } else {
            hi = m2;
        }
    }

    let mid = lo + (hi - lo) / 2;
    Ok((mid, elevation(mid)?))
}
