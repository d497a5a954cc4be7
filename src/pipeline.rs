use chrono::{DateTime, Duration, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use thiserror::Error;

use crate::calendar::{reconcile, CalendarError, CalendarService, SyncReport, TimeWindow};
use crate::config::{Config, ConfigError, SatelliteConfig};
use crate::passes::{assign_daily_ids, correlate_passes, detect_passes};
use crate::predict::{EventSource, GroundStation, PredictError, SatelliteRecord};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("{satellite}: {source}")]
    Predict {
        satellite: String,
        source: PredictError,
    },
    #[error("cannot list existing calendar events: {0}")]
    Calendar(#[from] CalendarError),
    #[error("local midnight of {0} does not exist in {1}")]
    Window(String, String),
    #[error("window of {0} from {1} is out of range")]
    WindowOutOfRange(String, DateTime<Utc>),
}

/// Runs detection, correlation and daily numbering for the configured
/// satellites, one at a time, and optionally publishes the result.
pub struct Pipeline<'a, S: EventSource + ?Sized> {
    source: &'a S,
    satellites: Vec<SatelliteConfig>,
    stations: Vec<GroundStation>,
    combine: bool,
    tolerance: Duration,
    timezone: Tz,
    min_elevation: f64,
}

impl<'a, S: EventSource + ?Sized> Pipeline<'a, S> {
    pub fn new(config: &Config, source: &'a S) -> Result<Self, PipelineError> {
        Ok(Self {
            source,
            satellites: config.satellites.clone(),
            stations: config.stations(),
            combine: config.passes.combine,
            tolerance: config.tolerance()?,
            timezone: config.timezone()?,
            min_elevation: config.passes.min_elevation,
        })
    }

    pub fn timezone(&self) -> Tz {
        self.timezone
    }

    /// Finalized passes of one satellite.
    ///
    /// A station whose event stream is malformed is logged and contributes no
    /// passes; a propagation failure fails the whole satellite.
    pub fn compute(
        &self,
        satellite: &SatelliteConfig,
        window: &TimeWindow,
    ) -> Result<SatelliteRecord, PipelineError> {
        let mut record = SatelliteRecord::new(&satellite.name, satellite.norad_id);

        for station in &self.stations {
            let events = self
                .source
                .events(
                    satellite.norad_id,
                    station,
                    window.start,
                    window.end,
                    self.min_elevation,
                )
                .map_err(|source| PipelineError::Predict {
                    satellite: satellite.name.clone(),
                    source,
                })?;

            let passes = match detect_passes(&station.name, &events, self.min_elevation) {
                Ok(passes) => passes,
                Err(e) => {
                    log::error!("{}: skipping station: {}", satellite.name, e);
                    Vec::new()
                }
            };
            log::debug!(
                "{}: {} passes over {}",
                satellite.name,
                passes.len(),
                station.name
            );
            record.groups.insert(station.name.clone(), passes);
        }

        if self.combine {
            correlate_passes(&mut record, self.tolerance);
        }
        assign_daily_ids(&mut record, &self.timezone);

        log::info!("{}: {} passes", record.name, record.pass_count());
        Ok(record)
    }

    /// Passes for every satellite that could be computed.
    pub fn predict(&self, window: &TimeWindow) -> Vec<SatelliteRecord> {
        self.satellites
            .iter()
            .filter_map(|satellite| match self.compute(satellite, window) {
                Ok(record) => Some(record),
                Err(e) => {
                    log::error!("Skipping satellite: {}", e);
                    None
                }
            })
            .collect()
    }

    /// Compute and publish all satellites.
    ///
    /// Existing entries are listed once for the whole window; failing to list
    /// them aborts the run before any mutation.
    pub fn sync<C: CalendarService + ?Sized>(
        &self,
        calendar: &C,
        window: &TimeWindow,
    ) -> Result<Vec<SyncReport>, PipelineError> {
        let mut existing = calendar.list(window)?;
        if existing.is_empty() {
            log::info!("No existing events in window");
        }

        let timezone = self.timezone.name();
        let reports = self
            .predict(window)
            .iter()
            .map(|record| reconcile(calendar, record, &mut existing, timezone))
            .collect();
        Ok(reports)
    }
}

/// `length` starting at the most recent midnight in `tz`.
pub fn window_from_local_midnight(
    now: DateTime<Utc>,
    tz: Tz,
    length: Duration,
) -> Result<TimeWindow, PipelineError> {
    let date = now.with_timezone(&tz).date_naive();
    let midnight = tz
        .from_local_datetime(&date.and_time(NaiveTime::MIN))
        .earliest()
        .ok_or_else(|| PipelineError::Window(date.to_string(), tz.name().to_string()))?
        .with_timezone(&Utc);
    let end = midnight
        .checked_add_signed(length)
        .ok_or_else(|| PipelineError::WindowOutOfRange(length.to_string(), midnight))?;
    Ok(TimeWindow::new(midnight, end))
}
