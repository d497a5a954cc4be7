use chrono::Duration;
use chrono_tz::Tz;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::PathBuf;
use thiserror::Error;

use crate::predict::GroundStation;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub satellites: Vec<SatelliteConfig>,
    pub ground_stations: Vec<StationConfig>,
    #[serde(default)]
    pub passes: PassesConfig,
    pub tle: TleConfig,
    pub calendar: CalendarConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SatelliteConfig {
    pub name: String,
    pub norad_id: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StationConfig {
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default)]
    pub elevation_m: f64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PassesConfig {
    /// Merge passes seen by several stations.
    #[serde(default = "default_combine")]
    pub combine: bool,
    #[serde(default = "default_tolerance_s")]
    pub tolerance_s: i64,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default = "default_min_elevation")]
    pub min_elevation: f64,
    /// How far ahead to predict, e.g. "7days".
    #[serde(default = "default_window")]
    pub window: String,
}

impl Default for PassesConfig {
    fn default() -> Self {
        Self {
            combine: default_combine(),
            tolerance_s: default_tolerance_s(),
            timezone: default_timezone(),
            min_elevation: default_min_elevation(),
            window: default_window(),
        }
    }
}

fn default_combine() -> bool {
    true
}

fn default_tolerance_s() -> i64 {
    180
}

fn default_timezone() -> String {
    "Australia/Sydney".to_string()
}

fn default_min_elevation() -> f64 {
    5.0
}

fn default_window() -> String {
    "7days".to_string()
}

#[derive(Debug, Clone, Deserialize)]
pub struct TleConfig {
    pub folder: PathBuf,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CalendarConfig {
    pub folder: PathBuf,
}

impl Config {
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::from_str(&content)
    }

    pub fn from_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Config = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let invalid = |msg: String| Err(ConfigError::Invalid(msg));

        if self.satellites.is_empty() {
            return invalid("no satellites configured".into());
        }
        if self.ground_stations.is_empty() {
            return invalid("no ground stations configured".into());
        }

        let mut names = HashSet::new();
        for station in &self.ground_stations {
            if station.name.trim().is_empty() {
                return invalid("ground station with empty name".into());
            }
            if !names.insert(station.name.as_str()) {
                return invalid(format!("duplicate ground station: {}", station.name));
            }
            if !(-90.0..=90.0).contains(&station.latitude) {
                return invalid(format!("{}: latitude out of range", station.name));
            }
            if !(-180.0..=180.0).contains(&station.longitude) {
                return invalid(format!("{}: longitude out of range", station.name));
            }
        }

        if self.passes.tolerance_s < 0 {
            return invalid("tolerance_s must not be negative".into());
        }
        self.tolerance()?;
        self.timezone()?;
        self.window()?;
        Ok(())
    }

    pub fn timezone(&self) -> Result<Tz, ConfigError> {
        self.passes.timezone.parse().map_err(|_| {
            ConfigError::Invalid(format!("unknown timezone: {}", self.passes.timezone))
        })
    }

    pub fn window(&self) -> Result<Duration, ConfigError> {
        let invalid = |e: String| ConfigError::Invalid(format!("window: {}", e));
        let window = humantime::parse_duration(self.passes.window.trim())
            .map_err(|e| invalid(e.to_string()))
            .and_then(|d| Duration::from_std(d).map_err(|e| invalid(e.to_string())))?;
        if window <= Duration::zero() {
            return Err(invalid("must be positive".into()));
        }
        Ok(window)
    }

    pub fn tolerance(&self) -> Result<Duration, ConfigError> {
        Duration::try_seconds(self.passes.tolerance_s).ok_or_else(|| {
            ConfigError::Invalid(format!(
                "tolerance_s out of range: {}",
                self.passes.tolerance_s
            ))
        })
    }

    pub fn stations(&self) -> Vec<GroundStation> {
        self.ground_stations
            .iter()
            .map(|s| GroundStation::new(&s.name, s.latitude, s.longitude, s.elevation_m))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const CONFIG: &str = r#"
satellites:
  - { name: ISS, norad_id: 25544 }
ground_stations:
  - { name: Sydney, latitude: -33.87, longitude: 151.21, elevation_m: 58 }
  - { name: Perth, latitude: -31.95, longitude: 115.86 }
tle:
  folder: ./tle
calendar:
  folder: ./calendar
"#;

    #[test]
    fn defaults_apply() {
        let config = Config::from_str(CONFIG).unwrap();

        assert!(config.passes.combine);
        assert_eq!(config.tolerance().unwrap(), Duration::seconds(180));
        assert_eq!(config.timezone().unwrap(), chrono_tz::Australia::Sydney);
        assert_eq!(config.window().unwrap(), Duration::days(7));
        assert_eq!(config.passes.min_elevation, 5.0);

        let stations = config.stations();
        assert_eq!(stations[1].name, "Perth");
        assert_eq!(stations[1].altitude_m, 0.0);
    }

    #[test]
    fn passes_section_overrides() {
        let yaml = format!(
            "{}passes:\n  combine: false\n  tolerance_s: 60\n  timezone: UTC\n  window: 2days\n",
            CONFIG
        );
        let config = Config::from_str(&yaml).unwrap();

        assert!(!config.passes.combine);
        assert_eq!(config.tolerance().unwrap(), Duration::seconds(60));
        assert_eq!(config.timezone().unwrap(), chrono_tz::UTC);
        assert_eq!(config.window().unwrap(), Duration::days(2));
    }

    #[test]
    fn duplicate_station_is_rejected() {
        let yaml = CONFIG.replace("name: Perth", "name: Sydney");
        assert!(matches!(
            Config::from_str(&yaml),
            Err(ConfigError::Invalid(msg)) if msg.contains("duplicate")
        ));
    }

    #[test]
    fn unknown_timezone_is_rejected() {
        let yaml = format!("{}passes:\n  timezone: Mars/Olympus\n", CONFIG);
        assert!(matches!(
            Config::from_str(&yaml),
            Err(ConfigError::Invalid(_))
        ));
    }

    #[test]
    fn bad_window_is_rejected() {
        let yaml = format!("{}passes:\n  window: soon\n", CONFIG);
        assert!(Config::from_str(&yaml).is_err());
    }

    #[test]
    fn huge_tolerance_is_rejected() {
        let yaml = format!("{}passes:\n  tolerance_s: {}\n", CONFIG, i64::MAX);
        assert!(matches!(
            Config::from_str(&yaml),
            Err(ConfigError::Invalid(msg)) if msg.contains("tolerance_s")
        ));
    }

    #[test]
    fn missing_section_is_a_parse_error() {
        let yaml = CONFIG.replace("calendar:\n  folder: ./calendar\n", "");
        assert!(matches!(Config::from_str(&yaml), Err(ConfigError::Yaml(_))));
    }
}
