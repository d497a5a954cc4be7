mod error;
mod events;
mod ground_station;
mod propagation;
mod tle_loader;
mod types;

pub use error::PredictError;
pub use events::{EventSource, Sgp4EventSource};
pub use ground_station::GroundStation;
pub use tle_loader::TleLoader;
pub use types::{group_label, EventKind, Pass, RawEvent, SatelliteRecord};
