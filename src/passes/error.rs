use thiserror::Error;

#[derive(Debug, Error)]
pub enum PassError {
    #[error("incomplete event stream from {station}: {reason}")]
    IncompleteEventStream { station: String, reason: String },
}

impl PassError {
    pub fn incomplete(station: &str, reason: impl Into<String>) -> Self {
        PassError::IncompleteEventStream {
            station: station.to_string(),
            reason: reason.into(),
        }
    }
}
