use thiserror::Error;

#[derive(Debug, Error)]
pub enum CalendarError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Event not found: {0}")]
    NotFound(String),
}
