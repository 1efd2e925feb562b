use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum TrackerError {
    #[error("invalid sample: {0}")]
    InvalidSample(String),
    #[error("no route model loaded")]
    NotReady,
    #[error("navigation session already ended")]
    SessionEnded,
    #[error("location permission denied")]
    LocationPermissionDenied,
}
