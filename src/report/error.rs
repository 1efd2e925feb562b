use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("remote service error: {0}")]
    Remote(String),
    #[error("remote service timed out after {0:?}")]
    Timeout(std::time::Duration),
}
