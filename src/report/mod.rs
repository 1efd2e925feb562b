mod error;
mod http;
mod types;
mod worker;

pub use error::ReportError;
pub use http::HttpReporter;
pub use types::{Precedence, ProgressReport, ProgressReporter, RemoteProgress};
pub use worker::{spawn_reporter, ReportHandle, ReporterOptions};
