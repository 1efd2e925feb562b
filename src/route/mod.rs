mod error;
mod model;
mod parsing;
mod types;

pub use error::RouteError;
pub use model::{Projection, RouteModel, DEFAULT_FALLBACK_SPEED_KMH};
pub use parsing::parse_duration_minutes;
pub use types::{Route, RouteOption};
