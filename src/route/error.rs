use thiserror::Error;

#[derive(Debug, Error, PartialEq)]
pub enum RouteError {
    #[error("invalid route: need at least 2 waypoints, got {0}")]
    TooFewWaypoints(usize),
    #[error("invalid route: waypoint {index} ({latitude}, {longitude}) is not a valid coordinate")]
    InvalidWaypoint {
        index: usize,
        latitude: f64,
        longitude: f64,
    },
}
