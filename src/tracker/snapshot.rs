use chrono::{DateTime, Utc};
use serde::Serialize;
use utoipa::ToSchema;

use crate::geo::Coordinate;

/// Raw fields shown on screen regardless of tracking mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct DisplayState {
    pub position: Coordinate,
    pub heading_deg: f64,
    pub speed_kmh: u32,
    pub timestamp: DateTime<Utc>,
}

/// Progress along the route for one sample, only produced while tracking is active.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct ProgressSnapshot {
    pub snapped_position: Coordinate,
    pub nearest_waypoint_index: usize,
    pub distance_from_route_m: f64,
    pub remaining_distance_m: f64,
    pub eta_minutes: Option<u32>,
    pub current_speed_kmh: f64,
    pub heading_deg: f64,
    pub timestamp: DateTime<Utc>,
}

impl ProgressSnapshot {
    pub fn remaining_km(&self) -> f64 {
        self.remaining_distance_m / 1000.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct ProgressUpdate {
    pub display: DisplayState,
    pub progress: Option<ProgressSnapshot>,
}
