use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::error::ReportError;
use crate::geo::Coordinate;
use crate::route::Route;
use crate::tracker::{DisplayState, ProgressSnapshot};

/// Which progress figure wins when both local and remote ones exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum Precedence {
    #[default]
    Local,
    Remote,
}

/// What gets forwarded to the remote service for each active sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ProgressReport {
    pub location: Coordinate,
    pub heading: f64,
    pub speed_kmh: f64,
    #[serde(skip)]
    pub timestamp: DateTime<Utc>,
}

impl ProgressReport {
    /// Raw position and heading, unrounded speed.
    pub fn new(display: &DisplayState, snapshot: &ProgressSnapshot) -> Self {
        Self {
            location: display.position,
            heading: display.heading_deg,
            speed_kmh: snapshot.current_speed_kmh,
            timestamp: display.timestamp,
        }
    }
}

/// Server-computed progress for one report.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct RemoteProgress {
    pub snapped_position: Option<Coordinate>,
    pub remaining_km: f64,
    pub eta_minutes: u32,
    pub sample_timestamp: DateTime<Utc>,
    pub received_at: DateTime<Utc>,
}

#[async_trait]
pub trait ProgressReporter: Send + Sync {
    async fn init_route(&self, route: &Route) -> Result<(), ReportError>;

    async fn location_update(&self, report: &ProgressReport)
        -> Result<RemoteProgress, ReportError>;
}
