use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::error::TrackerError;
use crate::geo::Coordinate;

/// Negative speeds smaller than this are treated as rounding noise.
const SPEED_TOLERANCE_MPS: f64 = 1e-6;

/// One raw fix from the device location source.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize, Serialize, ToSchema)]
pub struct LocationSample {
    pub position: Coordinate,
    #[serde(default)]
    pub heading_deg: Option<f64>,
    #[serde(default)]
    pub speed_mps: Option<f64>,
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl LocationSample {
    pub fn new(position: Coordinate, timestamp: DateTime<Utc>) -> Self {
        Self {
            position,
            heading_deg: None,
            speed_mps: None,
            timestamp,
        }
    }

    pub fn with_heading(mut self, heading_deg: f64) -> Self {
        self.heading_deg = Some(heading_deg);
        self
    }

    pub fn with_speed(mut self, speed_mps: f64) -> Self {
        self.speed_mps = Some(speed_mps);
        self
    }

    pub fn validate(&self) -> Result<(), TrackerError> {
        if !self.position.is_valid() {
            return Err(TrackerError::InvalidSample(format!(
                "position ({}, {}) out of range",
                self.position.latitude, self.position.longitude
            )));
        }
        if let Some(heading) = self.heading_deg {
            if !heading.is_finite() {
                return Err(TrackerError::InvalidSample(format!(
                    "heading {heading} is not finite"
                )));
            }
        }
        if let Some(speed) = self.speed_mps {
            if !speed.is_finite() || speed < -SPEED_TOLERANCE_MPS {
                return Err(TrackerError::InvalidSample(format!(
                    "speed {speed} m/s is not a valid speed"
                )));
            }
        }
        Ok(())
    }

    /// Ground speed in km/h; unknown speed counts as standing still.
    pub fn speed_kmh(&self) -> f64 {
        self.speed_mps.map(|mps| (mps * 3.6).max(0.0)).unwrap_or(0.0)
    }

    /// Heading folded into `[0, 360)`.
    pub fn normalized_heading(&self) -> Option<f64> {
        self.heading_deg.map(|h| h.rem_euclid(360.0))
    }
}
