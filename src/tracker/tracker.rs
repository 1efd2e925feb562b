use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use super::error::TrackerError;
use super::sample::LocationSample;
use super::snapshot::{DisplayState, ProgressSnapshot, ProgressUpdate};
use crate::route::RouteModel;

/// Below this the device speed is mostly GPS jitter.
pub const DEFAULT_NOISE_FLOOR_KMH: f64 = 5.0;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema, strum_macros::Display,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum TrackerMode {
    Idle,
    Previewing,
    Active,
}

/// How a session begins: looking at the route, or already driving it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartMode {
    Preview,
    Immediate,
}

impl StartMode {
    pub fn from_preview(preview: bool) -> Self {
        if preview {
            StartMode::Preview
        } else {
            StartMode::Immediate
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TrackerSettings {
    pub noise_floor_kmh: f64,
}

impl Default for TrackerSettings {
    fn default() -> Self {
        Self {
            noise_floor_kmh: DEFAULT_NOISE_FLOOR_KMH,
        }
    }
}

/// Everything the tracker remembers between samples.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackerState {
    pub last_sample: Option<LocationSample>,
    pub last_display: Option<DisplayState>,
    pub search_hint: Option<usize>,
    pub last_snapshot: Option<ProgressSnapshot>,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct TrackerStatus {
    pub mode: TrackerMode,
    pub display: Option<DisplayState>,
    pub last_snapshot: Option<ProgressSnapshot>,
}

/// Turns a stream of raw fixes into progress along one route.
///
/// Samples must be pushed one at a time; the tracker performs no I/O and
/// never blocks.
#[derive(Debug)]
pub struct ProgressTracker {
    model: Option<RouteModel>,
    settings: TrackerSettings,
    mode: TrackerMode,
    ended: bool,
    state: TrackerState,
}

impl ProgressTracker {
    pub fn new(model: Option<RouteModel>, start: StartMode, settings: TrackerSettings) -> Self {
        let mode = match start {
            StartMode::Preview => TrackerMode::Previewing,
            StartMode::Immediate => TrackerMode::Active,
        };
        log::info!("tracker created in {} mode", mode);
        Self {
            model,
            settings,
            mode,
            ended: false,
            state: TrackerState::default(),
        }
    }

    pub fn mode(&self) -> TrackerMode {
        self.mode
    }

    pub fn model(&self) -> Option<&RouteModel> {
        self.model.as_ref()
    }

    pub fn state(&self) -> &TrackerState {
        &self.state
    }

    pub fn last_snapshot(&self) -> Option<&ProgressSnapshot> {
        self.state.last_snapshot.as_ref()
    }

    pub fn status(&self) -> TrackerStatus {
        TrackerStatus {
            mode: self.mode,
            display: self.state.last_display,
            last_snapshot: self.state.last_snapshot,
        }
    }

    /// Confirm departure. Idempotent while active.
    pub fn start(&mut self) -> Result<TrackerMode, TrackerError> {
        if self.ended {
            return Err(TrackerError::SessionEnded);
        }
        if self.mode != TrackerMode::Active {
            log::info!("tracker {} -> {}", self.mode, TrackerMode::Active);
            self.mode = TrackerMode::Active;
        }
        Ok(self.mode)
    }

    /// End tracking for this session and forget everything learned so far.
    pub fn stop(&mut self) -> TrackerMode {
        if !self.ended {
            log::info!("tracker {} -> {}", self.mode, TrackerMode::Idle);
        }
        self.mode = TrackerMode::Idle;
        self.ended = true;
        self.state = TrackerState::default();
        self.mode
    }

    pub fn ingest(&mut self, sample: LocationSample) -> Result<ProgressUpdate, TrackerError> {
        let model = self.model.as_ref().ok_or(TrackerError::NotReady)?;
        if let Err(e) = sample.validate() {
            log::warn!("dropping sample at {}: {}", sample.timestamp, e);
            return Err(e);
        }

        let speed_kmh = sample.speed_kmh();
        let heading_deg = sample
            .normalized_heading()
            .or(self.state.last_display.map(|d| d.heading_deg))
            .unwrap_or(0.0);

        let display = DisplayState {
            position: sample.position,
            heading_deg,
            speed_kmh: speed_kmh.round() as u32,
            timestamp: sample.timestamp,
        };
        self.state.last_sample = Some(sample);
        self.state.last_display = Some(display);

        if self.mode != TrackerMode::Active {
            return Ok(ProgressUpdate {
                display,
                progress: None,
            });
        }

        let projection = model.project_nearest(&sample.position);
        if let Some(hint) = self.state.search_hint {
            if projection.index < hint {
                log::debug!(
                    "snapped back from waypoint {} to {} ({:.0} m off route)",
                    hint,
                    projection.index,
                    projection.distance_from_route_m
                );
            }
        }

        let remaining_m = model.remaining_from(projection.index);
        let effective_kmh = if speed_kmh > self.settings.noise_floor_kmh {
            speed_kmh
        } else {
            model.baseline_average_speed_kmh()
        };
        let eta_minutes = estimate_eta_minutes(remaining_m, effective_kmh);

        let snapshot = ProgressSnapshot {
            snapped_position: projection.snapped_position,
            nearest_waypoint_index: projection.index,
            distance_from_route_m: projection.distance_from_route_m,
            remaining_distance_m: remaining_m,
            eta_minutes,
            current_speed_kmh: speed_kmh,
            heading_deg,
            timestamp: sample.timestamp,
        };
        self.state.search_hint = Some(projection.index);
        self.state.last_snapshot = Some(snapshot);

        Ok(ProgressUpdate {
            display,
            progress: Some(snapshot),
        })
    }
}

fn estimate_eta_minutes(remaining_m: f64, speed_kmh: f64) -> Option<u32> {
    if speed_kmh.is_nan() || speed_kmh <= 0.0 {
        return None;
    }
    let minutes = (remaining_m / 1000.0) / speed_kmh * 60.0;
    Some(minutes.round() as u32)
}
