//! Feeds a recorded track through a session, standing in for the device
//! location source.

use std::fs;

use thiserror::Error;

use crate::geo::{haversine_m, Coordinate};
use crate::route::{Route, RouteOption};
use crate::session::{NavigationSession, SessionUpdate};
use crate::tracker::{LocationSample, TrackerError};

#[derive(Debug, Error)]
pub enum ReplayError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// Load a route as delivered by the routing service (YAML or JSON).
pub fn load_route(path: &str) -> Result<Route, ReplayError> {
    let content = fs::read_to_string(path)?;
    let option: RouteOption = serde_yaml::from_str(&content)?;
    Ok(option.into())
}

/// Load a recorded list of samples (YAML or JSON).
pub fn load_track(path: &str) -> Result<Vec<LocationSample>, ReplayError> {
    let content = fs::read_to_string(path)?;
    Ok(serde_yaml::from_str(&content)?)
}

/// Only lets a fix through once the device moved at least `min_distance_m`
/// from the last delivered one.
#[derive(Debug, Clone)]
pub struct DistanceFilter {
    min_distance_m: f64,
    last: Option<Coordinate>,
}

impl DistanceFilter {
    pub fn new(min_distance_m: f64) -> Self {
        Self {
            min_distance_m,
            last: None,
        }
    }

    pub fn accept(&mut self, position: &Coordinate) -> bool {
        // Garbage goes through so the tracker can reject it.
        if !position.is_valid() {
            return true;
        }
        match self.last {
            Some(last) if haversine_m(&last, position) < self.min_distance_m => false,
            _ => {
                self.last = Some(*position);
                true
            }
        }
    }
}

#[derive(Debug)]
pub enum ReplayStep {
    Filtered,
    Update(SessionUpdate),
    Rejected(TrackerError),
}

/// Replay `samples` in order. With `preview_until = Some(n)` the session is
/// started after the n-th delivered sample.
pub fn replay(
    session: &mut NavigationSession,
    samples: &[LocationSample],
    filter: &mut DistanceFilter,
    preview_until: Option<usize>,
) -> Vec<ReplayStep> {
    let mut delivered = 0;
    let mut steps = Vec::with_capacity(samples.len());

    for sample in samples {
        if !filter.accept(&sample.position) {
            steps.push(ReplayStep::Filtered);
            continue;
        }
        if preview_until == Some(delivered) {
            if let Err(e) = session.start() {
                log::warn!("could not start tracking: {}", e);
            }
        }
        delivered += 1;

        match session.ingest(*sample) {
            Ok(update) => steps.push(ReplayStep::Update(update)),
            Err(e) => steps.push(ReplayStep::Rejected(e)),
        }
    }

    steps
}
