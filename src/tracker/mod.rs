mod error;
mod sample;
mod snapshot;
mod tracker;

pub use error::TrackerError;
pub use sample::LocationSample;
pub use snapshot::{DisplayState, ProgressSnapshot, ProgressUpdate};
pub use tracker::{
    ProgressTracker, StartMode, TrackerMode, TrackerSettings, TrackerState, TrackerStatus,
    DEFAULT_NOISE_FLOOR_KMH,
};
