use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::geo::Coordinate;

/// A route as handed out by the routing service, coordinates in `[lng, lat]` order.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq, ToSchema)]
pub struct RouteOption {
    #[schema(value_type = Vec<Vec<f64>>)]
    pub coordinates: Vec<[f64; 2]>,
    #[serde(default)]
    pub distance: String,
    #[serde(default)]
    pub duration: String,
}

/// An ordered polyline plus the labels shown next to it in the route picker.
#[derive(Debug, Clone, PartialEq)]
pub struct Route {
    pub waypoints: Vec<Coordinate>,
    pub duration_label: String,
    pub distance_label: String,
}

impl Route {
    pub fn new(
        waypoints: Vec<Coordinate>,
        duration_label: impl Into<String>,
        distance_label: impl Into<String>,
    ) -> Self {
        Self {
            waypoints,
            duration_label: duration_label.into(),
            distance_label: distance_label.into(),
        }
    }
}

impl From<RouteOption> for Route {
    fn from(option: RouteOption) -> Self {
        Route {
            waypoints: option
                .coordinates
                .into_iter()
                .map(Coordinate::from_lng_lat)
                .collect(),
            duration_label: option.duration,
            distance_label: option.distance,
        }
    }
}
