use serde::Serialize;
use utoipa::ToSchema;

use super::error::RouteError;
use super::parsing::parse_duration_minutes;
use super::types::Route;
use crate::geo::{haversine_m, Coordinate};

/// Typical urban driving speed, used when the duration label is unusable.
pub const DEFAULT_FALLBACK_SPEED_KMH: f64 = 40.0;

/// Result of snapping a position onto the route's waypoints.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, ToSchema)]
pub struct Projection {
    pub index: usize,
    pub snapped_position: Coordinate,
    pub distance_from_route_m: f64,
}

/// Geometry derived once per selected route.
///
/// Holds the cumulative great-circle distance at every waypoint and the
/// baseline speed implied by the route's advisory duration. Immutable after
/// [`RouteModel::build`].
#[derive(Debug, Clone)]
pub struct RouteModel {
    route: Route,
    cumulative_m: Vec<f64>,
    baseline_minutes: Option<u32>,
    baseline_speed_kmh: f64,
}

impl RouteModel {
    pub fn build(route: Route) -> Result<Self, RouteError> {
        Self::build_with_fallback(route, DEFAULT_FALLBACK_SPEED_KMH)
    }

    pub fn build_with_fallback(route: Route, fallback_speed_kmh: f64) -> Result<Self, RouteError> {
        if route.waypoints.len() < 2 {
            return Err(RouteError::TooFewWaypoints(route.waypoints.len()));
        }
        if let Some((index, wp)) = route
            .waypoints
            .iter()
            .enumerate()
            .find(|(_, wp)| !wp.is_valid())
        {
            return Err(RouteError::InvalidWaypoint {
                index,
                latitude: wp.latitude,
                longitude: wp.longitude,
            });
        }

        let cumulative_m = cumulative_distances(&route.waypoints);
        let total_m = cumulative_m.last().copied().unwrap_or(0.0);
        let baseline_minutes = parse_duration_minutes(&route.duration_label);
        let baseline_speed_kmh = match baseline_minutes {
            Some(minutes) if minutes > 0 && total_m > 0.0 => {
                (total_m / 1000.0) / (f64::from(minutes) / 60.0)
            }
            _ => fallback_speed_kmh,
        };

        log::debug!(
            "route model: {} waypoints, {:.0} m, baseline {:?} min, {:.1} km/h",
            route.waypoints.len(),
            total_m,
            baseline_minutes,
            baseline_speed_kmh
        );

        Ok(Self {
            route,
            cumulative_m,
            baseline_minutes,
            baseline_speed_kmh,
        })
    }

    pub fn route(&self) -> &Route {
        &self.route
    }

    pub fn waypoints(&self) -> &[Coordinate] {
        &self.route.waypoints
    }

    pub fn cumulative_distance_table(&self) -> &[f64] {
        &self.cumulative_m
    }

    pub fn total_route_meters(&self) -> f64 {
        self.cumulative_m.last().copied().unwrap_or(0.0)
    }

    pub fn total_route_km(&self) -> f64 {
        self.total_route_meters() / 1000.0
    }

    pub fn baseline_minutes(&self) -> Option<u32> {
        self.baseline_minutes
    }

    pub fn baseline_average_speed_kmh(&self) -> f64 {
        self.baseline_speed_kmh
    }

    /// Nearest waypoint to `point`; ties resolve to the lowest index.
    ///
    /// Linear in the number of waypoints. Routes from the routing service stay
    /// in the low hundreds of points, so there is no spatial index.
    pub fn project_nearest(&self, point: &Coordinate) -> Projection {
        let mut best_index = 0;
        let mut best_dist = f64::INFINITY;

        for (i, wp) in self.route.waypoints.iter().enumerate() {
            let d = haversine_m(point, wp);
            if d < best_dist {
                best_dist = d;
                best_index = i;
            }
        }

        Projection {
            index: best_index,
            snapped_position: self.route.waypoints[best_index],
            distance_from_route_m: best_dist,
        }
    }

    /// Distance still to travel from waypoint `index`, never negative.
    pub fn remaining_from(&self, index: usize) -> f64 {
        match self.cumulative_m.get(index) {
            Some(done) => (self.total_route_meters() - done).max(0.0),
            None => 0.0,
        }
    }
}

fn cumulative_distances(waypoints: &[Coordinate]) -> Vec<f64> {
    let mut total = 0.0;
    let mut table = Vec::with_capacity(waypoints.len());
    table.push(0.0);
    for pair in waypoints.windows(2) {
        total += haversine_m(&pair[0], &pair[1]);
        table.push(total);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scenario_route() -> Route {
        Route::new(
            vec![
                Coordinate::from_lng_lat([24.70, 39.50]),
                Coordinate::from_lng_lat([24.80, 39.60]),
            ],
            "15 mins",
            "14 km",
        )
    }

    fn riyadh_route(duration: &str) -> Route {
        Route::new(
            vec![
                Coordinate::new(24.7136, 46.6753),
                Coordinate::new(24.7150, 46.6800),
                Coordinate::new(24.7200, 46.6850),
                Coordinate::new(24.7200, 46.6850),
                Coordinate::new(24.7260, 46.6900),
            ],
            duration,
            "",
        )
    }

    #[test]
    fn rejects_short_routes() {
        let empty = Route::new(vec![], "15 mins", "");
        assert_eq!(
            RouteModel::build(empty).unwrap_err(),
            RouteError::TooFewWaypoints(0)
        );

        let single = Route::new(vec![Coordinate::new(24.7, 46.6)], "15 mins", "");
        assert_eq!(
            RouteModel::build(single).unwrap_err(),
            RouteError::TooFewWaypoints(1)
        );
    }

    #[test]
    fn rejects_malformed_waypoints() {
        let route = Route::new(
            vec![Coordinate::new(24.7, 46.6), Coordinate::new(f64::NAN, 46.7)],
            "15 mins",
            "",
        );
        assert!(matches!(
            RouteModel::build(route),
            Err(RouteError::InvalidWaypoint { index: 1, .. })
        ));
    }

    #[test]
    fn table_starts_at_zero_and_never_decreases() {
        let model = RouteModel::build(riyadh_route("15 mins")).unwrap();
        let table = model.cumulative_distance_table();

        assert_eq!(table.len(), model.waypoints().len());
        assert_eq!(table[0], 0.0);
        assert!(table.windows(2).all(|w| w[1] >= w[0]));
        assert_eq!(table[2], table[3]);
        assert_eq!(model.total_route_meters(), *table.last().unwrap());
    }

    #[test]
    fn scenario_totals() {
        let model = RouteModel::build(scenario_route()).unwrap();
        let total = model.total_route_meters();

        assert!((total - 14_041.2).abs() < 1.0, "got {total:.1} m");
        assert_eq!(model.baseline_minutes(), Some(15));
        let expected = (total / 1000.0) / 0.25;
        assert!((model.baseline_average_speed_kmh() - expected).abs() < 1e-9);
        assert!((model.baseline_average_speed_kmh() - 56.16).abs() < 0.01);
    }

    #[test]
    fn baseline_falls_back_without_minutes() {
        let model = RouteModel::build(riyadh_route("soon")).unwrap();
        assert_eq!(model.baseline_minutes(), None);
        assert_eq!(model.baseline_average_speed_kmh(), DEFAULT_FALLBACK_SPEED_KMH);

        let zero = RouteModel::build(riyadh_route("0 mins")).unwrap();
        assert_eq!(zero.baseline_minutes(), Some(0));
        assert_eq!(zero.baseline_average_speed_kmh(), DEFAULT_FALLBACK_SPEED_KMH);
    }

    #[test]
    fn baseline_falls_back_on_zero_length_route() {
        let p = Coordinate::new(24.7136, 46.6753);
        let model = RouteModel::build_with_fallback(Route::new(vec![p, p], "10 mins", ""), 30.0)
            .unwrap();
        assert_eq!(model.total_route_meters(), 0.0);
        assert_eq!(model.baseline_average_speed_kmh(), 30.0);
    }

    #[test]
    fn projection_picks_the_closest_waypoint() {
        let model = RouteModel::build(riyadh_route("15 mins")).unwrap();
        let point = Coordinate::new(24.7149, 46.6801);
        let projection = model.project_nearest(&point);

        assert_eq!(projection.index, 1);
        assert_eq!(projection.snapped_position, model.waypoints()[1]);
        for wp in model.waypoints() {
            assert!(haversine_m(&point, wp) >= projection.distance_from_route_m);
        }
    }

    #[test]
    fn projection_ties_go_to_the_first_index() {
        let model = RouteModel::build(riyadh_route("15 mins")).unwrap();
        let projection = model.project_nearest(&Coordinate::new(24.7200, 46.6850));
        assert_eq!(projection.index, 2);
        assert_eq!(projection.distance_from_route_m, 0.0);
    }

    #[test]
    fn projection_is_idempotent() {
        let model = RouteModel::build(riyadh_route("15 mins")).unwrap();
        let point = Coordinate::new(-33.0, 151.0);
        let first = model.project_nearest(&point);
        let second = model.project_nearest(&point);
        assert_eq!(first, second);
        assert!(first.index < model.waypoints().len());
    }

    #[test]
    fn remaining_is_clamped() {
        let model = RouteModel::build(riyadh_route("15 mins")).unwrap();
        let last = model.waypoints().len() - 1;
        assert_eq!(model.remaining_from(0), model.total_route_meters());
        assert_eq!(model.remaining_from(last), 0.0);
        assert_eq!(model.remaining_from(last + 10), 0.0);
    }
}
