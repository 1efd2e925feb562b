mod coordinate;

pub use coordinate::{haversine_m, Coordinate, EARTH_RADIUS_M};
