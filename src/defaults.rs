/// Minutes planned at a stop when nothing else is known.
pub const DEFAULT_EXPECTED_DURATION_MIN: i32 = 15;

/// Half-width of the band around a drawn line used for corridor planning.
pub const DEFAULT_CORRIDOR_RADIUS_KM: f64 = 8.0;

/// Straight-line speed used to turn heuristic distance into a duration (36 km/h).
pub const DEFAULT_HEURISTIC_SPEED_MPS: f64 = 10.0;

/// Origin + destination + 23 waypoints, the directions provider ceiling.
pub const MAX_DIRECTIONS_STOPS: usize = 25;

/// Geography-dependent modes need at least this many geocoded stops.
pub const MIN_GEOCODED_STOPS: usize = 2;

pub const DEFAULT_DIRECTIONS_TIMEOUT_SECS: u64 = 5;

pub const MAX_VISIT_NOTES_LEN: usize = 1000;

pub const MAX_ROUTE_NAME_LEN: usize = 100;
