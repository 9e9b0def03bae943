//! Geographic calculations

use crate::types::{Coordinates, Located};

/// Mean Earth radius in meters
const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Calculate Haversine distance between two points in meters
pub fn haversine_meters(from: &Coordinates, to: &Coordinates) -> f64 {
    let d_lat = (to.lat - from.lat).to_radians();
    let d_lon = (to.lng - from.lng).to_radians();

    let lat1 = from.lat.to_radians();
    let lat2 = to.lat.to_radians();

    let a = (d_lat / 2.0).sin().powi(2)
        + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);

    // Rounding can push `a` a hair above 1 for antipodal points
    let c = 2.0 * a.sqrt().min(1.0).asin();

    EARTH_RADIUS_M * c
}

/// Calculate Haversine distance between two points in kilometers
pub fn haversine_km(from: &Coordinates, to: &Coordinates) -> f64 {
    haversine_meters(from, to) / 1000.0
}

/// Calculate distance matrix between all points, in meters.
/// `matrix[i][j]` is the distance from point i to point j.
pub fn distance_matrix(points: &[Coordinates]) -> Vec<Vec<f64>> {
    let n = points.len();
    let mut matrix = vec![vec![0.0; n]; n];

    for i in 0..n {
        for j in (i + 1)..n {
            let d = haversine_meters(&points[i], &points[j]);
            matrix[i][j] = d;
            matrix[j][i] = d;
        }
    }

    matrix
}

/// Projection parameter of `point` on the line start→end, in lat/lng space.
/// Unclamped: < 0 lies before `start`, > 1 beyond `end`.
/// A zero-length segment yields 0.
fn projection_parameter(point: &Coordinates, start: &Coordinates, end: &Coordinates) -> f64 {
    let dx = end.lng - start.lng;
    let dy = end.lat - start.lat;
    let len_sq = dx * dx + dy * dy;
    if len_sq == 0.0 {
        return 0.0;
    }
    ((point.lng - start.lng) * dx + (point.lat - start.lat) * dy) / len_sq
}

/// Distance in km from `point` to the segment start→end.
///
/// Planar projection in degree space, clamped to the segment, then measured
/// with haversine. Not a true geodesic projection, which is fine at the
/// scale of a day's driving.
pub fn point_to_segment_km(point: &Coordinates, start: &Coordinates, end: &Coordinates) -> f64 {
    let t = projection_parameter(point, start, end).clamp(0.0, 1.0);
    let projected = Coordinates {
        lat: start.lat + t * (end.lat - start.lat),
        lng: start.lng + t * (end.lng - start.lng),
    };
    haversine_km(point, &projected)
}

/// Keep candidates within `radius_km` of the segment start→end, in travel
/// order from start toward end. Ties keep their input order.
pub fn contacts_in_corridor<T: Located>(
    candidates: Vec<T>,
    start: &Coordinates,
    end: &Coordinates,
    radius_km: f64,
) -> Vec<T> {
    let mut kept: Vec<(f64, T)> = candidates
        .into_iter()
        .filter_map(|candidate| {
            let point = candidate.coordinates();
            if point_to_segment_km(&point, start, end) <= radius_km {
                Some((projection_parameter(&point, start, end), candidate))
            } else {
                None
            }
        })
        .collect();

    // sort_by is stable
    kept.sort_by(|a, b| a.0.total_cmp(&b.0));
    kept.into_iter().map(|(_, candidate)| candidate).collect()
}

/// Latitude/longitude rectangle, used to prefilter candidates in SQL
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundingBox {
    pub min_lat: f64,
    pub max_lat: f64,
    pub min_lng: f64,
    pub max_lng: f64,
}

impl BoundingBox {
    /// Rectangle covering the segment start→end widened by `radius_km` on
    /// every side. Contains every point within `radius_km` of the segment.
    pub fn around_segment(start: &Coordinates, end: &Coordinates, radius_km: f64) -> Self {
        let km_per_degree = EARTH_RADIUS_M / 1000.0 * std::f64::consts::PI / 180.0;
        let lat_margin = radius_km / km_per_degree;

        let min_lat = (start.lat.min(end.lat) - lat_margin).max(-90.0);
        let max_lat = (start.lat.max(end.lat) + lat_margin).min(90.0);

        // Meridians converge toward the poles; use the widest spread in the box
        let widest = min_lat.abs().max(max_lat.abs()).to_radians().cos();
        let (min_lng, max_lng) = if widest < 0.01 {
            (-180.0, 180.0)
        } else {
            let lng_margin = lat_margin / widest;
            (
                (start.lng.min(end.lng) - lng_margin).max(-180.0),
                (start.lng.max(end.lng) + lng_margin).min(180.0),
            )
        };

        Self {
            min_lat,
            max_lat,
            min_lng,
            max_lng,
        }
    }

    #[cfg(test)]
    pub fn contains(&self, point: &Coordinates) -> bool {
        (self.min_lat..=self.max_lat).contains(&point.lat)
            && (self.min_lng..=self.max_lng).contains(&point.lng)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn prague() -> Coordinates {
        Coordinates { lat: 50.0755, lng: 14.4378 }
    }

    fn brno() -> Coordinates {
        Coordinates { lat: 49.1951, lng: 16.6068 }
    }

    #[derive(Debug, Clone, PartialEq)]
    struct Named(&'static str, Coordinates);

    impl Located for Named {
        fn coordinates(&self) -> Coordinates {
            self.1
        }
    }

    fn names(items: &[Named]) -> Vec<&'static str> {
        items.iter().map(|n| n.0).collect()
    }

    #[test]
    fn test_haversine_prague_brno() {
        let distance = haversine_km(&prague(), &brno());

        // Prague to Brno is approximately 185 km
        assert!((distance - 185.0).abs() < 5.0);
    }

    #[test]
    fn test_haversine_same_point() {
        let point = Coordinates { lat: 50.0, lng: 14.0 };
        assert!(haversine_meters(&point, &point).abs() < 0.001);
    }

    #[test]
    fn test_haversine_one_degree_longitude_at_equator() {
        let a = Coordinates { lat: 0.0, lng: 0.0 };
        let b = Coordinates { lat: 0.0, lng: 1.0 };
        // 2πR / 360
        let expected = 2.0 * std::f64::consts::PI * EARTH_RADIUS_M / 360.0;
        assert!((haversine_meters(&a, &b) - expected).abs() < 0.01);
    }

    #[test]
    fn test_haversine_units_agree() {
        let m = haversine_meters(&prague(), &brno());
        let km = haversine_km(&prague(), &brno());
        assert!((m / 1000.0 - km).abs() < 1e-9);
    }

    #[test]
    fn test_distance_matrix() {
        let points = vec![
            Coordinates { lat: 50.0, lng: 14.0 },
            Coordinates { lat: 50.1, lng: 14.1 },
            Coordinates { lat: 50.2, lng: 14.2 },
        ];

        let matrix = distance_matrix(&points);

        assert_eq!(matrix.len(), 3);
        assert_eq!(matrix[0].len(), 3);
        for i in 0..3 {
            assert_eq!(matrix[i][i], 0.0);
        }
        assert_eq!(matrix[0][1], matrix[1][0]);
        assert!(matrix[0][2] > matrix[0][1]);
    }

    #[test]
    fn test_point_to_segment_clamps_to_endpoints() {
        let start = Coordinates { lat: 0.0, lng: 0.0 };
        let end = Coordinates { lat: 0.0, lng: 1.0 };
        let beyond = Coordinates { lat: 0.0, lng: 2.0 };

        // Nearest point is `end`, not the extension of the line
        let d = point_to_segment_km(&beyond, &start, &end);
        assert!((d - haversine_km(&beyond, &end)).abs() < 1e-9);
    }

    #[test]
    fn test_point_to_segment_perpendicular() {
        let start = Coordinates { lat: 0.0, lng: 0.0 };
        let end = Coordinates { lat: 0.0, lng: 1.0 };
        let above_middle = Coordinates { lat: 0.1, lng: 0.5 };

        let d = point_to_segment_km(&above_middle, &start, &end);
        let expected = haversine_km(&above_middle, &Coordinates { lat: 0.0, lng: 0.5 });
        assert!((d - expected).abs() < 1e-9);
    }

    #[test]
    fn test_point_to_zero_length_segment() {
        let start = prague();
        let d = point_to_segment_km(&brno(), &start, &start);
        assert!((d - haversine_km(&brno(), &start)).abs() < 1e-9);
    }

    #[test]
    fn test_corridor_orders_by_travel_direction() {
        let start = Coordinates { lat: 0.0, lng: 0.0 };
        let end = Coordinates { lat: 0.0, lng: 1.0 };
        let candidates = vec![
            Named("end", end),
            Named("middle", Coordinates { lat: 0.01, lng: 0.5 }),
            Named("start", start),
            Named("quarter", Coordinates { lat: -0.01, lng: 0.25 }),
        ];

        let result = contacts_in_corridor(candidates, &start, &end, 8.0);
        assert_eq!(names(&result), vec!["start", "quarter", "middle", "end"]);
    }

    #[test]
    fn test_corridor_excludes_outside_radius() {
        let start = Coordinates { lat: 0.0, lng: 0.0 };
        let end = Coordinates { lat: 0.0, lng: 1.0 };
        let candidates = vec![
            // ~11 km north of the middle of the segment
            Named("far", Coordinates { lat: 0.1, lng: 0.5 }),
            // ~5.5 km north
            Named("near", Coordinates { lat: 0.05, lng: 0.5 }),
            // on the line, but ~11 km past the end
            Named("overshoot", Coordinates { lat: 0.0, lng: 1.1 }),
        ];

        let result = contacts_in_corridor(candidates, &start, &end, 8.0);
        assert_eq!(names(&result), vec!["near"]);
    }

    #[test]
    fn test_corridor_zero_length_keeps_input_order() {
        let start = Coordinates { lat: 10.0, lng: 10.0 };
        let candidates = vec![
            Named("b", Coordinates { lat: 10.01, lng: 10.0 }),
            Named("a", Coordinates { lat: 10.0, lng: 10.02 }),
            Named("far", Coordinates { lat: 11.0, lng: 10.0 }),
            Named("c", start),
        ];

        let result = contacts_in_corridor(candidates, &start, &start, 5.0);
        assert_eq!(names(&result), vec!["b", "a", "c"]);
    }

    #[test]
    fn test_corridor_empty_input() {
        let start = prague();
        let result: Vec<Coordinates> = contacts_in_corridor(vec![], &start, &brno(), 8.0);
        assert!(result.is_empty());
    }

    #[test]
    fn test_bounding_box_covers_corridor() {
        let bounds = BoundingBox::around_segment(&prague(), &brno(), 8.0);
        assert!(bounds.contains(&prague()));
        assert!(bounds.contains(&brno()));
        // 7 km north of Prague, inside the radius
        assert!(bounds.contains(&Coordinates { lat: 50.0755 + 7.0 / 111.2, lng: 14.4378 }));
        // 20 km north of Prague, outside
        assert!(!bounds.contains(&Coordinates { lat: 50.0755 + 20.0 / 111.2, lng: 14.4378 }));
        // 7 km east of Brno at this latitude, inside
        let east = 16.6068 + 7.0 / (111.2 * 49.1951_f64.to_radians().cos());
        assert!(bounds.contains(&Coordinates { lat: 49.1951, lng: east }));
    }

    #[test]
    fn test_bounding_box_near_pole_spans_all_longitudes() {
        let near_pole = Coordinates { lat: 89.99, lng: 0.0 };
        let bounds = BoundingBox::around_segment(&near_pole, &near_pole, 10.0);
        assert_eq!(bounds.max_lat, 90.0);
        assert_eq!((bounds.min_lng, bounds.max_lng), (-180.0, 180.0));
    }
}
