//! Named reference points used to label a coordinate.

use super::Coordinate;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ReferencePoint {
    pub name: &'static str,
    pub latitude: f64,
    pub longitude: f64,
}

pub const REFERENCE_POINTS: &[ReferencePoint] = &[
    ReferencePoint { name: "Jakarta", latitude: -6.2088, longitude: 106.8456 },
    ReferencePoint { name: "Bandung", latitude: -6.9175, longitude: 107.6191 },
    ReferencePoint { name: "Semarang", latitude: -6.9667, longitude: 110.4167 },
    ReferencePoint { name: "Yogyakarta", latitude: -7.7956, longitude: 110.3695 },
    ReferencePoint { name: "Surabaya", latitude: -7.2575, longitude: 112.7521 },
    ReferencePoint { name: "Denpasar", latitude: -8.6705, longitude: 115.2126 },
    ReferencePoint { name: "Medan", latitude: 3.5952, longitude: 98.6722 },
    ReferencePoint { name: "Palembang", latitude: -2.9761, longitude: 104.7754 },
    ReferencePoint { name: "Banda Aceh", latitude: 5.5483, longitude: 95.3238 },
    ReferencePoint { name: "Makassar", latitude: -5.1477, longitude: 119.4327 },
    ReferencePoint { name: "Balikpapan", latitude: -1.2379, longitude: 116.8529 },
    ReferencePoint { name: "Kuala Lumpur", latitude: 3.1390, longitude: 101.6869 },
    ReferencePoint { name: "Singapore", latitude: 1.3521, longitude: 103.8198 },
    ReferencePoint { name: "Makkah", latitude: 21.4225, longitude: 39.8262 },
    ReferencePoint { name: "Madinah", latitude: 24.5247, longitude: 39.5692 },
];

/// Closest reference point to `coordinate`.
///
/// Distance is planar Euclidean on raw degrees, not geodesic. That is good
/// enough to pick a city label and nothing more; do not use it for range
/// checks.
pub fn nearest_reference(coordinate: &Coordinate) -> &'static ReferencePoint {
    let mut best = &REFERENCE_POINTS[0];
    let mut best_d2 = f64::INFINITY;
    for point in REFERENCE_POINTS {
        let d_lat = point.latitude - coordinate.latitude;
        let d_lng = point.longitude - coordinate.longitude;
        let d2 = d_lat * d_lat + d_lng * d_lng;
        if d2 < best_d2 {
            best = point;
            best_d2 = d2;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exact_match_labels_itself() {
        let c = Coordinate::new(-7.2575, 112.7521);
        assert_eq!(nearest_reference(&c).name, "Surabaya");
    }

    #[test]
    fn nearby_coordinate_picks_closest_city() {
        // Bogor, south of Jakarta.
        let c = Coordinate::new(-6.5950, 106.8166);
        assert_eq!(nearest_reference(&c).name, "Jakarta");
        // Jeddah is closer to Makkah than Madinah.
        let c = Coordinate::new(21.5433, 39.1728);
        assert_eq!(nearest_reference(&c).name, "Makkah");
    }
}
