//! Spherical geodesy
//!
//! Distance, forward projection and rhumb-line bearing on a spherical earth.
//! Over anchoring distances (tens to hundreds of meters) the error against
//! the WGS84 ellipsoid is far below GPS noise.
//!
//! All bearings are radians clockwise from true north.

use serde::{Deserialize, Serialize};
use std::f64::consts::PI;

/// Mean earth radius in meters
pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

const TWO_PI: f64 = 2.0 * PI;

/// Geographic coordinate
///
/// Latitude and longitude in degrees. When used as an anchor position the
/// altitude is the negative depth of the anchor below the surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub altitude: Option<f64>,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Coordinate {
            latitude,
            longitude,
            altitude: None,
        }
    }

    pub fn with_altitude(mut self, altitude: Option<f64>) -> Self {
        self.altitude = altitude;
        self
    }

    /// True if both components are finite and within the valid ranges
    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }

    /// Same point without altitude
    pub fn horizontal(&self) -> Coordinate {
        Coordinate::new(self.latitude, self.longitude)
    }
}

/// Great-circle distance in meters (haversine)
pub fn distance(a: &Coordinate, b: &Coordinate) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();
    let d_lat = (b.latitude - a.latitude).to_radians();
    let d_lon = (b.longitude - a.longitude).to_radians();

    let h = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
    // Rounding can push h just past 1 for antipodal points
    let h = h.clamp(0.0, 1.0);
    let c = 2.0 * h.sqrt().atan2((1.0 - h).sqrt());

    EARTH_RADIUS_M * c
}

/// Point reached by travelling `distance_m` meters from `origin` on an
/// initial bearing of `bearing_rad`.
///
/// The altitude of `origin` is not carried over.
pub fn destination_point(origin: &Coordinate, bearing_rad: f64, distance_m: f64) -> Coordinate {
    let delta = distance_m / EARTH_RADIUS_M;
    let lat1 = origin.latitude.to_radians();
    let lon1 = origin.longitude.to_radians();

    let lat2 = (lat1.sin() * delta.cos() + lat1.cos() * delta.sin() * bearing_rad.cos()).asin();
    let lon2 = lon1
        + (bearing_rad.sin() * delta.sin() * lat1.cos())
            .atan2(delta.cos() - lat1.sin() * lat2.sin());

    Coordinate::new(lat2.to_degrees(), normalize_longitude(lon2).to_degrees())
}

/// Constant-heading bearing from `a` to `b`, in `[0, 2π)`
pub fn rhumb_bearing(a: &Coordinate, b: &Coordinate) -> f64 {
    let lat1 = a.latitude.to_radians();
    let lat2 = b.latitude.to_radians();

    let d_psi = ((PI / 4.0 + lat2 / 2.0).tan() / (PI / 4.0 + lat1 / 2.0).tan()).ln();
    let mut d_lon = (b.longitude - a.longitude).to_radians();

    // Take the shorter way round across the antimeridian
    if d_lon.abs() > PI {
        d_lon = if d_lon > 0.0 {
            -(TWO_PI - d_lon)
        } else {
            TWO_PI + d_lon
        };
    }

    normalize_bearing(d_lon.atan2(d_psi))
}

/// Bearing relative to the vessel heading, in `[-π, π]`.
///
/// Positive values are to starboard.
pub fn relative_bearing(bearing_rad: f64, heading_rad: f64) -> f64 {
    (bearing_rad - heading_rad + PI).rem_euclid(TWO_PI) - PI
}

/// Normalize a bearing to `[0, 2π)`
pub fn normalize_bearing(bearing_rad: f64) -> f64 {
    let b = bearing_rad.rem_euclid(TWO_PI);
    if b >= TWO_PI {
        0.0
    } else {
        b
    }
}

/// Normalize a longitude to `(-π, π]`
fn normalize_longitude(lon_rad: f64) -> f64 {
    let l = (lon_rad + PI).rem_euclid(TWO_PI) - PI;
    if l <= -PI {
        l + TWO_PI
    } else {
        l
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn marina() -> Coordinate {
        Coordinate::new(52.3676, 4.9041)
    }

    #[test]
    fn test_distance_to_self_is_zero() {
        let points = [
            marina(),
            Coordinate::new(0.0, 0.0),
            Coordinate::new(-33.86, 151.21),
            Coordinate::new(89.9, -179.9),
        ];
        for p in points {
            assert_eq!(distance(&p, &p), 0.0);
        }
    }

    #[test]
    fn test_distance_symmetric() {
        let a = marina();
        let b = Coordinate::new(52.3700, 4.9100);
        let ab = distance(&a, &b);
        let ba = distance(&b, &a);
        assert!((ab - ba).abs() < 1e-9);
        assert!(ab > 0.0);
    }

    #[test]
    fn test_distance_one_degree_of_latitude() {
        let a = Coordinate::new(0.0, 0.0);
        let b = Coordinate::new(1.0, 0.0);
        // 2πR / 360
        assert!((distance(&a, &b) - 111_194.93).abs() < 0.1);
    }

    #[test]
    fn test_destination_round_trip() {
        let origin = marina();
        for bearing_deg in [0.0, 45.0, 90.0, 135.0, 180.0, 225.0, 270.0, 315.0, 359.0] {
            for d in [0.5, 17.32, 60.0, 500.0, 2_500.0, 10_000.0] {
                let dest = destination_point(&origin, f64::to_radians(bearing_deg), d);
                let back = distance(&origin, &dest);
                assert!(
                    (back - d).abs() < 0.5,
                    "bearing {} distance {} came back as {}",
                    bearing_deg,
                    d,
                    back
                );
            }
        }
    }

    #[test]
    fn test_destination_zero_distance() {
        let origin = marina();
        let dest = destination_point(&origin, 1.0, 0.0);
        assert!((dest.latitude - origin.latitude).abs() < 1e-12);
        assert!((dest.longitude - origin.longitude).abs() < 1e-12);
        assert_eq!(dest.altitude, None);
    }

    #[test]
    fn test_destination_crosses_antimeridian() {
        let origin = Coordinate::new(0.0, 179.9999);
        let dest = destination_point(&origin, PI / 2.0, 1_000.0);
        assert!(dest.longitude < -179.0);
        assert!(dest.is_valid());
    }

    #[test]
    fn test_rhumb_cardinal_directions() {
        let origin = Coordinate::new(0.0, 0.0);
        let north = rhumb_bearing(&origin, &Coordinate::new(0.01, 0.0));
        let east = rhumb_bearing(&origin, &Coordinate::new(0.0, 0.01));
        let south = rhumb_bearing(&origin, &Coordinate::new(-0.01, 0.0));
        let west = rhumb_bearing(&origin, &Coordinate::new(0.0, -0.01));

        assert!(north.abs() < 1e-9);
        assert!((east - PI / 2.0).abs() < 1e-9);
        assert!((south - PI).abs() < 1e-9);
        assert!((west - 3.0 * PI / 2.0).abs() < 1e-9);
    }

    #[test]
    fn test_rhumb_matches_projection_bearing() {
        let origin = marina();
        let bearing = f64::to_radians(123.0);
        let dest = destination_point(&origin, bearing, 200.0);
        assert!((rhumb_bearing(&origin, &dest) - bearing).abs() < 1e-3);
    }

    #[test]
    fn test_rhumb_range() {
        let a = Coordinate::new(10.0, 170.0);
        let b = Coordinate::new(10.5, -170.0);
        let bearing = rhumb_bearing(&a, &b);
        assert!((0.0..2.0 * PI).contains(&bearing));
        // Eastbound across the antimeridian, not the long way west
        assert!(bearing < PI);
    }

    #[test]
    fn test_relative_bearing() {
        assert!((relative_bearing(PI / 2.0, 0.0) - PI / 2.0).abs() < 1e-12);
        assert!((relative_bearing(0.0, PI / 2.0) + PI / 2.0).abs() < 1e-12);
        // 350° heading, anchor at 10° → 20° to starboard
        let rel = relative_bearing(f64::to_radians(10.0), f64::to_radians(350.0));
        assert!((rel - f64::to_radians(20.0)).abs() < 1e-12);
        for b in 0..36 {
            for h in 0..36 {
                let r = relative_bearing(f64::from(b) * 0.2, f64::from(h) * 0.2);
                assert!((-PI..=PI).contains(&r));
            }
        }
    }

    #[test]
    fn test_normalize_longitude_range() {
        assert!((normalize_longitude(PI) - PI).abs() < 1e-12);
        assert!((normalize_longitude(-PI) - PI).abs() < 1e-12);
        assert!((normalize_longitude(3.0 * PI / 2.0) + PI / 2.0).abs() < 1e-12);
    }

    #[test]
    fn test_coordinate_validity() {
        assert!(marina().is_valid());
        assert!(!Coordinate::new(91.0, 0.0).is_valid());
        assert!(!Coordinate::new(0.0, 181.0).is_valid());
        assert!(!Coordinate::new(f64::NAN, 0.0).is_valid());
    }

    #[test]
    fn test_coordinate_serde() {
        let json = serde_json::to_string(&Coordinate::new(1.5, 2.5)).unwrap();
        assert_eq!(json, r#"{"latitude":1.5,"longitude":2.5}"#);

        let c: Coordinate =
            serde_json::from_str(r#"{"latitude":1.0,"longitude":2.0,"altitude":-8.0}"#).unwrap();
        assert_eq!(c.altitude, Some(-8.0));
    }
}
