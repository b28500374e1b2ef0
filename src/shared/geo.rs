use std::{
    cmp,
    iter::Sum,
    ops::{Add, Div, Mul, Sub},
};

use serde::{Deserialize, Serialize};

/// A grid cell coordinate used by the spatial index. Cell size equals the
/// configured footpath radius, so any two stops in the same or adjacent cells are
/// candidates for a footpath edge.
pub type Cell = (i32, i32);

/// A length, stored in meters. Kept as its own type (rather than a bare `f64`) so
/// call sites read as `Distance::from_meters(320.0)` instead of an unlabeled number.
#[derive(Debug, Clone, Copy, Default)]
pub struct Distance(f64);

impl PartialEq for Distance {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl PartialOrd for Distance {
    fn partial_cmp(&self, other: &Self) -> Option<cmp::Ordering> {
        self.0.partial_cmp(&other.0)
    }
}

impl Add for Distance {
    type Output = Self;
    fn add(self, rhs: Self) -> Self::Output {
        Self(self.0 + rhs.0)
    }
}

impl Sub for Distance {
    type Output = Self;
    fn sub(self, rhs: Self) -> Self::Output {
        Self(self.0 - rhs.0)
    }
}

impl Mul<f64> for Distance {
    type Output = Self;
    fn mul(self, rhs: f64) -> Self::Output {
        Self(self.0 * rhs)
    }
}

impl Div<f64> for Distance {
    type Output = Self;
    fn div(self, rhs: f64) -> Self::Output {
        Self(self.0 / rhs)
    }
}

impl Distance {
    pub const fn from_meters(distance: f64) -> Self {
        Self(distance)
    }

    pub const fn from_kilometers(distance: f64) -> Self {
        Self(distance * 1000.0)
    }

    pub const fn as_meters(&self) -> f64 {
        self.0
    }

    pub const fn as_kilometers(&self) -> f64 {
        self.0 * 0.001
    }
}

/// A geodetic position in WGS84 degrees, as read directly from `stops.txt`.
#[derive(Debug, Default, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Sum for Coordinate {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        let mut count: usize = 0;
        let mut lat = 0.0;
        let mut lon = 0.0;
        iter.for_each(|coordinate| {
            count += 1;
            lat += coordinate.latitude;
            lon += coordinate.longitude;
        });
        let count = count.max(1) as f64;
        Self {
            latitude: lat / count,
            longitude: lon / count,
        }
    }
}

impl From<(f64, f64)> for Coordinate {
    fn from((latitude, longitude): (f64, f64)) -> Self {
        Self { latitude, longitude }
    }
}

const EARTH_RADIUS_M: f64 = 6_371_000.0;

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Great-circle distance via the haversine formula. Used only to pick the feed
    /// centroid sanity-check and in tests; the footpath builder itself measures
    /// distance on the projected plane, per spec.
    pub fn haversine_distance(&self, other: &Self) -> Distance {
        let dist_lat = (other.latitude - self.latitude).to_radians();
        let dist_lon = (other.longitude - self.longitude).to_radians();
        let a = (dist_lat / 2.0).sin().powi(2)
            + self.latitude.to_radians().cos()
                * other.latitude.to_radians().cos()
                * (dist_lon / 2.0).sin().powi(2);
        let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
        Distance::from_meters(EARTH_RADIUS_M * c)
    }
}

/// A stop position projected onto a local azimuthal-equidistant (AEQD) plane
/// centered on the feed's centroid, in meters. Distances computed on this plane are
/// what the footpath builder and spatial index use.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Projected {
    pub x: f64,
    pub y: f64,
}

impl Projected {
    pub fn euclidean_distance(&self, other: &Self) -> Distance {
        let dx = self.x - other.x;
        let dy = self.y - other.y;
        Distance::from_meters((dx * dx + dy * dy).sqrt())
    }

    /// Maps this point to the grid cell it falls in, for a given cell size. Two
    /// points within `cell_size` of each other land in the same cell or a cell
    /// immediately adjacent to it.
    pub fn to_cell(&self, cell_size: f64) -> Cell {
        ((self.x / cell_size).floor() as i32, (self.y / cell_size).floor() as i32)
    }
}

/// Spherical azimuthal-equidistant projection centered on a fixed origin.
///
/// This reproduces the `pyproj proj=aeqd` transform the original Python loader used
/// (`create_gdf`), rather than the degree-scaled grid approximation: distances
/// measured from the origin along a projected plane are exact great-circle
/// distances, and bearings are preserved, which keeps nearby-stop queries accurate
/// even in high-latitude feeds where a naive lat/lon-to-meters scaling distorts
/// longitude spacing.
#[derive(Debug, Clone, Copy)]
pub struct AeqdProjection {
    origin_lat_rad: f64,
    origin_lon_rad: f64,
}

impl AeqdProjection {
    /// Centers the projection on the mean of the given coordinates (the feed
    /// centroid). Falls back to `(0, 0)` for an empty slice.
    pub fn centered_on_centroid(stops: &[Coordinate]) -> Self {
        let centroid: Coordinate = stops.iter().copied().sum();
        Self::centered_on(centroid)
    }

    pub fn centered_on(origin: Coordinate) -> Self {
        Self {
            origin_lat_rad: origin.latitude.to_radians(),
            origin_lon_rad: origin.longitude.to_radians(),
        }
    }

    /// Forward-projects a geodetic coordinate to meters on the local plane.
    pub fn project(&self, coordinate: Coordinate) -> Projected {
        let lat = coordinate.latitude.to_radians();
        let lon = coordinate.longitude.to_radians();

        let d_lon = lon - self.origin_lon_rad;
        let cos_c = self.origin_lat_rad.sin() * lat.sin()
            + self.origin_lat_rad.cos() * lat.cos() * d_lon.cos();
        let cos_c = cos_c.clamp(-1.0, 1.0);
        let c = cos_c.acos();

        if c.abs() < 1e-12 {
            return Projected { x: 0.0, y: 0.0 };
        }

        let k = c / c.sin();
        let x = k * lat.cos() * d_lon.sin() * EARTH_RADIUS_M;
        let y = k
            * (self.origin_lat_rad.cos() * lat.sin()
                - self.origin_lat_rad.sin() * lat.cos() * d_lon.cos())
            * EARTH_RADIUS_M;
        Projected { x, y }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_eq_compares_meters() {
        let a = Distance::from_meters(1000.0);
        let b = Distance::from_kilometers(1.0);
        assert_eq!(a, b);
    }

    #[test]
    fn distance_cmp() {
        let a = Distance::from_meters(1000.0);
        let b = Distance::from_kilometers(0.5);
        assert!(a > b);
    }

    #[test]
    fn haversine_paris_london_is_roughly_343km() {
        let paris = Coordinate::new(48.858_01, 2.351_435);
        let london = Coordinate::new(51.505_238, -0.124_954_075);
        let d = paris.haversine_distance(&london);
        assert!((d.as_kilometers() - 343.0).abs() < 5.0);
    }

    #[test]
    fn aeqd_origin_projects_to_zero() {
        let origin = Coordinate::new(59.334_59, 18.063_24);
        let proj = AeqdProjection::centered_on(origin);
        let p = proj.project(origin);
        assert!(p.x.abs() < 1e-6 && p.y.abs() < 1e-6);
    }

    #[test]
    fn aeqd_distance_from_origin_matches_haversine() {
        let origin = Coordinate::new(59.334_59, 18.063_24);
        let other = Coordinate::new(59.370_136, 18.001_749);
        let proj = AeqdProjection::centered_on(origin);

        let projected_distance = Projected { x: 0.0, y: 0.0 }.euclidean_distance(&proj.project(other));
        let great_circle = origin.haversine_distance(&other);

        // AEQD is distance-preserving from the origin by construction.
        assert!((projected_distance.as_meters() - great_circle.as_meters()).abs() < 1.0);
    }

    #[test]
    fn cell_groups_nearby_points() {
        let a = Projected { x: 10.0, y: 10.0 };
        let b = Projected { x: 15.0, y: 5.0 };
        assert_eq!(a.to_cell(320.0), b.to_cell(320.0));
    }
}
