//! Geographic validity predicate contracts. Land/obstacle masking is an
//! external collaborator; this module defines the contract traits the
//! kernel filters through, plus small concrete obstacles used by the
//! end-to-end scenario tests.

use crate::geomath::{self, Unit};
use roaring::RoaringBitmap;

pub trait PointValidity: Sync {
    fn is_valid(&self, lat: f64, lon: f64) -> bool;
}

pub trait LineValidity: Sync {
    fn is_valid(&self, lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> bool;
}

pub trait PointsValidity: Sync {
    fn are_valid(&self, points: &[(f64, f64)]) -> Vec<bool>;
}

pub trait LinesValidity: Sync {
    fn are_valid(&self, lines: &[(f64, f64, f64, f64)]) -> Vec<bool>;
}

/// A circular exclusion zone: points inside are invalid, and a line is
/// invalid if either endpoint falls inside.
pub struct CircleObstacle {
    pub center: (f64, f64),
    pub radius_nm: f64,
}

impl PointValidity for CircleObstacle {
    fn is_valid(&self, lat: f64, lon: f64) -> bool {
        geomath::point_distance(lat, lon, self.center.0, self.center.1, Unit::NauticalMiles)
            >= self.radius_nm
    }
}

impl LineValidity for CircleObstacle {
    fn is_valid(&self, lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> bool {
        PointValidity::is_valid(self, lat1, lon1) && PointValidity::is_valid(self, lat2, lon2)
    }
}

/// A straight exclusion line with a perpendicular buffer, approximated by
/// sampling along the segment — simple and adequate at the scale of a
/// single isochrone step.
pub struct LineObstacle {
    pub a: (f64, f64),
    pub b: (f64, f64),
    pub buffer_nm: f64,
}

impl LineObstacle {
    fn distance_to_segment(&self, lat: f64, lon: f64) -> f64 {
        const SAMPLES: usize = 32;
        let mut best = f64::MAX;
        for i in 0..=SAMPLES {
            let t = i as f64 / SAMPLES as f64;
            let sample_lat = self.a.0 + (self.b.0 - self.a.0) * t;
            let sample_lon = self.a.1 + (self.b.1 - self.a.1) * t;
            let d = geomath::point_distance(lat, lon, sample_lat, sample_lon, Unit::NauticalMiles);
            if d < best {
                best = d;
            }
        }
        best
    }
}

impl PointValidity for LineObstacle {
    fn is_valid(&self, lat: f64, lon: f64) -> bool {
        self.distance_to_segment(lat, lon) >= self.buffer_nm
    }
}

impl LineValidity for LineObstacle {
    fn is_valid(&self, lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> bool {
        PointValidity::is_valid(self, lat1, lon1) && PointValidity::is_valid(self, lat2, lon2)
    }
}

/// An in-memory land mask storing land cells in a bitmap keyed by a
/// fixed-resolution lat/lon grid. A GSHHG-backed high-resolution loader is
/// out of scope here since no mask data ships with this crate.
pub struct GridLandMask {
    mask: RoaringBitmap,
    cells_per_degree: u32,
}

impl GridLandMask {
    pub fn new(cells_per_degree: u32) -> Self {
        Self { mask: RoaringBitmap::new(), cells_per_degree }
    }

    fn index(&self, lat: f64, lon: f64) -> u32 {
        let cpd = self.cells_per_degree as f64;
        let x = ((lon + 180.0) * cpd) as u32;
        let y = ((lat + 90.0) * cpd) as u32;
        let width = (360.0 * cpd) as u32;
        y * width + x
    }

    /// Marks a rectangular lat/lon box as land, for tests.
    pub fn add_land_box(&mut self, min_lat: f64, max_lat: f64, min_lon: f64, max_lon: f64) {
        let cpd = self.cells_per_degree as f64;
        let steps_lat = ((max_lat - min_lat) * cpd).ceil() as i32;
        let steps_lon = ((max_lon - min_lon) * cpd).ceil() as i32;
        for j in 0..=steps_lat {
            for i in 0..=steps_lon {
                let lat = min_lat + j as f64 / cpd;
                let lon = min_lon + i as f64 / cpd;
                self.mask.insert(self.index(lat, lon));
            }
        }
    }

    pub fn is_land(&self, lat: f64, lon: f64) -> bool {
        self.mask.contains(self.index(lat, lon))
    }
}

impl PointValidity for GridLandMask {
    fn is_valid(&self, lat: f64, lon: f64) -> bool {
        !self.is_land(lat, lon)
    }
}

impl LineValidity for GridLandMask {
    fn is_valid(&self, lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> bool {
        !self.is_land(lat1, lon1) && !self.is_land(lat2, lon2)
    }
}
