//! The wind-field oracle contract. Weather-data ingestion (GRIB decoding,
//! network fetches) is out of scope; this module only defines the
//! contract the kernel depends on, plus small in-memory implementations
//! useful for tests and simple callers.

use chrono::{DateTime, Utc};
use std::collections::HashMap;

/// True wind direction (degrees, meteorological convention) and true wind
/// speed (m/s) at a point in time and space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindSample {
    pub twd_deg: f64,
    pub tws_ms: f64,
}

/// `wind_at(time, lat, lon) -> Option<WindSample>`. `None` signals
/// out-of-temporal-or-spatial scope; callers fall back to a best-effort
/// terminal point.
pub trait WindOracle: Sync {
    fn wind_at(&self, time: DateTime<Utc>, lat: f64, lon: f64) -> Option<WindSample>;
}

/// A spatially-uniform wind that is valid only up to (optionally) a cutoff
/// time, used by the CLI demo and the end-to-end scenario tests.
pub struct UniformWindOracle {
    pub twd_deg: f64,
    pub tws_ms: f64,
    pub scope_end: Option<DateTime<Utc>>,
}

impl UniformWindOracle {
    pub fn new(twd_deg: f64, tws_ms: f64) -> Self {
        Self { twd_deg, tws_ms, scope_end: None }
    }

    pub fn with_scope_end(mut self, end: DateTime<Utc>) -> Self {
        self.scope_end = Some(end);
        self
    }
}

impl WindOracle for UniformWindOracle {
    fn wind_at(&self, time: DateTime<Utc>, _lat: f64, _lon: f64) -> Option<WindSample> {
        if let Some(end) = self.scope_end {
            if time > end {
                return None;
            }
        }
        Some(WindSample { twd_deg: self.twd_deg, tws_ms: self.tws_ms })
    }
}

/// A coarse spatial grid of wind samples, keyed by whole-degree lat/lon
/// cells with a single sample per cell (no nearest-neighbour search
/// across cell boundaries).
#[derive(Default)]
pub struct GridWindOracle {
    cells: HashMap<(i32, i32), WindSample>,
}

impl GridWindOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, lat: f64, lon: f64, sample: WindSample) {
        self.cells.insert((lat.floor() as i32, lon.floor() as i32), sample);
    }
}

impl WindOracle for GridWindOracle {
    fn wind_at(&self, _time: DateTime<Utc>, lat: f64, lon: f64) -> Option<WindSample> {
        self.cells.get(&(lat.floor() as i32, lon.floor() as i32)).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn uniform_oracle_is_unbounded_by_default() {
        let o = UniformWindOracle::new(180.0, 2.0);
        let t = Utc.with_ymd_and_hms(2021, 4, 2, 18, 0, 0).unwrap();
        assert!(o.wind_at(t, 5.0, 38.0).is_some());
    }

    #[test]
    fn uniform_oracle_respects_scope_end() {
        let end = Utc.with_ymd_and_hms(2021, 4, 2, 12, 0, 0).unwrap();
        let o = UniformWindOracle::new(270.0, 5.0).with_scope_end(end);
        let before = Utc.with_ymd_and_hms(2021, 4, 2, 10, 0, 0).unwrap();
        let after = Utc.with_ymd_and_hms(2021, 4, 2, 14, 0, 0).unwrap();
        assert!(o.wind_at(before, 5.0, 38.0).is_some());
        assert!(o.wind_at(after, 5.0, 38.0).is_none());
    }

    #[test]
    fn grid_oracle_returns_none_outside_known_cells() {
        let mut o = GridWindOracle::new();
        o.insert(5.0, 38.0, WindSample { twd_deg: 180.0, tws_ms: 2.0 });
        let t = Utc::now();
        assert!(o.wind_at(t, 5.2, 38.2).is_some());
        assert!(o.wind_at(t, 50.0, 0.0).is_none());
    }
}
