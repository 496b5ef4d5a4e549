//! The isochrone expansion-and-pruning kernel: one-step fan-out from the
//! current frontier, angular-sector pruning, validity filtering and
//! predecessor linkage.

use crate::error::RoutingError;
use crate::geomath::{self, Unit};
use crate::validity::{LineValidity, LinesValidity, PointValidity, PointsValidity};
use crate::wind::WindOracle;
use chrono::{DateTime, Utc};
use log::{info, warn};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One point reached by the expansion at a given time. Predecessor
/// linkage is by index into the parent layer, never by pointer — layers
/// stay copyable/serializable and the graph is cycle-free by
/// construction.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IsoPoint {
    pub lat: f64,
    pub lon: f64,
    /// Index into the previous layer, or `-1` for the root.
    pub prev_idx: i64,
    pub time: DateTime<Utc>,
    /// True wind direction, radians.
    pub twd: f64,
    /// True wind speed, knots.
    pub tws: f64,
    /// Boat speed, knots.
    pub speed: f64,
    /// Bearing sailed to reach this point, degrees.
    pub brg_deg: f64,
    /// Great-circle distance to the leg's target waypoint, nm.
    pub next_wp_dist: f64,
    /// Rhumb-line distance (nm) from the leg seed to this point.
    pub start_wp_los_dist: f64,
    /// Rhumb-line bearing (radians) from the leg seed to this point.
    pub start_wp_los_brg: f64,
}

impl IsoPoint {
    pub fn pos(&self) -> (f64, f64) {
        (self.lat, self.lon)
    }

    /// Seeds a leg's layer-0 root point.
    pub fn seed(pos: (f64, f64), time: DateTime<Utc>, next_wp_dist: f64) -> Self {
        Self {
            lat: pos.0,
            lon: pos.1,
            prev_idx: -1,
            time,
            twd: 0.0,
            tws: 0.0,
            speed: 0.0,
            brg_deg: 0.0,
            next_wp_dist,
            start_wp_los_dist: 0.0,
            start_wp_los_brg: 0.0,
        }
    }
}

pub type IsochroneLayer = Vec<IsoPoint>;
pub type Isochrones = Vec<IsochroneLayer>;

/// Strategy used to advance a candidate point one step: given TWS/TWA and
/// a bearing, returns the new position and boat speed. Implemented by
/// [`crate::router::PolarMotion`] and [`crate::router::FixedSpeedMotion`].
pub trait PointFn: Sync {
    fn advance(&self, pos: (f64, f64), tws: f64, twa: f64, dt_hours: f64, brg: f64) -> ((f64, f64), f64);
}

/// Optional validity predicates a kernel step is filtered through. Setting
/// a batched variant disables its per-point counterpart.
#[derive(Default)]
pub struct ValidityFilters<'a> {
    pub point_validity: Option<&'a dyn PointValidity>,
    pub line_validity: Option<&'a dyn LineValidity>,
    pub points_validity: Option<&'a dyn PointsValidity>,
    pub lines_validity: Option<&'a dyn LinesValidity>,
}

impl<'a> ValidityFilters<'a> {
    fn filter(&self, candidates: Vec<IsoPoint>, last: &[IsoPoint]) -> Vec<IsoPoint> {
        let mut candidates = candidates;

        let point_validity = if self.points_validity.is_some() { None } else { self.point_validity };
        let line_validity = if self.lines_validity.is_some() { None } else { self.line_validity };

        if let Some(pv) = point_validity {
            candidates.retain(|p| pv.is_valid(p.lat, p.lon));
        }
        if let Some(lv) = line_validity {
            candidates.retain(|p| {
                let parent = &last[p.prev_idx as usize];
                lv.is_valid(p.lat, p.lon, parent.lat, parent.lon)
            });
        }
        if let Some(pv) = self.points_validity {
            let points: Vec<(f64, f64)> = candidates.iter().map(|p| (p.lat, p.lon)).collect();
            let valid = pv.are_valid(&points);
            candidates = candidates
                .into_iter()
                .zip(valid)
                .filter_map(|(p, ok)| ok.then_some(p))
                .collect();
        }
        if let Some(lv) = self.lines_validity {
            let lines: Vec<(f64, f64, f64, f64)> = candidates
                .iter()
                .map(|p| {
                    let parent = &last[p.prev_idx as usize];
                    (p.lat, p.lon, parent.lat, parent.lon)
                })
                .collect();
            let valid = lv.are_valid(&lines);
            candidates = candidates
                .into_iter()
                .zip(valid)
                .filter_map(|(p, ok)| ok.then_some(p))
                .collect();
        }

        candidates
    }
}

fn fan_out_one(
    i: usize,
    p: &IsoPoint,
    t: DateTime<Utc>,
    dt_hours: f64,
    next_wp: (f64, f64),
    seed: (f64, f64),
    point_fn: &dyn PointFn,
    wind: &dyn WindOracle,
) -> Result<Vec<IsoPoint>, RoutingError> {
    let sample = wind.wind_at(t, p.lat, p.lon).ok_or(RoutingError::NoWind)?;
    let twd = sample.twd_deg.to_radians();
    let tws = sample.tws_ms * geomath::MS_TO_KT;

    let mut out = Vec::new();
    let mut twa_deg = -180;
    while twa_deg < 180 {
        let twa = (twa_deg as f64).to_radians();
        let brg = geomath::reduce360(twd + twa);

        let (new_pos, speed) = point_fn.advance(p.pos(), tws, twa, dt_hours, brg);
        let next_wp_dist =
            geomath::point_distance(new_pos.0, new_pos.1, next_wp.0, next_wp.1, Unit::NauticalMiles);

        if next_wp_dist <= p.next_wp_dist {
            let (los_dist, los_brg) =
                geomath::rhumb_distance_bearing(seed.0, seed.1, new_pos.0, new_pos.1);

            out.push(IsoPoint {
                lat: new_pos.0,
                lon: new_pos.1,
                prev_idx: i as i64,
                time: t,
                twd,
                tws,
                speed,
                brg_deg: brg.to_degrees(),
                next_wp_dist,
                start_wp_los_dist: los_dist,
                start_wp_los_brg: los_brg,
            });
        }

        twa_deg += 5;
    }
    Ok(out)
}

/// Sector-prunes a flat set of candidate points by integer-degree bucket
/// of `start_wp_los_brg`, keeping the smallest `next_wp_dist` per bucket.
/// Candidates must already be sorted by `start_wp_los_brg` ascending —
/// ties within a bucket keep the first (lowest-bearing) entry seen.
pub fn prune_sectors(mut candidates: Vec<IsoPoint>) -> Vec<IsoPoint> {
    candidates.sort_by(|a, b| a.start_wp_los_brg.partial_cmp(&b.start_wp_los_brg).unwrap());

    let mut buckets: HashMap<i32, IsoPoint> = HashMap::new();
    let mut order: Vec<i32> = Vec::new();
    for p in candidates {
        let key = p.start_wp_los_brg.to_degrees().floor() as i32;
        match buckets.get(&key) {
            Some(existing) if p.next_wp_dist < existing.next_wp_dist => {
                buckets.insert(key, p);
            }
            Some(_) => {}
            None => {
                buckets.insert(key, p);
                order.push(key);
            }
        }
    }

    let mut out: Vec<IsoPoint> = order.into_iter().map(|k| buckets.remove(&k).unwrap()).collect();
    out.sort_by(|a, b| a.start_wp_los_brg.partial_cmp(&b.start_wp_los_brg).unwrap());
    out
}

/// Runs a single expansion step, appending the new layer to `isochrones`.
/// An empty resulting layer is permitted and terminates progress on the
/// leg.
#[allow(clippy::too_many_arguments)]
pub fn expand_step(
    t: DateTime<Utc>,
    dt_hours: f64,
    isochrones: &mut Isochrones,
    next_wp: (f64, f64),
    point_fn: &dyn PointFn,
    wind: &dyn WindOracle,
    filters: &ValidityFilters,
    parallel: bool,
) -> Result<(), RoutingError> {
    let seed = isochrones[0][0].pos();
    let last = isochrones.last().expect("isochrones is non-empty").clone();
    info!("expanding isochrone front for {} points", last.len());

    let grouped: Vec<Vec<IsoPoint>> = if parallel {
        last.par_iter()
            .enumerate()
            .map(|(i, p)| fan_out_one(i, p, t, dt_hours, next_wp, seed, point_fn, wind))
            .collect::<Result<Vec<_>, _>>()?
    } else {
        last.iter()
            .enumerate()
            .map(|(i, p)| fan_out_one(i, p, t, dt_hours, next_wp, seed, point_fn, wind))
            .collect::<Result<Vec<_>, _>>()?
    };

    let flat: Vec<IsoPoint> = grouped.into_iter().flatten().collect();
    let pruned = prune_sectors(flat);
    let mut filtered = filters.filter(pruned, &last);
    filtered.sort_by(|a, b| a.start_wp_los_brg.partial_cmp(&b.start_wp_los_brg).unwrap());

    if filtered.is_empty() {
        warn!("isochrone front collapsed to zero points; leg cannot progress further");
    } else {
        info!("pruned front down to {} frontier points", filtered.len());
    }

    isochrones.push(filtered);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wind::{UniformWindOracle, WindSample};
    use chrono::Utc;

    struct ConstantSpeed(f64);
    impl PointFn for ConstantSpeed {
        fn advance(&self, pos: (f64, f64), _tws: f64, _twa: f64, dt_hours: f64, brg: f64) -> ((f64, f64), f64) {
            let d = self.0 * dt_hours;
            (geomath::forward_point(pos.0, pos.1, d, brg, Unit::NauticalMiles), self.0)
        }
    }

    fn seeded_isochrones(start: (f64, f64), next_wp_dist: f64) -> Isochrones {
        vec![vec![IsoPoint::seed(start, Utc::now(), next_wp_dist)]]
    }

    #[test]
    fn expand_step_produces_deterministic_layer_regardless_of_parallelism() {
        let start = (45.0, -1.0);
        let dest = (46.0, -1.0);
        let dist = geomath::point_distance(start.0, start.1, dest.0, dest.1, Unit::NauticalMiles);
        let wind = UniformWindOracle::new(180.0, 5.0);
        let motion = ConstantSpeed(6.0);
        let filters = ValidityFilters::default();

        let mut serial = seeded_isochrones(start, dist);
        expand_step(Utc::now(), 1.0, &mut serial, dest, &motion, &wind, &filters, false).unwrap();

        let mut parallel = seeded_isochrones(start, dist);
        expand_step(Utc::now(), 1.0, &mut parallel, dest, &motion, &wind, &filters, true).unwrap();

        assert_eq!(serial.last().unwrap().len(), parallel.last().unwrap().len());
        for (a, b) in serial.last().unwrap().iter().zip(parallel.last().unwrap()) {
            assert!((a.lat - b.lat).abs() < 1e-12);
            assert!((a.lon - b.lon).abs() < 1e-12);
        }
    }

    #[test]
    fn every_child_points_to_a_valid_parent_index() {
        let start = (45.0, -1.0);
        let dest = (46.0, -1.0);
        let dist = geomath::point_distance(start.0, start.1, dest.0, dest.1, Unit::NauticalMiles);
        let wind = UniformWindOracle::new(180.0, 5.0);
        let motion = ConstantSpeed(6.0);
        let filters = ValidityFilters::default();
        let mut iso = seeded_isochrones(start, dist);

        expand_step(Utc::now(), 1.0, &mut iso, dest, &motion, &wind, &filters, false).unwrap();

        let parent_len = iso[iso.len() - 2].len();
        for p in iso.last().unwrap() {
            assert!(p.prev_idx >= 0 && (p.prev_idx as usize) < parent_len);
        }
    }

    #[test]
    fn next_wp_dist_never_increases_from_parent_to_child() {
        let start = (45.0, -1.0);
        let dest = (46.0, -1.0);
        let dist = geomath::point_distance(start.0, start.1, dest.0, dest.1, Unit::NauticalMiles);
        let wind = UniformWindOracle::new(180.0, 5.0);
        let motion = ConstantSpeed(6.0);
        let filters = ValidityFilters::default();
        let mut iso = seeded_isochrones(start, dist);

        expand_step(Utc::now(), 1.0, &mut iso, dest, &motion, &wind, &filters, false).unwrap();

        let parent = &iso[iso.len() - 2];
        for p in iso.last().unwrap() {
            assert!(p.next_wp_dist <= parent[p.prev_idx as usize].next_wp_dist + 1e-9);
        }
    }

    #[test]
    fn missing_wind_surfaces_no_wind_error() {
        struct NoWind;
        impl WindOracle for NoWind {
            fn wind_at(&self, _t: DateTime<Utc>, _lat: f64, _lon: f64) -> Option<WindSample> {
                None
            }
        }

        let start = (45.0, -1.0);
        let dest = (46.0, -1.0);
        let dist = geomath::point_distance(start.0, start.1, dest.0, dest.1, Unit::NauticalMiles);
        let motion = ConstantSpeed(6.0);
        let filters = ValidityFilters::default();
        let mut iso = seeded_isochrones(start, dist);

        let err = expand_step(Utc::now(), 1.0, &mut iso, dest, &motion, &NoWind, &filters, false).unwrap_err();
        assert_eq!(err, RoutingError::NoWind);
    }
}
