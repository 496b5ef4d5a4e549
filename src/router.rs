//! Routing strategies: [`PolarRouter`] (polar-driven) and
//! [`ShortestPathRouter`] (fixed motoring speed). Both wrap
//! [`crate::isochrone::expand_step`] and differ only in their
//! [`crate::isochrone::PointFn`].

use crate::error::RoutingError;
use crate::geomath::{self, Unit};
use crate::isochrone::{expand_step, IsoPoint, Isochrones, PointFn, ValidityFilters};
use crate::polar::Polar;
use crate::wind::WindOracle;
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::sync::Arc;

/// A single tunable routing parameter, validated against `{lower, upper,
/// step}` on set rather than held as a free-form attribute.
#[derive(Debug, Clone)]
pub struct RouterParam {
    pub code: &'static str,
    pub label: &'static str,
    pub tooltip: &'static str,
    pub default: f64,
    pub lower: f64,
    pub upper: f64,
    pub step: f64,
    pub digits: u32,
    pub value: f64,
}

impl RouterParam {
    pub fn new(
        code: &'static str,
        label: &'static str,
        tooltip: &'static str,
        default: f64,
        lower: f64,
        upper: f64,
        step: f64,
        digits: u32,
    ) -> Self {
        Self { code, label, tooltip, default, lower, upper, step, digits, value: default }
    }
}

/// A router's schema of named, bounded parameters.
#[derive(Debug, Clone, Default)]
pub struct RouterParams {
    params: HashMap<&'static str, RouterParam>,
}

impl RouterParams {
    pub fn new(params: Vec<RouterParam>) -> Self {
        Self { params: params.into_iter().map(|p| (p.code, p)).collect() }
    }

    pub fn get(&self, code: &str) -> Result<f64, RoutingError> {
        self.params
            .get(code)
            .map(|p| p.value)
            .ok_or_else(|| RoutingError::InvalidParam(code.to_string()))
    }

    /// Sets a parameter's value, clamped to `[lower, upper]`.
    pub fn set(&mut self, code: &str, value: f64) -> Result<(), RoutingError> {
        let p = self
            .params
            .get_mut(code)
            .ok_or_else(|| RoutingError::InvalidParam(code.to_string()))?;
        p.value = value.clamp(p.lower, p.upper);
        Ok(())
    }

    pub fn descriptors(&self) -> impl Iterator<Item = &RouterParam> {
        self.params.values()
    }
}

fn min_increase_param() -> RouterParam {
    RouterParam::new(
        "min_increase",
        "Minimum increase (nm)",
        "Set the minimum value for selecting a new valid point",
        10.0,
        1.0,
        100.0,
        0.1,
        1,
    )
}

fn fixed_speed_param() -> RouterParam {
    RouterParam::new(
        "fixed_speed",
        "Fixed speed (kn)",
        "Set the fixed motoring speed",
        5.0,
        1.0,
        60.0,
        0.1,
        1,
    )
}

/// Outcome of one `route()` call: the leg's time, any path reconstructed
/// to the waypoint (empty if the leg isn't done yet), the isochrone
/// layers accumulated so far, current position, and a progress estimate.
#[derive(Debug, Clone)]
pub struct RoutingResult {
    pub time: DateTime<Utc>,
    pub path: Vec<IsoPoint>,
    pub isochrones: Isochrones,
    pub position: (f64, f64),
    pub progress: f64,
}

impl RoutingResult {
    fn empty(time: DateTime<Utc>, position: (f64, f64), isochrones: Isochrones) -> Self {
        Self { time, path: Vec::new(), isochrones, position, progress: 0.0 }
    }
}

/// Boat speed via bilinear polar interpolation.
pub struct PolarMotion {
    pub polar: Arc<Polar>,
}

impl PointFn for PolarMotion {
    fn advance(&self, pos: (f64, f64), tws: f64, twa: f64, dt_hours: f64, brg: f64) -> ((f64, f64), f64) {
        let speed = self.polar.get_speed(tws, twa.abs());
        let new_pos = geomath::forward_point(pos.0, pos.1, speed * dt_hours, brg, Unit::NauticalMiles);
        (new_pos, speed)
    }
}

/// Fixed motoring speed regardless of wind.
// TODO: fold in a current/leeway reduction factor once current modeling
// is in scope.
pub struct FixedSpeedMotion {
    pub speed_kn: f64,
}

impl PointFn for FixedSpeedMotion {
    fn advance(&self, pos: (f64, f64), _tws: f64, _twa: f64, dt_hours: f64, brg: f64) -> ((f64, f64), f64) {
        let new_pos = geomath::forward_point(pos.0, pos.1, self.speed_kn * dt_hours, brg, Unit::NauticalMiles);
        (new_pos, self.speed_kn)
    }
}

fn reconstruct_path(isochrones: &Isochrones, terminal_layer_idx: usize, terminal: &IsoPoint) -> Vec<IsoPoint> {
    let mut rev = vec![*terminal];
    let mut layer_idx = terminal_layer_idx;
    let mut idx = terminal.prev_idx;
    while layer_idx > 0 {
        layer_idx -= 1;
        let node = isochrones[layer_idx][idx as usize];
        idx = node.prev_idx;
        rev.push(node);
    }
    rev.reverse();
    rev
}

/// Shared `route()` body for both strategies: seeds or continues the
/// isochrone expansion, runs one kernel step, then either closes out the
/// leg (wind in scope) or picks a best-effort terminal point (wind out
/// of scope).
#[allow(clippy::too_many_arguments)]
fn route_with_motion(
    motion: &dyn PointFn,
    min_increase: f64,
    prev: Option<&RoutingResult>,
    t: DateTime<Utc>,
    dt_hours: f64,
    start: (f64, f64),
    end: (f64, f64),
    wind: &dyn WindOracle,
    filters: &ValidityFilters,
    parallel: bool,
) -> Result<RoutingResult, RoutingError> {
    let step_duration = Duration::milliseconds((dt_hours * 3_600_000.0).round() as i64);
    let target_time = t + step_duration;

    if wind.wind_at(target_time, end.0, end.1).is_some() {
        let mut isochrones = match prev {
            Some(log) if !log.isochrones.is_empty() => log.isochrones.clone(),
            _ => {
                let next_wp_dist = geomath::point_distance(end.0, end.1, start.0, start.1, Unit::NauticalMiles);
                vec![vec![IsoPoint::seed(start, t, next_wp_dist)]]
            }
        };

        expand_step(target_time, dt_hours, &mut isochrones, end, motion, wind, filters, parallel)?;

        let last_idx = isochrones.len() - 1;
        let mut best: Option<(f64, usize)> = None;
        for (idx, p) in isochrones[last_idx].iter().enumerate() {
            let dist = geomath::point_distance(p.lat, p.lon, end.0, end.1, Unit::NauticalMiles);
            if dist >= min_increase {
                continue;
            }
            // Reach bound always uses a 1-hour step, matching the default
            // max_reach_distance(pos, speed) call regardless of this leg's
            // actual dt_hours.
            let reach = geomath::max_reach_distance(p.pos(), p.speed, 1.0);
            if dist >= (reach * 1.1).abs() {
                continue;
            }
            // Batched predicates, when set, disable their per-point
            // counterpart on this router instance.
            let point_validity = if filters.points_validity.is_some() { None } else { filters.point_validity };
            let line_validity = if filters.lines_validity.is_some() { None } else { filters.line_validity };
            let point_ok = point_validity.map_or(true, |pv| pv.is_valid(end.0, end.1));
            let line_ok = line_validity.map_or(true, |lv| lv.is_valid(end.0, end.1, p.lat, p.lon));
            if !point_ok || !line_ok {
                continue;
            }
            if best.map_or(true, |(best_dist, _)| dist < best_dist) {
                best = Some((dist, idx));
            }
        }

        match best {
            Some((_, idx)) => {
                let terminal = isochrones[last_idx][idx];
                let path = reconstruct_path(&isochrones, last_idx, &terminal);
                let position = terminal.pos();
                Ok(RoutingResult { time: target_time, path, isochrones, position, progress: 0.0 })
            }
            None => Ok(RoutingResult::empty(target_time, start, isochrones)),
        }
    } else {
        // Out of the wind oracle's scope: best-effort toward `end` using
        // whatever isochrones we already have.
        let isochrones = match prev {
            Some(log) if !log.isochrones.is_empty() => log.isochrones.clone(),
            _ => vec![vec![IsoPoint::seed(start, t, 0.0)]],
        };
        let last_idx = isochrones.len() - 1;
        let (best_idx, _) = isochrones[last_idx]
            .iter()
            .enumerate()
            .map(|(idx, p)| (idx, geomath::point_distance(p.lat, p.lon, end.0, end.1, Unit::NauticalMiles)))
            .min_by(|a, b| a.1.partial_cmp(&b.1).unwrap())
            .expect("layer is non-empty");

        let terminal = isochrones[last_idx][best_idx];
        let path = reconstruct_path(&isochrones, last_idx, &terminal);
        let position = terminal.pos();
        Ok(RoutingResult { time: t, path, isochrones, position, progress: 0.0 })
    }
}

/// A routing strategy: wraps the kernel with a motion model and
/// parameter schema.
pub trait Router {
    #[allow(clippy::too_many_arguments)]
    fn route(
        &self,
        prev: Option<&RoutingResult>,
        t: DateTime<Utc>,
        dt_hours: f64,
        start: (f64, f64),
        end: (f64, f64),
        wind: &dyn WindOracle,
        filters: &ValidityFilters,
    ) -> Result<RoutingResult, RoutingError>;

    fn params(&self) -> &RouterParams;
    fn params_mut(&mut self) -> &mut RouterParams;
}

pub struct PolarRouter {
    polar: Arc<Polar>,
    params: RouterParams,
    pub parallel: bool,
}

impl PolarRouter {
    pub fn new(polar: Arc<Polar>) -> Self {
        Self { polar, params: RouterParams::new(vec![min_increase_param()]), parallel: false }
    }
}

impl Router for PolarRouter {
    fn route(
        &self,
        prev: Option<&RoutingResult>,
        t: DateTime<Utc>,
        dt_hours: f64,
        start: (f64, f64),
        end: (f64, f64),
        wind: &dyn WindOracle,
        filters: &ValidityFilters,
    ) -> Result<RoutingResult, RoutingError> {
        let motion = PolarMotion { polar: self.polar.clone() };
        let min_increase = self.params.get("min_increase")?;
        route_with_motion(&motion, min_increase, prev, t, dt_hours, start, end, wind, filters, self.parallel)
    }

    fn params(&self) -> &RouterParams {
        &self.params
    }

    fn params_mut(&mut self) -> &mut RouterParams {
        &mut self.params
    }
}

pub struct ShortestPathRouter {
    params: RouterParams,
    pub parallel: bool,
}

impl ShortestPathRouter {
    pub fn new() -> Self {
        Self { params: RouterParams::new(vec![min_increase_param(), fixed_speed_param()]), parallel: false }
    }
}

impl Default for ShortestPathRouter {
    fn default() -> Self {
        Self::new()
    }
}

impl Router for ShortestPathRouter {
    fn route(
        &self,
        prev: Option<&RoutingResult>,
        t: DateTime<Utc>,
        dt_hours: f64,
        start: (f64, f64),
        end: (f64, f64),
        wind: &dyn WindOracle,
        filters: &ValidityFilters,
    ) -> Result<RoutingResult, RoutingError> {
        let motion = FixedSpeedMotion { speed_kn: self.params.get("fixed_speed")? };
        let min_increase = self.params.get("min_increase")?;
        route_with_motion(&motion, min_increase, prev, t, dt_hours, start, end, wind, filters, self.parallel)
    }

    fn params(&self) -> &RouterParams {
        &self.params
    }

    fn params_mut(&mut self) -> &mut RouterParams {
        &mut self.params
    }
}

/// Descriptor for a registered routing algorithm.
pub struct RoutingAlgorithm {
    pub name: &'static str,
}

pub fn list_routing_algorithms() -> Vec<RoutingAlgorithm> {
    vec![RoutingAlgorithm { name: "PolarRouter" }, RoutingAlgorithm { name: "ShortestPathRouter" }]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wind::UniformWindOracle;

    fn fixture_polar() -> Arc<Polar> {
        let text = "TWA\\TWS\t6\t8\t10\t12\n\
                     0\t0.0\t0.0\t0.0\t0.0\n\
                     60\t5.2\t6.1\t6.8\t7.2\n\
                     90\t5.0\t6.0\t6.9\t7.5\n\
                     120\t4.0\t5.2\t6.2\t7.0\n\
                     150\t2.8\t3.8\t4.6\t5.3\n\
                     180\t0.9\t1.0\t1.2\t1.4\n";
        Arc::new(Polar::from_str(text).unwrap())
    }

    #[test]
    fn invalid_param_code_surfaces_error() {
        let router = PolarRouter::new(fixture_polar());
        assert!(router.params().get("nonexistent").is_err());
    }

    #[test]
    fn set_param_clamps_to_bounds() {
        let mut router = PolarRouter::new(fixture_polar());
        router.params_mut().set("min_increase", 1000.0).unwrap();
        assert_eq!(router.params().get("min_increase").unwrap(), 100.0);
    }

    #[test]
    fn polar_router_reaches_a_close_waypoint() {
        let start = (5.0, 38.0);
        let end = (5.05, 38.05);
        let wind = UniformWindOracle::new(180.0, 2.0);
        let filters = ValidityFilters::default();
        let router = PolarRouter::new(fixture_polar());

        let result = router
            .route(None, Utc::now(), 1.0, start, end, &wind, &filters)
            .unwrap();

        assert!(!result.path.is_empty(), "a nearby waypoint should close the leg in one step");
        assert_eq!(result.path[0].prev_idx, -1);
    }

    #[test]
    fn shortest_path_router_uses_fixed_speed_regardless_of_wind() {
        let start = (5.0, 38.0);
        let end = (5.05, 38.05);
        let wind = UniformWindOracle::new(90.0, 0.0);
        let filters = ValidityFilters::default();
        let mut router = ShortestPathRouter::new();
        router.params_mut().set("fixed_speed", 6.0).unwrap();

        let result = router
            .route(None, Utc::now(), 1.0, start, end, &wind, &filters)
            .unwrap();

        assert!(!result.path.is_empty());
    }

    #[test]
    fn out_of_wind_scope_falls_back_to_nearest_point() {
        struct ScopedWind;
        impl WindOracle for ScopedWind {
            fn wind_at(&self, _t: DateTime<Utc>, lat: f64, _lon: f64) -> Option<crate::wind::WindSample> {
                if lat > 10.0 {
                    None
                } else {
                    Some(crate::wind::WindSample { twd_deg: 180.0, tws_ms: 5.0 })
                }
            }
        }

        let start = (5.0, 38.0);
        let end = (50.0, 38.0); // far outside the oracle's scope
        let filters = ValidityFilters::default();
        let router = PolarRouter::new(fixture_polar());

        let result = router
            .route(None, Utc::now(), 1.0, start, end, &ScopedWind, &filters)
            .unwrap();

        assert!(!result.path.is_empty());
    }
}
