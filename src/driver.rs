//! The waypoint-driven routing driver: steps a [`Router`] leg by leg,
//! reconstructs paths, enforces time-monotonicity and tracks progress.

use crate::isochrone::{IsoPoint, ValidityFilters};
use crate::router::{Router, RoutingResult};
use crate::wind::WindOracle;
use chrono::{DateTime, Utc};

/// Sequence of [`RoutingResult`]s, one per `step()` call. Retained because
/// each step takes the previous log's trailing isochrones as input.
pub type RoutingLog = Vec<RoutingResult>;

/// Drives a [`Router`] across an ordered track of waypoints.
///
/// Owns the router, the accumulated path, the log and the current
/// position exclusively. The wind oracle and validity predicates are
/// borrowed for the lifetime of each `step()` call and are never
/// mutated.
pub struct RoutingDriver<'a> {
    algorithm: Box<dyn Router>,
    track: Vec<(f64, f64)>,
    wind: &'a dyn WindOracle,
    filters: ValidityFilters<'a>,

    position: (f64, f64),
    wp: usize,
    time: DateTime<Utc>,
    path: Vec<IsoPoint>,
    log: RoutingLog,
    steps: u64,
    end: bool,
    starting_new_leg: bool,
}

impl<'a> RoutingDriver<'a> {
    /// `track` must hold at least 2 waypoints. If `start_position` is
    /// `None`, routing starts from `track[0]` and the first leg targets
    /// `track[1]`.
    pub fn new(
        algorithm: Box<dyn Router>,
        track: Vec<(f64, f64)>,
        wind: &'a dyn WindOracle,
        start_datetime: DateTime<Utc>,
        start_position: Option<(f64, f64)>,
        filters: ValidityFilters<'a>,
    ) -> Self {
        assert!(track.len() >= 2, "a track needs at least 2 waypoints");

        let (wp, position) = match start_position {
            Some(pos) => (0, pos),
            None => (1, track[0]),
        };

        Self {
            algorithm,
            track,
            wind,
            filters,
            position,
            wp,
            time: start_datetime,
            path: Vec::new(),
            log: Vec::new(),
            steps: 0,
            end: false,
            starting_new_leg: true,
        }
    }

    pub fn end(&self) -> bool {
        self.end
    }

    pub fn steps(&self) -> u64 {
        self.steps
    }

    pub fn path(&self) -> &[IsoPoint] {
        &self.path
    }

    pub fn log(&self) -> &RoutingLog {
        &self.log
    }

    pub fn position(&self) -> (f64, f64) {
        self.position
    }

    /// Executes a single routing step, advancing the current leg (or
    /// starting the next) and returning the freshly-logged result.
    pub fn step(&mut self, dt_hours: f64) -> Result<RoutingResult, crate::error::RoutingError> {
        self.steps += 1;

        if self.wp >= self.track.len() {
            self.end = true;
            return Ok(self.log.last().expect("driver has already produced a result").clone());
        }

        let next_wp = self.track[self.wp];

        let result = if self.starting_new_leg || self.log.is_empty() {
            self.starting_new_leg = false;
            self.algorithm.route(None, self.time, dt_hours, self.position, next_wp, self.wind, &self.filters)?
        } else {
            let prev = self.log.last().unwrap().clone();
            self.algorithm.route(Some(&prev), self.time, dt_hours, self.position, next_wp, self.wind, &self.filters)?
        };

        // Non-monotone by construction — never used to decide termination,
        // only surfaced for progress bars.
        let ff = 100.0 / self.track.len() as f64;
        let progress = ff * self.wp as f64 + (self.log.len() as f64 % ff);

        if !result.path.is_empty() {
            self.position = result.position;
            self.path.extend(result.path.iter().copied());
            self.wp += 1;
            self.starting_new_leg = true;
        }

        self.path = time_monotone(&self.path);
        self.time = result.time;

        let logged = RoutingResult {
            progress,
            time: result.time,
            path: self.path.clone(),
            isochrones: result.isochrones,
            position: self.position,
        };
        self.log.push(logged.clone());
        Ok(logged)
    }
}

/// Keeps only points whose `time` strictly exceeds the previous kept
/// point's time; the first point is always kept. Removes overlaps where a
/// new leg starts at a time at or before the prior leg's end.
fn time_monotone(path: &[IsoPoint]) -> Vec<IsoPoint> {
    let mut out: Vec<IsoPoint> = Vec::with_capacity(path.len());
    let mut last_time: Option<DateTime<Utc>> = None;
    for p in path {
        match last_time {
            None => {
                out.push(*p);
                last_time = Some(p.time);
            }
            Some(t) if p.time > t => {
                out.push(*p);
                last_time = Some(p.time);
            }
            Some(_) => {}
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::polar::Polar;
    use crate::router::PolarRouter;
    use crate::wind::UniformWindOracle;
    use std::sync::Arc;

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
    fn driver_terminates_after_consuming_every_leg() {
        let wind = UniformWindOracle::new(180.0, 2.0);
        let track = vec![(5.0, 38.0), (5.05, 38.05), (5.1, 38.1)];
        let router = Box::new(PolarRouter::new(fixture_polar()));
        let mut driver = RoutingDriver::new(
            router,
            track,
            &wind,
            Utc::now(),
            None,
            ValidityFilters::default(),
        );

        let mut guard = 0;
        while !driver.end() && guard < 50 {
            driver.step(1.0).unwrap();
            guard += 1;
        }

        assert!(driver.end(), "driver should terminate once every leg is consumed");
        assert!(driver.steps() > 0);
    }

    #[test]
    fn accumulated_path_is_strictly_time_monotone() {
        let wind = UniformWindOracle::new(180.0, 2.0);
        let track = vec![(5.0, 38.0), (5.05, 38.05), (5.1, 38.1)];
        let router = Box::new(PolarRouter::new(fixture_polar()));
        let mut driver = RoutingDriver::new(
            router,
            track,
            &wind,
            Utc::now(),
            None,
            ValidityFilters::default(),
        );

        let mut guard = 0;
        while !driver.end() && guard < 50 {
            driver.step(1.0).unwrap();
            guard += 1;
        }

        for w in driver.path().windows(2) {
            assert!(w[0].time < w[1].time);
        }
    }
}
