//! Geodesic helpers on a spherical Earth model.
//!
//! All public distance/bearing functions operate on latitude/longitude in
//! degrees and return bearings in radians, matching the convention used by
//! the rest of the crate (TWD/TWA/bearings are radians internally; polar
//! files and the wind oracle speak degrees at their boundary).

/// Mean Earth radius, kilometres.
pub const EARTH_RADIUS_KM: f64 = 6371.0;

pub const NAUTICAL_MILE_IN_KM: f64 = 1.852;

/// m/s -> knots.
pub const MS_TO_KT: f64 = 1.94384;

/// Distance unit for [`point_distance`] and [`forward_point`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unit {
    NauticalMiles,
    Kilometers,
}

fn km_to_unit(km: f64, unit: Unit) -> f64 {
    match unit {
        Unit::Kilometers => km,
        Unit::NauticalMiles => km / NAUTICAL_MILE_IN_KM,
    }
}

fn unit_to_km(d: f64, unit: Unit) -> f64 {
    match unit {
        Unit::Kilometers => d,
        Unit::NauticalMiles => d * NAUTICAL_MILE_IN_KM,
    }
}

/// Great-circle (orthodromic) distance between two points, in `unit`.
pub fn point_distance(lat_a: f64, lon_a: f64, lat_b: f64, lon_b: f64, unit: Unit) -> f64 {
    let p1 = lat_a.to_radians();
    let p2 = lat_b.to_radians();
    let dp = (lat_b - lat_a).to_radians();
    let dl = (lon_b - lon_a).to_radians();

    let a = (dp / 2.0).sin().powi(2) + p1.cos() * p2.cos() * (dl / 2.0).sin().powi(2);
    let c = 2.0 * a.sqrt().atan2((1.0 - a).sqrt());
    km_to_unit(EARTH_RADIUS_KM * c, unit)
}

/// Rhumb-line (loxodromic) distance and initial heading between two points.
///
/// Distance is returned in nautical miles, heading in radians in
/// `[0, 2*pi)`.
pub fn rhumb_distance_bearing(lat_a: f64, lon_a: f64, lat_b: f64, lon_b: f64) -> (f64, f64) {
    let p1 = lat_a.to_radians();
    let p2 = lat_b.to_radians();
    let dp = p2 - p1;
    let mut dl = (lon_b - lon_a).to_radians();

    // Shortest way round the pole.
    if dl.abs() > std::f64::consts::PI {
        dl -= dl.signum() * 2.0 * std::f64::consts::PI;
    }

    let dpsi = ((p2 / 2.0 + std::f64::consts::FRAC_PI_4).tan()
        / (p1 / 2.0 + std::f64::consts::FRAC_PI_4).tan())
    .ln();
    let q = if dpsi.abs() > 1e-12 { dp / dpsi } else { p1.cos() };

    let dist_km = (dp * dp + q * q * dl * dl).sqrt() * EARTH_RADIUS_KM;
    let brg = reduce360(dl.atan2(dpsi));

    (km_to_unit(dist_km, Unit::NauticalMiles), brg)
}

/// Point at a great-circle `distance` (in `unit`) and initial `heading_rad`
/// from `(lat, lon)`. Stable for distances up to at least 20,000 km.
pub fn forward_point(lat: f64, lon: f64, distance: f64, heading_rad: f64, unit: Unit) -> (f64, f64) {
    let d_km = unit_to_km(distance, unit);
    let delta = d_km / EARTH_RADIUS_KM;

    let phi1 = lat.to_radians();
    let lambda1 = lon.to_radians();

    let phi2 = (phi1.sin() * delta.cos() + phi1.cos() * delta.sin() * heading_rad.cos()).asin();
    let lambda2 = lambda1
        + (heading_rad.sin() * delta.sin() * phi1.cos())
            .atan2(delta.cos() - phi1.sin() * phi2.sin());

    (phi2.to_degrees(), lambda2.to_degrees())
}

/// How far (nm) a boat making `speed_kn` knots could travel from `pos` in
/// `dt_hours`, used to bound whether a waypoint is within one step's reach.
pub fn max_reach_distance(pos: (f64, f64), speed_kn: f64, dt_hours: f64) -> f64 {
    let (lat2, lon2) = forward_point(pos.0, pos.1, speed_kn * dt_hours, 1.0, Unit::NauticalMiles);
    point_distance(pos.0, pos.1, lat2, lon2, Unit::NauticalMiles)
}

/// Velocity made good: `speed * cos(angle)`.
pub fn calculate_vmg(speed: f64, angle: f64) -> f64 {
    speed * angle.cos()
}

/// Reduce an angle (radians) to `[0, 2*pi)`. Returns `0.0` for `NaN`.
pub fn reduce360(alfa: f64) -> f64 {
    if alfa.is_nan() {
        return 0.0;
    }
    let two_pi = 2.0 * std::f64::consts::PI;
    let mut a = alfa % two_pi;
    if a < 0.0 {
        a += two_pi;
    }
    a
}

/// Reduce an angle (radians) to `(-pi, pi]`. Returns `0.0` for `NaN`.
pub fn reduce180(alfa: f64) -> f64 {
    if alfa.is_nan() {
        return 0.0;
    }
    let mut a = alfa;
    if a > std::f64::consts::PI {
        a -= 2.0 * std::f64::consts::PI;
    }
    if a < -std::f64::consts::PI {
        a += 2.0 * std::f64::consts::PI;
    }
    a
}
