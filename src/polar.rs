//! Parsing, validation and interpolation of boat-performance polar tables.

use crate::error::PolarError;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use std::sync::Mutex;

const EMPTY_VALUES: [&str; 4] = ["", "-", "NaN", "NULL"];

/// A boat's polar diagram: boat speed (knots) as a function of true wind
/// speed (knots) and true wind angle (radians, `[0, pi]`).
///
/// `speed[twa_idx][tws_idx]` mirrors the row-major layout of the polar file
/// (one row per TWA, one column per TWS).
pub struct Polar {
    tws: Vec<f64>,
    twa: Vec<f64>,
    speed: Vec<Vec<f64>>,
    vmg_cache: Mutex<HashMap<(u64, u64), (f64, f64)>>,
}

impl std::fmt::Debug for Polar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Polar")
            .field("tws", &self.tws)
            .field("twa", &self.twa)
            .field("speed", &self.speed)
            .finish()
    }
}

impl Clone for Polar {
    fn clone(&self) -> Self {
        Self {
            tws: self.tws.clone(),
            twa: self.twa.clone(),
            speed: self.speed.clone(),
            vmg_cache: Mutex::new(self.vmg_cache.lock().unwrap().clone()),
        }
    }
}

impl Polar {
    /// Loads and validates a polar file from disk.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, PolarError> {
        let content = fs::read_to_string(path).map_err(|_| PolarError::EmptyFile)?;
        Self::from_str(&content)
    }

    /// Parses and validates the textual polar format: whitespace-separated,
    /// header `TWA\TWS` followed by ascending TWS values, then one row
    /// per TWA with matching column count.
    pub fn from_str(content: &str) -> Result<Self, PolarError> {
        validate_polar_text(content)?;

        let mut lines = content.trim().lines();
        let header = lines.next().expect("validated non-empty");
        let header_parts: Vec<&str> = header.split_whitespace().collect();
        let tws: Vec<f64> = header_parts[1..]
            .iter()
            .map(|s| s.parse::<f64>().expect("validated numeric"))
            .collect();

        let mut twa = Vec::new();
        let mut speed = Vec::new();
        for line in lines {
            let parts: Vec<&str> = line.split_whitespace().collect();
            let twa_deg: f64 = parts[0].parse().expect("validated numeric");
            twa.push(twa_deg.to_radians());
            let row: Vec<f64> = parts[1..]
                .iter()
                .map(|s| s.parse::<f64>().expect("validated numeric"))
                .collect();
            speed.push(row);
        }

        Ok(Self {
            tws,
            twa,
            speed,
            vmg_cache: Mutex::new(HashMap::new()),
        })
    }

    /// Exact round-trip serialization: TWS to integer, speeds to one
    /// decimal, TWA rounded to the nearest degree.
    pub fn to_string(&self) -> String {
        let mut s = String::from("TWA\\TWS");
        for x in &self.tws {
            s.push_str(&format!("\t{:.0}", x));
        }
        s.push('\n');

        for (row_idx, twa) in self.twa.iter().enumerate() {
            s.push_str(&format!("{:.0}", twa.to_degrees().round()));
            for speed in &self.speed[row_idx] {
                s.push_str(&format!("\t{:.1}", speed));
            }
            s.push('\n');
        }
        s
    }

    fn bracket_clamp_above(values: &[f64], x: f64) -> (usize, usize, f64) {
        let last = values.len() - 1;
        if x >= values[last] {
            return (last, last, 0.0);
        }
        if x <= values[0] {
            // Extrapolate using the first two columns rather than clamp.
            let i1 = 1.min(last);
            let frac = if values[i1] == values[0] {
                0.0
            } else {
                (x - values[0]) / (values[i1] - values[0])
            };
            return (0, i1, frac);
        }
        for i in 0..last {
            if x >= values[i] && x <= values[i + 1] {
                let frac = if values[i + 1] == values[i] {
                    0.0
                } else {
                    (x - values[i]) / (values[i + 1] - values[i])
                };
                return (i, i + 1, frac);
            }
        }
        (last, last, 0.0)
    }

    fn bracket_clamp_both(values: &[f64], x: f64) -> (usize, usize, f64) {
        let last = values.len() - 1;
        let xc = x.clamp(values[0], values[last]);
        if xc >= values[last] {
            return (last, last, 0.0);
        }
        for i in 0..last {
            if xc >= values[i] && xc <= values[i + 1] {
                let frac = if values[i + 1] == values[i] {
                    0.0
                } else {
                    (xc - values[i]) / (values[i + 1] - values[i])
                };
                return (i, i + 1, frac);
            }
        }
        (0, 0, 0.0)
    }

    /// Bilinear interpolation of boat speed (knots) at `tws` knots and
    /// `twa` radians (`[0, pi]`). TWS above the table's last column is
    /// clamped; below the first column it extrapolates from the two
    /// lowest columns. TWA is clamped at both ends.
    pub fn get_speed(&self, tws: f64, twa: f64) -> f64 {
        let (tws0, tws1, tws_frac) = Self::bracket_clamp_above(&self.tws, tws);
        let (twa0, twa1, twa_frac) = Self::bracket_clamp_both(&self.twa, twa);

        let v00 = self.speed[twa0][tws0];
        let v01 = self.speed[twa0][tws1];
        let v10 = self.speed[twa1][tws0];
        let v11 = self.speed[twa1][tws1];

        let v0 = v00 + (v01 - v00) * tws_frac;
        let v1 = v10 + (v11 - v10) * tws_frac;
        v0 + (v1 - v0) * twa_frac
    }

    /// Best reaching angle/speed: the TWA in `{0°, 1°, ..., 180°}` giving
    /// peak boat speed at `tws`.
    pub fn get_reaching(&self, tws: f64) -> (f64, f64) {
        let mut max_speed = 0.0;
        let mut twa_at_max = 0.0;
        for deg in 0..=180 {
            let twa = (deg as f64).to_radians();
            let speed = self.get_speed(tws, twa);
            if speed > max_speed {
                max_speed = speed;
                twa_at_max = twa;
            }
        }
        (max_speed, twa_at_max)
    }

    fn vmg_key(tws: f64, twa_ref: f64) -> (u64, u64) {
        (tws.to_bits(), twa_ref.to_bits())
    }

    /// Maximum VMG toward `twa_ref` (radians) at `tws`, searching
    /// `alpha in [max(0, twa_ref - pi/2), min(pi, twa_ref + pi/2)]` in 1°
    /// steps. Memoized by `(tws, twa_ref)`.
    pub fn get_max_vmg_twa(&self, tws: f64, twa_ref: f64) -> (f64, f64) {
        let key = Self::vmg_key(tws, twa_ref);
        if let Some(cached) = self.vmg_cache.lock().unwrap().get(&key) {
            return *cached;
        }

        let twa_min = (twa_ref - std::f64::consts::FRAC_PI_2).max(0.0);
        let twa_max = (twa_ref + std::f64::consts::FRAC_PI_2).min(std::f64::consts::PI);

        let mut alfa = twa_min;
        let mut max_vmg = -1.0;
        let mut twa_at_max = twa_min;
        let step = 1.0_f64.to_radians();
        while alfa < twa_max {
            let v = self.get_speed(tws, alfa);
            let vmg = v * (alfa - twa_ref).cos();
            if vmg - max_vmg > 1e-3 {
                max_vmg = vmg;
                twa_at_max = alfa;
            }
            alfa += step;
        }

        let result = (max_vmg, twa_at_max);
        self.vmg_cache.lock().unwrap().insert(key, result);
        result
    }

    fn max_vmg_up(&self, tws: f64) -> (f64, f64) {
        self.get_max_vmg_twa(tws, 0.0)
    }

    fn max_vmg_down(&self, tws: f64) -> (f64, f64) {
        let (vmg, twa) = self.get_max_vmg_twa(tws, std::f64::consts::PI);
        (-vmg, twa)
    }

    /// Boat speed clamped to the VMG-up/VMG-down band: inside the band,
    /// interpolates; outside, projects via `vmg / cos(twa)`.
    pub fn get_routage_speed(&self, tws: f64, twa: f64) -> f64 {
        let (vmg_up, twa_up) = self.max_vmg_up(tws);
        let (vmg_down, twa_down) = self.max_vmg_down(tws);

        if twa >= twa_up && twa <= twa_down {
            self.get_speed(tws, twa)
        } else if twa < twa_up {
            vmg_up / twa.cos()
        } else {
            vmg_down / twa.cos()
        }
    }

    /// TWA clamped to the VMG-up/VMG-down band.
    pub fn get_twa_routage(&self, tws: f64, twa: f64) -> f64 {
        let (_, twa_up) = self.max_vmg_up(tws);
        let (_, twa_down) = self.max_vmg_down(tws);
        if twa < twa_up {
            twa_up
        } else if twa > twa_down {
            twa_down
        } else {
            twa
        }
    }
}

fn split_ws(line: &str) -> Vec<&str> {
    line.split_whitespace().collect()
}

fn validate_header(header_line: &str) -> Result<Vec<f64>, PolarError> {
    let parts = split_ws(header_line);
    let mut tws = Vec::with_capacity(parts.len().saturating_sub(1));
    for p in &parts[1..] {
        tws.push(p.parse::<f64>().map_err(|_| PolarError::WindSpeedNotNumeric)?);
    }
    if !tws.windows(2).all(|w| w[0] <= w[1]) {
        return Err(PolarError::WindSpeedsNotIncreasing);
    }
    Ok(tws)
}

fn validate_twa(twa_str: &str) -> Result<(), PolarError> {
    let twa: f64 = twa_str.parse().map_err(|_| PolarError::TwaNotNumeric)?;
    if !(0.0..=180.0).contains(&twa) {
        return Err(PolarError::TwaOutOfRange);
    }
    Ok(())
}

fn validate_boat_speed(speed_str: &str) -> Result<(), PolarError> {
    if EMPTY_VALUES.contains(&speed_str) {
        return Err(PolarError::EmptyValue);
    }
    let speed: f64 = speed_str.parse().map_err(|_| PolarError::SpeedNotNumeric)?;
    if speed < 0.0 {
        return Err(PolarError::NegativeSpeed);
    }
    Ok(())
}

fn validate_data_row(line: &str, expected_columns: usize) -> Result<(), PolarError> {
    let parts = split_ws(line);
    if parts.is_empty() {
        return Err(PolarError::EmptyLine);
    }
    if parts.len() != expected_columns {
        return Err(PolarError::ColumnCountMismatch);
    }
    validate_twa(parts[0])?;
    for speed in &parts[1..] {
        validate_boat_speed(speed)?;
    }
    Ok(())
}

/// Validates the structure and content of polar-file text without
/// constructing a [`Polar`]. Exposed so callers can pre-flight a file.
pub fn validate_polar_text(content: &str) -> Result<(), PolarError> {
    let trimmed = content.trim();
    if trimmed.is_empty() {
        return Err(PolarError::EmptyFile);
    }
    let lines: Vec<&str> = trimmed.split('\n').collect();

    let header_parts = split_ws(lines[0]);
    validate_header(lines[0])?;
    let expected_columns = header_parts.len();

    for line in &lines[1..] {
        validate_data_row(line, expected_columns)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fixture() -> &'static str {
        "TWA\\TWS\t6\t8\t10\t12\n\
         0\t0.0\t0.0\t0.0\t0.0\n\
         52\t4.8\t5.6\t6.1\t6.4\n\
         60\t5.2\t6.1\t6.8\t7.2\n\
         64\t5.3\t6.2\t7.0\t7.4\n\
         90\t5.0\t6.0\t6.9\t7.5\n\
         120\t4.0\t5.2\t6.2\t7.0\n\
         150\t2.8\t3.8\t4.6\t5.3\n\
         170\t1.0\t1.1\t1.3\t1.5\n\
         180\t0.9\t1.0\t1.2\t1.4\n"
    }

    #[test]
    fn parses_valid_fixture() {
        let p = Polar::from_str(fixture()).unwrap();
        assert_eq!(p.tws, vec![6.0, 8.0, 10.0, 12.0]);
        assert_eq!(p.twa.len(), 9);
    }

    #[test]
    fn round_trips_to_string() {
        let p = Polar::from_str(fixture()).unwrap();
        let s = p.to_string();
        let p2 = Polar::from_str(&s).unwrap();
        assert_eq!(p.tws, p2.tws);
        assert_eq!(p.twa, p2.twa);
        assert_eq!(p.speed, p2.speed);
    }

    #[test]
    fn get_speed_exact_grid_point() {
        let p = Polar::from_str(fixture()).unwrap();
        assert!((p.get_speed(8.0, 60.0_f64.to_radians()) - 6.1).abs() < 1e-9);
    }

    #[test]
    fn get_speed_interpolates_across_tws() {
        let p = Polar::from_str(fixture()).unwrap();
        // Halfway between tws=8 (6.1) and tws=10 (6.8) at twa=60.
        let got = p.get_speed(9.0, 60.0_f64.to_radians());
        assert!((got - 6.45).abs() < 1e-9);
    }

    #[test]
    fn get_speed_symmetric_in_sign() {
        let p = Polar::from_str(fixture()).unwrap();
        let twa = 60.0_f64.to_radians();
        assert_eq!(p.get_speed(8.0, twa), p.get_speed(8.0, -twa.abs()));
    }

    #[test]
    fn get_speed_clamps_above_range() {
        let p = Polar::from_str(fixture()).unwrap();
        assert_eq!(p.get_speed(20.0, 60.0_f64.to_radians()), p.get_speed(12.0, 60.0_f64.to_radians()));
    }

    #[test]
    fn get_reaching_finds_peak_speed() {
        let p = Polar::from_str(fixture()).unwrap();
        let (speed, twa) = p.get_reaching(8.0);
        assert!((speed - 6.2).abs() < 1e-9);
        assert!((twa.to_degrees() - 64.0).abs() < 1e-6);
    }

    #[test]
    fn routage_speed_clamps_outside_vmg_band() {
        let p = Polar::from_str(fixture()).unwrap();
        let twa = 170.0_f64.to_radians();
        let routage = p.get_twa_routage(8.0, twa);
        assert!(routage < twa);
        let speed = p.get_routage_speed(8.0, twa);
        assert!(speed > 0.0);
    }

    #[test]
    fn rejects_empty_file() {
        assert_eq!(validate_polar_text(""), Err(PolarError::EmptyFile));
    }

    #[test]
    fn rejects_non_numeric_wind_speed() {
        let content = "TWA\\TWS\t6\ta\n0\t0.0\t0.0\n";
        assert_eq!(validate_polar_text(content), Err(PolarError::WindSpeedNotNumeric));
    }

    #[test]
    fn rejects_non_increasing_wind_speed() {
        let content = "TWA\\TWS\t10\t6\n0\t0.0\t0.0\n";
        assert_eq!(validate_polar_text(content), Err(PolarError::WindSpeedsNotIncreasing));
    }

    #[test]
    fn rejects_empty_line() {
        let content = "TWA\\TWS\t6\t8\n0\t0.0\t0.0\n\n60\t1.0\t2.0\n";
        assert_eq!(validate_polar_text(content), Err(PolarError::EmptyLine));
    }

    #[test]
    fn rejects_column_count_mismatch() {
        let content = "TWA\\TWS\t6\t8\n0\t0.0\t0.0\t0.0\n";
        assert_eq!(validate_polar_text(content), Err(PolarError::ColumnCountMismatch));
    }

    #[test]
    fn rejects_twa_out_of_range() {
        let content = "TWA\\TWS\t6\t8\n190\t0.0\t0.0\n";
        assert_eq!(validate_polar_text(content), Err(PolarError::TwaOutOfRange));
    }

    #[test]
    fn rejects_twa_not_numeric() {
        let content = "TWA\\TWS\t6\t8\nfoo\t0.0\t0.0\n";
        assert_eq!(validate_polar_text(content), Err(PolarError::TwaNotNumeric));
    }

    #[test]
    fn rejects_empty_value() {
        let content = "TWA\\TWS\t6\t8\n0\t0.0\t-\n";
        assert_eq!(validate_polar_text(content), Err(PolarError::EmptyValue));
    }

    #[test]
    fn rejects_negative_speed() {
        let content = "TWA\\TWS\t6\t8\n0\t0.0\t-1.0\n";
        assert_eq!(validate_polar_text(content), Err(PolarError::NegativeSpeed));
    }

    #[test]
    fn rejects_speed_not_numeric() {
        let content = "TWA\\TWS\t6\t8\n0\t0.0\tfoo\n";
        assert_eq!(validate_polar_text(content), Err(PolarError::SpeedNotNumeric));
    }
}
