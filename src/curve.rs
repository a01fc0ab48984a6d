//! Temperature to duty-cycle curves

use crate::errors::{MonitorError, Result};
use crate::sensors::Temperature;
use log::error;
use serde::{Deserialize, Serialize};

/// Commanded fan or pump speed, percent of maximum (0-100).
pub type DutyPercent = u8;

/// Duty commanded when a profile cannot be used.
pub const SAFE_DUTY_PERCENT: DutyPercent = 50;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CurvePoint {
    pub temp: f64,
    pub duty: f64,
}

impl CurvePoint {
    pub fn new(temp: f64, duty: f64) -> Self {
        Self { temp, duty }
    }
}

/// Flat `[temp1, duty1, temp2, duty2, ...]` sequence as stored in the config file.
///
/// The points do not have to be sorted; [`CurveProfile::points`] sorts them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CurveProfile(Vec<f64>);

impl CurveProfile {
    pub fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }

    /// Pair up the flat values and sort them by temperature.
    pub fn points(&self) -> Result<Vec<CurvePoint>> {
        if self.0.len() < 4 || self.0.len() % 2 != 0 {
            return Err(MonitorError::InvalidProfile { len: self.0.len() });
        }

        let mut points: Vec<CurvePoint> = self
            .0
            .chunks_exact(2)
            .map(|pair| CurvePoint::new(pair[0], pair[1]))
            .collect();
        points.sort_by(|a, b| a.temp.total_cmp(&b.temp));
        Ok(points)
    }

    pub fn validate(&self) -> Result<()> {
        self.points().map(|_| ())
    }
}

impl From<Vec<f64>> for CurveProfile {
    fn from(values: Vec<f64>) -> Self {
        Self::new(values)
    }
}

/// Clamp to 0-100 and truncate toward zero.
fn to_duty(value: f64) -> DutyPercent {
    value.clamp(0.0, 100.0) as DutyPercent
}

/// Calculate the duty for a temperature using linear interpolation between
/// the bracketing control points.
///
/// Temperatures outside the profile take the duty of the nearest end point.
/// A malformed profile yields [`MonitorError::InvalidProfile`].
pub fn interpolate(temperature: Temperature, profile: &CurveProfile) -> Result<DutyPercent> {
    let points = profile.points()?;
    let first = points[0];
    let last = points[points.len() - 1];

    if temperature <= first.temp {
        return Ok(to_duty(first.duty));
    }
    if temperature >= last.temp {
        return Ok(to_duty(last.duty));
    }

    for pair in points.windows(2) {
        let (low, high) = (pair[0], pair[1]);
        if low.temp <= temperature && temperature <= high.temp {
            if high.temp == low.temp {
                return Ok(to_duty(low.duty));
            }
            let ratio = (temperature - low.temp) / (high.temp - low.temp);
            return Ok(to_duty(low.duty + ratio * (high.duty - low.duty)));
        }
    }

    // NaN temperatures fall through every comparison
    Ok(SAFE_DUTY_PERCENT)
}

/// [`interpolate`], reporting a malformed profile and failing closed to
/// [`SAFE_DUTY_PERCENT`].
pub fn interpolate_or_safe(
    temperature: Temperature,
    profile: &CurveProfile,
    curve_name: &str,
) -> DutyPercent {
    match interpolate(temperature, profile) {
        Ok(duty) => duty,
        Err(e) => {
            error!(
                "Invalid {} profile {:?}: {}, using {}%",
                curve_name,
                profile.values(),
                e,
                SAFE_DUTY_PERCENT
            );
            SAFE_DUTY_PERCENT
        }
    }
}
