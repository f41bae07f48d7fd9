use crate::aggregation::Aggregation;
use serde::{Deserialize, Serialize};

/// Least squares line `y = slope * x + intercept` in domain units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Regression {
    pub slope: f64,
    pub intercept: f64,
}

impl Regression {
    pub fn at(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }

    /// A vertical fit: every point shares the same x but y differs.
    pub fn is_vertical(&self) -> bool {
        self.slope.is_infinite()
    }
}

/// Segment of the trend in domain coordinates (day of month, kilograms).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendLine {
    pub x1: f64,
    pub y1: f64,
    pub x2: f64,
    pub y2: f64,
}

impl TrendLine {
    pub fn is_finite(&self) -> bool {
        [self.x1, self.y1, self.x2, self.y2]
            .iter()
            .all(|v| v.is_finite())
    }
}

/// Fit an ordinary least squares line to an aggregation.
///
/// Returns `None` for an empty aggregation. A zero numerator always yields a
/// flat line, even when the denominator is zero too. A zero denominator with
/// a non-zero numerator yields an infinite slope carrying the numerator's sign.
pub fn estimate(agg: &Aggregation) -> Option<Regression> {
    agg.ranges?;
    let (mean_x, mean_y) = (agg.mean_x()?, agg.mean_y()?);
    let n = agg.count as f64;
    let sums = &agg.sums;

    let numerator = n * sums.x_times_y - sums.x * sums.y;
    let denominator = n * sums.x_squared - sums.x * sums.x;
    let slope = if numerator == 0.0 {
        0.0
    } else if denominator == 0.0 {
        f64::INFINITY.copysign(numerator)
    } else {
        numerator / denominator
    };

    let intercept = mean_y - slope * mean_x;
    Some(Regression { slope, intercept })
}

/// Trend segment spanning `x = 0` to `x = x_to`.
pub fn trend_line(agg: &Aggregation, x_to: f64) -> Option<TrendLine> {
    let regression = estimate(agg)?;
    log::debug!(
        "trend over {} points: slope {} intercept {}",
        agg.count,
        regression.slope,
        regression.intercept
    );
    Some(TrendLine {
        x1: 0.0,
        y1: regression.at(0.0),
        x2: x_to,
        y2: regression.at(x_to),
    })
}
