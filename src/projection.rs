//! Mapping of domain values onto the fixed graph surface.
//!
//! The surface is a square of [`SURFACE_SIZE`] logical units with the origin
//! in the top left corner, the same layout an SVG `viewBox="0 0 100 100"`
//! uses. Days run left to right and weights bottom to top.

use crate::aggregation::Range;
use crate::trend::TrendLine;
use serde::{Deserialize, Serialize};

pub const SURFACE_SIZE: f64 = 100.0;

/// Minimum half-span of the y-axis around the median weight.
const MIN_HALF_SPAN: f64 = 5.0;
/// Room left above and below the observed weights.
const PADDING: f64 = 3.0;
const FINE_STEP: f64 = 2.0;
const COARSE_STEP: f64 = 5.0;
const DAY_TICK_STEP: u32 = 5;
/// Weight the empty graph is centred on.
const FALLBACK_WEIGHT: f64 = 75.0;

/// Rounded y-axis bounds and tick spacing.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisRange {
    pub from: f64,
    pub to: f64,
    pub step_size: f64,
}

impl AxisRange {
    /// Adaptive y-range for observed weights.
    ///
    /// The range spans at least ten units around the median, keeps
    /// [`PADDING`] free on either side of the data and is widened outward to
    /// multiples of the tick step.
    pub fn adaptive(y: Range) -> Self {
        let median = (y.from + y.to) / 2.0;
        let from = (median - MIN_HALF_SPAN).min(y.from - PADDING);
        let to = (median + MIN_HALF_SPAN).max(y.to + PADDING);
        let step_size = if to - from > 2.0 * MIN_HALF_SPAN {
            COARSE_STEP
        } else {
            FINE_STEP
        };
        Self {
            from: (from / step_size).floor() * step_size,
            to: (to / step_size).ceil() * step_size,
            step_size,
        }
    }

    /// Range used when there is nothing to plot.
    pub fn fallback() -> Self {
        Self::adaptive(Range {
            from: FALLBACK_WEIGHT,
            to: FALLBACK_WEIGHT,
        })
    }

    pub fn span(&self) -> f64 {
        self.to - self.from
    }

    /// Tick values from `from + step` up to and including `to`.
    pub fn ticks(&self) -> Vec<f64> {
        let mut ticks = Vec::new();
        let mut k = 1.0;
        loop {
            let value = self.from + k * self.step_size;
            // Guard against accumulated error putting a tick a hair below `to`.
            if value >= self.to - self.step_size * 1e-9 {
                break;
            }
            ticks.push(value);
            k += 1.0;
        }
        ticks.push(self.to);
        ticks
    }
}

/// Day-of-month tick values: 1, 5, 10, ... and the last day.
pub fn day_ticks(days_in_month: u32) -> Vec<u32> {
    let mut ticks = vec![1];
    let mut day = DAY_TICK_STEP;
    while day + DAY_TICK_STEP <= days_in_month {
        ticks.push(day);
        day += DAY_TICK_STEP;
    }
    ticks.push(days_in_month);
    ticks
}

/// Position on the drawing surface.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub x: f64,
    pub y: f64,
}

impl Position {
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite()
    }

    fn clamped(self) -> Self {
        Self {
            x: self.x.clamp(0.0, SURFACE_SIZE),
            y: self.y.clamp(0.0, SURFACE_SIZE),
        }
    }
}

/// A projected line segment.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Segment {
    pub from: Position,
    pub to: Position,
}

/// Linear maps from (day, weight) to surface coordinates for one month.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Projector {
    days: f64,
    axis: AxisRange,
}

impl Projector {
    pub fn new(days_in_month: u32, axis: AxisRange) -> Self {
        Self {
            days: days_in_month.max(1) as f64,
            axis,
        }
    }

    pub fn project_x(&self, day: f64) -> f64 {
        day / self.days * SURFACE_SIZE
    }

    pub fn project_y(&self, weight: f64) -> f64 {
        SURFACE_SIZE - (weight - self.axis.from) / self.axis.span() * SURFACE_SIZE
    }

    pub fn unproject_x(&self, x: f64) -> f64 {
        x / SURFACE_SIZE * self.days
    }

    pub fn unproject_y(&self, y: f64) -> f64 {
        self.axis.from + (SURFACE_SIZE - y) / SURFACE_SIZE * self.axis.span()
    }

    /// Project a point marker, pinning it to the surface edge when it falls
    /// outside (late on the final day of the month, for instance).
    pub fn project_point(&self, day: f64, weight: f64) -> Position {
        Position {
            x: self.project_x(day),
            y: self.project_y(weight),
        }
        .clamped()
    }

    /// Project a trend line and clip it to the surface.
    ///
    /// Returns `None` when any endpoint is not finite (a vertical trend) or
    /// when the segment misses the surface entirely.
    pub fn project_trend(&self, line: &TrendLine) -> Option<Segment> {
        if !line.is_finite() {
            return None;
        }
        let from = Position {
            x: self.project_x(line.x1),
            y: self.project_y(line.y1),
        };
        let to = Position {
            x: self.project_x(line.x2),
            y: self.project_y(line.y2),
        };
        if !from.is_finite() || !to.is_finite() {
            return None;
        }
        clip(Segment { from, to })
    }
}

/// Liang-Barsky clipping against the surface square.
fn clip(segment: Segment) -> Option<Segment> {
    let Segment { from, to } = segment;
    let dx = to.x - from.x;
    let dy = to.y - from.y;
    let mut t0: f64 = 0.0;
    let mut t1: f64 = 1.0;

    for (p, q) in [
        (-dx, from.x),
        (dx, SURFACE_SIZE - from.x),
        (-dy, from.y),
        (dy, SURFACE_SIZE - from.y),
    ] {
        if p == 0.0 {
            if q < 0.0 {
                return None;
            }
            continue;
        }
        let r = q / p;
        if p < 0.0 {
            t0 = t0.max(r);
        } else {
            t1 = t1.min(r);
        }
        if t0 > t1 {
            return None;
        }
    }

    Some(Segment {
        from: Position {
            x: from.x + t0 * dx,
            y: from.y + t0 * dy,
        },
        to: Position {
            x: from.x + t1 * dx,
            y: from.y + t1 * dy,
        },
    })
}
