//! Render model for the monthly weight graph.
//!
//! [`build_graph`] is a pure function of the entry snapshot and the month on
//! display; the shell calls it on every repaint instead of caching anything.

use crate::Entry;
use crate::aggregation::{Point, aggregate};
use crate::calendar;
use crate::projection::{AxisRange, Position, Projector, Segment, day_ticks};
use crate::trend::{self, Regression};
use chrono::NaiveDate;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct XTick {
    pub position: f64,
    pub day: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct YTick {
    pub position: f64,
    pub weight: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Graph {
    pub month: NaiveDate,
    pub days_in_month: u32,
    pub axis: AxisRange,
    pub points: Vec<Position>,
    pub trend: Option<Segment>,
    pub regression: Option<Regression>,
    pub x_ticks: Vec<XTick>,
    pub y_ticks: Vec<YTick>,
}

impl Graph {
    pub fn projector(&self) -> Projector {
        Projector::new(self.days_in_month, self.axis)
    }
}

/// Entries recorded during `month`, as (fractional day, kg) points.
pub fn points_in_month(entries: &[Entry], month: NaiveDate) -> Vec<Point> {
    entries
        .iter()
        .map(|e| (e.timestamp.naive_local(), e.weight))
        .filter(|(t, _)| calendar::contains(month, *t))
        .map(|(t, w)| Point::new(calendar::day_of_month_fraction(t), w))
        .collect()
}

/// Build the projected graph for the month containing `month`.
pub fn build_graph(entries: &[Entry], month: NaiveDate) -> Graph {
    let month = calendar::first_day(month);
    let days_in_month = calendar::days_in_month(month);
    let points = points_in_month(entries, month);
    let agg = aggregate(points.iter().copied());

    let axis = agg
        .ranges
        .map(|r| AxisRange::adaptive(r.y))
        .unwrap_or_else(AxisRange::fallback);
    let projector = Projector::new(days_in_month, axis);

    let regression = trend::estimate(&agg);
    let trend = trend::trend_line(&agg, days_in_month as f64)
        .and_then(|line| projector.project_trend(&line));
    if regression.is_some_and(|r| r.is_vertical()) {
        log::debug!("All entries share one day, skipping vertical trend line");
    }

    log::debug!(
        "graph for {}: {} of {} entries plotted",
        month.format("%Y-%m"),
        points.len(),
        entries.len()
    );

    Graph {
        month,
        days_in_month,
        axis,
        points: points
            .iter()
            .map(|p| projector.project_point(p.x, p.y))
            .collect(),
        trend,
        regression,
        x_ticks: day_ticks(days_in_month)
            .into_iter()
            .map(|day| XTick {
                position: projector.project_x(day as f64),
                day,
            })
            .collect(),
        y_ticks: axis
            .ticks()
            .into_iter()
            .map(|weight| YTick {
                position: projector.project_y(weight),
                weight,
            })
            .collect(),
    }
}
