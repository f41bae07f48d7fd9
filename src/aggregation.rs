// Single pass reduction of plotted points into regression sums
use serde::{Deserialize, Serialize};

/// A weight entry in regression coordinates: day of month and kilograms.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Point {
    pub x: f64,
    pub y: f64,
}

impl Point {
    pub fn new(x: f64, y: f64) -> Self {
        Self { x, y }
    }
}

/// Closed interval of observed values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Range {
    pub from: f64,
    pub to: f64,
}

impl Range {
    fn single(value: f64) -> Self {
        Self {
            from: value,
            to: value,
        }
    }

    fn include(&mut self, value: f64) {
        self.from = self.from.min(value);
        self.to = self.to.max(value);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Ranges {
    pub x: Range,
    pub y: Range,
}

/// Running sums needed by an ordinary least squares fit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Sums {
    pub x: f64,
    pub y: f64,
    pub x_squared: f64,
    pub x_times_y: f64,
}

/// Summary of a point set.
///
/// `ranges` is `None` exactly when no points were aggregated, which keeps
/// "no data" apart from "all data at zero".
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct Aggregation {
    pub sums: Sums,
    pub ranges: Option<Ranges>,
    pub count: usize,
}

impl Aggregation {
    pub fn mean_x(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sums.x / self.count as f64)
    }

    pub fn mean_y(&self) -> Option<f64> {
        (self.count > 0).then(|| self.sums.y / self.count as f64)
    }

    fn push(mut self, point: Point) -> Self {
        self.sums.x += point.x;
        self.sums.y += point.y;
        self.sums.x_squared += point.x * point.x;
        self.sums.x_times_y += point.x * point.y;
        self.ranges = Some(match self.ranges {
            Some(mut r) => {
                r.x.include(point.x);
                r.y.include(point.y);
                r
            }
            None => Ranges {
                x: Range::single(point.x),
                y: Range::single(point.y),
            },
        });
        self.count += 1;
        self
    }
}

/// Aggregate `points` in one pass.
///
/// The result does not depend on the order of the input beyond floating
/// point summation error.
pub fn aggregate<I>(points: I) -> Aggregation
where
    I: IntoIterator<Item = Point>,
{
    points
        .into_iter()
        .fold(Aggregation::default(), Aggregation::push)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_points() -> Vec<Point> {
        vec![
            Point::new(1.0, 80.0),
            Point::new(5.0, 79.5),
            Point::new(12.0, 79.0),
            Point::new(18.0, 78.0),
            Point::new(25.0, 77.5),
        ]
    }

    #[test]
    fn empty_input_has_no_ranges() {
        let agg = aggregate(Vec::<Point>::new());
        assert_eq!(agg.sums, Sums::default());
        assert!(agg.ranges.is_none());
        assert_eq!(agg.count, 0);
        assert_eq!(agg.mean_x(), None);
    }

    #[test]
    fn zero_valued_point_still_has_ranges() {
        let agg = aggregate([Point::new(0.0, 0.0)]);
        assert_eq!(agg.sums, Sums::default());
        let ranges = agg.ranges.unwrap();
        assert_eq!(ranges.x, Range { from: 0.0, to: 0.0 });
        assert_eq!(agg.count, 1);
    }

    #[test]
    fn sums_and_ranges() {
        let agg = aggregate(sample_points());
        assert_eq!(agg.count, 5);
        assert!((agg.sums.x - 61.0).abs() < 1e-9);
        assert!((agg.sums.y - 394.0).abs() < 1e-9);
        assert!((agg.sums.x_squared - 1119.0).abs() < 1e-9);
        // 80 + 397.5 + 948 + 1404 + 1937.5
        assert!((agg.sums.x_times_y - 4767.0).abs() < 1e-9);

        let ranges = agg.ranges.unwrap();
        assert_eq!(ranges.x, Range { from: 1.0, to: 25.0 });
        assert_eq!(ranges.y, Range { from: 77.5, to: 80.0 });
        assert!(ranges.x.from <= ranges.x.to);
        assert!(ranges.y.from <= ranges.y.to);
    }

    #[test]
    fn order_does_not_matter() {
        let forward = aggregate(sample_points());
        let mut reversed = sample_points();
        reversed.reverse();
        reversed.swap(0, 2);
        let shuffled = aggregate(reversed);

        assert_eq!(forward.ranges, shuffled.ranges);
        assert_eq!(forward.count, shuffled.count);
        assert!((forward.sums.x - shuffled.sums.x).abs() < 1e-9);
        assert!((forward.sums.y - shuffled.sums.y).abs() < 1e-9);
        assert!((forward.sums.x_squared - shuffled.sums.x_squared).abs() < 1e-9);
        assert!((forward.sums.x_times_y - shuffled.sums.x_times_y).abs() < 1e-9);
    }

    #[test]
    fn means() {
        let agg = aggregate(sample_points());
        assert!((agg.mean_x().unwrap() - 12.2).abs() < 1e-9);
        assert!((agg.mean_y().unwrap() - 78.8).abs() < 1e-9);
    }
}
