use chrono::{DateTime, DurationRound, TimeDelta, Utc};
use itertools::Itertools;

use crate::core::series::{Aggregate, Point, Series};

impl<T> ResampleHourly for T where T: ?Sized {}

pub trait ResampleHourly {
    /// Group consecutive points by the hour they start in, and average the values.
    fn mean_hourly<V>(self) -> Vec<Point<V>>
    where
        Self: Sized + IntoIterator<Item = Point<V>>,
        V: Into<f64> + From<f64>,
    {
        const ONE_HOUR: TimeDelta = TimeDelta::hours(1);

        self.into_iter()
            .chunk_by(|(timestamp, _)| timestamp.duration_trunc(ONE_HOUR).unwrap_or(*timestamp))
            .into_iter()
            .filter_map(|(hour, points)| {
                points.map(|(_, value)| value).mean().map(|mean| (hour, mean))
            })
            .collect()
    }
}

impl<V> Series<V> {
    /// Check whether every two consecutive points are exactly `step` apart.
    #[must_use]
    pub fn has_step(&self, step: TimeDelta) -> bool {
        self.len() >= 2 && self.timestamps().tuple_windows().all(|(lhs, rhs)| rhs - lhs == step)
    }

    #[must_use]
    pub fn start(&self) -> Option<DateTime<Utc>> {
        self.timestamps().next()
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use chrono::TimeZone;

    use super::*;

    #[test]
    fn test_mean_hourly() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        let series = Series::try_new(
            [1.0, 2.0, 3.0, 6.0, 10.0]
                .into_iter()
                .enumerate()
                .map(|(index, value)| (start + TimeDelta::minutes(15 * index as i64), value))
                .collect(),
        )
        .unwrap();
        assert!(series.has_step(TimeDelta::minutes(15)));

        let resampled = series.mean_hourly();
        assert_eq!(resampled.len(), 2);
        assert_eq!(resampled[0].0, start);
        assert_abs_diff_eq!(resampled[0].1, 3.0);
        assert_eq!(resampled[1].0, Utc.with_ymd_and_hms(2024, 3, 1, 11, 0, 0).unwrap());
        assert_abs_diff_eq!(resampled[1].1, 10.0);
    }

    #[test]
    fn test_has_step_irregular() {
        let start = Utc.with_ymd_and_hms(2024, 3, 1, 10, 0, 0).unwrap();
        let series = Series::try_new(vec![
            (start, 1.0),
            (start + TimeDelta::minutes(15), 1.0),
            (start + TimeDelta::hours(1), 1.0),
        ])
        .unwrap();
        assert!(!series.has_step(TimeDelta::minutes(15)));
    }
}
