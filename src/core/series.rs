mod aggregate;
mod resample;

use std::ops::Index;

use chrono::{DateTime, Datelike, Timelike, Utc};
use itertools::Itertools;

pub use self::{aggregate::Aggregate, resample::ResampleHourly};
use crate::core::error::{Error, Result};

pub type Point<V> = (DateTime<Utc>, V);

/// Time series with strictly increasing timestamps.
#[must_use]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Series<V>(Vec<Point<V>>);

impl<V> Series<V> {
    /// Wrap the points, ensuring the timestamps are strictly increasing.
    pub fn try_new(points: Vec<Point<V>>) -> Result<Self> {
        if let Some(((_, _), (timestamp, _))) =
            points.iter().tuple_windows().find(|((lhs, _), (rhs, _))| lhs >= rhs)
        {
            return Err(Error::Alignment(format!(
                "timestamps are not strictly increasing at {timestamp}"
            )));
        }
        Ok(Self(points))
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Point<V>> {
        self.0.iter()
    }

    pub fn timestamps(&self) -> impl Iterator<Item = DateTime<Utc>> + '_ {
        self.0.iter().map(|(timestamp, _)| *timestamp)
    }

    /// Convert the values, keeping the timestamps.
    pub fn map_values<T>(self, f: impl Fn(V) -> T) -> Series<T> {
        Series(self.0.into_iter().map(|(timestamp, value)| (timestamp, f(value))).collect())
    }

    /// Keep the points matching the predicate. Order is preserved, hence the invariant holds.
    pub fn retain(mut self, predicate: impl Fn(&Point<V>) -> bool) -> Self {
        self.0.retain(predicate);
        self
    }
}

impl<V: Copy + Into<f64>> Series<V> {
    /// Ensure all the values are finite and non-negative.
    pub fn ensure_non_negative(&self, name: &str) -> Result<()> {
        match self.0.iter().find(|(_, value)| {
            let value: f64 = (*value).into();
            !value.is_finite() || value < 0.0
        }) {
            Some((timestamp, value)) => Err(Error::InvalidInput(format!(
                "`{name}` has the value {} at {timestamp}",
                Into::<f64>::into(*value),
            ))),
            None => Ok(()),
        }
    }
}

impl<V> Default for Series<V> {
    fn default() -> Self {
        Self(Vec::new())
    }
}

impl<V> Index<usize> for Series<V> {
    type Output = Point<V>;

    fn index(&self, index: usize) -> &Self::Output {
        &self.0[index]
    }
}

impl<'a, V> IntoIterator for &'a Series<V> {
    type Item = &'a Point<V>;
    type IntoIter = std::slice::Iter<'a, Point<V>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<V> IntoIterator for Series<V> {
    type Item = Point<V>;
    type IntoIter = std::vec::IntoIter<Point<V>>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Position of a timestamp within a year, regardless of the year itself.
#[must_use]
#[derive(Copy, Clone, Debug, Eq, PartialEq, Ord, PartialOrd, Hash)]
pub struct CalendarPosition {
    pub month: u32,
    pub day: u32,
    pub seconds_from_midnight: u32,
}

impl CalendarPosition {
    pub fn of(timestamp: DateTime<Utc>) -> Self {
        Self {
            month: timestamp.month(),
            day: timestamp.day(),
            seconds_from_midnight: timestamp.num_seconds_from_midnight(),
        }
    }

    #[must_use]
    pub const fn is_leap_day(self) -> bool {
        self.month == 2 && self.day == 29
    }
}
