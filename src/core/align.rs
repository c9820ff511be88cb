//! Alignment of heterogeneous series onto one timestamp index.
//!
//! Timestamps are compared by their [`CalendarPosition`], so that a profile exported for one
//! year lines up with the data of another year. The only length mismatch that gets reconciled
//! is the leap day: the longer series loses its February 29 points. The same happens when the
//! valuation rates have no February 29, see [`fit_to_rates`].

use chrono::{DateTime, TimeDelta, Utc};
use itertools::Itertools;

use crate::core::{
    error::{Error, Result},
    series::{CalendarPosition, Series},
    spot::RateSource,
};

/// Align the series onto the index of the first one.
///
/// Already aligned series are returned unchanged.
pub fn align<V>(series: Vec<Series<V>>) -> Result<Vec<Series<V>>> {
    let Some(target_len) = series.iter().map(Series::len).min() else {
        return Ok(series);
    };

    let series: Vec<Series<V>> = series
        .into_iter()
        .enumerate()
        .map(|(index, series)| {
            if series.len() == target_len {
                Ok(series)
            } else {
                without_leap_day(index, series, target_len)
            }
        })
        .try_collect()?;

    let mut series = series.into_iter();
    let Some(reference) = series.next() else {
        return Ok(Vec::new());
    };
    let index = reference.timestamps().collect_vec();
    ensure_gap_free(&index)?;
    let positions = index.iter().copied().map(CalendarPosition::of).collect_vec();

    let mut aligned = Vec::with_capacity(series.len() + 1);
    aligned.push(reference);
    for (series_index, other) in series.enumerate() {
        let points = other
            .into_iter()
            .zip(&index)
            .zip(&positions)
            .enumerate()
            .map(|(point_index, (((timestamp, value), reference_timestamp), position))| {
                if CalendarPosition::of(timestamp) == *position {
                    Ok((*reference_timestamp, value))
                } else {
                    Err(Error::Alignment(format!(
                        "series #{} has {timestamp} at position {point_index}, \
                         which does not match {reference_timestamp} of series #0",
                        series_index + 1,
                    )))
                }
            })
            .try_collect()?;
        aligned.push(Series::try_new(points)?);
    }
    Ok(aligned)
}

/// Drop February 29 from the aligned series when the rates do not cover it.
///
/// Coverage is checked against the index of the first series. Any other uncovered interval
/// fails with the rate lookup error.
pub fn fit_to_rates<V>(
    series: Vec<Series<V>>,
    rates: &dyn RateSource,
) -> Result<Vec<Series<V>>> {
    let mut misses_leap_day = false;
    if let Some(reference) = series.first() {
        for timestamp in reference.timestamps() {
            match rates.rate_at(timestamp) {
                Ok(_) => {}
                Err(_) if CalendarPosition::of(timestamp).is_leap_day() => misses_leap_day = true,
                Err(error) => return Err(error),
            }
        }
    }
    if !misses_leap_day {
        return Ok(series);
    }
    Ok(series
        .into_iter()
        .map(|series| {
            series.retain(|(timestamp, _)| !CalendarPosition::of(*timestamp).is_leap_day())
        })
        .collect())
}

/// Ensure the index advances by one constant step.
///
/// A step which jumps over a removed February 29 is the only exception.
fn ensure_gap_free(index: &[DateTime<Utc>]) -> Result {
    let Some(step) = index.iter().tuple_windows().map(|(lhs, rhs)| *rhs - *lhs).min() else {
        return Ok(());
    };
    let over_leap_day = step + TimeDelta::days(1);
    for (lhs, rhs) in index.iter().tuple_windows() {
        let delta = *rhs - *lhs;
        let skips_leap_day =
            delta == over_leap_day && CalendarPosition::of(*lhs + step).is_leap_day();
        if delta != step && !skips_leap_day {
            return Err(Error::Alignment(format!(
                "the index has a gap between {lhs} and {rhs}, the step is {step}",
            )));
        }
    }
    Ok(())
}

/// Drop the February 29 points, which must reduce the series exactly to the target length.
fn without_leap_day<V>(index: usize, series: Series<V>, target_len: usize) -> Result<Series<V>> {
    let len = series.len();
    let series = series.retain(|(timestamp, _)| !CalendarPosition::of(*timestamp).is_leap_day());
    if series.len() == target_len {
        Ok(series)
    } else {
        Err(Error::Alignment(format!(
            "series #{index} has {len} intervals, and {} without the leap day, expected {target_len}",
            series.len(),
        )))
    }
}
