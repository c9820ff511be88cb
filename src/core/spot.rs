//! Representative valuation rates derived from a spot price history.

use std::{
    collections::{BTreeMap, BTreeSet, btree_map::Entry},
    fmt::{Display, Formatter},
};

use chrono::{DateTime, Datelike, Timelike, Utc};
use itertools::Itertools;

use crate::{
    core::{
        error::{Error, Result},
        series::{Aggregate, CalendarPosition, Series},
    },
    quantity::price::KilowattHourPrice,
};

/// Source of the valuation rate for any interval of the horizon.
pub trait RateSource: Sync {
    fn rate_at(&self, timestamp: DateTime<Utc>) -> Result<KilowattHourPrice>;
}

/// Grouping of spot prices into windows sharing one representative rate.
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    Hash,
    Eq,
    PartialEq,
    clap::ValueEnum,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum Window {
    /// One rate for the whole horizon.
    Full,

    /// One rate per calendar month, pooled across the years.
    #[default]
    Monthly,

    /// One rate per hour of the year, pooled across the years.
    CalendarHour,
}

impl Window {
    pub fn key(self, timestamp: DateTime<Utc>) -> WindowKey {
        match self {
            Self::Full => WindowKey::Full,
            Self::Monthly => WindowKey::Month(timestamp.month()),
            Self::CalendarHour => WindowKey::CalendarHour {
                month: timestamp.month(),
                day: timestamp.day(),
                hour: timestamp.hour(),
            },
        }
    }
}

impl Display for Window {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Full => write!(f, "full"),
            Self::Monthly => write!(f, "monthly"),
            Self::CalendarHour => write!(f, "calendar-hour"),
        }
    }
}

#[must_use]
#[derive(Copy, Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd)]
pub enum WindowKey {
    Full,
    Month(u32),
    CalendarHour { month: u32, day: u32, hour: u32 },
}

impl Display for WindowKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Full => write!(f, "full horizon"),
            Self::Month(month) => write!(f, "month {month:02}"),
            Self::CalendarHour { month, day, hour } => {
                write!(f, "{month:02}-{day:02} {hour:02}:00")
            }
        }
    }
}

/// How a representative rate is derived from the spot prices.
#[derive(
    Copy,
    Clone,
    Debug,
    Default,
    Hash,
    Eq,
    PartialEq,
    clap::ValueEnum,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(rename_all = "kebab-case")]
pub enum PricingPolicy {
    /// Median of the window.
    #[default]
    MedianWindowRate,

    /// Arithmetic mean of the window.
    MeanWindowRate,

    /// The spot price of the very interval, the window is ignored.
    IntervalExact,
}

impl PricingPolicy {
    pub fn summarize(
        self,
        prices: &Series<KilowattHourPrice>,
        window: Window,
    ) -> Result<Box<dyn RateSource>> {
        match self {
            Self::MedianWindowRate => Ok(Box::new(WindowRates::median(prices, window)?)),
            Self::MeanWindowRate => Ok(Box::new(WindowRates::mean(prices, window)?)),
            Self::IntervalExact => Ok(Box::new(ExactRates::try_from(prices)?)),
        }
    }
}

impl Display for PricingPolicy {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MedianWindowRate => write!(f, "median-window-rate"),
            Self::MeanWindowRate => write!(f, "mean-window-rate"),
            Self::IntervalExact => write!(f, "interval-exact"),
        }
    }
}

/// One representative rate per window.
#[must_use]
#[derive(Clone, Debug)]
pub struct WindowRates {
    window: Window,
    rates: BTreeMap<WindowKey, KilowattHourPrice>,
}

impl WindowRates {
    pub fn median(prices: &Series<KilowattHourPrice>, window: Window) -> Result<Self> {
        Self::summarize(prices, window, Aggregate::median)
    }

    pub fn mean(prices: &Series<KilowattHourPrice>, window: Window) -> Result<Self> {
        Self::summarize(prices, window, Aggregate::mean)
    }

    fn summarize(
        prices: &Series<KilowattHourPrice>,
        window: Window,
        aggregate: impl Fn(Vec<KilowattHourPrice>) -> Option<KilowattHourPrice>,
    ) -> Result<Self> {
        prices.ensure_non_negative("spot price")?;
        if prices.is_empty() {
            return Err(Error::InsufficientData { window: window.to_string() });
        }
        let rates = prices
            .iter()
            .map(|(timestamp, price)| (window.key(*timestamp), *price))
            .into_group_map()
            .into_iter()
            .map(|(key, prices)| {
                aggregate(prices)
                    .map(|rate| (key, rate))
                    .ok_or_else(|| Error::InsufficientData { window: key.to_string() })
            })
            .try_collect()?;
        Ok(Self { window, rates })
    }

    #[must_use]
    pub const fn window(&self) -> Window {
        self.window
    }

    pub fn iter(&self) -> impl Iterator<Item = (WindowKey, KilowattHourPrice)> + '_ {
        self.rates.iter().map(|(key, rate)| (*key, *rate))
    }
}

impl RateSource for WindowRates {
    fn rate_at(&self, timestamp: DateTime<Utc>) -> Result<KilowattHourPrice> {
        let key = self.window.key(timestamp);
        self.rates
            .get(&key)
            .copied()
            .ok_or_else(|| Error::InsufficientData { window: key.to_string() })
    }
}

/// Spot price of the interval itself, matched by calendar position.
#[must_use]
#[derive(Clone, Debug)]
pub struct ExactRates(BTreeMap<CalendarPosition, KilowattHourPrice>);

impl TryFrom<&Series<KilowattHourPrice>> for ExactRates {
    type Error = Error;

    fn try_from(prices: &Series<KilowattHourPrice>) -> Result<Self> {
        prices.ensure_non_negative("spot price")?;
        let mut rates = BTreeMap::new();
        for (timestamp, price) in prices {
            match rates.entry(CalendarPosition::of(*timestamp)) {
                Entry::Vacant(entry) => {
                    entry.insert(*price);
                }
                Entry::Occupied(_) => {
                    return Err(Error::InvalidInput(format!(
                        "exact rates need a single year of spot prices, but {timestamp} repeats an earlier calendar position",
                    )));
                }
            }
        }
        Ok(Self(rates))
    }
}

impl RateSource for ExactRates {
    fn rate_at(&self, timestamp: DateTime<Utc>) -> Result<KilowattHourPrice> {
        self.0
            .get(&CalendarPosition::of(timestamp))
            .copied()
            .ok_or_else(|| Error::InsufficientData { window: timestamp.to_string() })
    }
}

/// Keep the last `n_years` complete calendar years, that is, the years with all 12 months present.
pub fn last_full_years<V: Copy>(series: &Series<V>, n_years: usize) -> Result<Series<V>> {
    if n_years == 0 {
        return Err(Error::InvalidInput("the number of analysis years must be positive".into()));
    }
    let complete_years: BTreeSet<i32> = series
        .timestamps()
        .map(|timestamp| (timestamp.year(), timestamp.month()))
        .unique()
        .counts_by(|(year, _)| year)
        .into_iter()
        .filter(|(_, n_months)| *n_months == 12)
        .map(|(year, _)| year)
        .collect();
    if complete_years.is_empty() {
        return Err(Error::InsufficientData { window: format!("last {n_years} full years") });
    }
    let kept_years: BTreeSet<i32> = complete_years.into_iter().rev().take(n_years).collect();
    Ok(series.clone().retain(|(timestamp, _)| kept_years.contains(&timestamp.year())))
}
