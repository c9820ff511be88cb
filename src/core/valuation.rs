//! Monetary value of the allocated energy.

use std::ops::Add;

use bon::Builder;
use itertools::Itertools;
use rayon::prelude::*;

use crate::{
    core::{
        allocation::{Allocation, Step},
        consumer::{Consumer, ConsumerKind},
        error::{Error, Result},
        spot::RateSource,
    },
    quantity::{Zero, energy::KilowattHours, money::Money},
};

/// Consumer-side charges on top of the spot price, as fractions of it.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct Tariff {
    pub vat: f64,
    pub transfer_fee: f64,
}

impl Tariff {
    #[must_use]
    pub fn purchase_multiplier(self) -> f64 {
        1.0 + self.vat + self.transfer_fee
    }

    fn validate(self) -> Result {
        for (name, value) in [("VAT", self.vat), ("transfer fee", self.transfer_fee)] {
            if !value.is_finite() || value < 0.0 {
                return Err(Error::InvalidInput(format!("{name} is {value}")));
            }
        }
        Ok(())
    }
}

/// Totals of a single consumer over the horizon.
#[derive(Clone, Debug, serde::Serialize)]
pub struct ConsumerSummary {
    pub name: String,
    pub kind: ConsumerKind,
    pub consumption: KilowattHours,
    pub allocated: KilowattHours,
    pub unmet: KilowattHours,

    /// Value of the allocated energy.
    pub saved: Money,

    /// Cost of the unmet demand purchased from the grid.
    pub purchase_cost: Money,
}

impl ConsumerSummary {
    /// Share of the consumption covered from the production.
    #[must_use]
    pub fn coverage(&self) -> Option<f64> {
        (self.consumption > KilowattHours::ZERO).then(|| self.allocated / self.consumption)
    }
}

#[derive(Clone, Debug, serde::Serialize)]
pub struct FinancialSummary {
    pub consumers: Vec<ConsumerSummary>,
    pub production: KilowattHours,
    pub surplus: KilowattHours,
    pub surplus_value: Money,
    pub total_saved: Money,
    pub total_purchase_cost: Money,

    /// Saved plus surplus value.
    pub system_total: Money,
}

#[derive(Builder)]
#[builder(finish_fn(vis = ""))]
pub struct ValuationEngine<'a> {
    allocation: &'a Allocation,
    consumers: &'a [Consumer],
    rates: &'a dyn RateSource,

    /// Fraction of the spot price paid for the surplus.
    #[builder(default = 1.0)]
    sell_rate_multiplier: f64,

    #[builder(default)]
    tariff: Tariff,
}

impl<S: valuation_engine_builder::IsComplete> ValuationEngineBuilder<'_, S> {
    pub fn value(self) -> Result<FinancialSummary> {
        self.build().value()
    }
}

impl ValuationEngine<'_> {
    fn value(self) -> Result<FinancialSummary> {
        self.validate()?;
        let n_consumers = self.consumers.len();
        let totals = self
            .allocation
            .steps
            .par_iter()
            .map(|step| self.value_step(step))
            .try_reduce(|| Totals::zero(n_consumers), |lhs, rhs| Ok(lhs + rhs))?;

        let consumers = self
            .consumers
            .iter()
            .zip(totals.consumers)
            .map(|(consumer, totals)| ConsumerSummary {
                name: consumer.name.clone(),
                kind: consumer.kind,
                consumption: totals.consumption,
                allocated: totals.allocated,
                unmet: totals.unmet,
                saved: totals.saved,
                purchase_cost: totals.purchase_cost,
            })
            .collect_vec();
        let total_saved: Money = consumers.iter().map(|consumer| consumer.saved).sum();
        let total_purchase_cost = consumers.iter().map(|consumer| consumer.purchase_cost).sum();
        Ok(FinancialSummary {
            consumers,
            production: totals.production,
            surplus: totals.surplus,
            surplus_value: totals.surplus_value,
            total_saved,
            total_purchase_cost,
            system_total: total_saved + totals.surplus_value,
        })
    }

    fn validate(&self) -> Result {
        if !self.sell_rate_multiplier.is_finite() || self.sell_rate_multiplier < 0.0 {
            return Err(Error::InvalidInput(format!(
                "sell rate multiplier is {}",
                self.sell_rate_multiplier,
            )));
        }
        self.tariff.validate()?;
        if let Some(step) =
            self.allocation.steps.iter().find(|step| step.records.len() != self.consumers.len())
        {
            return Err(Error::InvalidInput(format!(
                "{} has {} allocation records for {} consumers",
                step.timestamp,
                step.records.len(),
                self.consumers.len(),
            )));
        }
        Ok(())
    }

    fn value_step(&self, step: &Step) -> Result<Totals> {
        let rate = self.rates.rate_at(step.timestamp)?;
        let purchase_rate = rate * self.tariff.purchase_multiplier();
        let consumers = step
            .records
            .iter()
            .map(|record| ConsumerTotals {
                consumption: record.consumption,
                allocated: record.allocated,
                unmet: record.unmet,
                saved: record.allocated * purchase_rate,
                purchase_cost: record.unmet * purchase_rate,
            })
            .collect();
        Ok(Totals {
            consumers,
            production: step.production,
            surplus: step.surplus(),
            surplus_value: step.surplus() * rate * self.sell_rate_multiplier,
        })
    }
}

#[derive(Copy, Clone, Debug, Default, derive_more::Add)]
struct ConsumerTotals {
    consumption: KilowattHours,
    allocated: KilowattHours,
    unmet: KilowattHours,
    saved: Money,
    purchase_cost: Money,
}

struct Totals {
    consumers: Vec<ConsumerTotals>,
    production: KilowattHours,
    surplus: KilowattHours,
    surplus_value: Money,
}

impl Totals {
    fn zero(n_consumers: usize) -> Self {
        Self {
            consumers: vec![ConsumerTotals::default(); n_consumers],
            production: KilowattHours::ZERO,
            surplus: KilowattHours::ZERO,
            surplus_value: Money::ZERO,
        }
    }
}

impl Add for Totals {
    type Output = Self;

    fn add(self, rhs: Self) -> Self::Output {
        Self {
            consumers: self
                .consumers
                .into_iter()
                .zip(rhs.consumers)
                .map(|(lhs, rhs)| lhs + rhs)
                .collect(),
            production: self.production + rhs.production,
            surplus: self.surplus + rhs.surplus,
            surplus_value: self.surplus_value + rhs.surplus_value,
        }
    }
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use chrono::{DateTime, Utc};

    use super::*;
    use crate::{
        core::{
            allocation::AllocationEngine,
            series::{Series, tests::hourly},
            spot::{PricingPolicy, Window, WindowRates},
        },
        quantity::price::KilowattHourPrice,
    };

    fn consumer(name: &str, kind: ConsumerKind, demand: &[f64]) -> Consumer {
        Consumer {
            name: name.to_string(),
            kind,
            share: None,
            demand: hourly(demand).map_values(KilowattHours),
        }
    }

    fn allocate(production: &[f64], consumers: &[Consumer]) -> Allocation {
        AllocationEngine::builder()
            .production(&hourly(production).map_values(KilowattHours))
            .consumers(consumers)
            .allocate()
            .unwrap()
    }

    fn exact(prices: &[f64]) -> Box<dyn RateSource> {
        PricingPolicy::IntervalExact
            .summarize(&hourly(prices).map_values(KilowattHourPrice), Window::Full)
            .unwrap()
    }

    /// Flat rate for every timestamp.
    struct Flat(f64);

    impl RateSource for Flat {
        fn rate_at(&self, _timestamp: DateTime<Utc>) -> Result<KilowattHourPrice> {
            Ok(KilowattHourPrice(self.0))
        }
    }

    #[test]
    fn test_exact_cover() -> Result<()> {
        let consumers = [
            consumer("Company", ConsumerKind::Company, &[5.0, 5.0]),
            consumer("A1", ConsumerKind::Apartment, &[5.0, 5.0]),
        ];
        let allocation = allocate(&[10.0, 10.0], &consumers);
        let rates = exact(&[2.0, 2.0]);
        let summary = ValuationEngine::builder()
            .allocation(&allocation)
            .consumers(&consumers)
            .rates(rates.as_ref())
            .value()?;
        assert_abs_diff_eq!(summary.consumers[0].saved.0, 20.0);
        assert_abs_diff_eq!(summary.consumers[1].saved.0, 20.0);
        assert_abs_diff_eq!(summary.surplus_value.0, 0.0);
        assert_abs_diff_eq!(summary.system_total.0, 40.0);
        assert_abs_diff_eq!(summary.consumers[1].coverage().unwrap(), 1.0);
        Ok(())
    }

    #[test]
    fn test_deficit_costs() -> Result<()> {
        let consumers = [
            consumer("Company", ConsumerKind::Company, &[5.0, 5.0]),
            consumer("A1", ConsumerKind::Apartment, &[5.0, 5.0]),
        ];
        let allocation = allocate(&[4.0, 4.0], &consumers);
        let summary = ValuationEngine::builder()
            .allocation(&allocation)
            .consumers(&consumers)
            .rates(&Flat(1.5))
            .value()?;
        for consumer in &summary.consumers {
            assert_abs_diff_eq!(consumer.allocated.0, 4.0);
            assert_abs_diff_eq!(consumer.unmet.0, 6.0);
            assert_abs_diff_eq!(consumer.saved.0, 6.0);
            assert_abs_diff_eq!(consumer.purchase_cost.0, 9.0);
            assert_abs_diff_eq!(consumer.coverage().unwrap(), 0.4);
        }
        assert_abs_diff_eq!(summary.total_purchase_cost.0, 18.0);
        assert_abs_diff_eq!(summary.system_total.0, 12.0);
        Ok(())
    }

    #[test]
    fn test_surplus_value() -> Result<()> {
        let consumers = [consumer("Company", ConsumerKind::Company, &[5.0, 5.0])];
        let allocation = allocate(&[20.0, 20.0], &consumers);
        let rates = exact(&[1.0, 1.0]);

        let summary = ValuationEngine::builder()
            .allocation(&allocation)
            .consumers(&consumers)
            .rates(rates.as_ref())
            .sell_rate_multiplier(0.5)
            .value()?;
        assert_abs_diff_eq!(summary.surplus.0, 30.0);
        assert_abs_diff_eq!(summary.surplus_value.0, 15.0);
        assert_abs_diff_eq!(summary.total_saved.0, 10.0);
        assert_abs_diff_eq!(summary.system_total.0, 25.0);

        let summary = ValuationEngine::builder()
            .allocation(&allocation)
            .consumers(&consumers)
            .rates(rates.as_ref())
            .value()?;
        assert_abs_diff_eq!(summary.surplus_value.0, 30.0);
        Ok(())
    }

    #[test]
    fn test_more_allocated_is_worth_more() -> Result<()> {
        let consumers = [consumer("Company", ConsumerKind::Company, &[5.0, 5.0])];
        let value = |production: &[f64]| {
            ValuationEngine::builder()
                .allocation(&allocate(production, &consumers))
                .consumers(&consumers)
                .rates(&Flat(0.2))
                .sell_rate_multiplier(0.0)
                .value()
        };
        let lower = value(&[1.0, 1.0])?;
        let higher = value(&[1.0, 2.0])?;
        assert!(higher.consumers[0].saved > lower.consumers[0].saved);
        assert!(higher.system_total > lower.system_total);
        Ok(())
    }

    #[test]
    fn test_tariff() -> Result<()> {
        let consumers = [consumer("Company", ConsumerKind::Company, &[2.0])];
        let allocation = allocate(&[3.0], &consumers);
        let summary = ValuationEngine::builder()
            .allocation(&allocation)
            .consumers(&consumers)
            .rates(&Flat(1.0))
            .tariff(Tariff { vat: 0.25, transfer_fee: 0.25 })
            .value()?;
        assert_abs_diff_eq!(summary.total_saved.0, 3.0);
        assert_abs_diff_eq!(summary.surplus_value.0, 1.0);
        Ok(())
    }

    #[test]
    fn test_missing_window() {
        let consumers = [consumer("Company", ConsumerKind::Company, &[1.0])];
        let allocation = allocate(&[1.0], &consumers);
        let prices = Series::try_new(vec![(
            "2023-01-01T00:00:00Z".parse().unwrap(),
            KilowattHourPrice(1.0),
        )])
        .unwrap();
        let rates = WindowRates::median(&prices, Window::Monthly).unwrap();
        let result = ValuationEngine::builder()
            .allocation(&allocation)
            .consumers(&consumers)
            .rates(&rates)
            .value();
        assert!(matches!(result, Err(Error::InsufficientData { .. })));
    }

    #[test]
    fn test_negative_sell_rate_multiplier() {
        let consumers = [consumer("Company", ConsumerKind::Company, &[1.0])];
        let allocation = allocate(&[1.0], &consumers);
        let result = ValuationEngine::builder()
            .allocation(&allocation)
            .consumers(&consumers)
            .rates(&Flat(1.0))
            .sell_rate_multiplier(-1.0)
            .value();
        assert!(matches!(result, Err(Error::InvalidInput(_))));
    }
}
