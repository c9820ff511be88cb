//! Per-interval distribution of the produced energy among the consumers.

use bon::Builder;
use chrono::{DateTime, Utc};
use rayon::prelude::*;

use crate::{
    core::{
        consumer::{Consumer, ConsumerKind, WEIGHT_TOLERANCE},
        error::{Error, Result},
        series::Series,
    },
    quantity::{Zero, energy::KilowattHours},
};

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
pub enum AllocationPolicy {
    /// Production is split proportionally to the demand of each consumer.
    #[default]
    Proportional,

    /// The company is served first, the rest is split by the fixed apartment shares.
    FixedShare,
}

/// Energy flows of a single consumer within a single interval.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct AllocationRecord {
    pub consumption: KilowattHours,

    /// Covered from the production.
    pub allocated: KilowattHours,

    /// Purchased from the grid.
    pub unmet: KilowattHours,
}

/// Production left after all the allocations, sold to the grid.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct SurplusRecord(pub KilowattHours);

#[derive(Clone, Debug)]
pub struct Step {
    pub timestamp: DateTime<Utc>,
    pub production: KilowattHours,

    /// One record per consumer, in the consumer order.
    pub records: Vec<AllocationRecord>,

    pub surplus: Option<SurplusRecord>,
}

impl Step {
    #[must_use]
    pub fn surplus(&self) -> KilowattHours {
        self.surplus.map_or(KilowattHours::ZERO, |SurplusRecord(surplus)| surplus)
    }
}

/// Allocation over the entire horizon.
#[must_use]
#[derive(Clone, Debug)]
pub struct Allocation {
    pub steps: Vec<Step>,
}

#[derive(Builder)]
#[builder(finish_fn(vis = ""))]
pub struct AllocationEngine<'a> {
    production: &'a Series<KilowattHours>,

    /// Company first, then the apartments.
    consumers: &'a [Consumer],

    #[builder(default)]
    policy: AllocationPolicy,
}

impl<S: allocation_engine_builder::IsComplete> AllocationEngineBuilder<'_, S> {
    pub fn allocate(self) -> Result<Allocation> {
        self.build().allocate()
    }
}

impl AllocationEngine<'_> {
    fn allocate(self) -> Result<Allocation> {
        self.validate()?;
        let shares = match self.policy {
            AllocationPolicy::Proportional => Vec::new(),
            AllocationPolicy::FixedShare => self.shares()?,
        };
        let steps = (0..self.production.len())
            .into_par_iter()
            .map(|index| {
                let (timestamp, production) = self.production[index];
                let demands: Vec<KilowattHours> =
                    self.consumers.iter().map(|consumer| consumer.demand[index].1).collect();
                let (allocated, surplus) = match self.policy {
                    AllocationPolicy::Proportional => {
                        Self::split_proportionally(production, &demands)
                    }
                    AllocationPolicy::FixedShare => {
                        self.split_by_shares(production, &demands, &shares)
                    }
                };
                let records = demands
                    .into_iter()
                    .zip(allocated)
                    .map(|(consumption, allocated)| AllocationRecord {
                        consumption,
                        allocated,
                        unmet: (consumption - allocated).max(KilowattHours::ZERO),
                    })
                    .collect();
                Step { timestamp, production, records, surplus }
            })
            .collect();
        Ok(Allocation { steps })
    }

    fn validate(&self) -> Result {
        self.production.ensure_non_negative("production")?;
        for consumer in self.consumers {
            consumer.demand.ensure_non_negative(&consumer.name)?;
            if !consumer.demand.timestamps().eq(self.production.timestamps()) {
                return Err(Error::Alignment(format!(
                    "consumption of `{}` is not aligned with the production",
                    consumer.name,
                )));
            }
        }
        Ok(())
    }

    /// Fixed apartment shares, zero for the company.
    fn shares(&self) -> Result<Vec<f64>> {
        let shares = self
            .consumers
            .iter()
            .map(|consumer| match (consumer.kind, consumer.share) {
                (ConsumerKind::Company, _) => Ok(0.0),
                (_, Some(share)) if share.is_finite() && share >= 0.0 => Ok(share),
                (_, Some(share)) => Err(Error::InvalidInput(format!(
                    "`{}` has the share {share}",
                    consumer.name,
                ))),
                (_, None) => {
                    Err(Error::InvalidInput(format!("`{}` has no fixed share", consumer.name)))
                }
            })
            .collect::<Result<Vec<f64>>>()?;
        let sum: f64 = shares.iter().sum();
        if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
            return Err(Error::InvalidWeight { group: "apartment shares".to_string(), sum });
        }
        Ok(shares)
    }

    fn split_proportionally(
        production: KilowattHours,
        demands: &[KilowattHours],
    ) -> (Vec<KilowattHours>, Option<SurplusRecord>) {
        let total_demand: KilowattHours = demands.iter().copied().sum();
        if production < total_demand {
            let allocated =
                demands.iter().map(|demand| production * (*demand / total_demand)).collect();
            (allocated, None)
        } else {
            (demands.to_vec(), Some(SurplusRecord(production - total_demand)))
        }
    }

    fn split_by_shares(
        &self,
        production: KilowattHours,
        demands: &[KilowattHours],
        shares: &[f64],
    ) -> (Vec<KilowattHours>, Option<SurplusRecord>) {
        let mut allocated = vec![KilowattHours::ZERO; demands.len()];
        let mut left = production;
        for ((consumer, demand), slot) in self.consumers.iter().zip(demands).zip(&mut allocated) {
            if consumer.kind == ConsumerKind::Company {
                *slot = (*demand).min(left);
                left -= *slot;
            }
        }
        let for_apartments = left;
        for ((consumer, (demand, share)), slot) in
            self.consumers.iter().zip(demands.iter().zip(shares)).zip(&mut allocated)
        {
            if consumer.kind != ConsumerKind::Company {
                *slot = (for_apartments * *share).min(*demand);
                left -= *slot;
            }
        }
        let total_demand: KilowattHours = demands.iter().copied().sum();
        let surplus = (production >= total_demand || left > KilowattHours::ZERO)
            .then(|| SurplusRecord(left.max(KilowattHours::ZERO)));
        (allocated, surplus)
    }
}
