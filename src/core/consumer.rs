//! Consumers competing for the produced energy, and the roster they are built from.

use itertools::{Either, Itertools};

use crate::{
    core::{
        align::{align, fit_to_rates},
        error::{Error, Result},
        series::Series,
        spot::RateSource,
    },
    quantity::energy::KilowattHours,
};

/// Allowed deviation of a weight sum from one.
pub const WEIGHT_TOLERANCE: f64 = 1e-6;

#[derive(Copy, Clone, Debug, Eq, PartialEq, serde::Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ConsumerKind {
    Company,
    Apartment,
    TypeMember,
}

/// Single participant of the allocation with its own demand series.
#[derive(Clone, Debug)]
pub struct Consumer {
    pub name: String,
    pub kind: ConsumerKind,

    /// Fixed share of the production left after the company, if configured.
    pub share: Option<f64>,

    pub demand: Series<KilowattHours>,
}

/// Named consumption profile.
#[derive(Clone, Debug)]
pub struct Profile {
    pub name: String,
    pub consumption: Series<KilowattHours>,
    pub share: Option<f64>,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Member {
    pub name: String,
    pub weight: f64,
}

/// How a member's portion of its type's consumption is specified.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum WeightBasis {
    Weight(f64),
    Occupants(u32),
    FloorArea(f64),
}

impl WeightBasis {
    const fn label(self) -> &'static str {
        match self {
            Self::Weight(_) => "weight",
            Self::Occupants(_) => "occupants",
            Self::FloorArea(_) => "floor area",
        }
    }

    fn value(self) -> f64 {
        match self {
            Self::Weight(value) | Self::FloorArea(value) => value,
            Self::Occupants(occupants) => f64::from(occupants),
        }
    }
}

/// Group of apartments sharing one consumption profile.
#[derive(Clone, Debug)]
pub struct ApartmentType {
    pub profile: Profile,
    pub members: Vec<Member>,
}

impl ApartmentType {
    /// Split the type among `count` equally weighted members.
    ///
    /// Members are named after the type, numbered with a counter shared across the types.
    pub fn with_count(profile: Profile, count: usize, next_number: &mut usize) -> Result<Self> {
        if count == 0 {
            return Err(Error::InvalidWeight { group: profile.name, sum: 0.0 });
        }
        #[expect(clippy::cast_precision_loss)]
        let weight = 1.0 / count as f64;
        let members = (0..count)
            .map(|_| {
                let member = Member { name: format!("{}{next_number}", profile.name), weight };
                *next_number += 1;
                member
            })
            .collect();
        Ok(Self { profile, members })
    }

    /// Build the members from their weight bases.
    ///
    /// Explicit weights must already sum up to one, occupants and floor areas get normalized.
    pub fn with_members(profile: Profile, members: Vec<(String, WeightBasis)>) -> Result<Self> {
        if let Some((_, basis)) = members.iter().find(|(_, basis)| {
            let value = basis.value();
            !value.is_finite() || value < 0.0
        }) {
            return Err(Error::InvalidInput(format!(
                "`{}` has a negative {}",
                profile.name,
                basis.label(),
            )));
        }

        let sum: f64 = members.iter().map(|(_, basis)| basis.value()).sum();
        let is_mixed = members
            .iter()
            .map(|(_, basis)| std::mem::discriminant(basis))
            .all_equal_value()
            .is_err();
        if members.is_empty() || is_mixed || sum <= 0.0 {
            return Err(Error::InvalidWeight { group: profile.name, sum });
        }

        let members = match members[0].1 {
            WeightBasis::Weight(_) => {
                if (sum - 1.0).abs() > WEIGHT_TOLERANCE {
                    return Err(Error::InvalidWeight { group: profile.name, sum });
                }
                members
                    .into_iter()
                    .map(|(name, basis)| Member { name, weight: basis.value() })
                    .collect()
            }
            WeightBasis::Occupants(_) | WeightBasis::FloorArea(_) => members
                .into_iter()
                .map(|(name, basis)| Member { name, weight: basis.value() / sum })
                .collect(),
        };
        Ok(Self { profile, members })
    }
}

/// Exactly one allocation mode is active per run.
#[derive(Clone, Debug)]
pub enum Apartments {
    ByApartment(Vec<Profile>),
    ByType(Vec<ApartmentType>),
}

/// The company and the apartments, in the order of allocation.
#[derive(Clone, Debug)]
pub struct Roster {
    pub company: Profile,
    pub apartments: Apartments,
}

impl Roster {
    /// Align the production and every profile onto the production's index.
    pub fn align_with(
        self,
        production: Series<KilowattHours>,
    ) -> Result<(Series<KilowattHours>, Self)> {
        self.transform_with(production, align)
    }

    /// Drop February 29 from the aligned production and profiles, if the rates lack it.
    pub fn fit_to_rates(
        self,
        production: Series<KilowattHours>,
        rates: &dyn RateSource,
    ) -> Result<(Series<KilowattHours>, Self)> {
        self.transform_with(production, |series| fit_to_rates(series, rates))
    }

    /// Apply the transformation to the production followed by every profile.
    fn transform_with(
        mut self,
        production: Series<KilowattHours>,
        transform: impl FnOnce(Vec<Series<KilowattHours>>) -> Result<Vec<Series<KilowattHours>>>,
    ) -> Result<(Series<KilowattHours>, Self)> {
        let mut series = vec![production];
        series.extend(self.profiles_mut().map(|profile| std::mem::take(&mut profile.consumption)));

        let mut transformed = transform(series)?.into_iter();
        let production = transformed.next().unwrap_or_default();
        for (profile, consumption) in self.profiles_mut().zip(transformed) {
            profile.consumption = consumption;
        }
        Ok((production, self))
    }

    fn profiles_mut(&mut self) -> impl Iterator<Item = &mut Profile> {
        let apartments = match &mut self.apartments {
            Apartments::ByApartment(profiles) => Either::Left(profiles.iter_mut()),
            Apartments::ByType(types) => {
                Either::Right(types.iter_mut().map(|apartment_type| &mut apartment_type.profile))
            }
        };
        std::iter::once(&mut self.company).chain(apartments)
    }

    /// Flatten the roster into the consumers: the company first, then the apartments in order.
    pub fn into_consumers(self) -> Vec<Consumer> {
        let company = Consumer {
            name: self.company.name,
            kind: ConsumerKind::Company,
            share: self.company.share,
            demand: self.company.consumption,
        };
        let apartments = match self.apartments {
            Apartments::ByApartment(profiles) => profiles
                .into_iter()
                .map(|profile| Consumer {
                    name: profile.name,
                    kind: ConsumerKind::Apartment,
                    share: profile.share,
                    demand: profile.consumption,
                })
                .collect_vec(),
            Apartments::ByType(types) => types
                .into_iter()
                .flat_map(|apartment_type| {
                    let ApartmentType { profile, members } = apartment_type;
                    members.into_iter().map(move |member| Consumer {
                        name: member.name,
                        kind: ConsumerKind::TypeMember,
                        share: profile.share.map(|share| share * member.weight),
                        demand: profile
                            .consumption
                            .clone()
                            .map_values(|demand| demand * member.weight),
                    })
                })
                .collect_vec(),
        };
        std::iter::once(company).chain(apartments).collect()
    }
}
