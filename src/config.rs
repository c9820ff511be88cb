//! Run configuration file.

use std::{
    fs,
    path::{Path, PathBuf},
};

use itertools::Itertools;
use serde::Deserialize;

use crate::{
    core::{
        allocation::AllocationPolicy,
        consumer::{ApartmentType, Apartments, Profile, Roster, WeightBasis},
        series::Series,
        spot::{PricingPolicy, Window},
        valuation::Tariff,
    },
    prelude::*,
    quantity::energy::KilowattHours,
};

/// The spot history is not analysed further back.
pub const MAX_ANALYSIS_YEARS: usize = 13;

/// Limit the requested analysis years to [`MAX_ANALYSIS_YEARS`].
#[must_use]
pub fn clamp_analysis_years(analysis_years: Option<usize>) -> Option<usize> {
    match analysis_years {
        Some(analysis_years) if analysis_years > MAX_ANALYSIS_YEARS => {
            warn!(analysis_years, max = MAX_ANALYSIS_YEARS, "limiting the analysis years");
            Some(MAX_ANALYSIS_YEARS)
        }
        analysis_years => analysis_years,
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Mode {
    /// Apartments grouped by type, sharing one profile.
    ByType,

    /// Each apartment has its own profile.
    ByApartment,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RunConfig {
    pub mode: Mode,

    #[serde(default)]
    pub window: Window,

    #[serde(default)]
    pub policy: PricingPolicy,

    #[serde(default)]
    pub allocation: AllocationPolicy,

    #[serde(default = "RunConfig::default_sell_rate_multiplier")]
    pub sell_rate_multiplier: f64,

    #[serde(default)]
    pub vat: f64,

    #[serde(default)]
    pub transfer_fee: f64,

    /// Restrict the spot history to the last complete years.
    pub analysis_years: Option<usize>,

    pub production: PathBuf,
    pub spot_prices: PathBuf,
    pub company: ProfileConfig,

    #[serde(default)]
    pub apartments: Vec<ProfileConfig>,

    #[serde(default)]
    pub types: Vec<TypeConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProfileConfig {
    pub name: String,
    pub profile: PathBuf,

    /// Fixed share of the production left after the company.
    pub share: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TypeConfig {
    pub name: String,
    pub profile: PathBuf,
    pub share: Option<f64>,

    /// Number of equally weighted apartments.
    pub count: Option<usize>,

    #[serde(default)]
    pub members: Vec<MemberConfig>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MemberConfig {
    pub name: String,
    pub occupants: Option<u32>,
    pub floor_area: Option<f64>,
    pub weight: Option<f64>,
}

impl MemberConfig {
    fn basis(&self) -> Result<WeightBasis> {
        match (self.occupants, self.floor_area, self.weight) {
            (Some(occupants), None, None) => Ok(WeightBasis::Occupants(occupants)),
            (None, Some(floor_area), None) => Ok(WeightBasis::FloorArea(floor_area)),
            (None, None, Some(weight)) => Ok(WeightBasis::Weight(weight)),
            _ => bail!(
                "`{}` must specify exactly one of `occupants`, `floor_area` or `weight`",
                self.name,
            ),
        }
    }
}

impl RunConfig {
    const fn default_sell_rate_multiplier() -> f64 {
        1.0
    }

    /// Read the configuration, resolving the relative paths against its directory.
    #[instrument(skip_all, fields(path = %path.display()))]
    pub fn read(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("failed to read `{}`", path.display()))?;
        let config = Self::from_toml(&text, path.parent().unwrap_or_else(|| Path::new("")))
            .with_context(|| format!("invalid configuration `{}`", path.display()))?;
        info!(
            mode = ?config.mode,
            n_apartments = config.apartments.len(),
            n_types = config.types.len(),
            "read the configuration",
        );
        Ok(config)
    }

    pub fn from_toml(text: &str, base_dir: &Path) -> Result<Self> {
        let mut config: Self = toml::from_str(text)?;
        config.validate()?;
        config.resolve_paths(base_dir);
        Ok(config)
    }

    fn validate(&mut self) -> Result {
        match self.mode {
            Mode::ByApartment => ensure!(
                self.types.is_empty(),
                "`types` are not allowed in the by-apartment mode",
            ),
            Mode::ByType => ensure!(
                self.apartments.is_empty(),
                "`apartments` are not allowed in the by-type mode",
            ),
        }
        self.analysis_years = clamp_analysis_years(self.analysis_years);
        for apartment_type in &self.types {
            let has_members = !apartment_type.members.is_empty();
            ensure!(
                apartment_type.count.is_some() != has_members,
                "type `{}` must specify either `count` or `members`",
                apartment_type.name,
            );
        }
        Ok(())
    }

    fn resolve_paths(&mut self, base_dir: &Path) {
        let resolve = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base_dir.join(&*path);
            }
        };
        resolve(&mut self.production);
        resolve(&mut self.spot_prices);
        resolve(&mut self.company.profile);
        self.apartments.iter_mut().for_each(|apartment| resolve(&mut apartment.profile));
        self.types.iter_mut().for_each(|apartment_type| resolve(&mut apartment_type.profile));
    }

    #[must_use]
    pub const fn tariff(&self) -> Tariff {
        Tariff { vat: self.vat, transfer_fee: self.transfer_fee }
    }

    /// Build the roster, loading the profiles with `load`.
    pub fn roster(
        &self,
        mut load: impl FnMut(&Path) -> Result<Series<KilowattHours>>,
    ) -> Result<Roster> {
        let mut profile = |name: &str, path: &Path, share: Option<f64>| -> Result<Profile> {
            Ok(Profile { name: name.to_string(), consumption: load(path)?, share })
        };
        let company = profile(&self.company.name, &self.company.profile, self.company.share)?;

        let apartments = match self.mode {
            Mode::ByApartment => Apartments::ByApartment(
                self.apartments
                    .iter()
                    .map(|config| profile(&config.name, &config.profile, config.share))
                    .try_collect()?,
            ),
            Mode::ByType => {
                let mut next_number = 1;
                let mut types = Vec::with_capacity(self.types.len());
                for config in &self.types {
                    let type_profile = profile(&config.name, &config.profile, config.share)?;
                    let apartment_type = if let Some(count) = config.count {
                        ApartmentType::with_count(type_profile, count, &mut next_number)?
                    } else {
                        let members = config
                            .members
                            .iter()
                            .map(|member| Ok((member.name.clone(), member.basis()?)))
                            .collect::<Result<Vec<_>>>()?;
                        ApartmentType::with_members(type_profile, members)?
                    };
                    types.push(apartment_type);
                }
                Apartments::ByType(types)
            }
        };
        Ok(Roster { company, apartments })
    }
}
