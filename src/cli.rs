mod allocate;
mod rates;

use std::path::PathBuf;

use clap::{Parser, Subcommand};

pub use self::{allocate::allocate, rates::rates};
use crate::core::spot::{PricingPolicy, Window};

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
#[must_use]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Main command: allocate the production among the consumers and value it.
    #[clap(name = "allocate")]
    Allocate(Box<AllocateArgs>),

    /// Print the representative spot rate of every window.
    #[clap(name = "rates")]
    Rates(Box<RatesArgs>),
}

#[derive(Parser)]
pub struct AllocateArgs {
    /// Run configuration file.
    #[clap(long = "config", env = "ENERLOC_CONFIG")]
    pub config: PathBuf,

    #[clap(flatten)]
    pub spot: SpotArgs,

    /// Fraction of the spot rate paid for the surplus, overrides the configuration.
    #[clap(long, env = "ENERLOC_SELL_RATE_MULTIPLIER")]
    pub sell_rate_multiplier: Option<f64>,

    /// Write the summary as CSV.
    #[clap(long = "export-csv")]
    pub export_csv: Option<PathBuf>,

    /// Write the summary as JSON.
    #[clap(long = "export-json")]
    pub export_json: Option<PathBuf>,
}

#[derive(Parser)]
pub struct RatesArgs {
    /// Spot price CSV file.
    #[clap(long = "spot-prices", env = "ENERLOC_SPOT_PRICES")]
    pub spot_prices: PathBuf,

    #[clap(flatten)]
    pub spot: SpotArgs,
}

/// Spot rate settings, each overrides the configuration when given.
#[derive(Copy, Clone, Parser)]
pub struct SpotArgs {
    /// Price window sharing one representative rate.
    #[clap(long, env = "ENERLOC_WINDOW")]
    pub window: Option<Window>,

    /// How the representative rate is derived.
    #[clap(long, env = "ENERLOC_POLICY")]
    pub policy: Option<PricingPolicy>,

    /// Number of the last complete years of the spot history to analyse.
    #[clap(long, env = "ENERLOC_ANALYSIS_YEARS")]
    pub analysis_years: Option<usize>,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_verify_args() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_parse_allocate() {
        let args = Args::try_parse_from([
            "enerloc",
            "allocate",
            "--config",
            "run.toml",
            "--window",
            "calendar-hour",
            "--sell-rate-multiplier",
            "0.5",
        ])
        .unwrap();
        let Command::Allocate(args) = args.command else {
            panic!("expected the allocate command");
        };
        assert_eq!(args.spot.window, Some(Window::CalendarHour));
        assert_eq!(args.spot.policy, None);
        assert_eq!(args.sell_rate_multiplier, Some(0.5));
    }
}
