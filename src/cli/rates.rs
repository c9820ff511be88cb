use crate::{
    cli::RatesArgs,
    config::clamp_analysis_years,
    core::spot::{PricingPolicy, WindowRates},
    load::load_spot_prices,
    prelude::*,
    tables::build_rates_table,
};

#[instrument(skip_all)]
pub fn rates(args: &RatesArgs) -> Result {
    let prices =
        load_spot_prices(&args.spot_prices, clamp_analysis_years(args.spot.analysis_years))?;
    let window = args.spot.window.unwrap_or_default();
    let rates = match args.spot.policy.unwrap_or_default() {
        PricingPolicy::MedianWindowRate => WindowRates::median(&prices, window)?,
        PricingPolicy::MeanWindowRate => WindowRates::mean(&prices, window)?,
        PricingPolicy::IntervalExact => bail!("the interval-exact policy has no windows"),
    };
    info!(window = %rates.window(), n_windows = rates.iter().count(), "summarized");
    println!("{}", build_rates_table(&rates));
    Ok(())
}
