use std::fs::File;

use crate::{
    cli::AllocateArgs,
    config::{RunConfig, clamp_analysis_years},
    core::{allocation::AllocationEngine, valuation::ValuationEngine},
    export::{write_csv, write_json},
    load::{load_series, load_spot_prices},
    prelude::*,
    tables::build_summary_table,
};

#[instrument(skip_all)]
pub fn allocate(args: &AllocateArgs) -> Result {
    let mut config = RunConfig::read(&args.config)?;
    if let Some(window) = args.spot.window {
        config.window = window;
    }
    if let Some(policy) = args.spot.policy {
        config.policy = policy;
    }
    if let Some(analysis_years) = args.spot.analysis_years {
        config.analysis_years = clamp_analysis_years(Some(analysis_years));
    }
    if let Some(sell_rate_multiplier) = args.sell_rate_multiplier {
        config.sell_rate_multiplier = sell_rate_multiplier;
    }

    let spot_prices = load_spot_prices(&config.spot_prices, config.analysis_years)?;
    let production = load_series(&config.production)?;
    let roster = config.roster(load_series)?;

    let (production, roster) = roster.align_with(production)?;
    info!(len = production.len(), start = ?production.start(), "aligned the series");
    let rates = config.policy.summarize(&spot_prices, config.window)?;
    let len = production.len();
    let (production, roster) = roster.fit_to_rates(production, rates.as_ref())?;
    if production.len() != len {
        warn!(len = production.len(), "dropped February 29, which the spot prices do not cover");
    }
    let consumers = roster.into_consumers();
    info!(
        n_consumers = consumers.len(),
        allocation = ?config.allocation,
        policy = %config.policy,
        window = %config.window,
        "allocating…",
    );

    let allocation = AllocationEngine::builder()
        .production(&production)
        .consumers(&consumers)
        .policy(config.allocation)
        .allocate()?;
    let summary = ValuationEngine::builder()
        .allocation(&allocation)
        .consumers(&consumers)
        .rates(rates.as_ref())
        .sell_rate_multiplier(config.sell_rate_multiplier)
        .tariff(config.tariff())
        .value()?;
    info!(
        total_saved = %summary.total_saved,
        surplus_value = %summary.surplus_value,
        system_total = %summary.system_total,
        "valued",
    );
    println!("{}", build_summary_table(&summary));

    if let Some(path) = &args.export_csv {
        let file = File::create(path)
            .with_context(|| format!("failed to create `{}`", path.display()))?;
        write_csv(file, &summary)?;
        info!(path = %path.display(), "exported CSV");
    }
    if let Some(path) = &args.export_json {
        let file = File::create(path)
            .with_context(|| format!("failed to create `{}`", path.display()))?;
        write_json(file, &summary)?;
        info!(path = %path.display(), "exported JSON");
    }
    Ok(())
}
