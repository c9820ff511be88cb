//! Summary export for further processing.

use std::io::Write;

use serde::Serialize;

use crate::{
    core::{consumer::ConsumerKind, valuation::FinancialSummary},
    prelude::*,
    quantity::{energy::KilowattHours, money::Money},
};

/// Flat CSV row: one per consumer, then the surplus and the total.
///
/// Money is rounded to cents, energy is kept as is.
#[derive(Serialize)]
struct Row<'a> {
    name: &'a str,
    kind: Option<ConsumerKind>,
    consumption: Option<KilowattHours>,
    allocated: Option<KilowattHours>,
    unmet: Option<KilowattHours>,
    saved: Option<Money>,
    purchase_cost: Option<Money>,
    surplus: Option<KilowattHours>,
    surplus_value: Option<Money>,
    system_total: Option<Money>,
}

#[instrument(skip_all)]
pub fn write_csv(writer: impl Write, summary: &FinancialSummary) -> Result {
    let mut writer = csv::Writer::from_writer(writer);
    for consumer in &summary.consumers {
        writer.serialize(Row {
            name: &consumer.name,
            kind: Some(consumer.kind),
            consumption: Some(consumer.consumption),
            allocated: Some(consumer.allocated),
            unmet: Some(consumer.unmet),
            saved: Some(consumer.saved.round_to_cents()),
            purchase_cost: Some(consumer.purchase_cost.round_to_cents()),
            surplus: None,
            surplus_value: None,
            system_total: None,
        })?;
    }
    writer.serialize(Row {
        name: "surplus",
        kind: None,
        consumption: None,
        allocated: None,
        unmet: None,
        saved: None,
        purchase_cost: None,
        surplus: Some(summary.surplus),
        surplus_value: Some(summary.surplus_value.round_to_cents()),
        system_total: None,
    })?;
    writer.serialize(Row {
        name: "total",
        kind: None,
        consumption: Some(summary.consumers.iter().map(|consumer| consumer.consumption).sum()),
        allocated: Some(summary.consumers.iter().map(|consumer| consumer.allocated).sum()),
        unmet: Some(summary.consumers.iter().map(|consumer| consumer.unmet).sum()),
        saved: Some(summary.total_saved.round_to_cents()),
        purchase_cost: Some(summary.total_purchase_cost.round_to_cents()),
        surplus: Some(summary.surplus),
        surplus_value: Some(summary.surplus_value.round_to_cents()),
        system_total: Some(summary.system_total.round_to_cents()),
    })?;
    writer.flush()?;
    Ok(())
}

#[instrument(skip_all)]
pub fn write_json(writer: impl Write, summary: &FinancialSummary) -> Result {
    serde_json::to_writer_pretty(writer, summary).context("failed to serialize the summary")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{core::valuation::ConsumerSummary, quantity::Zero};

    fn summary() -> FinancialSummary {
        FinancialSummary {
            consumers: vec![
                ConsumerSummary {
                    name: "Company".to_string(),
                    kind: ConsumerKind::Company,
                    consumption: KilowattHours(10.0),
                    allocated: KilowattHours(10.0),
                    unmet: KilowattHours::ZERO,
                    saved: Money(20.0),
                    purchase_cost: Money::ZERO,
                },
                ConsumerSummary {
                    name: "A1".to_string(),
                    kind: ConsumerKind::TypeMember,
                    consumption: KilowattHours(10.0),
                    allocated: KilowattHours(10.0),
                    unmet: KilowattHours::ZERO,
                    saved: Money(20.0),
                    purchase_cost: Money::ZERO,
                },
            ],
            production: KilowattHours(20.0),
            surplus: KilowattHours::ZERO,
            surplus_value: Money::ZERO,
            total_saved: Money(40.0),
            total_purchase_cost: Money::ZERO,
            system_total: Money(40.0),
        }
    }

    #[test]
    fn test_write_csv() -> Result {
        let mut buffer = Vec::new();
        write_csv(&mut buffer, &summary())?;
        let text = String::from_utf8(buffer)?;
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 5);
        assert_eq!(
            lines[0],
            "name,kind,consumption,allocated,unmet,saved,purchase_cost,surplus,surplus_value,system_total",
        );
        assert_eq!(lines[1], "Company,company,10.0,10.0,0.0,20.0,0.0,,,");
        assert_eq!(lines[2], "A1,type-member,10.0,10.0,0.0,20.0,0.0,,,");
        assert_eq!(lines[3], "surplus,,,,,,,0.0,0.0,");
        assert_eq!(lines[4], "total,,20.0,20.0,0.0,40.0,0.0,0.0,0.0,40.0");
        Ok(())
    }

    #[test]
    fn test_write_json() -> Result {
        let mut buffer = Vec::new();
        write_json(&mut buffer, &summary())?;
        let value: serde_json::Value = serde_json::from_slice(&buffer)?;
        assert_eq!(value["system_total"], 40.0);
        assert_eq!(value["consumers"][1]["kind"], "type-member");
        assert_eq!(value["consumers"].as_array().map(Vec::len), Some(2));
        Ok(())
    }
}
