use average::Mean;
use comfy_table::{Attribute, Cell, CellAlignment, Color, Table, modifiers, presets};

use crate::{
    core::{
        spot::WindowRates,
        valuation::{ConsumerSummary, FinancialSummary},
    },
    quantity::{Zero, energy::KilowattHours, money::Money, price::KilowattHourPrice},
};

pub fn build_summary_table(summary: &FinancialSummary) -> Table {
    let mut table = new_table();
    table.set_header(vec![
        "Consumer", "Kind", "Consumption", "Covered", "Coverage", "Unmet", "Saved", "Purchased",
    ]);
    for consumer in &summary.consumers {
        table.add_row(vec![
            Cell::new(&consumer.name).add_attribute(Attribute::Bold),
            Cell::new(format!("{:?}", consumer.kind)).add_attribute(Attribute::Dim),
            energy_cell(consumer.consumption),
            energy_cell(consumer.allocated).fg(Color::Green),
            coverage_cell(consumer),
            energy_cell(consumer.unmet).fg(if consumer.unmet >= KilowattHours::ONE_WATT_HOUR {
                Color::Red
            } else {
                Color::Green
            }),
            money_cell(consumer.saved).fg(Color::Green),
            money_cell(consumer.purchase_cost).fg(Color::Red),
        ]);
    }
    table.add_row(vec![
        Cell::new("Surplus").add_attribute(Attribute::Italic),
        Cell::new(""),
        Cell::new(""),
        Cell::new(""),
        Cell::new(""),
        energy_cell(summary.surplus).fg(Color::DarkYellow),
        money_cell(summary.surplus_value).fg(Color::DarkYellow),
        Cell::new(""),
    ]);
    table.add_row(vec![
        Cell::new("Total").add_attribute(Attribute::Bold),
        Cell::new(""),
        energy_cell(summary.consumers.iter().map(|consumer| consumer.consumption).sum()),
        energy_cell(summary.consumers.iter().map(|consumer| consumer.allocated).sum()),
        Cell::new(""),
        energy_cell(summary.consumers.iter().map(|consumer| consumer.unmet).sum()),
        money_cell(summary.system_total).add_attribute(Attribute::Bold).fg(Color::Green),
        money_cell(summary.total_purchase_cost).fg(Color::Red),
    ]);
    table
}

pub fn build_rates_table(rates: &WindowRates) -> Table {
    let mean_rate: KilowattHourPrice = {
        let estimate: Mean = rates.iter().map(|(_, rate)| rate.0).collect();
        if estimate.is_empty() { KilowattHourPrice::ZERO } else { estimate.mean().into() }
    };

    let mut table = new_table();
    table.set_header(vec!["Window", "Rate"]);
    for (key, rate) in rates.iter() {
        table.add_row(vec![
            Cell::new(key),
            Cell::new(rate)
                .set_alignment(CellAlignment::Right)
                .fg(if rate >= mean_rate { Color::Red } else { Color::Green }),
        ]);
    }
    table
}

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .apply_modifier(modifiers::UTF8_ROUND_CORNERS)
        .enforce_styling();
    table
}

fn energy_cell(energy: KilowattHours) -> Cell {
    Cell::new(energy).set_alignment(CellAlignment::Right)
}

fn money_cell(money: Money) -> Cell {
    Cell::new(money).set_alignment(CellAlignment::Right)
}

fn coverage_cell(consumer: &ConsumerSummary) -> Cell {
    consumer.coverage().map_or_else(
        || Cell::new("n/a").add_attribute(Attribute::Dim),
        |coverage| Cell::new(format!("{:.1}%", coverage * 100.0)),
    )
    .set_alignment(CellAlignment::Right)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::consumer::ConsumerKind;

    #[test]
    fn test_summary_table() {
        let summary = FinancialSummary {
            consumers: vec![ConsumerSummary {
                name: "A1".to_string(),
                kind: ConsumerKind::Apartment,
                consumption: KilowattHours(10.0),
                allocated: KilowattHours(4.0),
                unmet: KilowattHours(6.0),
                saved: Money(6.0),
                purchase_cost: Money(9.0),
            }],
            production: KilowattHours(4.0),
            surplus: KilowattHours::ZERO,
            surplus_value: Money::ZERO,
            total_saved: Money(6.0),
            total_purchase_cost: Money(9.0),
            system_total: Money(6.0),
        };
        let rendered = build_summary_table(&summary).to_string();
        assert!(rendered.contains("A1"));
        assert!(rendered.contains("40.0%"));
        assert!(rendered.contains("6.000 kWh"));
    }
}
