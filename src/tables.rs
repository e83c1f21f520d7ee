use chrono::Datelike;
use comfy_table::{Attribute, Cell, CellAlignment, Color, Table, modifiers, presets};
use itertools::Itertools;

use crate::{
    core::{
        price::{Pricing, PricingMode},
        record::YearSimulationResult,
        roi::{Payback, RoiAnalysis},
        summary::PeriodSummary,
    },
    quantity::cost::Cost,
};

fn new_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .apply_modifier(modifiers::UTF8_ROUND_CORNERS)
        .enforce_styling();
    table
}

fn savings_cell(savings: Cost) -> Cell {
    Cell::new(savings).set_alignment(CellAlignment::Right).fg(if savings >= Cost::ONE_CENT {
        Color::Green
    } else if savings <= -Cost::ONE_CENT {
        Color::Red
    } else {
        Color::Reset
    })
}

fn net_position_cell(net_position: Option<Cost>) -> Cell {
    net_position.map_or_else(|| Cell::new("-").add_attribute(Attribute::Dim), savings_cell)
}

fn cost_cell(cost: Cost) -> Cell {
    Cell::new(cost).set_alignment(CellAlignment::Right)
}

pub fn build_monthly_table(months: &[PeriodSummary], pricing: Pricing) -> Table {
    let modes: &[PricingMode] = if pricing.dynamic.is_enabled {
        &[PricingMode::Fixed, PricingMode::Dynamic]
    } else {
        &[PricingMode::Fixed]
    };

    let mut table = new_table();
    let mut header = vec![
        "Month",
        "Days",
        "Production",
        "Consumption",
        "Import",
        "Export",
        "Charge",
        "Discharge",
    ];
    for mode in modes {
        header.extend(match mode {
            PricingMode::Fixed => ["Fixed", "+ battery", "Savings"],
            PricingMode::Dynamic => ["Dynamic", "+ battery", "Savings"],
        });
    }
    table.set_header(header);

    for month in months {
        let mut row = vec![
            Cell::new(month.first_day.format("%b")),
            Cell::new(month.n_days).add_attribute(Attribute::Dim),
            Cell::new(month.production).set_alignment(CellAlignment::Right),
            Cell::new(month.consumption).set_alignment(CellAlignment::Right),
            Cell::new(month.grid.import).set_alignment(CellAlignment::Right),
            Cell::new(month.grid.export).set_alignment(CellAlignment::Right),
            Cell::new(month.battery.import).set_alignment(CellAlignment::Right).fg(Color::Green),
            Cell::new(month.battery.export).set_alignment(CellAlignment::Right).fg(Color::Red),
        ];
        for mode in modes {
            row.push(cost_cell(month.costs.no_battery(*mode)).add_attribute(Attribute::Dim));
            row.push(cost_cell(month.costs.with_battery(*mode)));
            row.push(savings_cell(month.costs.battery_savings(*mode)));
        }
        table.add_row(row);
    }
    table
}

pub fn build_annual_table<'a>(
    results: impl IntoIterator<Item = &'a YearSimulationResult>,
) -> Table {
    let mut table = new_table();
    table.set_header(vec![
        "Year",
        "Days",
        "Discharge",
        "Cycles",
        "Fixed",
        "+ battery",
        "Savings",
        "Dynamic",
        "+ battery",
        "Savings",
        "Dynamic advantage",
        "+ battery",
    ]);
    for result in results {
        let costs = result.costs();
        let advantage = result.dynamic_pricing_advantage();
        table.add_row(vec![
            Cell::new(result.year),
            Cell::new(result.days.len()).add_attribute(Attribute::Dim),
            Cell::new(result.battery_flow().export).set_alignment(CellAlignment::Right),
            Cell::new(format!("{:.1}", result.equivalent_full_cycles()))
                .set_alignment(CellAlignment::Right),
            cost_cell(costs.no_battery_fixed).add_attribute(Attribute::Dim),
            cost_cell(costs.with_battery_fixed),
            savings_cell(costs.battery_savings(PricingMode::Fixed)),
            cost_cell(costs.no_battery_dynamic).add_attribute(Attribute::Dim),
            cost_cell(costs.with_battery_dynamic),
            savings_cell(costs.battery_savings(PricingMode::Dynamic)),
            savings_cell(advantage.no_battery),
            savings_cell(advantage.with_battery),
        ]);
    }
    table
}

/// Net positions at the end of every month.
pub fn build_checkpoints_table(analysis: &RoiAnalysis) -> Table {
    let mut table = new_table();
    table.set_header(vec![
        "Month",
        "Pricing",
        "Solar savings",
        "Battery savings",
        "Solar",
        "Battery",
        "Total",
    ]);
    let month_ends = analysis
        .points
        .iter()
        .chunk_by(|point| (point.date.year(), point.date.month()))
        .into_iter()
        .filter_map(|(_, points)| points.last())
        .collect_vec();
    for point in month_ends {
        table.add_row(vec![
            Cell::new(point.date.format("%Y-%m")),
            Cell::new(point.mode).add_attribute(Attribute::Dim),
            cost_cell(point.cumulative_solar_savings),
            cost_cell(point.cumulative_battery_savings),
            net_position_cell(point.solar_net_position),
            net_position_cell(point.battery_net_position),
            net_position_cell(point.combined_net_position),
        ]);
    }
    table
}

pub fn build_payback_table(analysis: &RoiAnalysis) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Investment", "Installed", "Cost", "Savings", "Break-even", "Months"]);
    let paybacks = [
        ("Solar panels", analysis.solar),
        ("Battery", analysis.battery),
        ("Combined", analysis.combined),
    ];
    for (name, payback) in paybacks {
        let Some(Payback { installed_on, cost, savings, break_even_on, months }) = payback else {
            continue;
        };
        table.add_row(vec![
            Cell::new(name),
            Cell::new(installed_on).add_attribute(Attribute::Dim),
            cost_cell(cost),
            savings_cell(savings),
            break_even_on.map_or_else(
                || Cell::new("not yet").fg(Color::Red),
                |date| Cell::new(date).fg(Color::Green),
            ),
            months.map_or_else(|| Cell::new("-"), Cell::new).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}
