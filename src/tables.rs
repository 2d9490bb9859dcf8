use chrono::TimeDelta;
use comfy_table::{Attribute, Cell, CellAlignment, Table, modifiers, presets};

use crate::core::{aggregate::HourlyEnergy, window::TIMEZONE};

pub fn build_hourly_energy_table(hourly: &HourlyEnergy) -> Table {
    let mut table = Table::new();
    table
        .load_preset(presets::UTF8_FULL_CONDENSED)
        .apply_modifier(modifiers::UTF8_ROUND_CORNERS)
        .enforce_styling();
    table.set_header(vec!["Date", "Start", "Energy", "Power", "Sum"]);
    for ((start, energy), point) in hourly.hours().zip(hourly.statistic_points()) {
        let start = start.with_timezone(&TIMEZONE);
        table.add_row(vec![
            Cell::new(start.format("%b %d")).add_attribute(Attribute::Dim),
            Cell::new(start.format("%H:%M")),
            Cell::new(energy).set_alignment(CellAlignment::Right),
            Cell::new(energy / TimeDelta::hours(1))
                .set_alignment(CellAlignment::Right)
                .add_attribute(Attribute::Dim),
            Cell::new(point.sum).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}
