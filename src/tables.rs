use comfy_table::{Attribute, Cell, CellAlignment, Color, Table, modifiers, presets};

use crate::{
    core::{
        classify::{bucket_key, display_price},
        granularity::Granularity,
        peak::{PeakHours, day_key},
        point::PricePoint,
        settings::Settings,
    },
    prelude::*,
};

fn new_table() -> Table {
    let mut table = Table::new();
    table.load_preset(presets::UTF8_FULL_CONDENSED).apply_modifier(modifiers::UTF8_ROUND_CORNERS);
    table.enforce_styling();
    table
}

pub fn build_prices_table(series: &[PricePoint], granularity: Granularity, settings: &Settings) -> Result<Table> {
    let mut table = new_table();
    table.set_header(vec!["Product", "Slot", "Raw", "Price"]);
    for point in series {
        let raw = point.price.with_context(|| format!("no price for product `{}`", point.product))?;
        let price = display_price(raw, settings);
        table.add_row(vec![
            Cell::new(&point.product),
            Cell::new(bucket_key(point, granularity).unwrap_or_default()).add_attribute(Attribute::Dim),
            Cell::new(raw).set_alignment(CellAlignment::Right),
            Cell::new(price)
                .set_alignment(CellAlignment::Right)
                .fg(if price < settings.threshold { Color::Green } else { Color::Red }),
        ]);
    }
    Ok(table)
}

#[must_use]
pub fn build_peak_hours_table(peak_hours: &PeakHours) -> Table {
    let mut table = new_table();
    table.set_header(vec!["Day", "Hours", "Timestamp"]);
    for (day, events) in peak_hours.days.iter().enumerate() {
        for (label, millis) in events {
            table.add_row(vec![
                Cell::new(day_key(day)),
                Cell::new(label).fg(Color::Red),
                Cell::new(millis).set_alignment(CellAlignment::Right).add_attribute(Attribute::Dim),
            ]);
        }
    }
    table
}
