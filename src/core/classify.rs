//! Display prices and the threshold partition.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::{
    core::{
        calendar::{compare_by_price, pad},
        granularity::Granularity,
        point::{PricePoint, extract_time_range},
        settings::Settings,
    },
    prelude::*,
};

/// Round half up to three decimals.
#[must_use]
pub fn round_to_mills(value: f64) -> f64 {
    (value * 1000.0 + 0.5).floor() / 1000.0
}

/// Display price in ct/kWh from the raw price in €/MWh.
#[must_use]
pub fn display_price(raw: f64, settings: &Settings) -> f64 {
    let trade = round_to_mills(raw / 10.0);
    settings.costs.map_or(trade, |costs| round_to_mills(costs.apply(trade)))
}

/// Bucket key of the point, `06_to_07` for hourly and `HH:MM-HH:MM` for quarter-hourly slots.
#[must_use]
pub fn bucket_key(point: &PricePoint, granularity: Granularity) -> Option<String> {
    match granularity {
        Granularity::Hourly => {
            let digits: String = point
                .product
                .strip_prefix('H')?
                .chars()
                .take_while(char::is_ascii_digit)
                .collect();
            let end_hour: u32 = digits.parse().ok()?;
            let start_hour = end_hour.checked_sub(1)?;
            Some(format!("{}_to_{}", pad(start_hour, 2), pad(end_hour, 2)))
        }
        Granularity::QuarterHourly => point
            .product_text
            .as_deref()
            .and_then(extract_time_range)
            .or_else(|| point.id.clone()),
    }
}

/// Every slot of a day keyed by its bucket, together with the threshold partition.
#[must_use]
#[derive(Clone, Debug, Default)]
pub struct Classification {
    pub full: BTreeMap<String, f64>,
    pub below: BTreeMap<String, f64>,
    pub above: BTreeMap<String, f64>,
}

impl Classification {
    /// Classify the day series, a point without a price fails the whole day.
    #[instrument(skip_all, fields(granularity = %granularity, n_points = series.len()))]
    pub fn try_new(series: &[PricePoint], granularity: Granularity, settings: &Settings) -> Result<Self> {
        let mut this = Self::default();
        for point in series {
            let raw = point
                .price
                .with_context(|| format!("no price for product `{}`", point.product))?;
            let Some(key) = bucket_key(point, granularity) else {
                warn!(product = point.product, "skipping the point without a slot key");
                continue;
            };
            let price = display_price(raw, settings);
            if price < settings.threshold {
                this.below.insert(key.clone(), price);
            } else {
                this.above.insert(key.clone(), price);
            }
            this.full.insert(key, price);
        }
        Ok(this)
    }
}

/// Daily mean over the nominal number of slots, missing when the sum is zero.
#[must_use]
pub fn average(prices: &BTreeMap<String, f64>, granularity: Granularity) -> Option<f64> {
    let sum: f64 = prices.values().sum();
    if sum == 0.0 { None } else { Some(sum / f64::from(granularity.n_slots())) }
}

/// Slot keys ordered by ascending price.
#[must_use]
#[derive(Clone, Debug)]
pub struct Ranking(pub Vec<(String, f64)>);

impl Ranking {
    pub fn new(prices: &BTreeMap<String, f64>) -> Self {
        let mut entries: Vec<_> = prices.iter().map(|(key, price)| (key.clone(), *price)).collect();
        entries.sort_by(compare_by_price);
        Self(entries)
    }

    /// Compact list of slot starts in the same order.
    #[must_use]
    pub fn short(&self, granularity: Granularity) -> Vec<ShortKey> {
        self.0
            .iter()
            .filter_map(|(key, _)| ShortKey::new(key, granularity))
            .collect()
    }
}

/// Start hour for hourly slots, `HH:MM` for quarter-hourly ones.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ShortKey {
    Hour(u32),
    Slot(String),
}

impl ShortKey {
    fn new(key: &str, granularity: Granularity) -> Option<Self> {
        match granularity {
            Granularity::Hourly => key.get(..2)?.parse().ok().map(Self::Hour),
            Granularity::QuarterHourly => key.get(..5).map(|slot| Self::Slot(slot.to_string())),
        }
    }
}
