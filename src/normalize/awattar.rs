use chrono::{TimeZone, Timelike};

use crate::{
    api::awattar::MarketPrice,
    core::point::{DaySeries, PricePoint},
};

/// `H` products from the local start hour, prices stay in €/MWh.
pub fn normalize<Tz: TimeZone>(prices: &[MarketPrice], timezone: &Tz) -> DaySeries {
    prices
        .iter()
        .map(|price| {
            let hour = price.start_timestamp.with_timezone(timezone).hour();
            PricePoint::hourly(hour + 1, price.market_price)
        })
        .collect()
}
