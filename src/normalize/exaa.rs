use crate::{
    api::exaa::{AuctionPrice, MarketCouplingResults},
    core::{
        point::{DaySeries, PricePoint, extract_time_range},
        sources::ExaaDay,
    },
    prelude::*,
};

pub fn normalize_market_coupling(results: MarketCouplingResults) -> ExaaDay {
    ExaaDay { hourly: normalize_products(results.h), quarter_hourly: normalize_products(results.q) }
}

/// Quarter-hourly products are recognized by their `q…` text and keyed by their time range.
fn normalize_products(points: Vec<PricePoint>) -> DaySeries {
    let is_quarter_hourly = points.iter().any(|point| {
        point.product_text.as_deref().is_some_and(|text| text.trim_start().starts_with(['q', 'Q']))
    });
    if !is_quarter_hourly {
        return points;
    }
    points
        .into_iter()
        .filter_map(|mut point| {
            let Some(id) = point.product_text.as_deref().and_then(extract_time_range) else {
                warn!(product = point.product, "dropping the quarter-hourly product without a time range");
                return None;
            };
            point.id = Some(id);
            Some(point)
        })
        .collect()
}

pub fn normalize_auction(prices: &[AuctionPrice]) -> DaySeries {
    prices.iter().map(|price| PricePoint::hourly(price.x, price.y)).collect()
}
