//! Entsoe publication documents, as converted by [`crate::api::xml`].

use std::collections::BTreeMap;

use serde_json::Value;

use crate::{
    core::{
        calendar::{pad, quarter_slot_label},
        granularity::Granularity,
        point::{DaySeries, PricePoint},
        sources::Auction,
    },
    normalize::average_hourly,
    prelude::*,
};

type Accessor = fn(&Value) -> Option<&Value>;

/// Known nestings of the point list, tried in order.
static POINT_ACCESSORS: [(&str, Accessor); 4] = [
    ("[0].Period[0].Point", |series| series.get(0)?.get("Period")?.get(0)?.get("Point")),
    ("[0].Period.Point", |series| series.get(0)?.get("Period")?.get("Point")),
    (".Period[0].Point", |series| series.get("Period")?.get(0)?.get("Point")),
    (".Period.Point", |series| series.get("Period")?.get("Point")),
];

/// Series of the auction in the requested granularity.
///
/// Quarter-hourly data is averaged for an hourly request, hourly data cannot serve a quarter-hourly one.
pub fn normalize(document: &Value, auction: Auction, granularity: Granularity) -> Result<Option<DaySeries>> {
    let Some(time_series) = document.get("TimeSeries") else {
        debug!("the document has no time series");
        return Ok(None);
    };
    let selected = match time_series {
        Value::Array(all) => {
            let matching: Vec<Value> = all
                .iter()
                .filter(|series| classification_position(series) == auction.classification_position())
                .cloned()
                .collect();
            if matching.is_empty() {
                debug!(?auction, "no time series for the auction");
                return Ok(None);
            }
            Value::Array(matching)
        }
        single => single.clone(),
    };

    let Some((shape, points)) =
        POINT_ACCESSORS.iter().find_map(|(shape, accessor)| Some((*shape, accessor(&selected)?)))
    else {
        error!(document = %document, "unknown time series shape");
        bail!("none of the known Entsoe time series shapes matches the document");
    };
    debug!(shape, "matched the time series shape");

    let points = match points {
        Value::Array(points) => points.iter().map(parse_point).collect::<Result<Vec<_>>>()?,
        point => vec![parse_point(point)?],
    };
    let filled = gap_fill(points);

    match (Granularity::detect(filled.len()), granularity) {
        (Granularity::Hourly, Granularity::Hourly) => Ok(Some(
            filled.into_iter().map(|(position, price)| PricePoint::hourly(position, price)).collect(),
        )),
        (Granularity::QuarterHourly, Granularity::QuarterHourly) => Ok(Some(
            filled
                .into_iter()
                .map(|(position, price)| {
                    PricePoint::quarter_hourly(
                        format!("Q{}", pad(position, 2)),
                        quarter_slot_label(position.saturating_sub(1)),
                        price,
                    )
                })
                .collect(),
        )),
        (Granularity::QuarterHourly, Granularity::Hourly) => Ok(Some(average_hourly(
            filled.into_iter().map(|(position, price)| (position.saturating_sub(1), price)),
        ))),
        (Granularity::Hourly, Granularity::QuarterHourly) => {
            debug!("hourly data cannot serve a quarter-hourly request");
            Ok(None)
        }
    }
}

/// A series without a classification sequence is the main auction.
fn classification_position(series: &Value) -> &str {
    series
        .get("classificationSequence_AttributeInstanceComponent")
        .and_then(|component| component.get("position"))
        .and_then(|position| position.get("_text"))
        .and_then(Value::as_str)
        .unwrap_or("1")
}

fn parse_point(point: &Value) -> Result<(u32, Option<f64>)> {
    let position = point
        .get("position")
        .and_then(|position| position.get("_text"))
        .and_then(Value::as_str)
        .context("a time series point has no position")?
        .trim()
        .parse()
        .context("invalid time series point position")?;
    let price = point
        .get("price_amount")
        .and_then(|price| price.get("_text"))
        .and_then(Value::as_str)
        .and_then(|price| price.trim().parse().ok());
    Ok((position, price))
}

/// Walk from the first to the last position, carrying the last known price into the gaps.
///
/// Entsoe omits a point whose price equals the previous one.
pub fn gap_fill(points: Vec<(u32, Option<f64>)>) -> Vec<(u32, f64)> {
    let known: BTreeMap<u32, Option<f64>> = points.into_iter().collect();
    let (Some(first), Some(last)) = (known.keys().next().copied(), known.keys().next_back().copied()) else {
        return Vec::new();
    };
    let mut last_price = None;
    let mut filled = Vec::new();
    for position in first..=last {
        if let Some(Some(price)) = known.get(&position) {
            last_price = Some(*price);
        }
        match last_price {
            Some(price) => filled.push((position, price)),
            None => warn!(position, "dropping the position without a known price"),
        }
    }
    filled
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use serde_json::json;

    use super::*;

    fn point(position: u32, price: f64) -> Value {
        json!({"position": {"_text": position.to_string()}, "price_amount": {"_text": price.to_string()}})
    }

    #[test]
    fn test_gap_fill() {
        let filled = gap_fill(vec![(5, Some(9.0)), (1, Some(10.0)), (2, Some(12.0))]);
        assert_eq!(filled, [(1, 10.0), (2, 12.0), (3, 12.0), (4, 12.0), (5, 9.0)]);
    }

    #[test]
    fn test_gap_fill_drops_leading_unknown() {
        let filled = gap_fill(vec![(1, None), (3, Some(7.0))]);
        assert_eq!(filled, [(3, 7.0)]);
        assert!(gap_fill(Vec::new()).is_empty());
    }

    #[test]
    fn test_single_series() -> Result {
        let document = json!({
            "TimeSeries": {
                "Period": {"Point": [point(1, 10.0), point(2, 12.0), point(5, 9.0)]}
            }
        });
        let series = normalize(&document, Auction::Main, Granularity::Hourly)?.unwrap();
        let prices: Vec<_> = series.iter().map(|point| point.price.unwrap()).collect();
        assert_eq!(prices, [10.0, 12.0, 12.0, 12.0, 9.0]);
        assert_eq!(series[4].product, "H05");
        Ok(())
    }

    #[test]
    fn test_selects_the_auction() -> Result {
        let document = json!({
            "TimeSeries": [
                {
                    "classificationSequence_AttributeInstanceComponent": {"position": {"_text": "1"}},
                    "Period": [{"Point": [point(1, 10.0)]}]
                },
                {
                    "classificationSequence_AttributeInstanceComponent": {"position": {"_text": "2"}},
                    "Period": [{"Point": [point(1, 20.0)]}]
                }
            ]
        });
        let main = normalize(&document, Auction::Main, Granularity::Hourly)?.unwrap();
        assert_abs_diff_eq!(main[0].price.unwrap(), 10.0);
        let early = normalize(&document, Auction::Early, Granularity::Hourly)?.unwrap();
        assert_abs_diff_eq!(early[0].price.unwrap(), 20.0);
        Ok(())
    }

    #[test]
    fn test_array_with_a_single_period() -> Result {
        let document = json!({
            "TimeSeries": [{"Period": {"Point": [point(1, 10.0), point(3, 8.0)]}}]
        });
        let series = normalize(&document, Auction::Main, Granularity::Hourly)?.unwrap();
        let prices: Vec<_> = series.iter().map(|point| point.price.unwrap()).collect();
        assert_eq!(prices, [10.0, 10.0, 8.0]);
        Ok(())
    }

    #[test]
    fn test_single_series_with_periods() -> Result {
        let document = json!({
            "TimeSeries": {
                "Period": [{"Point": [point(1, 30.0)]}, {"Point": [point(1, 40.0)]}]
            }
        });
        let series = normalize(&document, Auction::Main, Granularity::Hourly)?.unwrap();
        assert_eq!(series.len(), 1);
        assert_abs_diff_eq!(series[0].price.unwrap(), 30.0);
        Ok(())
    }

    #[test]
    fn test_quarter_hourly() -> Result {
        let points: Vec<_> = (1..=96).map(|position| point(position, f64::from(position))).collect();
        let document = json!({"TimeSeries": {"Period": {"Point": points}}});

        let quarters = normalize(&document, Auction::Main, Granularity::QuarterHourly)?.unwrap();
        assert_eq!(quarters.len(), 96);
        assert_eq!(quarters[29].product, "Q30");
        assert_eq!(quarters[29].id.as_deref(), Some("07:15-07:30"));

        let hours = normalize(&document, Auction::Main, Granularity::Hourly)?.unwrap();
        assert_eq!(hours.len(), 24);
        assert_eq!(hours[0].product, "H01");
        assert_abs_diff_eq!(hours[0].price.unwrap(), 2.5);
        Ok(())
    }

    #[test]
    fn test_hourly_data_cannot_serve_quarter_hours() -> Result {
        let document = json!({"TimeSeries": {"Period": {"Point": [point(1, 10.0)]}}});
        assert!(normalize(&document, Auction::Main, Granularity::QuarterHourly)?.is_none());
        Ok(())
    }

    #[test]
    fn test_unknown_shape_fails() {
        let document = json!({"TimeSeries": {"Interval": {"Point": [point(1, 10.0)]}}});
        assert!(normalize(&document, Auction::Main, Granularity::Hourly).is_err());
    }
}
