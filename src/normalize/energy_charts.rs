use chrono::{DateTime, TimeZone, Timelike};

use crate::{
    api::energy_charts::Prices,
    core::{
        calendar::{pad, quarter_slot_label},
        granularity::Granularity,
        point::{DaySeries, PricePoint},
    },
    normalize::average_hourly,
    prelude::*,
};

/// Prices of the local day starting at `day_start`, in the requested granularity.
pub fn normalize<Tz: TimeZone>(
    prices: &Prices,
    day_start: &DateTime<Tz>,
    granularity: Granularity,
) -> Option<DaySeries> {
    let timezone = day_start.timezone();
    let date = day_start.date_naive();
    let slots: Vec<(DateTime<Tz>, f64)> = prices
        .unix_seconds
        .iter()
        .zip(&prices.price)
        .filter_map(|(seconds, price)| {
            let start = DateTime::from_timestamp(*seconds, 0)?.with_timezone(&timezone);
            Some((start, (*price)?))
        })
        .filter(|(start, _)| start.date_naive() == date)
        .collect();
    if slots.is_empty() {
        return None;
    }

    let quarter_index = |start: &DateTime<Tz>| start.hour() * 4 + start.minute() / 15;
    match (Granularity::detect(slots.len()), granularity) {
        (Granularity::Hourly, Granularity::Hourly) => {
            Some(slots.iter().map(|(start, price)| PricePoint::hourly(start.hour() + 1, *price)).collect())
        }
        (Granularity::QuarterHourly, Granularity::QuarterHourly) => Some(
            slots
                .iter()
                .map(|(start, price)| {
                    let index = quarter_index(start);
                    PricePoint::quarter_hourly(format!("Q{}", pad(index + 1, 2)), quarter_slot_label(index), *price)
                })
                .collect(),
        ),
        (Granularity::QuarterHourly, Granularity::Hourly) => {
            Some(average_hourly(slots.iter().map(|(start, price)| (quarter_index(start), *price))))
        }
        (Granularity::Hourly, Granularity::QuarterHourly) => {
            debug!("hourly data cannot serve a quarter-hourly request");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn day_start() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 10, 18, 0, 0, 0).unwrap()
    }

    fn prices(step: i64, count: i64) -> Prices {
        let start = day_start().timestamp() - step;
        Prices {
            unix_seconds: (0..=count).map(|index| start + index * step).collect(),
            price: (0..=count).map(|index| Some(index as f64)).collect(),
        }
    }

    #[test]
    fn test_hourly() {
        let series = normalize(&prices(3600, 24), &day_start(), Granularity::Hourly).unwrap();
        assert_eq!(series.len(), 24);
        assert_eq!(series[0], PricePoint::hourly(1, 1.0));
    }

    #[test]
    fn test_quarter_hourly() {
        let series = normalize(&prices(900, 96), &day_start(), Granularity::QuarterHourly).unwrap();
        assert_eq!(series.len(), 96);
        assert_eq!(series[29].product, "Q30");
        assert_eq!(series[29].id.as_deref(), Some("07:15-07:30"));
    }

    #[test]
    fn test_missing_prices_are_skipped() {
        let prices = Prices { unix_seconds: vec![day_start().timestamp()], price: vec![None] };
        assert!(normalize(&prices, &day_start(), Granularity::Hourly).is_none());
    }
}
