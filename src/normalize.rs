//! Provider payloads into the common day series.

pub mod awattar;
pub mod energy_charts;
pub mod entsoe;
pub mod epex;
pub mod exaa;

use itertools::Itertools;

use crate::core::point::{DaySeries, PricePoint};

/// Mean price of every hour, from `(zero-based quarter slot, price)` pairs.
pub fn average_hourly(quarters: impl IntoIterator<Item = (u32, f64)>) -> DaySeries {
    quarters
        .into_iter()
        .chunk_by(|(slot, _)| slot / 4)
        .into_iter()
        .map(|(hour, prices)| {
            let (sum, count) = prices.fold((0.0, 0_u32), |(sum, count), (_, price)| (sum + price, count + 1));
            PricePoint::hourly(hour + 1, sum / f64::from(count))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;

    use super::*;

    #[test]
    fn test_average_hourly() {
        let series = average_hourly([(0, 1.0), (1, 2.0), (2, 3.0), (3, 4.0), (4, 10.0), (7, 20.0)]);
        assert_eq!(series.len(), 2);
        assert_eq!(series[0].product, "H01");
        assert_abs_diff_eq!(series[0].price.unwrap(), 2.5);
        assert_eq!(series[1].product, "H02");
        assert_abs_diff_eq!(series[1].price.unwrap(), 15.0);
    }
}
