use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::calendar::pad;

static TIME_RANGE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{2}:\d{2})\s*-\s*(\d{2}:\d{2})").unwrap());

/// One price slot in the shape every provider is normalized into.
#[must_use]
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PricePoint {
    /// `H07` for hourly slots, `Q29` or `Q08_1` for quarter-hourly ones.
    #[serde(rename = "Product")]
    pub product: String,

    #[serde(rename = "ProductText", default, skip_serializing_if = "Option::is_none")]
    pub product_text: Option<String>,

    /// Raw price in €/MWh.
    #[serde(rename = "Price", default)]
    pub price: Option<f64>,

    /// Stable `HH:MM-HH:MM` key of quarter-hourly slots.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl PricePoint {
    /// Hourly point, `hour` is one-based: `1` is the slot from midnight to 01:00.
    pub fn hourly(hour: u32, price: f64) -> Self {
        Self {
            product: format!("H{}", pad(hour, 2)),
            product_text: None,
            price: Some(price),
            id: None,
        }
    }

    /// Quarter-hourly point with its `HH:MM-HH:MM` range.
    pub fn quarter_hourly(product: String, range: String, price: f64) -> Self {
        Self { product, product_text: Some(range.clone()), price: Some(price), id: Some(range) }
    }
}

/// Points of one calendar day and one granularity, gaps are allowed.
pub type DaySeries = Vec<PricePoint>;

/// Extract the whitespace-free `HH:MM-HH:MM` range from a free-form slot text.
#[must_use]
pub fn extract_time_range(text: &str) -> Option<String> {
    TIME_RANGE.captures(text).map(|captures| format!("{}-{}", &captures[1], &captures[2]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hourly() {
        let point = PricePoint::hourly(7, 95.5);
        assert_eq!(point.product, "H07");
        assert_eq!(point.price, Some(95.5));
    }

    #[test]
    fn test_extract_time_range() {
        assert_eq!(extract_time_range("q 07:00 - 07:15").as_deref(), Some("07:00-07:15"));
        assert_eq!(extract_time_range("07:00-07:15").as_deref(), Some("07:00-07:15"));
        assert_eq!(extract_time_range("H07"), None);
    }

    #[test]
    fn test_deserialize_without_price() -> crate::prelude::Result {
        // language=json
        let point: PricePoint = serde_json::from_str(r#"{"Product": "H01", "Volume": 12.5}"#)?;
        assert_eq!(point.price, None);
        assert_eq!(point.product_text, None);
        Ok(())
    }
}
