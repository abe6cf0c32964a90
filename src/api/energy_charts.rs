//! [Energy-Charts](https://api.energy-charts.info) day-ahead prices.

use chrono::{DateTime, Local};
use reqwest::Url;
use serde::Deserialize;

use crate::{api::transport::Transport, core::settings::Country, prelude::*};

pub struct Api {
    transport: Transport,
    base_url: Url,
}

impl Api {
    pub fn try_new(transport: Transport) -> Result<Self> {
        Ok(Self::with_base_url(transport, Url::parse("https://api.energy-charts.info/")?))
    }

    pub const fn with_base_url(transport: Transport, base_url: Url) -> Self {
        Self { transport, base_url }
    }

    #[instrument(skip_all, fields(day = %day.date_naive(), country = %country))]
    pub async fn get_prices(&self, day: &DateTime<Local>, country: &Country) -> Result<Option<Prices>> {
        let mut url = self.base_url.join("price")?;
        url.query_pairs_mut()
            .append_pair("bzn", &country.bidding_zone())
            .append_pair("start", &day.format("%Y-%m-%d").to_string());
        self.transport.get_json(url, "energy charts").await
    }
}

/// Parallel arrays of slot starts and prices.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct Prices {
    #[serde(default)]
    pub unix_seconds: Vec<i64>,

    /// €/MWh.
    #[serde(default)]
    pub price: Vec<Option<f64>>,
}
