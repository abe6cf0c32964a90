//! [aWATTar](https://www.awattar.at/services/api) hourly market data.

use chrono::{DateTime, Local, TimeDelta, Utc};
use reqwest::Url;
use serde::Deserialize;
use serde_with::serde_as;

use crate::{
    api::transport::Transport,
    core::{
        calendar::{add_days, truncate_to_midnight},
        settings::Country,
    },
    prelude::*,
};

pub struct Api {
    transport: Transport,
    base_url: Url,
}

impl Api {
    /// Austria has its own host, every other market is served from the German one.
    pub fn try_new(transport: Transport, country: &Country) -> Result<Self> {
        let base_url = if country.code() == "at" {
            "https://api.awattar.at/"
        } else {
            "https://api.awattar.de/"
        };
        Ok(Self::with_base_url(transport, Url::parse(base_url)?))
    }

    pub const fn with_base_url(transport: Transport, base_url: Url) -> Self {
        Self { transport, base_url }
    }

    #[instrument(skip_all, fields(day = %day.date_naive()))]
    pub async fn get_market_data(&self, day: &DateTime<Local>) -> Result<Option<Vec<MarketPrice>>> {
        let (start, end) = query_bounds(day);
        let mut url = self.base_url.join("v1/marketdata")?;
        url.query_pairs_mut()
            .append_pair("start", &start.to_string())
            .append_pair("end", &end.to_string());
        let response: Option<MarketData> = self.transport.get_json(url, "awattar").await?;
        Ok(response.map(|response| response.data).filter(|data| !data.is_empty()))
    }
}

/// Epoch milliseconds from the local midnight to 2 seconds after the last second of the day.
fn query_bounds(day: &DateTime<Local>) -> (i64, i64) {
    let start = truncate_to_midnight(day);
    let end = add_days(day, 1) - TimeDelta::seconds(1) + TimeDelta::milliseconds(2000);
    (start.timestamp_millis(), end.timestamp_millis())
}

#[derive(Deserialize)]
struct MarketData {
    data: Vec<MarketPrice>,
}

#[serde_as]
#[derive(Copy, Clone, Debug, Deserialize)]
pub struct MarketPrice {
    #[serde_as(as = "serde_with::TimestampMilliSeconds<i64>")]
    pub start_timestamp: DateTime<Utc>,

    #[serde_as(as = "serde_with::TimestampMilliSeconds<i64>")]
    pub end_timestamp: DateTime<Utc>,

    /// €/MWh.
    #[serde(rename = "marketprice")]
    pub market_price: f64,
}

#[cfg(test)]
mod tests {
    use approx::assert_abs_diff_eq;
    use chrono::TimeZone;
    use mockito::{Matcher, Server};

    use super::*;

    #[tokio::test]
    async fn test_get_market_data() -> Result {
        // language=json
        let body = r#"{
            "object": "list",
            "data": [
                {"start_timestamp": 1760738400000, "end_timestamp": 1760742000000, "marketprice": 95.12, "unit": "Eur/MWh"},
                {"start_timestamp": 1760742000000, "end_timestamp": 1760745600000, "marketprice": -1.5, "unit": "Eur/MWh"}
            ],
            "url": "/at/v1/marketdata"
        }"#;
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/v1/marketdata")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;
        let api = Api::with_base_url(Transport::builder().build(), format!("{}/", server.url()).parse()?);
        let day = Local.with_ymd_and_hms(2025, 10, 18, 0, 0, 0).unwrap();

        let prices = api.get_market_data(&day).await?.unwrap();

        assert_eq!(prices.len(), 2);
        assert_eq!(prices[0].start_timestamp.timestamp_millis(), 1_760_738_400_000);
        assert_abs_diff_eq!(prices[1].market_price, -1.5);
        mock.assert_async().await;
        Ok(())
    }

    #[test]
    fn test_query_bounds_include_the_slack() {
        let day = Local.with_ymd_and_hms(2025, 10, 18, 13, 0, 0).unwrap();
        let (start, end) = query_bounds(&day);
        assert_eq!(start, truncate_to_midnight(&day).timestamp_millis());
        assert_eq!(end - add_days(&day, 1).timestamp_millis(), 1000);
    }

    #[tokio::test]
    async fn test_empty_data_is_absent() -> Result {
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/v1/marketdata")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"object": "list", "data": []}"#)
            .create_async()
            .await;
        let api = Api::with_base_url(Transport::builder().build(), format!("{}/", server.url()).parse()?);
        assert!(api.get_market_data(&Local::now()).await?.is_none());
        Ok(())
    }

    #[tokio::test]
    #[ignore = "makes the API request"]
    async fn test_get_market_data_live() -> Result {
        let api = Api::try_new(Transport::builder().build(), &Country::from("at"))?;
        let prices = api.get_market_data(&Local::now()).await?;
        assert!(prices.is_some_and(|prices| prices.len() >= 23));
        Ok(())
    }
}
