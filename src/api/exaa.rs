//! [EXAA](https://www.exaa.at) auction results.

use chrono::{DateTime, Datelike, Local};
use reqwest::Url;
use serde::Deserialize;

use crate::{
    api::transport::Transport,
    core::{point::PricePoint, settings::Country},
    prelude::*,
};

pub struct Api {
    transport: Transport,
    base_url: Url,
}

impl Api {
    pub fn try_new(transport: Transport) -> Result<Self> {
        Ok(Self::with_base_url(transport, Url::parse("https://www.exaa.at/data/")?))
    }

    pub const fn with_base_url(transport: Transport, base_url: Url) -> Self {
        Self { transport, base_url }
    }

    /// Market-coupling auction, both granularities in one response.
    #[instrument(skip_all, fields(day = %day.date_naive(), country = %country))]
    pub async fn get_market_coupling(
        &self,
        day: &DateTime<Local>,
        country: &Country,
    ) -> Result<Option<MarketCouplingResults>> {
        let mut url = self.base_url.join("trading-results")?;
        url.query_pairs_mut()
            .append_pair("delivery_day", &delivery_day(day))
            .append_pair("market", &country.upper())
            .append_pair("auction", "market_coupling");
        let response: Option<Envelope<MarketCouplingResults>> =
            self.transport.get_json(url, "exaa market coupling").await?;
        Ok(response.and_then(|response| response.data))
    }

    /// 10:15 auction, hourly prices only.
    #[instrument(skip_all, fields(day = %day.date_naive(), country = %country))]
    pub async fn get_1015_auction(
        &self,
        day: &DateTime<Local>,
        country: &Country,
    ) -> Result<Option<Vec<AuctionPrice>>> {
        let mut url = self.base_url.join("market-results")?;
        url.query_pairs_mut()
            .append_pair("delivery_day", &delivery_day(day))
            .append_pair("market", &country.upper())
            .append_pair("auction", "1015");
        let response: Option<Envelope<AuctionResults>> =
            self.transport.get_json(url, "exaa 10:15").await?;
        let Some(results) = response.and_then(|response| response.data) else {
            return Ok(None);
        };
        // Only Austria is published separately, every other market reads the German prices.
        let market = if country.code() == "at" { results.at } else { results.de };
        Ok(market.and_then(|market| market.price))
    }
}

/// `2026-3-9`, no zero-padding.
fn delivery_day(day: &DateTime<Local>) -> String {
    format!("{}-{}-{}", day.year(), day.month(), day.day())
}

#[derive(Deserialize)]
struct Envelope<T> {
    data: Option<T>,
}

#[derive(Clone, Debug, Default, Deserialize)]
pub struct MarketCouplingResults {
    /// Hourly products.
    #[serde(default)]
    pub h: Vec<PricePoint>,

    /// Quarter-hourly products.
    #[serde(default)]
    pub q: Vec<PricePoint>,
}

#[derive(Deserialize)]
struct AuctionResults {
    #[serde(rename = "AT")]
    at: Option<MarketResults>,

    #[serde(rename = "DE")]
    de: Option<MarketResults>,
}

#[derive(Deserialize)]
struct MarketResults {
    price: Option<Vec<AuctionPrice>>,
}

#[derive(Copy, Clone, Debug, Deserialize)]
pub struct AuctionPrice {
    /// One-based hour of the day.
    pub x: u32,

    /// €/MWh.
    pub y: f64,
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use mockito::{Matcher, Server};

    use super::*;

    fn day() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 3, 9, 0, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn test_get_market_coupling() -> Result {
        // language=json
        let body = r#"{
            "data": {
                "h": [
                    {"Product": "H01", "Price": 95.5, "Volume": 1234.5},
                    {"Product": "H02", "Price": null}
                ],
                "q": [
                    {"Product": "Q01", "ProductText": "qh 00:00 - 00:15", "Price": 90.1}
                ]
            }
        }"#;
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/trading-results")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("delivery_day".into(), "2026-3-9".into()),
                Matcher::UrlEncoded("market".into(), "AT".into()),
                Matcher::UrlEncoded("auction".into(), "market_coupling".into()),
            ]))
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;
        let api = Api::with_base_url(Transport::builder().build(), format!("{}/", server.url()).parse()?);

        let results = api.get_market_coupling(&day(), &Country::from("at")).await?.unwrap();

        assert_eq!(results.h.len(), 2);
        assert_eq!(results.h[1].price, None);
        assert_eq!(results.q[0].product_text.as_deref(), Some("qh 00:00 - 00:15"));
        mock.assert_async().await;
        Ok(())
    }

    #[tokio::test]
    async fn test_get_1015_auction_reads_german_prices() -> Result {
        // language=json
        let body = r#"{
            "data": {
                "AT": {"price": [{"x": 1, "y": 10.0}]},
                "DE": {"price": [{"x": 1, "y": 20.0}, {"x": 2, "y": 21.0}]}
            }
        }"#;
        let mut server = Server::new_async().await;
        let _mock = server
            .mock("GET", "/market-results")
            .match_query(Matcher::UrlEncoded("auction".into(), "1015".into()))
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;
        let api = Api::with_base_url(Transport::builder().build(), format!("{}/", server.url()).parse()?);

        let prices = api.get_1015_auction(&day(), &Country::from("nl")).await?.unwrap();

        assert_eq!(prices.len(), 2);
        assert_eq!(prices[1].x, 2);
        Ok(())
    }

    #[tokio::test]
    #[ignore = "makes the API request"]
    async fn test_get_market_coupling_live() -> Result {
        let api = Api::try_new(Transport::builder().build())?;
        let results = api.get_market_coupling(&Local::now(), &Country::from("at")).await?;
        assert!(results.is_some_and(|results| !results.h.is_empty()));
        Ok(())
    }
}
