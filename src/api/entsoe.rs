//! [ENTSO-E transparency platform](https://transparency.entsoe.eu) day-ahead prices.

use chrono::{DateTime, Local, TimeDelta, Utc};
use reqwest::Url;
use serde::Serialize;
use serde_json::Value;

use crate::{
    api::{transport::Transport, xml},
    core::{calendar::add_days, settings::Country},
    prelude::*,
};

pub struct Api {
    transport: Transport,
    base_url: Url,
    security_token: Option<String>,
}

impl Api {
    pub fn try_new(transport: Transport, security_token: Option<String>) -> Result<Self> {
        Ok(Self::with_base_url(transport, Url::parse("https://web-api.tp.entsoe.eu/api")?, security_token))
    }

    pub const fn with_base_url(transport: Transport, base_url: Url, security_token: Option<String>) -> Self {
        Self { transport, base_url, security_token }
    }

    /// `Publication_MarketDocument` of the day, converted into the compact JSON tree.
    #[instrument(skip_all, fields(day = %day.date_naive(), country = %country))]
    pub async fn get_day_ahead_prices(&self, day: &DateTime<Local>, country: &Country) -> Result<Option<Value>> {
        let security_token = self.security_token.as_deref().context("no Entsoe security token configured")?;
        let domain = country.eic_domain().unwrap_or_else(|| {
            error!(%country, "the country has no Entsoe domain");
            ""
        });
        let query = Query {
            document_type: "A44",
            security_token,
            period_start: format_period(day),
            period_end: format_period(&(add_days(day, 1) - TimeDelta::seconds(1))),
            in_domain: domain,
            out_domain: domain,
        };
        let mut url = self.base_url.clone();
        url.set_query(Some(&serde_qs::to_string(&query)?));

        let Some(fetched) = self.transport.fetch(self.transport.client().get(url), "entsoe").await? else {
            return Ok(None);
        };
        let document = xml::to_json(&fetched.body.replace("price.amount", "price_amount"))?;
        Ok(document.get("Publication_MarketDocument").cloned())
    }
}

/// `yyyyMMddHHmm` in UTC.
fn format_period(time: &DateTime<Local>) -> String {
    time.with_timezone(&Utc).format("%Y%m%d%H%M").to_string()
}

#[derive(Serialize)]
struct Query<'a> {
    #[serde(rename = "documentType")]
    document_type: &'a str,

    #[serde(rename = "securityToken")]
    security_token: &'a str,

    #[serde(rename = "periodStart")]
    period_start: String,

    #[serde(rename = "periodEnd")]
    period_end: String,

    #[serde(rename = "in_Domain")]
    in_domain: &'a str,

    #[serde(rename = "out_Domain")]
    out_domain: &'a str,
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use mockito::{Matcher, Server};

    use super::*;

    #[tokio::test]
    async fn test_get_day_ahead_prices() -> Result {
        // language=xml
        let body = r#"<?xml version="1.0" encoding="UTF-8"?>
            <Publication_MarketDocument xmlns="urn:iec62325.351:tc57wg16:451-3:publicationdocument:7:3">
                <TimeSeries>
                    <Period>
                        <resolution>PT60M</resolution>
                        <Point><position>1</position><price.amount>10</price.amount></Point>
                    </Period>
                </TimeSeries>
            </Publication_MarketDocument>"#;
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/api")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("documentType".into(), "A44".into()),
                Matcher::UrlEncoded("securityToken".into(), "token".into()),
                Matcher::UrlEncoded("in_Domain".into(), "10YCH-SWISSGRIDZ".into()),
            ]))
            .with_status(200)
            .with_body(body)
            .create_async()
            .await;
        let api = Api::with_base_url(
            Transport::builder().build(),
            format!("{}/api", server.url()).parse()?,
            Some("token".to_string()),
        );
        let day = Local.with_ymd_and_hms(2026, 10, 18, 0, 0, 0).unwrap();

        let document = api.get_day_ahead_prices(&day, &Country::from("ch")).await?.unwrap();

        assert_eq!(document["TimeSeries"]["Period"]["Point"]["price_amount"]["_text"], "10");
        mock.assert_async().await;
        Ok(())
    }

    #[tokio::test]
    async fn test_missing_token_fails() {
        let api = Api::try_new(Transport::builder().build(), None).unwrap();
        assert!(api.get_day_ahead_prices(&Local::now(), &Country::from("ch")).await.is_err());
    }

    #[test]
    fn test_format_period() {
        let day = Local.with_ymd_and_hms(2026, 10, 18, 0, 0, 0).unwrap();
        let period = format_period(&day);
        assert_eq!(period.len(), 12);
        assert!(period.ends_with("00") || period.ends_with("30") || period.ends_with("45"));
    }
}
