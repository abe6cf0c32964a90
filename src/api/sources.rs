use async_trait::async_trait;
use chrono::{DateTime, Local};

use crate::{
    api::{awattar, energy_charts, entsoe, epex, exaa, transport::Transport},
    core::{
        granularity::Granularity,
        point::DaySeries,
        settings::{Country, Settings},
        sources::{Auction, EpexDay, ExaaDay, MarketSources},
    },
    normalize,
    prelude::*,
};

/// The live upstreams of one market.
pub struct Sources {
    country: Country,
    awattar: awattar::Api,
    exaa: exaa::Api,
    epex: epex::Api,
    entsoe: entsoe::Api,
    energy_charts: energy_charts::Api,
}

impl Sources {
    pub fn try_new(transport: &Transport, settings: &Settings) -> Result<Self> {
        Ok(Self {
            country: settings.country.clone(),
            awattar: awattar::Api::try_new(transport.clone(), &settings.country)?,
            exaa: exaa::Api::try_new(transport.clone())?,
            epex: epex::Api::try_new(transport.clone())?,
            entsoe: entsoe::Api::try_new(transport.clone(), settings.entsoe_token.clone())?,
            energy_charts: energy_charts::Api::try_new(transport.clone())?,
        })
    }
}

#[async_trait]
impl MarketSources for Sources {
    async fn exaa_market_coupling(&self, day: &DateTime<Local>) -> Result<Option<ExaaDay>> {
        let results = self.exaa.get_market_coupling(day, &self.country).await?;
        Ok(results.map(normalize::exaa::normalize_market_coupling))
    }

    async fn exaa_1015(&self, day: &DateTime<Local>) -> Result<Option<DaySeries>> {
        let prices = self.exaa.get_1015_auction(day, &self.country).await?;
        Ok(prices.map(|prices| normalize::exaa::normalize_auction(&prices)))
    }

    async fn awattar(&self, day: &DateTime<Local>) -> Result<Option<DaySeries>> {
        let prices = self.awattar.get_market_data(day).await?;
        Ok(prices.map(|prices| normalize::awattar::normalize(&prices, &Local)))
    }

    async fn entsoe(
        &self,
        day: &DateTime<Local>,
        auction: Auction,
        granularity: Granularity,
    ) -> Result<Option<DaySeries>> {
        let Some(document) = self.entsoe.get_day_ahead_prices(day, &self.country).await? else {
            return Ok(None);
        };
        normalize::entsoe::normalize(&document, auction, granularity)
    }

    async fn epex(&self, day: &DateTime<Local>) -> Result<Option<EpexDay>> {
        let Some(html) = self.epex.get_results_page(day, &self.country).await? else {
            return Ok(None);
        };
        normalize::epex::normalize(&html).map(Some)
    }

    async fn energy_charts(
        &self,
        day: &DateTime<Local>,
        granularity: Granularity,
    ) -> Result<Option<DaySeries>> {
        let prices = self.energy_charts.get_prices(day, &self.country).await?;
        Ok(prices.and_then(|prices| normalize::energy_charts::normalize(&prices, day, granularity)))
    }
}
