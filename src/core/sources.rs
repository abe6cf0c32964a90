use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDate};

use crate::{
    core::{granularity::Granularity, point::DaySeries},
    prelude::*,
};

/// Both granularities of one Exaa market-coupling response.
#[must_use]
#[derive(Clone, Debug, Default)]
pub struct ExaaDay {
    pub hourly: DaySeries,
    pub quarter_hourly: DaySeries,
}

impl ExaaDay {
    #[must_use]
    pub fn get(&self, granularity: Granularity) -> &DaySeries {
        match granularity {
            Granularity::Hourly => &self.hourly,
            Granularity::QuarterHourly => &self.quarter_hourly,
        }
    }

    #[must_use]
    pub fn into_series(self, granularity: Granularity) -> DaySeries {
        match granularity {
            Granularity::Hourly => self.hourly,
            Granularity::QuarterHourly => self.quarter_hourly,
        }
    }
}

/// Scraped Epex results together with the delivery day the page claims to show.
#[must_use]
#[derive(Clone, Debug)]
pub struct EpexDay {
    pub delivery_date: NaiveDate,
    pub series: DaySeries,
}

/// Entsoe publishes the main auction as classification position 1 and the early one as 2.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Auction {
    Main,
    Early,
}

impl Auction {
    pub const fn classification_position(self) -> &'static str {
        match self {
            Self::Main => "1",
            Self::Early => "2",
        }
    }
}

/// Fetch and normalize a day of prices from each upstream.
///
/// `Ok(None)` means the source has nothing for the day, an error means the call itself failed.
#[async_trait]
pub trait MarketSources: Send + Sync {
    async fn exaa_market_coupling(&self, day: &DateTime<Local>) -> Result<Option<ExaaDay>>;

    async fn exaa_1015(&self, day: &DateTime<Local>) -> Result<Option<DaySeries>>;

    async fn awattar(&self, day: &DateTime<Local>) -> Result<Option<DaySeries>>;

    /// Series in the requested granularity, quarter-hourly data is averaged into hours if needed.
    async fn entsoe(
        &self,
        day: &DateTime<Local>,
        auction: Auction,
        granularity: Granularity,
    ) -> Result<Option<DaySeries>>;

    async fn epex(&self, day: &DateTime<Local>) -> Result<Option<EpexDay>>;

    async fn energy_charts(
        &self,
        day: &DateTime<Local>,
        granularity: Granularity,
    ) -> Result<Option<DaySeries>>;
}
