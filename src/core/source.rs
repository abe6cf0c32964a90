use std::fmt::{Display, Formatter};

/// Upstream that ended up providing a day series.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq, clap::ValueEnum)]
pub enum Source {
    /// Exaa market-coupling auction, hourly and quarter-hourly.
    ExaaMarketCoupling,

    /// Exaa 10:15 auction, a forecast for tomorrow.
    Exaa1015,

    Awattar,

    /// Entsoe transparency platform, main auction.
    Entsoe,

    /// Entsoe transparency platform, early auction.
    Entsoe1015,

    /// Scraped from the Epex Spot market results page.
    Epex,

    EnergyCharts,
}

impl Source {
    /// Name published as the data provenance.
    pub const fn name(self) -> &'static str {
        match self {
            Self::ExaaMarketCoupling => "exaaMC",
            Self::Exaa1015 => "exaa1015",
            Self::Awattar => "awattar",
            Self::Entsoe => "entsoe",
            Self::Entsoe1015 => "entsoe1015",
            Self::Epex => "epex",
            Self::EnergyCharts => "energyCharts",
        }
    }

    /// Early auctions are only an estimate of the final prices.
    pub const fn is_forecast(self) -> bool {
        matches!(self, Self::Exaa1015 | Self::Entsoe1015)
    }
}

impl Display for Source {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Provenance value of a possibly empty selection.
#[must_use]
pub fn provenance(source: Option<Source>) -> &'static str {
    source.map_or("", Source::name)
}
