use std::time::Duration;

use clap::Parser;
use enumset::EnumSet;

use crate::{
    cli::costs::CostArgs,
    core::{
        granularity::Granularity,
        settings::{Country, Settings},
    },
};

#[derive(Parser)]
pub struct MarketArgs {
    /// Market country code.
    #[clap(long, env = "COUNTRY", default_value = "at")]
    country: Country,

    /// Prices strictly below the threshold are published as cheap, ct/kWh.
    #[clap(long, env = "THRESHOLD", default_value = "10")]
    threshold: f64,

    #[clap(
        long,
        env = "GRANULARITIES",
        value_delimiter = ',',
        num_args = 1..,
        default_value = "hourly,quarter-hourly",
    )]
    granularities: Vec<Granularity>,

    /// Fall back to the early auctions for tomorrow's hourly prices.
    #[clap(long, env = "FORECAST")]
    forecast: bool,

    /// Fall back to Energy Charts when the other sources have nothing.
    #[clap(long, env = "ENERGY_CHARTS")]
    energy_charts: bool,

    /// Entsoe transparency platform security token.
    #[clap(long, env = "ENTSOE_TOKEN")]
    entsoe_token: Option<String>,

    #[clap(flatten)]
    costs: CostArgs,
}

impl MarketArgs {
    pub fn settings(&self, transient_retry_pause: Duration) -> Settings {
        Settings::builder()
            .country(self.country.clone())
            .threshold(self.threshold)
            .granularities(self.granularities.iter().copied().collect::<EnumSet<_>>())
            .forecast(self.forecast)
            .energy_charts(self.energy_charts)
            .maybe_costs(self.costs.costs())
            .maybe_entsoe_token(self.entsoe_token.clone())
            .transient_retry_pause(transient_retry_pause)
            .build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = MarketArgs::parse_from(["market"]).settings(Duration::from_secs(180));
        assert_eq!(settings.country.code(), "at");
        assert_eq!(settings.granularities, EnumSet::all());
        assert!(settings.costs.is_none());
        assert!(!settings.forecast);
    }

    #[test]
    fn test_single_granularity() {
        let settings = MarketArgs::parse_from(["market", "--country=CH", "--granularities=quarter-hourly"])
            .settings(Duration::ZERO);
        assert!(settings.country.is_switzerland());
        assert_eq!(settings.granularities, EnumSet::only(Granularity::QuarterHourly));
    }
}
