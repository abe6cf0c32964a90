use std::{process::ExitCode, time::Duration};

use chrono::{DateTime, Local};
use clap::Parser;
use enumset::EnumSet;
use serde_json::json;

use crate::{
    api::{peak_hours, sources::Sources, transport::Transport},
    cli::{market::MarketArgs, store::StoreArgs, transport::TransportArgs},
    core::{granularity::Granularity, settings::Settings},
    crash,
    pipeline::{market, peak},
    prelude::*,
    store::{JsonStore, StateStore},
};

#[derive(Parser)]
pub struct WatchArgs {
    /// Collect the grid peak hours.
    #[clap(long, env = "PEAK_HOURS", default_value = "true", action = clap::ArgAction::Set)]
    peak_hours: bool,

    /// Collect the day-ahead market prices.
    #[clap(long, env = "MARKET_PRICES", default_value = "true", action = clap::ArgAction::Set)]
    market_prices: bool,

    /// Sleep a random duration up to this one before the first request.
    #[clap(long, env = "MAX_START_DELAY", default_value = "30s")]
    max_start_delay: humantime::Duration,

    #[clap(flatten)]
    market: MarketArgs,

    #[clap(flatten)]
    transport: TransportArgs,

    #[clap(flatten)]
    store: StoreArgs,
}

impl WatchArgs {
    pub async fn run(self) -> Result<ExitCode> {
        let started_at = Local::now();
        let settings = self.market.settings(self.transport.transient_retry_pause.into());
        crash::tag_market(&settings.country);
        let transport = self.transport.transport()?;
        let store = self.store.open()?;

        let delay = random_delay(self.max_start_delay.into());
        info!(?delay, "sleeping before the first request…");
        tokio::time::sleep(delay).await;

        let now = Local::now();
        let (peak_result, market_result) = tokio::join!(
            self.watch_peak_hours(&transport, &store, &now),
            self.watch_market_prices(&transport, &store, &settings, &now),
        );
        store.write("info.lastStart", json!(started_at.timestamp_millis())).await?;
        store.flush()?;

        let mut exit_code = ExitCode::SUCCESS;
        for (pipeline, result) in [("peak hours", peak_result), ("market prices", market_result)] {
            if let Err(error) = result {
                error!(pipeline, "failed: {error:#}");
                crash::report(&error);
                exit_code = ExitCode::FAILURE;
            }
        }
        Ok(exit_code)
    }

    async fn watch_peak_hours(&self, transport: &Transport, store: &JsonStore, now: &DateTime<Local>) -> Result {
        if !self.peak_hours {
            info!("peak hours are disabled");
            return store.delete(peak::NAMESPACE).await;
        }
        let api = peak_hours::Api::try_new(transport.clone())?;
        peak::run(&api, store, now).await
    }

    async fn watch_market_prices(
        &self,
        transport: &Transport,
        store: &JsonStore,
        settings: &Settings,
        now: &DateTime<Local>,
    ) -> Result {
        if !self.market_prices {
            info!("market prices are disabled");
            for granularity in EnumSet::<Granularity>::all() {
                store.delete(granularity.namespace()).await?;
            }
            return Ok(());
        }
        let sources = Sources::try_new(transport, settings)?;
        market::run(&sources, store, settings, now).await
    }
}

/// Uniformly random duration in `[0, max)`, spreading the load on the upstreams.
fn random_delay(max: Duration) -> Duration {
    if max.is_zero() { Duration::ZERO } else { rand::random_range(Duration::ZERO..max) }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_delay() {
        assert_eq!(random_delay(Duration::ZERO), Duration::ZERO);
        for _ in 0..100 {
            assert!(random_delay(Duration::from_secs(30)) < Duration::from_secs(30));
        }
    }

    #[test]
    fn test_toggles() {
        let args = WatchArgs::parse_from(["watch", "--peak-hours=false"]);
        assert!(!args.peak_hours);
        assert!(args.market_prices);
    }
}
