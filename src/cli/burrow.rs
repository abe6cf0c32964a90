use chrono::Local;
use clap::{Parser, Subcommand};

use crate::{
    api::{peak_hours, sources::Sources},
    cli::{market::MarketArgs, transport::TransportArgs},
    core::{chain::Orchestrator, day::Day, granularity::Granularity, peak::PeakHours, source::Source},
    prelude::*,
    tables::{build_peak_hours_table, build_prices_table},
};

#[derive(Parser)]
pub struct BurrowArgs {
    #[command(subcommand)]
    command: BurrowCommand,
}

impl BurrowArgs {
    pub async fn run(self) -> Result {
        match self.command {
            BurrowCommand::Prices(args) => args.run().await,
            BurrowCommand::PeakHours(args) => args.run().await,
        }
    }
}

#[derive(Subcommand)]
enum BurrowCommand {
    /// Fetch the prices from a single source, without publishing them.
    Prices(Box<BurrowPricesArgs>),

    /// Fetch the grid peak hours, without publishing them.
    PeakHours(BurrowPeakHoursArgs),
}

#[derive(Parser)]
struct BurrowPricesArgs {
    #[clap(long, value_enum)]
    source: Source,

    #[clap(long, value_enum, default_value = "today")]
    day: Day,

    #[clap(long, value_enum, default_value = "hourly")]
    granularity: Granularity,

    #[clap(flatten)]
    market: MarketArgs,

    #[clap(flatten)]
    transport: TransportArgs,
}

impl BurrowPricesArgs {
    #[instrument(skip_all, fields(source = %self.source, day = ?self.day, granularity = %self.granularity))]
    async fn run(self) -> Result {
        let settings = self.market.settings(self.transport.transient_retry_pause.into());
        let sources = Sources::try_new(&self.transport.transport()?, &settings)?;
        let day_start = self.day.start(&Local::now());
        let series = Orchestrator::new(&sources, &settings)
            .attempt(self.source, self.granularity, &day_start)
            .await?
            .unwrap_or_default();
        info!(n_points = series.len(), "fetched");
        println!("{}", build_prices_table(&series, self.granularity, &settings)?);
        Ok(())
    }
}

#[derive(Parser)]
struct BurrowPeakHoursArgs {
    #[clap(flatten)]
    transport: TransportArgs,
}

impl BurrowPeakHoursArgs {
    #[instrument(skip_all)]
    async fn run(self) -> Result {
        let status = peak_hours::Api::try_new(self.transport.transport()?)?
            .get_status()
            .await?
            .context("the peak-hour service is unavailable")?;
        let peak_hours = PeakHours::try_new(&status, &Local::now())?;
        println!("{}", build_peak_hours_table(&peak_hours));
        Ok(())
    }
}
