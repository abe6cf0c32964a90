mod burrow;
mod costs;
mod market;
mod sentry;
mod store;
mod transport;
mod watch;

use std::process::ExitCode;

use clap::{Parser, Subcommand};

use crate::{
    cli::{burrow::BurrowArgs, sentry::SentryArgs, watch::WatchArgs},
    prelude::*,
};

#[derive(Parser)]
#[command(author, version, about, propagate_version = true)]
#[must_use]
pub struct Args {
    #[clap(flatten)]
    pub sentry: SentryArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Main command: fetch the peak hours and market prices, and publish them into the state.
    #[clap(name = "watch")]
    Watch(Box<WatchArgs>),

    /// Development tools.
    #[clap(name = "burrow")]
    Burrow(Box<BurrowArgs>),
}

impl Command {
    pub async fn run(self) -> Result<ExitCode> {
        match self {
            Self::Watch(args) => args.run().await,
            Self::Burrow(args) => {
                args.run().await?;
                Ok(ExitCode::SUCCESS)
            }
        }
    }
}
