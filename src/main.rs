#![allow(clippy::doc_markdown)]
#![doc = include_str!("../README.md")]

mod api;
mod cli;
mod core;
mod crash;
mod normalize;
mod pipeline;
mod prelude;
mod store;
mod tables;

use std::process::ExitCode;

use clap::{Parser, crate_version};

use crate::{cli::Args, prelude::*};

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt().without_time().compact().init();
    info!(version = crate_version!(), "starting…");

    let args = Args::parse();
    let _sentry_guard = args.sentry.init();
    let exit_code = args.command.run().await?;

    info!("done!");
    Ok(exit_code)
}
