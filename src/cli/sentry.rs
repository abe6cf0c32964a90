use std::borrow::Cow;

use clap::{Parser, crate_name, crate_version};
use sentry::ClientInitGuard;

use crate::prelude::*;

#[derive(Parser)]
pub struct SentryArgs {
    #[clap(long = "sentry-dsn", env = "SENTRY_DSN")]
    dsn: Option<String>,

    /// Deployment name attached to the crash reports, for example `production`.
    #[clap(long = "sentry-environment", env = "SENTRY_ENVIRONMENT")]
    environment: Option<String>,
}

impl SentryArgs {
    /// Crash reports go nowhere until this is called with a DSN.
    pub fn init(&self) -> ClientInitGuard {
        let options = sentry::ClientOptions {
            sample_rate: 1.0,
            attach_stacktrace: true,
            in_app_include: vec![crate_name!()],
            release: Some(Cow::Borrowed(crate_version!())),
            environment: self.environment.clone().map(Cow::Owned),
            ..Default::default()
        };
        let guard = sentry::init((self.dsn.clone(), options));
        if guard.is_enabled() {
            info!(environment = self.environment.as_deref(), "reporting crashes to Sentry");
        } else {
            warn!("Sentry is disabled");
        }
        guard
    }
}
