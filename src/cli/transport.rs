use clap::Parser;

use crate::{api::transport::Transport, prelude::*};

#[derive(Parser)]
pub struct TransportArgs {
    /// Timeout of every HTTP request.
    #[clap(long, env = "HTTP_TIMEOUT", default_value = "30s")]
    http_timeout: humantime::Duration,

    #[clap(long, env = "RETRY_ATTEMPTS", default_value = "3")]
    retry_attempts: u32,

    /// Delay before the first retry, doubled for every following one.
    #[clap(long, env = "RETRY_BASE_DELAY", default_value = "10s")]
    retry_base_delay: humantime::Duration,

    /// Pause before retrying Entsoe once more after a transient network error, Switzerland only.
    #[clap(long, env = "TRANSIENT_RETRY_PAUSE", default_value = "3min")]
    pub transient_retry_pause: humantime::Duration,
}

impl TransportArgs {
    pub fn transport(&self) -> Result<Transport> {
        Transport::try_new(self.http_timeout.into(), self.retry_attempts, self.retry_base_delay.into())
    }
}
