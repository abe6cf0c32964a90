//! [APG](https://www.apg.at) peak-hour status feed.

use reqwest::Url;

use crate::{api::transport::Transport, core::peak::PeakHourStatus, prelude::*};

pub struct Api {
    transport: Transport,
    url: Url,
}

impl Api {
    pub fn try_new(transport: Transport) -> Result<Self> {
        Ok(Self::with_url(transport, Url::parse("https://awareness.cloud.apg.at/api/v1/PeakHourStatus")?))
    }

    pub const fn with_url(transport: Transport, url: Url) -> Self {
        Self { transport, url }
    }

    #[instrument(skip_all)]
    pub async fn get_status(&self) -> Result<Option<PeakHourStatus>> {
        self.transport.get_json(self.url.clone(), "peak hours").await
    }
}
