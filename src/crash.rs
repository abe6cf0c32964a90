use sentry::integrations::anyhow::capture_anyhow;

use crate::{api::transport::is_timeout, core::settings::Country, prelude::*};

/// Forward the error to Sentry, timeouts excepted. A no-op when Sentry is not initialized.
pub fn report(error: &Error) {
    if is_timeout(error) {
        debug!("not reporting the timeout");
    } else {
        capture_anyhow(error);
    }
}

/// Tag every following report with the market it concerns.
pub fn tag_market(country: &Country) {
    sentry::configure_scope(|scope| scope.set_tag("country", country.code()));
}
