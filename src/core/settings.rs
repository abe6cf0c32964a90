use std::{str::FromStr, time::Duration};

use enumset::EnumSet;

use crate::{core::granularity::Granularity, prelude::*};

/// Lower-case market country code, as in `at` or `de`.
#[derive(Clone, Debug, Eq, PartialEq, derive_more::Display)]
pub struct Country(String);

impl FromStr for Country {
    type Err = Error;

    fn from_str(code: &str) -> Result<Self> {
        let code = code.trim().to_lowercase();
        ensure!(
            code.len() == 2 && code.chars().all(|char| char.is_ascii_alphabetic()),
            "`{code}` is not a two-letter country code",
        );
        Ok(Self(code))
    }
}

impl Country {
    pub fn code(&self) -> &str {
        &self.0
    }

    #[must_use]
    pub fn upper(&self) -> String {
        self.0.to_uppercase()
    }

    /// Switzerland is served by Entsoe only.
    #[must_use]
    pub fn is_switzerland(&self) -> bool {
        self.0 == "ch"
    }

    /// Bidding zone as named by Epex and Energy Charts.
    #[must_use]
    pub fn bidding_zone(&self) -> String {
        if self.0 == "de" { "DE-LU".to_string() } else { self.upper() }
    }

    /// Entsoe EIC code of the bidding zone.
    #[must_use]
    pub fn eic_domain(&self) -> Option<&'static str> {
        match self.0.as_str() {
            "at" => Some("10YAT-APG------L"),
            "be" => Some("10YBE----------2"),
            "ch" => Some("10YCH-SWISSGRIDZ"),
            "de" => Some("10Y1001A1001A82H"),
            "dk" => Some("10YDK-1--------W"),
            "fi" => Some("10YFI-1--------U"),
            "fr" => Some("10YFR-RTE------C"),
            "nl" => Some("10YNL----------L"),
            "no" => Some("10YNO-1--------2"),
            "pl" => Some("10YPL-AREA-----S"),
            "se" => Some("10Y1001A1001A46L"),
            _ => None,
        }
    }
}

/// Cost model, all relative values are fractions (`0.2` is 20%).
#[must_use]
#[derive(Copy, Clone, Debug, bon::Builder)]
pub struct Costs {
    /// Absolute provider fee in ct/kWh.
    #[builder(default)]
    pub fee_absolute: f64,

    /// Provider fee relative to the trade price.
    #[builder(default)]
    pub fee_relative: f64,

    #[builder(default)]
    pub vat: f64,

    /// Charges relative to the trade price plus the provider fee.
    #[builder(default)]
    pub charges: f64,

    /// Grid costs in ct/kWh.
    #[builder(default)]
    pub grid_costs: f64,
}

impl Costs {
    /// Gross price in ct/kWh from the trade price in ct/kWh.
    #[must_use]
    pub fn apply(&self, trade: f64) -> f64 {
        let provider = (trade * self.fee_relative).abs() + self.fee_absolute;
        let charges = (trade + provider) * self.charges;
        let vat = (trade + provider + charges + self.grid_costs) * self.vat;
        trade + provider + charges + self.grid_costs + vat
    }
}

/// Immutable run settings, read from the command line once.
#[must_use]
#[derive(Clone, Debug, bon::Builder)]
pub struct Settings {
    #[builder(into)]
    pub country: Country,

    /// Display prices strictly below this value are cheap, in ct/kWh.
    #[builder(default = 10.0)]
    pub threshold: f64,

    #[builder(default = EnumSet::all())]
    pub granularities: EnumSet<Granularity>,

    /// Fall back to the early auctions for tomorrow.
    #[builder(default)]
    pub forecast: bool,

    /// Allow the Energy Charts fallback.
    #[builder(default)]
    pub energy_charts: bool,

    /// Apply the cost model, otherwise display prices are the trade prices.
    pub costs: Option<Costs>,

    pub entsoe_token: Option<String>,

    /// Pause before the single retry of the Swiss path after a transient network error.
    #[builder(default = Duration::from_secs(180))]
    pub transient_retry_pause: Duration,
}

impl From<&str> for Country {
    /// Trusted literal codes, use [`FromStr`] for user input.
    fn from(code: &str) -> Self {
        Self(code.to_lowercase())
    }
}
