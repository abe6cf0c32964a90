//! Grid peak hours, bucketed by the local day they fall on.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone, Timelike, Utc};
use serde::Deserialize;

use crate::{
    core::calendar::{add_days, pad, truncate_to_midnight},
    prelude::*,
};

/// Number of day-relative maps, today included.
pub const N_DAYS: usize = 5;

#[derive(Clone, Debug, Deserialize)]
pub struct PeakHourStatus {
    #[serde(rename = "StatusInfos")]
    pub status_infos: Option<Vec<PeakHourEvent>>,
}

#[derive(Clone, Debug, Deserialize)]
pub struct PeakHourEvent {
    pub utc: Option<DateTime<Utc>>,
}

/// Peak-hour start times in epoch milliseconds.
#[must_use]
#[derive(Clone, Debug, Default)]
pub struct PeakHours {
    /// `from_HH_to_HH` labels of today and the four following days.
    pub days: [BTreeMap<String, i64>; N_DAYS],

    /// Every event in arrival order, keyed by `item NN`.
    pub all: BTreeMap<String, i64>,
}

impl PeakHours {
    /// Distribute the events over the days starting with the day of `now`.
    ///
    /// Fails without a partial result when the envelope or any timestamp is missing.
    pub fn try_new<Tz: TimeZone>(status: &PeakHourStatus, now: &DateTime<Tz>) -> Result<Self> {
        let events = status.status_infos.as_ref().context("no `StatusInfos` in the peak-hour status")?;
        let day_starts: Vec<DateTime<Tz>> = (0..N_DAYS as i64).map(|n_days| add_days(now, n_days)).collect();

        let mut this = Self::default();
        for (index, event) in events.iter().enumerate() {
            let utc = event.utc.with_context(|| format!("no `utc` in peak-hour event #{}", index + 1))?;
            let local = utc.with_timezone(&now.timezone());
            let millis = utc.timestamp_millis();
            let label = format!("from_{}_to_{}", pad(local.hour(), 2), pad(local.hour() + 1, 2));

            let event_day = truncate_to_midnight(&local);
            match day_starts.iter().position(|day_start| *day_start == event_day) {
                Some(day) => {
                    this.days[day].insert(label, millis);
                }
                None => {
                    debug!(%utc, "the event is outside the day window");
                }
            }
            this.all.insert(format!("item {}", pad(u32::try_from(index + 1)?, 2)), millis);
        }
        Ok(this)
    }
}

/// State-store key of the day-relative map, `today` or `today+N`.
#[must_use]
pub fn day_key(day: usize) -> String {
    if day == 0 { "today".to_string() } else { format!("today+{day}") }
}
