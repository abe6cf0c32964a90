//! Peak-hour pipeline.

use chrono::{DateTime, Local};
use serde_json::json;

use crate::{
    api::peak_hours,
    core::peak::{PeakHours, day_key},
    prelude::*,
    store::{StateStore, publish_tree},
};

pub const NAMESPACE: &str = "peakTime";

#[instrument(skip_all)]
pub async fn run<S: StateStore + ?Sized>(api: &peak_hours::Api, store: &S, now: &DateTime<Local>) -> Result {
    let status = api.get_status().await?.context("the peak-hour service is unavailable")?;
    let peak_hours = PeakHours::try_new(&status, now)?;
    publish(store, &peak_hours).await
}

async fn publish<S: StateStore + ?Sized>(store: &S, peak_hours: &PeakHours) -> Result {
    for (day, events) in peak_hours.days.iter().enumerate() {
        publish_tree(store, &format!("{NAMESPACE}.{}", day_key(day)), &json!(events)).await?;
    }
    publish_tree(store, &format!("{NAMESPACE}.allDays"), &json!(peak_hours.all)).await?;
    store.expire(NAMESPACE).await?;
    store.purge(NAMESPACE).await?;
    info!(n_events = peak_hours.all.len(), "published");
    Ok(())
}
