//! Market-price pipeline: select, classify, aggregate and publish.

use chrono::{DateTime, Local};
use enumset::EnumSet;
use serde_json::{Value, json};

use crate::{
    core::{
        chain::{Orchestrator, Selection},
        chart::Chart,
        classify::{Classification, Ranking, average},
        day::Day,
        granularity::Granularity,
        settings::Settings,
        source::provenance,
        sources::MarketSources,
    },
    prelude::*,
    store::{StateStore, publish_tree},
};

/// Namespace subtrees whose stale `null` entries are deleted after expiry.
const PURGED: [&str; 3] = ["belowThreshold", "aboveThreshold", "details"];

#[instrument(skip_all, fields(country = %settings.country))]
pub async fn run<M, S>(sources: &M, store: &S, settings: &Settings, now: &DateTime<Local>) -> Result
where
    M: MarketSources + ?Sized,
    S: StateStore + ?Sized,
{
    let selections = Orchestrator::new(sources, settings).run(now).await?;

    // Classify everything before the first write, so that a missing price leaves the state untouched.
    let classified = selections
        .iter()
        .map(|selection| {
            Classification::try_new(&selection.series, selection.granularity, settings)
                .with_context(|| format!("failed to classify the {} prices for {:?}", selection.granularity, selection.day))
        })
        .collect::<Result<Vec<_>>>()?;

    for (selection, classification) in selections.iter().zip(&classified) {
        publish(store, selection, classification, now).await?;
    }
    for granularity in EnumSet::<Granularity>::all() {
        let namespace = granularity.namespace();
        if settings.granularities.contains(granularity) {
            store.expire(namespace).await?;
            for subtree in PURGED {
                store.purge(&format!("{namespace}.{subtree}")).await?;
            }
        } else {
            info!(%granularity, "disabled, deleting the namespace");
            store.delete(namespace).await?;
        }
    }

    let has_today = selections.iter().any(|selection| selection.day == Day::Today && !selection.series.is_empty());
    ensure!(has_today, "no source has any prices for today");
    Ok(())
}

/// Write every view of one day and granularity.
#[instrument(skip_all, fields(day = ?selection.day, granularity = %selection.granularity))]
async fn publish<S: StateStore + ?Sized>(
    store: &S,
    selection: &Selection,
    classification: &Classification,
    now: &DateTime<Local>,
) -> Result {
    let namespace = selection.granularity.namespace();
    let day = selection.day.key();
    let day_start = selection.day.start(now);
    let count_field = selection.granularity.count_field();

    store.write(&format!("{namespace}.{day}.date"), json!(day_start.timestamp_millis())).await?;
    store.write(&format!("{namespace}.{day}.source"), json!(provenance(selection.source))).await?;
    publish_tree(store, &format!("{namespace}.details.{day}"), &serde_json::to_value(&selection.series)?).await?;

    publish_tree(store, &format!("{namespace}.{day}"), &json!(classification.full)).await?;
    for (bucket, prices) in [("belowThreshold", &classification.below), ("aboveThreshold", &classification.above)] {
        let prefix = format!("{namespace}.{bucket}.{day}");
        publish_tree(store, &prefix, &json!(prices)).await?;
        store.write(&format!("{prefix}.{count_field}"), json!(prices.len())).await?;
    }

    for (prefix, prices) in [
        (format!("{namespace}.{day}_sorted"), &classification.full),
        (format!("{namespace}.belowThreshold.{day}_sorted"), &classification.below),
    ] {
        let ranking = Ranking::new(prices);
        publish_tree(store, &prefix, &json!(ranking.0)).await?;
        let short = serde_json::to_string(&ranking.short(selection.granularity))?;
        store.write(&format!("{prefix}.short"), Value::String(short)).await?;
    }

    let average = average(&classification.full, selection.granularity);
    store.write(&format!("{namespace}.{day}.average"), json!(average)).await?;

    let chart = Chart::new(&classification.full, selection.granularity, &day_start, selection.source);
    store.write(&format!("{namespace}.{day}.jsonChart"), Value::String(serde_json::to_string(&chart)?)).await?;

    info!(
        source = provenance(selection.source),
        n_slots = classification.full.len(),
        n_below = classification.below.len(),
        average,
        "published",
    );
    Ok(())
}
