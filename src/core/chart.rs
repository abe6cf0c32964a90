//! Step-line chart of one day, serialized into the state store as a JSON string.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveTime, TimeZone};
use serde::Serialize;

use crate::core::{granularity::Granularity, source::Source};

const COLOR: &str = "#0d6efd";
const FORECAST_COLOR: &str = "#9ec5fe";

#[must_use]
#[derive(Clone, Debug, Serialize)]
pub struct Chart {
    pub graphs: Vec<Graph>,
}

#[must_use]
#[derive(Clone, Debug, Serialize)]
pub struct Graph {
    #[serde(rename = "type")]
    pub kind: &'static str,

    pub color: &'static str,

    #[serde(rename = "line_steppedLine")]
    pub stepped_line: bool,

    #[serde(rename = "line_UseFillColor")]
    pub use_fill_color: bool,

    #[serde(rename = "line_pointSize")]
    pub point_size: u32,

    #[serde(rename = "xAxis_bounds")]
    pub x_axis_bounds: &'static str,

    #[serde(rename = "xAxis_timeFormats")]
    pub x_axis_time_formats: TimeFormats,

    #[serde(rename = "yAxis_min")]
    pub y_axis_min: f64,

    #[serde(rename = "yAxis_max")]
    pub y_axis_max: f64,

    #[serde(rename = "datalabel_show")]
    pub show_data_labels: bool,

    pub data: Vec<ChartPoint>,
}

#[derive(Copy, Clone, Debug, Serialize)]
pub struct TimeFormats {
    pub hour: &'static str,
}

#[derive(Copy, Clone, Debug, PartialEq, Serialize)]
pub struct ChartPoint {
    /// Display price.
    pub y: f64,

    /// Slot start in epoch milliseconds.
    pub t: i64,
}

impl Chart {
    /// Build the chart from the full bucket map of the day starting at `day_start`.
    pub fn new<Tz: TimeZone>(
        prices: &BTreeMap<String, f64>,
        granularity: Granularity,
        day_start: &DateTime<Tz>,
        source: Option<Source>,
    ) -> Self {
        let mut data: Vec<ChartPoint> = prices
            .iter()
            .filter_map(|(key, price)| {
                let start = slot_start(key, granularity, day_start)?;
                Some(ChartPoint { y: *price, t: start })
            })
            .collect();
        if let Some(last) = data.last().copied() {
            // Duplicate the last point so that the step line renders the end edge of the last slot.
            data.push(ChartPoint {
                y: last.y,
                t: last.t + granularity.slot_duration().num_milliseconds(),
            });
        }
        let (y_axis_min, y_axis_max) = data.iter().fold((0.0_f64, 0.0_f64), |(min, max), point| {
            (min.min(point.y.floor()), max.max(point.y.ceil()))
        });
        let color = if source.is_some_and(Source::is_forecast) { FORECAST_COLOR } else { COLOR };
        Self {
            graphs: vec![Graph {
                kind: "line",
                color,
                stepped_line: true,
                use_fill_color: true,
                point_size: 0,
                x_axis_bounds: "data",
                x_axis_time_formats: TimeFormats { hour: "HH:mm" },
                y_axis_min,
                y_axis_max,
                show_data_labels: false,
                data,
            }],
        }
    }
}

/// Epoch milliseconds of the slot start, `None` for keys that do not exist in the local day.
fn slot_start<Tz: TimeZone>(key: &str, granularity: Granularity, day_start: &DateTime<Tz>) -> Option<i64> {
    let time = match granularity {
        Granularity::Hourly => NaiveTime::from_hms_opt(key.get(..2)?.parse().ok()?, 0, 0)?,
        Granularity::QuarterHourly => NaiveTime::parse_from_str(key.get(..5)?, "%H:%M").ok()?,
    };
    let local = day_start.date_naive().and_time(time);
    day_start
        .timezone()
        .from_local_datetime(&local)
        .earliest()
        .map(|start| start.timestamp_millis())
}
