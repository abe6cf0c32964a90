//! Results table of the Epex market results page.

use std::sync::LazyLock;

use chrono::NaiveDate;
use regex::Regex;
use scraper::{ElementRef, Html};

use crate::{
    api::epex::selector,
    core::{
        calendar::pad,
        point::{PricePoint, extract_time_range},
        sources::EpexDay,
    },
    prelude::*,
};

static DELIVERY_DATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d{1,2})\s+([A-Za-z]+)\s+(\d{4})").unwrap());

const MONTHS: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

const PRICE_COLUMN: &str = "Price(€/MWh)";

pub fn normalize(html: &str) -> Result<EpexDay> {
    let document = Html::parse_document(html);
    let delivery_date = parse_delivery_date(&document)?;

    let slots: Vec<String> = document
        .select(&selector("div.js-table-times li")?)
        .map(|item| text_of(&item))
        .filter(|text| extract_time_range(text).is_some())
        .collect();
    let prices = parse_price_column(&document)?;
    if slots.len() != prices.len() {
        error!(html, n_slots = slots.len(), n_rows = prices.len(), "misaligned Epex results table");
        bail!("{} time slots but {} value rows in the Epex results table", slots.len(), prices.len());
    }

    let series = slots
        .into_iter()
        .zip(prices)
        .zip(1_u32..)
        .map(|((slot, price), index)| {
            let product = format!("Q{}_{}", pad(index.div_ceil(4), 2), (index - 1) % 4 + 1);
            PricePoint { id: extract_time_range(&slot), product_text: Some(slot), price: Some(price), product }
        })
        .collect();
    Ok(EpexDay { delivery_date, series })
}

fn parse_delivery_date(document: &Html) -> Result<NaiveDate> {
    let header_selector = selector("h2")?;
    for header in document.select(&header_selector).map(|header| text_of(&header)) {
        let Some(captures) = DELIVERY_DATE.captures(&header) else {
            continue;
        };
        let month_name = captures[2].to_lowercase();
        let month = MONTHS
            .iter()
            .position(|month| *month == month_name)
            .with_context(|| format!("unknown month name `{}` in the Epex delivery date", &captures[2]))?;
        let day = captures[1].parse()?;
        let year = captures[3].parse()?;
        return NaiveDate::from_ymd_opt(year, u32::try_from(month)? + 1, day)
            .with_context(|| format!("invalid Epex delivery date `{}`", &captures[0]));
    }
    bail!("no delivery date on the Epex results page")
}

/// Prices from the column titled by the last header row, one per body row of the same width.
fn parse_price_column(document: &Html) -> Result<Vec<f64>> {
    let table = document
        .select(&selector("div.js-table-values table")?)
        .next()
        .context("no values table on the Epex results page")?;
    let header = table
        .select(&selector("thead tr")?)
        .last()
        .context("the Epex values table has no header")?;
    let titles: Vec<String> = header
        .select(&selector("th, td")?)
        .map(|cell| text_of(&cell).split_whitespace().collect())
        .collect();
    let Some(column) = titles.iter().position(|title| title == PRICE_COLUMN) else {
        error!(?titles, "no price column in the Epex values table");
        bail!("no `{PRICE_COLUMN}` column in the Epex values table");
    };

    let cell_selector = selector("td")?;
    table
        .select(&selector("tbody tr")?)
        .map(|row| row.select(&cell_selector).map(|cell| text_of(&cell)).collect::<Vec<_>>())
        .filter(|cells| cells.len() == titles.len())
        .map(|cells| {
            let price = cells[column].replace(',', "");
            price.trim().parse().with_context(|| format!("invalid Epex price `{price}`"))
        })
        .collect()
}

fn text_of(element: &ElementRef<'_>) -> String {
    element.text().collect::<String>().split_whitespace().collect::<Vec<_>>().join(" ")
}
