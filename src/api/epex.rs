//! [EPEX Spot](https://www.epexspot.com/en/market-results) market results page.
//!
//! The results are only rendered after the disclaimer form is submitted,
//! so every fetch runs its own cookie session: get, accept, get again.

use std::sync::Arc;

use chrono::{DateTime, Local, TimeDelta};
use reqwest::{
    Client,
    RequestBuilder,
    Url,
    cookie::{CookieStore, Jar},
    header::{ACCEPT_ENCODING, USER_AGENT},
};
use scraper::{ElementRef, Html, Selector};

use crate::{
    api::transport::{Fetched, Transport},
    core::settings::Country,
    prelude::*,
};

const BROWSER_USER_AGENT: &str =
    "Mozilla/5.0 (X11; Linux x86_64; rv:131.0) Gecko/20100101 Firefox/131.0";

pub struct Api {
    transport: Transport,
    base_url: Url,
}

impl Api {
    pub fn try_new(transport: Transport) -> Result<Self> {
        Ok(Self::with_base_url(transport, Url::parse("https://www.epexspot.com/")?))
    }

    pub const fn with_base_url(transport: Transport, base_url: Url) -> Self {
        Self { transport, base_url }
    }

    /// HTML of the quarter-hourly day-ahead results page for the delivery day.
    #[instrument(skip_all, fields(day = %day.date_naive(), country = %country))]
    pub async fn get_results_page(&self, day: &DateTime<Local>, country: &Country) -> Result<Option<String>> {
        let url = self.results_url(day, country)?;
        let session = Session::start(&self.transport)?;

        let Some(page) = session.send(session.client().get(url.clone())).await? else {
            return Ok(None);
        };
        let form = DisclaimerForm::parse(&page.body)?;
        let action = url.join(&form.action).context("invalid disclaimer form action")?;
        debug!(%action, form_id = form.form_id, "accepting the disclaimer…");
        if session.send(session.client().post(action).form(&form.fields)).await?.is_none() {
            return Ok(None);
        }
        if !session.has_cookies(&url) {
            warn!("accepting the disclaimer has not set any cookies");
        }

        let page = session.send(session.client().get(url)).await?;
        Ok(page.map(|page| page.body))
    }

    fn results_url(&self, day: &DateTime<Local>, country: &Country) -> Result<Url> {
        let mut url = self.base_url.join("en/market-results")?;
        let trading_date = *day - TimeDelta::days(1);
        url.query_pairs_mut()
            .append_pair("market_area", &country.bidding_zone())
            .append_pair("auction", "MRC")
            .append_pair("trading_date", &trading_date.format("%Y-%m-%d").to_string())
            .append_pair("delivery_date", &day.format("%Y-%m-%d").to_string())
            .append_pair("modality", "Auction")
            .append_pair("sub_modality", "DayAhead")
            .append_pair("data_mode", "table")
            .append_pair("product", "15");
        Ok(url)
    }
}

/// Cookie session of a single page fetch, its jar also catches cookies set by redirects.
struct Session {
    jar: Arc<Jar>,
    transport: Transport,
}

impl Session {
    fn start(transport: &Transport) -> Result<Self> {
        let jar = Arc::new(Jar::default());
        Ok(Self { transport: transport.with_cookie_jar(Arc::clone(&jar))?, jar })
    }

    const fn client(&self) -> &Client {
        self.transport.client()
    }

    async fn send(&self, request: RequestBuilder) -> Result<Option<Fetched>> {
        let request = request.header(USER_AGENT, BROWSER_USER_AGENT).header(ACCEPT_ENCODING, "identity");
        self.transport.fetch(request, "epex").await
    }

    fn has_cookies(&self, url: &Url) -> bool {
        self.jar.cookies(url).is_some()
    }
}

#[derive(Debug)]
struct DisclaimerForm {
    action: String,
    form_id: String,
    fields: Vec<(String, String)>,
}

impl DisclaimerForm {
    /// Find the form by its `form_build_id` input, which is how Drupal marks its forms.
    fn parse(html: &str) -> Result<Self> {
        let document = Html::parse_document(html);
        let build_id_selector = selector(r#"input[name="form_build_id"]"#)?;
        let Some(build_id) = document.select(&build_id_selector).next() else {
            error!(html, "no disclaimer form on the page");
            bail!("no disclaimer form on the Epex results page");
        };
        let form = build_id
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|element| element.value().name() == "form")
            .context("the disclaimer form build ID is outside of a form")?;

        let mut fields = Vec::new();
        for input in form.select(&selector("input[name]")?) {
            let (Some(name), kind) = (input.value().attr("name"), input.value().attr("type")) else {
                continue;
            };
            let value = input.value().attr("value");
            match kind.unwrap_or("text") {
                "hidden" | "submit" | "text" => fields.push((name.to_string(), value.unwrap_or_default().to_string())),
                "checkbox" => fields.push((name.to_string(), value.unwrap_or("1").to_string())),
                _ => {}
            }
        }
        let form_id = fields
            .iter()
            .find_map(|(name, value)| (name == "form_id").then(|| value.clone()))
            .context("the disclaimer form has no `form_id`")?;
        Ok(Self {
            action: form.value().attr("action").unwrap_or_default().to_string(),
            form_id,
            fields,
        })
    }
}

pub fn selector(css: &str) -> Result<Selector> {
    Selector::parse(css).map_err(|error| anyhow!("invalid selector `{css}`: {error:?}"))
}
