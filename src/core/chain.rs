//! Provider fallback chain: for every day and granularity, the first source with data wins.

use chrono::{DateTime, Local};

use crate::{
    api::transport::is_transient,
    core::{
        day::Day,
        granularity::Granularity,
        point::DaySeries,
        settings::Settings,
        source::Source,
        sources::{Auction, ExaaDay, MarketSources},
    },
    crash,
    prelude::*,
};

#[derive(Copy, Clone, Debug)]
pub struct Request<'a> {
    pub day: Day,
    pub granularity: Granularity,
    pub settings: &'a Settings,
}

impl Request<'_> {
    fn is_swiss(&self) -> bool {
        self.settings.country.is_switzerland()
    }

    fn is_hourly(&self) -> bool {
        self.granularity == Granularity::Hourly
    }

    fn wants_forecast(&self) -> bool {
        self.day == Day::Tomorrow && self.settings.forecast
    }
}

struct Link {
    source: Source,
    applies: fn(&Request<'_>) -> bool,
}

/// Sources in priority order, each with the condition under which it is tried.
static CHAIN: [Link; 7] = [
    Link { source: Source::ExaaMarketCoupling, applies: |request| !request.is_swiss() },
    Link {
        source: Source::Entsoe,
        applies: |request| {
            request.is_swiss() || (!request.is_hourly() && request.settings.entsoe_token.is_some())
        },
    },
    Link { source: Source::Entsoe1015, applies: |request| request.is_swiss() && request.wants_forecast() },
    Link { source: Source::Epex, applies: |request| !request.is_swiss() && !request.is_hourly() },
    Link { source: Source::Awattar, applies: |request| !request.is_swiss() && request.is_hourly() },
    Link {
        source: Source::EnergyCharts,
        applies: |request| !request.is_swiss() && request.settings.energy_charts,
    },
    Link {
        source: Source::Exaa1015,
        applies: |request| !request.is_swiss() && request.is_hourly() && request.wants_forecast(),
    },
];

/// Sources to try for the request, in order.
pub fn links(request: &Request<'_>) -> impl Iterator<Item = Source> {
    CHAIN.iter().filter(|link| (link.applies)(request)).map(|link| link.source)
}

/// Day series picked for one day and granularity, empty if no source had data.
#[must_use]
#[derive(Clone, Debug)]
pub struct Selection {
    pub day: Day,
    pub granularity: Granularity,
    pub source: Option<Source>,
    pub series: DaySeries,
}

pub struct Orchestrator<'a, S: ?Sized> {
    sources: &'a S,
    settings: &'a Settings,
}

impl<'a, S: MarketSources + ?Sized> Orchestrator<'a, S> {
    pub const fn new(sources: &'a S, settings: &'a Settings) -> Self {
        Self { sources, settings }
    }

    /// Select a series for every enabled granularity, today and tomorrow.
    #[instrument(skip_all, fields(country = %self.settings.country))]
    pub async fn run(&self, today: &DateTime<Local>) -> Result<Vec<Selection>> {
        let tomorrow = Day::Tomorrow.start(today);
        let (exaa_today, exaa_tomorrow) = if self.settings.country.is_switzerland() {
            (None, None)
        } else {
            tokio::join!(self.prefetch_exaa(today), self.prefetch_exaa(&tomorrow))
        };

        let mut selections = Vec::new();
        for granularity in self.settings.granularities {
            for day in Day::ALL {
                let exaa = match day {
                    Day::Today => exaa_today.as_ref(),
                    Day::Tomorrow => exaa_tomorrow.as_ref(),
                };
                let request = Request { day, granularity, settings: self.settings };
                selections.push(self.select(&request, &day.start(today), exaa).await?);
            }
        }
        Ok(selections)
    }

    /// Fetch a single source, bypassing the chain.
    pub async fn attempt(
        &self,
        source: Source,
        granularity: Granularity,
        day_start: &DateTime<Local>,
    ) -> Result<Option<DaySeries>> {
        match source {
            Source::ExaaMarketCoupling => Ok(self
                .sources
                .exaa_market_coupling(day_start)
                .await?
                .map(|exaa| exaa.into_series(granularity))),
            Source::Exaa1015 => self.sources.exaa_1015(day_start).await,
            Source::Awattar => self.sources.awattar(day_start).await,
            Source::Entsoe => self.sources.entsoe(day_start, Auction::Main, granularity).await,
            Source::Entsoe1015 => self.sources.entsoe(day_start, Auction::Early, granularity).await,
            Source::Epex => {
                let Some(epex) = self.sources.epex(day_start).await? else {
                    return Ok(None);
                };
                if epex.delivery_date == day_start.date_naive() {
                    Ok(Some(epex.series))
                } else {
                    warn!(
                        delivery_date = %epex.delivery_date,
                        expected = %day_start.date_naive(),
                        "discarding the stale Epex results",
                    );
                    Ok(None)
                }
            }
            Source::EnergyCharts => self.sources.energy_charts(day_start, granularity).await,
        }
    }

    async fn prefetch_exaa(&self, day_start: &DateTime<Local>) -> Option<ExaaDay> {
        self.sources.exaa_market_coupling(day_start).await.unwrap_or_else(|error| {
            error!(day = %day_start.date_naive(), "failed to fetch the Exaa market coupling: {error:#}");
            crash::report(&error);
            None
        })
    }

    #[instrument(skip_all, fields(day = ?request.day, granularity = %request.granularity))]
    async fn select(
        &self,
        request: &Request<'_>,
        day_start: &DateTime<Local>,
        exaa: Option<&ExaaDay>,
    ) -> Result<Selection> {
        for source in links(request) {
            let series = match source {
                Source::ExaaMarketCoupling => exaa.map(|exaa| exaa.get(request.granularity).clone()),
                _ if request.is_swiss() => {
                    self.attempt_with_transient_retry(source, request.granularity, day_start).await?
                }
                _ => self.attempt(source, request.granularity, day_start).await.unwrap_or_else(|error| {
                    error!(%source, "failed to fetch: {error:#}");
                    crash::report(&error);
                    None
                }),
            };
            match series {
                Some(series) if !series.is_empty() => {
                    info!(%source, n_points = series.len(), "selected");
                    return Ok(Selection {
                        day: request.day,
                        granularity: request.granularity,
                        source: Some(source),
                        series,
                    });
                }
                _ => {
                    debug!(%source, "no data");
                }
            }
        }
        warn!("no source has data");
        Ok(Selection {
            day: request.day,
            granularity: request.granularity,
            source: None,
            series: DaySeries::new(),
        })
    }

    /// The Swiss path has no fallback, so a transient network error gets one more chance.
    async fn attempt_with_transient_retry(
        &self,
        source: Source,
        granularity: Granularity,
        day_start: &DateTime<Local>,
    ) -> Result<Option<DaySeries>> {
        match self.attempt(source, granularity, day_start).await {
            Err(error) if is_transient(&error) => {
                warn!(
                    %source,
                    pause = ?self.settings.transient_retry_pause,
                    "transient network error, retrying once: {error:#}",
                );
                tokio::time::sleep(self.settings.transient_retry_pause).await;
                self.attempt(source, granularity, day_start)
                    .await
                    .with_context(|| format!("failed to fetch from {source} after the retry"))
            }
            result => result.with_context(|| format!("failed to fetch from {source}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::{collections::VecDeque, io, sync::Mutex, time::Duration};

    use async_trait::async_trait;
    use chrono::{NaiveDate, TimeZone};

    use super::*;
    use crate::core::{point::PricePoint, sources::EpexDay};

    fn today() -> DateTime<Local> {
        Local.with_ymd_and_hms(2026, 10, 18, 0, 0, 0).unwrap()
    }

    fn tomorrow() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 19).unwrap()
    }

    fn series(price: f64) -> DaySeries {
        (1..=24).map(|hour| PricePoint::hourly(hour, price)).collect()
    }

    fn quarter_series(price: f64) -> DaySeries {
        vec![PricePoint::quarter_hourly("Q01_1".to_string(), "00:00-00:15".to_string(), price)]
    }

    #[derive(Default)]
    struct FakeSources {
        exaa_today: Option<ExaaDay>,
        exaa_tomorrow: Option<ExaaDay>,
        exaa_1015: Option<DaySeries>,
        awattar: Option<DaySeries>,
        awattar_fails: bool,
        epex: Option<EpexDay>,
        energy_charts: Option<DaySeries>,
        entsoe: Mutex<VecDeque<Result<Option<DaySeries>>>>,
        calls: Mutex<Vec<Source>>,
    }

    impl FakeSources {
        fn log(&self, source: Source) {
            self.calls.lock().unwrap().push(source);
        }

        fn calls(&self) -> Vec<Source> {
            self.calls.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl MarketSources for FakeSources {
        async fn exaa_market_coupling(&self, day: &DateTime<Local>) -> Result<Option<ExaaDay>> {
            self.log(Source::ExaaMarketCoupling);
            Ok(if day.date_naive() == tomorrow() { self.exaa_tomorrow.clone() } else { self.exaa_today.clone() })
        }

        async fn exaa_1015(&self, _day: &DateTime<Local>) -> Result<Option<DaySeries>> {
            self.log(Source::Exaa1015);
            Ok(self.exaa_1015.clone())
        }

        async fn awattar(&self, _day: &DateTime<Local>) -> Result<Option<DaySeries>> {
            self.log(Source::Awattar);
            if self.awattar_fails {
                bail!("HTTP 400 Bad Request");
            }
            Ok(self.awattar.clone())
        }

        async fn entsoe(
            &self,
            _day: &DateTime<Local>,
            auction: Auction,
            _granularity: Granularity,
        ) -> Result<Option<DaySeries>> {
            self.log(if auction == Auction::Main { Source::Entsoe } else { Source::Entsoe1015 });
            self.entsoe.lock().unwrap().pop_front().unwrap_or(Ok(None))
        }

        async fn epex(&self, _day: &DateTime<Local>) -> Result<Option<EpexDay>> {
            self.log(Source::Epex);
            Ok(self.epex.clone())
        }

        async fn energy_charts(
            &self,
            _day: &DateTime<Local>,
            _granularity: Granularity,
        ) -> Result<Option<DaySeries>> {
            self.log(Source::EnergyCharts);
            Ok(self.energy_charts.clone())
        }
    }

    fn find(selections: &[Selection], day: Day, granularity: Granularity) -> &Selection {
        selections
            .iter()
            .find(|selection| selection.day == day && selection.granularity == granularity)
            .unwrap()
    }

    #[test]
    fn test_links() {
        let settings = Settings::builder().country("at").forecast(true).entsoe_token("token".to_string()).build();
        let request = |day, granularity| Request { day, granularity, settings: &settings };

        assert_eq!(
            links(&request(Day::Tomorrow, Granularity::Hourly)).collect::<Vec<_>>(),
            [Source::ExaaMarketCoupling, Source::Awattar, Source::Exaa1015],
        );
        assert_eq!(
            links(&request(Day::Today, Granularity::Hourly)).collect::<Vec<_>>(),
            [Source::ExaaMarketCoupling, Source::Awattar],
        );
        assert_eq!(
            links(&request(Day::Tomorrow, Granularity::QuarterHourly)).collect::<Vec<_>>(),
            [Source::ExaaMarketCoupling, Source::Entsoe, Source::Epex],
        );
    }

    #[test]
    fn test_links_with_energy_charts() {
        let settings = Settings::builder().country("de").energy_charts(true).build();
        let request = |granularity| Request { day: Day::Today, granularity, settings: &settings };

        assert_eq!(
            links(&request(Granularity::Hourly)).collect::<Vec<_>>(),
            [Source::ExaaMarketCoupling, Source::Awattar, Source::EnergyCharts],
        );
        assert_eq!(
            links(&request(Granularity::QuarterHourly)).collect::<Vec<_>>(),
            [Source::ExaaMarketCoupling, Source::Epex, Source::EnergyCharts],
        );
    }

    #[test]
    fn test_links_for_switzerland() {
        let settings = Settings::builder().country("ch").forecast(true).energy_charts(true).build();
        let request = |day| Request { day, granularity: Granularity::Hourly, settings: &settings };

        assert_eq!(links(&request(Day::Today)).collect::<Vec<_>>(), [Source::Entsoe]);
        assert_eq!(
            links(&request(Day::Tomorrow)).collect::<Vec<_>>(),
            [Source::Entsoe, Source::Entsoe1015],
        );
    }

    #[tokio::test]
    async fn test_falls_back_to_exaa_1015() -> Result {
        let settings = Settings::builder()
            .country("at")
            .forecast(true)
            .granularities(Granularity::Hourly.into())
            .build();
        let sources = FakeSources {
            exaa_today: Some(ExaaDay { hourly: series(100.0), quarter_hourly: DaySeries::new() }),
            exaa_1015: Some(series(90.0)),
            awattar_fails: true,
            ..Default::default()
        };

        let selections = Orchestrator::new(&sources, &settings).run(&today()).await?;

        assert_eq!(selections.len(), 2);
        assert_eq!(find(&selections, Day::Today, Granularity::Hourly).source, Some(Source::ExaaMarketCoupling));
        let tomorrow = find(&selections, Day::Tomorrow, Granularity::Hourly);
        assert_eq!(tomorrow.source, Some(Source::Exaa1015));
        assert_eq!(tomorrow.series.len(), 24);
        Ok(())
    }

    #[tokio::test]
    async fn test_exaa_is_fetched_once_per_day() -> Result {
        let settings = Settings::builder().country("at").build();
        let exaa = ExaaDay { hourly: series(100.0), quarter_hourly: quarter_series(100.0) };
        let sources = FakeSources {
            exaa_today: Some(exaa.clone()),
            exaa_tomorrow: Some(exaa),
            ..Default::default()
        };

        let selections = Orchestrator::new(&sources, &settings).run(&today()).await?;

        assert_eq!(selections.len(), 4);
        assert!(selections.iter().all(|selection| selection.source == Some(Source::ExaaMarketCoupling)));
        assert_eq!(sources.calls(), [Source::ExaaMarketCoupling, Source::ExaaMarketCoupling]);
        Ok(())
    }

    #[tokio::test]
    async fn test_stale_epex_is_discarded() -> Result {
        let settings = Settings::builder()
            .country("at")
            .granularities(Granularity::QuarterHourly.into())
            .build();
        let sources = FakeSources {
            epex: Some(EpexDay { delivery_date: tomorrow(), series: quarter_series(80.0) }),
            ..Default::default()
        };

        let selections = Orchestrator::new(&sources, &settings).run(&today()).await?;

        let today = find(&selections, Day::Today, Granularity::QuarterHourly);
        assert_eq!(today.source, None);
        assert!(today.series.is_empty());
        assert_eq!(find(&selections, Day::Tomorrow, Granularity::QuarterHourly).source, Some(Source::Epex));
        Ok(())
    }

    #[tokio::test]
    async fn test_switzerland_retries_transient_error_once() -> Result {
        let settings = Settings::builder()
            .country("ch")
            .granularities(Granularity::Hourly.into())
            .transient_retry_pause(Duration::from_millis(1))
            .build();
        let sources = FakeSources {
            entsoe: Mutex::new(VecDeque::from([
                Err(io::Error::from(io::ErrorKind::ConnectionReset).into()),
                Ok(Some(series(50.0))),
                Ok(Some(series(60.0))),
            ])),
            ..Default::default()
        };

        let selections = Orchestrator::new(&sources, &settings).run(&today()).await?;

        assert_eq!(find(&selections, Day::Today, Granularity::Hourly).source, Some(Source::Entsoe));
        assert_eq!(find(&selections, Day::Tomorrow, Granularity::Hourly).source, Some(Source::Entsoe));
        assert_eq!(sources.calls(), [Source::Entsoe, Source::Entsoe, Source::Entsoe]);
        Ok(())
    }

    #[tokio::test]
    async fn test_switzerland_fails_on_other_errors() {
        let settings = Settings::builder().country("ch").build();
        let sources = FakeSources {
            entsoe: Mutex::new(VecDeque::from([Err(anyhow!("unexpected document shape"))])),
            ..Default::default()
        };
        assert!(Orchestrator::new(&sources, &settings).run(&today()).await.is_err());
    }
}
