//! HTTP calls with a timeout, retries and exponential backoff.

use std::{io, sync::Arc, time::Duration};

use bon::Builder;
use reqwest::{Client, ClientBuilder, RequestBuilder, StatusCode, Url, cookie::Jar, header::HeaderMap};
use serde::de::DeserializeOwned;
use tokio::time::sleep;

use crate::prelude::*;

#[must_use]
#[derive(Clone, Debug, Builder)]
pub struct Transport {
    #[builder(default)]
    client: Client,

    /// Applied to every client built from this transport.
    timeout: Option<Duration>,

    /// Total number of attempts, the first one included.
    #[builder(default = 3)]
    n_attempts: u32,

    /// Delay before the second attempt, doubled after every next failure.
    #[builder(default = Duration::from_secs(10))]
    base_delay: Duration,
}

/// Successful response with a non-empty body.
#[must_use]
#[derive(Clone, Debug)]
pub struct Fetched {
    pub url: Url,
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: String,
}

impl Fetched {
    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        serde_json::from_str(&self.body)
            .with_context(|| format!("failed to deserialize the response from `{}`", self.url))
    }
}

impl Transport {
    pub fn try_new(timeout: Duration, n_attempts: u32, base_delay: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("failed to build the HTTP client")?;
        Ok(Self::builder()
            .client(client)
            .timeout(timeout)
            .n_attempts(n_attempts)
            .base_delay(base_delay)
            .build())
    }

    /// Same transport with its own client that keeps the cookies in the jar, redirect hops included.
    pub fn with_cookie_jar(&self, jar: Arc<Jar>) -> Result<Self> {
        let builder = ClientBuilder::new().cookie_provider(jar);
        let builder = match self.timeout {
            Some(timeout) => builder.timeout(timeout),
            None => builder,
        };
        let client = builder.build().context("failed to build the HTTP client")?;
        Ok(Self { client, ..self.clone() })
    }

    pub const fn client(&self) -> &Client {
        &self.client
    }

    /// Send the request until it succeeds or the attempts run out.
    ///
    /// A server error on the final attempt means that the upstream has nothing to offer right now,
    /// and is returned as `Ok(None)`. Any other final failure is an error.
    #[instrument(skip_all, fields(name = name))]
    pub async fn fetch(&self, request: RequestBuilder, name: &str) -> Result<Option<Fetched>> {
        let n_attempts = self.n_attempts.max(1);
        let mut delay = self.base_delay;
        let mut attempt = 1;
        loop {
            let attempt_request =
                request.try_clone().context("the request body cannot be retried")?;
            match Self::send(attempt_request).await {
                Ok(fetched) => {
                    debug!(attempt, status = %fetched.status, url = %fetched.url, "fetched");
                    trace!(body = fetched.body, "response body");
                    return Ok(Some(fetched));
                }
                Err(error) if attempt < n_attempts => {
                    warn!(attempt, ?delay, "attempt failed, retrying: {error:#}");
                    sleep(delay).await;
                    delay *= 2;
                    attempt += 1;
                }
                Err(error) if is_server_error(&error) => {
                    error!(attempt, "giving up on the server error: {error:#}");
                    return Ok(None);
                }
                Err(error) => {
                    return Err(error.context(format!("{name} failed after {attempt} attempts")));
                }
            }
        }
    }

    pub async fn get_json<T: DeserializeOwned>(&self, url: Url, name: &str) -> Result<Option<T>> {
        self.fetch(self.client.get(url), name).await?.map(|fetched| fetched.json()).transpose()
    }

    async fn send(request: RequestBuilder) -> Result<Fetched> {
        let response = request.send().await.context("failed to call")?;
        let url = response.url().clone();
        let status = response.status();
        let headers = response.headers().clone();
        let response = response
            .error_for_status()
            .with_context(|| format!("request to `{url}` failed"))?;
        let body = response.text().await.context("failed to read the response body")?;
        ensure!(
            !body.trim().is_empty(),
            "Response empty for URL {url} with status code {}",
            status.as_u16(),
        );
        Ok(Fetched { url, status, headers, body })
    }
}

fn is_server_error(error: &Error) -> bool {
    error.chain().any(|cause| {
        cause
            .downcast_ref::<reqwest::Error>()
            .and_then(reqwest::Error::status)
            .is_some_and(|status| status.is_server_error())
    })
}

/// Connection resets and timeouts, the errors that tend to go away on their own.
#[must_use]
pub fn is_transient(error: &Error) -> bool {
    error.chain().any(|cause| {
        if let Some(error) = cause.downcast_ref::<reqwest::Error>() {
            error.is_timeout() || error.is_connect()
        } else if let Some(error) = cause.downcast_ref::<io::Error>() {
            matches!(
                error.kind(),
                io::ErrorKind::ConnectionReset
                    | io::ErrorKind::ConnectionAborted
                    | io::ErrorKind::BrokenPipe
                    | io::ErrorKind::TimedOut
                    | io::ErrorKind::UnexpectedEof
            )
        } else {
            false
        }
    })
}

/// Timeouts are expected from time to time and are not worth an alert.
#[must_use]
pub fn is_timeout(error: &Error) -> bool {
    error.chain().any(|cause| {
        cause.downcast_ref::<reqwest::Error>().is_some_and(reqwest::Error::is_timeout)
            || cause
                .downcast_ref::<io::Error>()
                .is_some_and(|error| error.kind() == io::ErrorKind::TimedOut)
    })
}

#[cfg(test)]
mod tests {
    use mockito::Server;

    use super::*;

    fn transport() -> Transport {
        Transport::builder().n_attempts(3).base_delay(Duration::from_millis(1)).build()
    }

    #[tokio::test]
    async fn test_get_json() -> Result {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/prices")
            .with_status(200)
            .with_body(r#"{"data": [1, 2]}"#)
            .expect(1)
            .create_async()
            .await;
        let url: Url = format!("{}/prices", server.url()).parse()?;

        let body = transport().get_json::<serde_json::Value>(url, "test").await?;

        assert_eq!(body, Some(serde_json::json!({"data": [1, 2]})));
        mock.assert_async().await;
        Ok(())
    }

    #[tokio::test]
    async fn test_final_server_error_means_no_data() -> Result {
        let mut server = Server::new_async().await;
        let mock = server.mock("GET", "/prices").with_status(503).expect(3).create_async().await;
        let url: Url = format!("{}/prices", server.url()).parse()?;

        let fetched = transport().fetch(transport().client().get(url), "test").await?;

        assert!(fetched.is_none());
        mock.assert_async().await;
        Ok(())
    }

    #[tokio::test]
    async fn test_final_client_error_fails() -> Result {
        let mut server = Server::new_async().await;
        let mock = server.mock("GET", "/prices").with_status(404).expect(3).create_async().await;
        let url: Url = format!("{}/prices", server.url()).parse()?;

        let result = transport().fetch(transport().client().get(url), "test").await;

        assert!(result.is_err());
        mock.assert_async().await;
        Ok(())
    }

    #[tokio::test]
    async fn test_empty_body_fails() -> Result {
        let mut server = Server::new_async().await;
        let _mock = server.mock("GET", "/prices").with_status(200).with_body("  ").create_async().await;
        let url: Url = format!("{}/prices", server.url()).parse()?;

        let error = transport().fetch(transport().client().get(url), "test").await.unwrap_err();

        assert!(format!("{error:#}").contains("Response empty for URL"));
        Ok(())
    }

    #[test]
    fn test_is_transient() {
        assert!(is_transient(&Error::new(io::Error::from(io::ErrorKind::ConnectionReset))));
        assert!(!is_transient(&anyhow!("unexpected document shape")));
        assert!(is_timeout(&Error::new(io::Error::from(io::ErrorKind::TimedOut))));
    }
}
