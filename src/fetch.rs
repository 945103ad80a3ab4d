//! HTTP fetching.
//!
//! [`PageFetcher`] is the seam every stage fetches through. [`HttpFetcher`]
//! is the `reqwest` implementation used at runtime; tests swap in a stub
//! that serves canned bodies.
//!
//! Fetching never retries. Retry policy belongs to the caller.

use crate::error::ScrapeError;
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

/// Anything that can GET a URL and hand back its body.
pub trait PageFetcher {
    /// Fetch `url`, giving up after `timeout`.
    ///
    /// Fails with [`ScrapeError::Transport`] on connection errors, timeouts
    /// and non-2xx statuses.
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<String, ScrapeError>;
}

impl<T: PageFetcher> PageFetcher for &T {
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<String, ScrapeError> {
        (**self).fetch(url, timeout).await
    }
}

/// `reqwest`-backed fetcher. The user agent is sent on every request,
/// which is how the geocoding service identifies us.
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    /// Build the shared HTTP client.
    ///
    /// # Arguments
    ///
    /// * `user_agent` - Value of the `User-Agent` header on every request
    ///
    /// # Returns
    ///
    /// A fetcher with a 10 s connect timeout and at most 5 redirects, or
    /// [`ScrapeError::Config`] if the client cannot be built.
    pub fn new(user_agent: &str) -> Result<Self, ScrapeError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .connect_timeout(Duration::from_secs(10))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()
            .map_err(|e| ScrapeError::Config(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

impl PageFetcher for HttpFetcher {
    #[instrument(level = "debug", skip(self), fields(%url))]
    async fn fetch(&self, url: &str, timeout: Duration) -> Result<String, ScrapeError> {
        let t0 = Instant::now();
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| {
                warn!(elapsed_ms = t0.elapsed().as_millis() as u64, error = %e, "GET failed");
                ScrapeError::transport(url, e)
            })?;

        let body = response
            .text()
            .await
            .map_err(|e| ScrapeError::transport(url, e))?;
        debug!(
            bytes = body.len(),
            elapsed_ms = t0.elapsed().as_millis() as u64,
            "GET succeeded"
        );
        Ok(body)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    //! In-memory fetcher for tests.

    use super::*;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Mutex;

    /// One canned answer.
    #[derive(Debug, Clone)]
    pub enum StubResponse {
        Body(String),
        Fail,
    }

    /// Serves canned responses per URL and records every call.
    ///
    /// Each URL has a queue of responses; the last one repeats forever.
    /// Unknown URLs fail with a transport error.
    #[derive(Debug, Default)]
    pub struct StubFetcher {
        routes: Mutex<HashMap<String, VecDeque<StubResponse>>>,
        calls: Mutex<Vec<String>>,
    }

    impl StubFetcher {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_page(self, url: &str, body: &str) -> Self {
            self.with_sequence(url, vec![StubResponse::Body(body.to_string())])
        }

        pub fn with_failure(self, url: &str) -> Self {
            self.with_sequence(url, vec![StubResponse::Fail])
        }

        pub fn with_sequence(self, url: &str, responses: Vec<StubResponse>) -> Self {
            self.routes
                .lock()
                .unwrap()
                .insert(url.to_string(), responses.into());
            self
        }

        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }

        pub fn calls_to(&self, url: &str) -> usize {
            self.calls.lock().unwrap().iter().filter(|u| *u == url).count()
        }
    }

    impl PageFetcher for StubFetcher {
        async fn fetch(&self, url: &str, _timeout: Duration) -> Result<String, ScrapeError> {
            self.calls.lock().unwrap().push(url.to_string());
            let mut routes = self.routes.lock().unwrap();
            let response = match routes.get_mut(url) {
                Some(queue) if queue.len() > 1 => queue.pop_front(),
                Some(queue) => queue.front().cloned(),
                None => None,
            };
            match response {
                Some(StubResponse::Body(body)) => Ok(body),
                Some(StubResponse::Fail) => Err(ScrapeError::transport(url, "simulated failure")),
                None => Err(ScrapeError::transport(url, "HTTP status 404 Not Found")),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{StubFetcher, StubResponse};
    use super::*;

    #[test]
    fn test_http_fetcher_builds() {
        assert!(HttpFetcher::new("coworking_scraper/test").is_ok());
    }

    #[tokio::test]
    async fn test_stub_sequence_then_repeat() {
        let stub = StubFetcher::new().with_sequence(
            "https://example.com",
            vec![StubResponse::Fail, StubResponse::Body("ok".to_string())],
        );
        let timeout = Duration::from_secs(1);
        assert!(stub.fetch("https://example.com", timeout).await.is_err());
        assert_eq!(stub.fetch("https://example.com", timeout).await.unwrap(), "ok");
        assert_eq!(stub.fetch("https://example.com", timeout).await.unwrap(), "ok");
        assert_eq!(stub.calls_to("https://example.com"), 3);
    }

    #[tokio::test]
    async fn test_unknown_url_is_transport_error() {
        let stub = StubFetcher::new();
        let err = (&stub)
            .fetch("https://example.com/missing", Duration::from_secs(1))
            .await
            .unwrap_err();
        assert!(matches!(err, ScrapeError::Transport { .. }));
    }
}
