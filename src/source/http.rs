//! Blocking HTTP client used for feeds and attachments.

use std::io::Read;
use std::time::Duration;

use reqwest::blocking::Client;

use super::HttpClient;
use crate::config::HttpConfig;
use crate::error::TransportError;

/// Maximum number of redirects to follow.
const MAX_REDIRECTS: usize = 5;

/// [`HttpClient`] backed by `reqwest::blocking`.
///
/// Must be built and dropped outside of an async context; serve mode creates
/// one per request inside `spawn_blocking`.
pub struct ReqwestClient {
    client: Client,
}

impl ReqwestClient {
    pub fn new(config: &HttpConfig) -> Result<Self, TransportError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.timeout_secs))
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| TransportError(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { client })
    }
}

impl HttpClient for ReqwestClient {
    fn get(&self, url: &str) -> Result<Box<dyn Read>, TransportError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| TransportError(format!("request to {url} failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransportError(format!("HTTP error from {url}: {status}")));
        }

        Ok(Box::new(response))
    }
}
