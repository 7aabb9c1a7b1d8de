use std::thread;
use std::time::Duration;

use reqwest::Url;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};
use serde_json::Value;
use tracing::{debug, warn};

use crate::config::ResolvedConfig;
use crate::error::BrapiError;

/// Query parameters of a single BrAPI call, in request order.
pub type Params<'a> = [(&'a str, String)];

pub trait BrapiClient: Send + Sync {
    /// Issues `GET <base>/<call>` and returns the decoded JSON document.
    fn get(&self, call: &str, params: &Params<'_>) -> Result<Value, BrapiError>;
}

impl<T: BrapiClient + ?Sized> BrapiClient for &T {
    fn get(&self, call: &str, params: &Params<'_>) -> Result<Value, BrapiError> {
        (**self).get(call, params)
    }
}

#[derive(Clone)]
pub struct BrapiHttpClient {
    client: Client,
    base_url: String,
    max_retries: usize,
}

impl BrapiHttpClient {
    pub fn new(base_url: &str, config: &ResolvedConfig) -> Result<Self, BrapiError> {
        let base_url = normalize_base_url(base_url)?;

        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("brapi2vcf/{}", env!("CARGO_PKG_VERSION")))
                .map_err(|err| BrapiError::Http(err.to_string()))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|err| BrapiError::Http(err.to_string()))?;

        Ok(Self {
            client,
            base_url,
            max_retries: config.max_retries,
        })
    }

    fn handle_status(
        response: reqwest::blocking::Response,
    ) -> Result<reqwest::blocking::Response, BrapiError> {
        if response.status().is_success() {
            return Ok(response);
        }
        let status = response.status().as_u16();
        let message = response
            .text()
            .unwrap_or_else(|_| "BrAPI request failed".to_string());
        Err(BrapiError::Status { status, message })
    }

    fn send_with_retries<F>(
        &self,
        mut make_req: F,
    ) -> Result<reqwest::blocking::Response, BrapiError>
    where
        F: FnMut() -> reqwest::blocking::RequestBuilder,
    {
        const BASE_DELAY_MS: u64 = 200;
        let mut attempt = 0usize;
        loop {
            let response = make_req().send();
            match response {
                Ok(resp) => {
                    let status = resp.status().as_u16();
                    if attempt < self.max_retries && is_retryable_status(status) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        warn!(status, attempt, "retrying BrAPI request");
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    if attempt < self.max_retries && is_retryable_error(&err) {
                        let delay = BASE_DELAY_MS * (attempt as u64 + 1);
                        warn!(error = %err, attempt, "retrying BrAPI request");
                        thread::sleep(Duration::from_millis(delay));
                        attempt += 1;
                        continue;
                    }
                    return Err(BrapiError::Http(err.to_string()));
                }
            }
        }
    }
}

impl BrapiClient for BrapiHttpClient {
    fn get(&self, call: &str, params: &Params<'_>) -> Result<Value, BrapiError> {
        let url = format!("{}/{}", self.base_url, call);
        debug!(%url, ?params, "BrAPI request");
        let response = self.send_with_retries(|| self.client.get(&url).query(params))?;
        let response = Self::handle_status(response)?;
        let body = response
            .text()
            .map_err(|err| BrapiError::Http(err.to_string()))?;
        serde_json::from_str(&body).map_err(|err| BrapiError::Decode(format!("{call}: {err}")))
    }
}

/// Validates the server address and strips trailing slashes so calls can be
/// appended with a single `/`.
pub fn normalize_base_url(raw: &str) -> Result<String, BrapiError> {
    let trimmed = raw.trim();
    let url = Url::parse(trimmed).map_err(|err| BrapiError::InvalidUrl(format!("{raw}: {err}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(BrapiError::InvalidUrl(format!(
            "{raw}: unsupported scheme {}",
            url.scheme()
        )));
    }
    Ok(trimmed.trim_end_matches('/').to_string())
}

fn is_retryable_status(status: u16) -> bool {
    matches!(status, 429 | 500 | 502 | 503 | 504)
}

fn is_retryable_error(err: &reqwest::Error) -> bool {
    err.is_timeout() || err.is_connect()
}
