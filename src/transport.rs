use std::collections::BTreeMap;
use std::thread;
use std::time::Duration;

use reqwest::blocking::{Client as HttpClient, Response};
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use serde_json::{Map, Value};

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::util::{backoff, retriable_status, urljoin};

/// A raw response body, classified by the `Content-Type` header.
#[derive(Debug, Clone)]
pub(crate) enum RawContent {
    Json(Value),
    Binary(Vec<u8>),
    Text(String),
}

/// Blocking HTTP transport for the GENESIS-Online REST service.
///
/// Every request carries the session's `username`, `password`, and
/// `language` query parameters; per-call parameters are merged on top and
/// may override the session language.
#[derive(Debug, Clone)]
pub(crate) struct Transport {
    http: HttpClient,
    base_url: String,
    username: String,
    password: String,
    language: String,
    timeout: Duration,
    retry_max: usize,
    sleep_max: Duration,
}

impl Transport {
    pub(crate) fn new(cfg: &ClientConfig) -> Result<Self> {
        let mut default_headers = HeaderMap::new();
        default_headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&format!("genesisonline-rs/{}", env!("CARGO_PKG_VERSION")))
                .unwrap_or(HeaderValue::from_static("genesisonline-rs")),
        );

        let http = HttpClient::builder()
            .default_headers(default_headers)
            .build()
            .map_err(Error::Request)?;

        Ok(Transport {
            http,
            base_url: cfg.url.clone(),
            username: cfg.username.clone(),
            password: cfg.password.clone(),
            language: cfg.language.clone(),
            timeout: Duration::from_secs(60),
            retry_max: 5,
            sleep_max: Duration::from_secs(120),
        })
    }

    pub(crate) fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }

    pub(crate) fn set_retry(&mut self, retry_max: usize, sleep_max: Duration) {
        self.retry_max = retry_max.max(1);
        self.sleep_max = sleep_max;
    }

    /// The session language sent with every request unless overridden.
    pub(crate) fn language(&self) -> &str {
        &self.language
    }

    /// Issues a GET against `{base_url}/{path}` and classifies the body by
    /// content type. `params` are the caller-supplied query parameters; they
    /// are also checked against the parameter names the server declares in
    /// JSON responses (mismatches warn, never fail).
    pub(crate) fn get(&self, path: &str, params: &[(String, String)]) -> Result<RawContent> {
        let url = urljoin(&self.base_url, path);

        let mut query: BTreeMap<&str, &str> = BTreeMap::new();
        query.insert("username", &self.username);
        query.insert("password", &self.password);
        query.insert("language", &self.language);
        for (k, v) in params {
            query.insert(k, v);
        }
        let query: Vec<(&str, &str)> = query.into_iter().collect();

        let resp = self.robust_get(&url, &query)?;
        let status = resp.status();
        let resp = resp
            .error_for_status()
            .map_err(|e| Error::Http { status, url: url.clone(), source: e })?;

        let content_type = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        if content_type.contains("application/json") {
            let value: Value = resp.json().map_err(Error::from_reqwest)?;
            if let Some(expected) = value.get("Parameter").and_then(Value::as_object) {
                let mismatched = unexpected_params(expected, params.iter().map(|(k, _)| k.as_str()));
                if !mismatched.is_empty() {
                    log::warn!(
                        "received unexpected parameter(s) {:?}; expected one of {:?}",
                        mismatched,
                        expected.keys().collect::<Vec<_>>()
                    );
                }
            }
            Ok(RawContent::Json(value))
        } else if content_type.contains("image/png") {
            Ok(RawContent::Binary(resp.bytes().map_err(Error::from_reqwest)?.to_vec()))
        } else if content_type.contains("text/csv") {
            Ok(RawContent::Text(resp.text().map_err(Error::from_reqwest)?))
        } else {
            Err(Error::UnexpectedContent { content_type })
        }
    }

    fn robust_get(&self, url: &str, query: &[(&str, &str)]) -> Result<Response> {
        let mut tries = 0usize;
        let mut sleep = Duration::from_secs(1);

        loop {
            match self.http.get(url).timeout(self.timeout).query(query).send() {
                Ok(resp) => {
                    if retriable_status(resp.status().as_u16()) && tries + 1 < self.retry_max {
                        tries += 1;
                        thread::sleep(sleep);
                        sleep = backoff(sleep, self.sleep_max);
                        continue;
                    }
                    return Ok(resp);
                }
                Err(err) => {
                    // Timeouts surface immediately; transient connection
                    // errors are retried up to the limit.
                    if err.is_timeout() || tries + 1 >= self.retry_max {
                        return Err(Error::from_reqwest(err));
                    }
                    tries += 1;
                    thread::sleep(sleep);
                    sleep = backoff(sleep, self.sleep_max);
                }
            }
        }
    }
}

/// Caller-supplied parameter names absent from the set the server declares
/// as accepted for the endpoint.
pub(crate) fn unexpected_params<'a>(
    expected: &Map<String, Value>,
    received: impl Iterator<Item = &'a str>,
) -> Vec<String> {
    received.filter(|name| !expected.contains_key(*name)).map(str::to_string).collect()
}
