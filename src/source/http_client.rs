//! Shared HTTP client construction policy for source clients.
//!
//! This module centralizes networking defaults so both sites stay consistent
//! on timeout, user-agent, compression, referer, and proxy compatibility.

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, REFERER};
use reqwest::{Client, ClientBuilder, Proxy, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::user_agent;

use super::SourceError;

/// Default connect timeout for source requests.
pub const CONNECT_TIMEOUT_SECS: u64 = 10;

/// Default read timeout for source requests and page downloads.
pub const READ_TIMEOUT_SECS: u64 = 20;

/// Timeout configuration applied to every source client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HttpTimeouts {
    /// Connect timeout in seconds.
    pub connect_timeout_secs: u64,
    /// Total request timeout in seconds.
    pub read_timeout_secs: u64,
}

impl Default for HttpTimeouts {
    fn default() -> Self {
        Self {
            connect_timeout_secs: CONNECT_TIMEOUT_SECS,
            read_timeout_secs: READ_TIMEOUT_SECS,
        }
    }
}

/// Builds a source HTTP client using shared project policy.
///
/// `base_url` is sent as the `Referer` header; both sites gate images on it.
///
/// # Errors
///
/// Returns [`SourceError::ClientBuild`] when client construction fails.
pub fn build_source_http_client(
    source_name: &str,
    base_url: &str,
    timeouts: HttpTimeouts,
) -> Result<Client, SourceError> {
    match try_build_client(base_url, timeouts, false) {
        Ok(client) => Ok(client),
        Err(BuildClientFailure::Panic) => {
            // Some restricted sandbox environments panic when querying system
            // proxy settings. The fallback keeps env-proxy support.
            warn!(
                source = source_name,
                "Source client hit system proxy panic; using env-proxy fallback builder"
            );
            match try_build_client(base_url, timeouts, true) {
                Ok(client) => Ok(client),
                Err(BuildClientFailure::Panic) => Err(SourceError::client_build(
                    source_name,
                    "HTTP client construction panicked while initializing networking",
                )),
                Err(BuildClientFailure::Build(error)) => Err(SourceError::client_build(
                    source_name,
                    format!("HTTP client construction failed: {error}"),
                )),
            }
        }
        Err(BuildClientFailure::Build(error)) => Err(SourceError::client_build(
            source_name,
            format!("HTTP client construction failed: {error}"),
        )),
    }
}

enum BuildClientFailure {
    Panic,
    Build(reqwest::Error),
}

fn try_build_client(
    base_url: &str,
    timeouts: HttpTimeouts,
    disable_system_proxy_lookup: bool,
) -> Result<Client, BuildClientFailure> {
    let base_url = base_url.to_string();
    catch_unwind(AssertUnwindSafe(move || {
        let mut builder = base_builder(&base_url, timeouts);
        if disable_system_proxy_lookup {
            builder = apply_env_proxy_fallback(builder.no_proxy());
        }
        builder.build().map_err(BuildClientFailure::Build)
    }))
    .map_err(|_| BuildClientFailure::Panic)?
}

fn base_builder(base_url: &str, timeouts: HttpTimeouts) -> ClientBuilder {
    let mut headers = HeaderMap::new();
    if let Ok(referer) = HeaderValue::from_str(base_url) {
        headers.insert(REFERER, referer);
    }

    Client::builder()
        .connect_timeout(Duration::from_secs(timeouts.connect_timeout_secs))
        .timeout(Duration::from_secs(timeouts.read_timeout_secs))
        .user_agent(user_agent::default_source_user_agent())
        .default_headers(headers)
        .gzip(true)
}

fn apply_env_proxy_fallback(mut builder: ClientBuilder) -> ClientBuilder {
    if let Some(proxy) = env_proxy_for_scheme("https")
        && let Ok(resolved) = Proxy::https(&proxy)
    {
        builder = builder.proxy(resolved);
    }
    if let Some(proxy) = env_proxy_for_scheme("http")
        && let Ok(resolved) = Proxy::http(&proxy)
    {
        builder = builder.proxy(resolved);
    }
    builder
}

fn env_proxy_for_scheme(scheme: &str) -> Option<String> {
    match scheme {
        "https" => find_first_proxy_var(&["HTTPS_PROXY", "https_proxy", "ALL_PROXY", "all_proxy"]),
        "http" => find_first_proxy_var(&["HTTP_PROXY", "http_proxy", "ALL_PROXY", "all_proxy"]),
        _ => None,
    }
}

fn find_first_proxy_var(names: &[&str]) -> Option<String> {
    names.iter().find_map(|name| {
        std::env::var(name)
            .ok()
            .map(|value| value.trim().to_string())
            .filter(|value| !value.is_empty())
    })
}

/// Sends a request and maps transport and status failures to [`SourceError`].
pub(crate) async fn send_checked(
    source_name: &str,
    url: &str,
    request: RequestBuilder,
) -> Result<Response, SourceError> {
    let response = request
        .send()
        .await
        .map_err(|error| SourceError::unavailable(source_name, url, error))?;

    let status = response.status();
    if !status.is_success() {
        debug!(source = source_name, url, status = status.as_u16(), "Source returned error status");
        return Err(SourceError::http_status(source_name, url, status.as_u16()));
    }
    Ok(response)
}

/// Fetches a response body as text.
pub(crate) async fn fetch_text(
    source_name: &str,
    url: &str,
    request: RequestBuilder,
) -> Result<String, SourceError> {
    send_checked(source_name, url, request)
        .await?
        .text()
        .await
        .map_err(|error| SourceError::unavailable(source_name, url, error))
}

/// Fetches a response body and decodes it as JSON.
///
/// Body decoding failures surface as [`SourceError::Parse`], not as network errors.
pub(crate) async fn fetch_json<T: DeserializeOwned>(
    source_name: &str,
    url: &str,
    request: RequestBuilder,
) -> Result<T, SourceError> {
    let body = fetch_text(source_name, url, request).await?;
    serde_json::from_str(&body)
        .map_err(|error| SourceError::parse(source_name, url, format!("invalid JSON: {error}")))
}
