//! Authenticated HTTP client for the catalog API.
//!
//! The client is constructed once from an [`ApiConfig`] and passed by
//! reference into each fetch operation. Credentials are baked into the
//! underlying [`reqwest::Client`] as default headers, so no call site ever
//! touches process-wide state.

use reqwest::header::{HeaderMap, HeaderValue};
use serde::de::DeserializeOwned;
use url::Url;

use crate::types::ExportError;

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "X-API-Key";
/// Header carrying the storefront client token.
pub const CLIENT_TOKEN_HEADER: &str = "X-Spree-Client-Token";

const USER_AGENT: &str = concat!("shelfgrab/", env!("CARGO_PKG_VERSION"));

/// Connection settings for the catalog API.
#[derive(Clone, Debug)]
pub struct ApiConfig {
    pub base_url: Url,
    pub api_key: String,
    pub client_token: String,
}

/// Immutable, cloneable handle to the catalog API.
#[derive(Clone, Debug)]
pub struct ApiClient {
    http: reqwest::Client,
    base: Url,
}

impl ApiClient {
    /// Builds a client with the fixed auth headers installed.
    pub fn new(config: &ApiConfig) -> Result<Self, ExportError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            API_KEY_HEADER,
            HeaderValue::from_str(&config.api_key).map_err(|source| {
                ExportError::Credential {
                    header: API_KEY_HEADER,
                    source,
                }
            })?,
        );
        headers.insert(
            CLIENT_TOKEN_HEADER,
            HeaderValue::from_str(&config.client_token).map_err(|source| {
                ExportError::Credential {
                    header: CLIENT_TOKEN_HEADER,
                    source,
                }
            })?,
        );

        let http = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .default_headers(headers)
            .use_rustls_tls()
            .build()?;

        Ok(Self {
            http,
            base: config.base_url.clone(),
        })
    }

    /// Base URL this client was configured with.
    pub fn base_url(&self) -> &Url {
        &self.base
    }

    /// Issues a GET against `path` (relative to the base URL) and decodes the
    /// JSON body into `T`. Non-2xx statuses are reported as errors.
    pub async fn get<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> Result<T, ExportError> {
        let url = self.endpoint(path)?;
        let response = self
            .http
            .get(url)
            .query(query)
            .send()
            .await?
            .error_for_status()?;
        Ok(response.json::<T>().await?)
    }

    fn endpoint(&self, path: &str) -> Result<Url, ExportError> {
        let joined = format!(
            "{}/{}",
            self.base.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Ok(Url::parse(&joined)?)
    }
}
