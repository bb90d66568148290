//! Salesforce REST API client
//!
//! Provides a typed HTTP client for the versioned REST surface of one org.
//! Handles authentication headers and endpoint construction; the session
//! module decides which token is current.
//!
//! ## Usage
//!
//! ```rust,no_run
//! use crmsync_salesforce::client::SalesforceClient;
//!
//! let client = SalesforceClient::with_base_url("https://example.my.salesforce.com", "v60.0")?;
//! let url = client.data_url("/limits");
//! assert!(url.ends_with("/services/data/v60.0/limits"));
//! # Ok::<(), crmsync_salesforce::SalesforceError>(())
//! ```

use std::time::Duration;

use crmsync_core::config::SalesforceConfig;
use reqwest::{Client, Method, RequestBuilder};

use crate::{session::AccessToken, SalesforceError};

/// Default transport timeout applied when none is configured
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// SalesforceClient
// ============================================================================

/// HTTP client for Salesforce REST calls
///
/// Wraps `reqwest::Client` with bearer authentication and base URL
/// construction for `{instance_url}/services/data/{api_version}`.
#[derive(Debug, Clone)]
pub struct SalesforceClient {
    /// The underlying HTTP client
    client: Client,
    /// Org base URL without trailing slash
    instance_url: String,
    /// REST API version segment, e.g. `v60.0`
    api_version: String,
}

impl SalesforceClient {
    /// Creates a client from the Salesforce configuration section
    ///
    /// # Errors
    /// Returns [`SalesforceError::Configuration`] if the HTTP client cannot be built.
    pub fn new(config: &SalesforceConfig) -> Result<Self, SalesforceError> {
        let client = build_http(Duration::from_secs(config.request_timeout_secs))?;
        Ok(Self::from_parts(
            client,
            &config.instance_url,
            &config.api_version,
        ))
    }

    /// Creates a client with a custom base URL (useful for testing)
    ///
    /// # Errors
    /// Returns [`SalesforceError::Configuration`] if the HTTP client cannot be built.
    pub fn with_base_url(
        instance_url: impl AsRef<str>,
        api_version: impl AsRef<str>,
    ) -> Result<Self, SalesforceError> {
        let client = build_http(DEFAULT_TIMEOUT)?;
        Ok(Self::from_parts(
            client,
            instance_url.as_ref(),
            api_version.as_ref(),
        ))
    }

    fn from_parts(client: Client, instance_url: &str, api_version: &str) -> Self {
        Self {
            client,
            instance_url: instance_url.trim_end_matches('/').to_string(),
            api_version: api_version.to_string(),
        }
    }

    /// Absolute URL for a path under the versioned data API
    ///
    /// # Arguments
    /// * `path` - Path relative to `/services/data/{version}`, e.g. `/limits`
    pub fn data_url(&self, path: &str) -> String {
        format!(
            "{}/services/data/{}{}",
            self.instance_url, self.api_version, path
        )
    }

    /// Creates an authenticated request builder for the given method and path
    ///
    /// # Arguments
    /// * `method` - HTTP method
    /// * `path` - Path relative to the versioned data API
    /// * `token` - Bearer credential from the session manager
    pub fn request(&self, method: Method, path: &str, token: &AccessToken) -> RequestBuilder {
        self.client
            .request(method, self.data_url(path))
            .bearer_auth(token.secret())
    }

    /// Returns the org base URL
    pub fn instance_url(&self) -> &str {
        &self.instance_url
    }

    /// Returns the REST API version segment
    pub fn api_version(&self) -> &str {
        &self.api_version
    }

    /// Returns a reference to the underlying HTTP client
    ///
    /// The token exchange shares this client so both paths honour the same timeout.
    pub(crate) fn http_client(&self) -> &Client {
        &self.client
    }
}

fn build_http(timeout: Duration) -> Result<Client, SalesforceError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| SalesforceError::Configuration(e.to_string()))
}
