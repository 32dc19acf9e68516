//! CVAT API client split into focused submodules.
//!
//! The `CvatClient` struct and its methods are organized by domain:
//! - this module - HTTP plumbing and the typed, drift-checked [`CvatClient::fetch`]
//! - [`loaders`] - project, task, metadata and annotation loading
//! - [`export`] - dataset export polling, download and image extraction

mod export;
mod loaders;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

pub use export::ExportState;

use crate::config::Config;
use crate::drift::{self, SchemaDrift};
use crate::error::{Error, Result};
use crate::retry::request_with_retry;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

/// Client for one CVAT server
///
/// Every call is independent: nothing fetched is cached between calls.
#[derive(Clone, Debug)]
pub struct CvatClient {
    /// Shared HTTP connection pool
    pub(crate) http: reqwest::Client,
    /// Validated configuration
    pub(crate) config: Config,
}

impl CvatClient {
    /// Create a client after validating the configuration
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let http = reqwest::Client::builder().build()?;
        Ok(Self { http, config })
    }

    /// The configuration this client was built with
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Absolute URL for an API path such as `tasks/3`
    pub(crate) fn api_url(&self, path: &str) -> String {
        format!("{}/{}", self.config.base_url(), path.trim_start_matches('/'))
    }

    /// GET request with credentials applied
    pub(crate) fn get(&self, url: &str) -> reqwest::RequestBuilder {
        let request = self.http.get(url);
        match &self.config.username {
            Some(username) => request.basic_auth(username, self.config.password.as_deref()),
            None => request,
        }
    }

    /// GET a JSON document, retrying transient transport failures
    pub(crate) async fn get_json(&self, url: &str) -> Result<serde_json::Value> {
        let timeout = self.config.request_timeout;
        let response = request_with_retry(&self.config.retry, || async move {
            self.get(url)
                .timeout(timeout)
                .send()
                .await
                .map_err(Error::from)
        })
        .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Http {
                status: status.as_u16(),
                url: url.to_string(),
            });
        }

        Ok(response.json::<serde_json::Value>().await?)
    }

    /// Fetch a record and check it for schema drift
    ///
    /// The body is decoded into `T` with strict field presence. The decoded record is
    /// then re-encoded and compared against the raw body; any difference is logged as
    /// a warning and the record is returned regardless.
    pub async fn fetch<T>(&self, url: &str) -> Result<T>
    where
        T: DeserializeOwned + Serialize,
    {
        let (record, _) = self.fetch_with_drift(url).await?;
        Ok(record)
    }

    /// Like [`fetch`](Self::fetch), also returning the detected drift
    pub async fn fetch_with_drift<T>(&self, url: &str) -> Result<(T, SchemaDrift)>
    where
        T: DeserializeOwned + Serialize,
    {
        let raw = self.get_json(url).await?;
        let record: T = serde_json::from_value(raw.clone())?;

        let drift = match drift::detect(&record, &raw) {
            Ok(drift) => drift,
            Err(e) => {
                warn!(url, error = %e, "could not re-encode record for schema check");
                SchemaDrift::default()
            }
        };

        if drift.is_empty() {
            debug!(url, record = record_name::<T>(), "fetched record");
        } else {
            warn!(
                url,
                record = record_name::<T>(),
                unmodelled = ?drift.unmodelled,
                unexpected = ?drift.unexpected,
                changed = ?drift.changed,
                "{} model doesn't match the payload returned by the CVAT API",
                record_name::<T>()
            );
        }

        Ok((record, drift))
    }
}

/// Short type name of a record, e.g. `TaskRecord`
fn record_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}
