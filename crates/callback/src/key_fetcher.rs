//! Retrieval of the published signing key set.
//!
//! [`KeyFetcher`] is the seam between the key cache and the network.
//! [`HttpKeyFetcher`] downloads the certificates document of an
//! environment; [`MemoryKeyFetcher`] serves a fixed set for tests and
//! offline use.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use crate::{
    environment::Environment,
    error::{CallbackError, Result},
    signing_key::{Jwk, JwkSet, SigningKey, usable_keys},
};

/// Source of the published signing keys of an environment.
#[async_trait]
pub trait KeyFetcher: Send + Sync {
    /// Fetches the usable signing keys of `environment`.
    ///
    /// Unusable entries are already filtered out; the result may be empty.
    ///
    /// # Errors
    ///
    /// Returns [`CallbackError::KeyFetch`] when the key set cannot be
    /// retrieved or decoded.
    async fn fetch(&self, environment: Environment) -> Result<Vec<SigningKey>>;
}

/// Fetches the key set over HTTPS from the environment's certificates URL.
#[derive(Clone, Debug, Default)]
pub struct HttpKeyFetcher {
    client: reqwest::Client,
    endpoint: Option<String>,
}

impl HttpKeyFetcher {
    /// Creates a fetcher using the environment's published URL.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a fetcher sharing an existing HTTP client.
    #[must_use]
    pub fn with_client(client: reqwest::Client) -> Self {
        Self { client, endpoint: None }
    }

    /// Overrides the certificates URL for every environment.
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    fn url_for(&self, environment: Environment) -> &str {
        self.endpoint.as_deref().unwrap_or_else(|| environment.certificates_url())
    }
}

#[async_trait]
impl KeyFetcher for HttpKeyFetcher {
    #[tracing::instrument(skip(self))]
    async fn fetch(&self, environment: Environment) -> Result<Vec<SigningKey>> {
        let url = self.url_for(environment);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| CallbackError::key_fetch_with_source(format!("GET {url}"), e))?
            .error_for_status()
            .map_err(|e| CallbackError::key_fetch_with_source(format!("GET {url}"), e))?;

        let set: JwkSet = response
            .json()
            .await
            .map_err(|e| CallbackError::key_fetch_with_source("decoding key set", e))?;

        let published = set.keys.len();
        let keys = usable_keys(set.into_jwks());
        tracing::debug!(published, usable = keys.len(), "fetched signing keys");
        Ok(keys)
    }
}

/// In-memory [`KeyFetcher`] serving a configurable key set.
///
/// Counts fetches and can be told to fail, which makes it the fetcher of
/// choice for exercising the key cache.
#[derive(Debug, Default)]
pub struct MemoryKeyFetcher {
    jwks: RwLock<Vec<Jwk>>,
    failure: RwLock<Option<String>>,
    fetches: AtomicU64,
}

impl MemoryKeyFetcher {
    /// Creates a fetcher serving `jwks`.
    #[must_use]
    pub fn new(jwks: Vec<Jwk>) -> Self {
        Self { jwks: RwLock::new(jwks), ..Self::default() }
    }

    /// Replaces the served key set; the next fetch observes it.
    pub fn set_keys(&self, jwks: Vec<Jwk>) {
        *self.jwks.write() = jwks;
    }

    /// Makes every following fetch fail with `message`, or succeed again
    /// with `None`.
    pub fn set_failure(&self, message: Option<String>) {
        *self.failure.write() = message;
    }

    /// Number of fetches served so far, failed ones included.
    #[must_use]
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::Acquire)
    }
}

#[async_trait]
impl KeyFetcher for MemoryKeyFetcher {
    async fn fetch(&self, _environment: Environment) -> Result<Vec<SigningKey>> {
        self.fetches.fetch_add(1, Ordering::AcqRel);
        if let Some(message) = self.failure.read().clone() {
            return Err(CallbackError::key_fetch(message));
        }
        let jwks = self.jwks.read().clone();
        Ok(usable_keys(jwks))
    }
}
