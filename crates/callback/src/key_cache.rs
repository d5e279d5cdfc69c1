//! Per-environment cache of the published signing keys.
//!
//! [`KeyCache`] holds the last fetched [`KeySet`] of one environment behind a
//! lock and swaps it wholesale on every fetch, so readers only ever see a
//! complete set.
//!
//! # Lookup
//!
//! ```text
//! kid arrives → set missing or older than the lifetime? fetch + swap
//!             → kid in set? return it
//!             → otherwise force one fetch + swap, look up again
//!             → still unknown? None
//! ```
//!
//! A key found in a fresh set is returned without touching the network, so
//! a rotated-in key costs one extra fetch and an unknown `kid` costs exactly
//! one.
//!
//! # Examples
//!
//! ```no_run
//! use std::sync::Arc;
//! use payconiq_callback::{Environment, HttpKeyFetcher, KeyCache};
//!
//! async fn example() {
//!     let cache = KeyCache::new(Environment::External, Arc::new(HttpKeyFetcher::new()));
//!     let key = cache.get_key("es256-2024").await;
//! }
//! ```

use std::{
    collections::HashMap,
    fmt,
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use chrono::{DateTime, Utc};
use fail::fail_point;
use parking_lot::RwLock;

use crate::{
    environment::Environment,
    error::{CallbackError, Result},
    key_fetcher::KeyFetcher,
    signing_key::SigningKey,
    time_source::{SystemTimeSource, TimeSource},
};

/// How long a fetched key set is trusted before it is refetched (12 hours).
pub const KEY_SET_LIFETIME: Duration = Duration::from_secs(12 * 60 * 60);

/// An immutable snapshot of an environment's signing keys.
#[derive(Debug)]
pub struct KeySet {
    keys: HashMap<String, Arc<SigningKey>>,
    fetched_at: DateTime<Utc>,
}

impl KeySet {
    /// Builds a set from `keys`, stamped with `fetched_at`.
    ///
    /// Later duplicates of a `kid` replace earlier ones.
    #[must_use]
    pub fn new(keys: Vec<SigningKey>, fetched_at: DateTime<Utc>) -> Self {
        let keys =
            keys.into_iter().map(|key| (key.kid().to_owned(), Arc::new(key))).collect();
        Self { keys, fetched_at }
    }

    /// Looks up a key by `kid`.
    #[must_use]
    pub fn get(&self, kid: &str) -> Option<Arc<SigningKey>> {
        self.keys.get(kid).cloned()
    }

    /// When the set was fetched or installed.
    #[must_use]
    pub fn fetched_at(&self) -> DateTime<Utc> {
        self.fetched_at
    }

    /// Number of keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Whether the set holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Key identifiers in the set, sorted.
    #[must_use]
    pub fn kids(&self) -> Vec<&str> {
        let mut kids: Vec<&str> = self.keys.keys().map(String::as_str).collect();
        kids.sort_unstable();
        kids
    }

    fn is_stale(&self, now: DateTime<Utc>, lifetime: Duration) -> bool {
        // A lifetime beyond chrono's range never expires.
        match chrono::Duration::from_std(lifetime) {
            Ok(lifetime) => now - self.fetched_at > lifetime,
            Err(_) => false,
        }
    }
}

/// Cache of one environment's published signing keys.
///
/// Shared between verifiers via `Arc`. The lock guarding the current set is
/// never held across an await; concurrent misses may fetch redundantly and
/// the last completed fetch wins.
pub struct KeyCache {
    environment: Environment,
    fetcher: Arc<dyn KeyFetcher>,
    current: RwLock<Option<Arc<KeySet>>>,
    lifetime: Duration,
    time_source: Arc<dyn TimeSource>,
    fetches: AtomicU64,
}

impl KeyCache {
    /// Creates an empty cache for `environment` using the system clock.
    #[must_use]
    pub fn new(environment: Environment, fetcher: Arc<dyn KeyFetcher>) -> Self {
        Self::with_time_source(environment, fetcher, Arc::new(SystemTimeSource))
    }

    /// Creates an empty cache reading "now" from `time_source`.
    #[must_use]
    pub fn with_time_source(
        environment: Environment,
        fetcher: Arc<dyn KeyFetcher>,
        time_source: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            environment,
            fetcher,
            current: RwLock::new(None),
            lifetime: KEY_SET_LIFETIME,
            time_source,
            fetches: AtomicU64::new(0),
        }
    }

    /// Overrides the key set lifetime (default [`KEY_SET_LIFETIME`]).
    #[must_use]
    pub fn with_lifetime(mut self, lifetime: Duration) -> Self {
        self.lifetime = lifetime;
        self
    }

    /// The environment whose keys this cache holds.
    #[must_use]
    pub fn environment(&self) -> Environment {
        self.environment
    }

    /// The configured key set lifetime.
    #[must_use]
    pub fn lifetime(&self) -> Duration {
        self.lifetime
    }

    /// Resolves `kid` to a signing key.
    ///
    /// Returns `Ok(None)` when the key is unknown even after one forced
    /// refetch.
    ///
    /// # Errors
    ///
    /// Returns [`CallbackError::KeyFetch`] when a required fetch fails.
    #[tracing::instrument(skip(self), fields(environment = %self.environment))]
    pub async fn get_key(&self, kid: &str) -> Result<Option<Arc<SigningKey>>> {
        let now = self.time_source.now();
        let set = match self.snapshot() {
            Some(set) if !set.is_stale(now, self.lifetime) => set,
            Some(_) => {
                tracing::debug!("key set stale, refetching");
                self.refresh().await?
            },
            None => {
                tracing::debug!("no key set yet, fetching");
                self.refresh().await?
            },
        };

        if let Some(key) = set.get(kid) {
            return Ok(Some(key));
        }

        tracing::debug!("unknown kid, forcing refetch");
        let set = self.refresh().await?;
        let key = set.get(kid);
        if key.is_none() {
            tracing::debug!(known = ?set.kids(), "kid unknown after refetch");
        }
        Ok(key)
    }

    /// Fetches the key set now and installs it, regardless of age.
    ///
    /// # Errors
    ///
    /// Returns [`CallbackError::KeyFetch`] when the fetch fails; the
    /// previous set is kept in that case.
    #[tracing::instrument(skip(self), fields(environment = %self.environment))]
    pub async fn refresh(&self) -> Result<Arc<KeySet>> {
        fail_point!("key-cache-before-fetch", |_| {
            Err(CallbackError::key_fetch("injected failure before key fetch"))
        });

        self.fetches.fetch_add(1, Ordering::AcqRel);
        let keys = self.fetcher.fetch(self.environment).await?;
        let set = Arc::new(KeySet::new(keys, self.time_source.now()));
        *self.current.write() = Some(Arc::clone(&set));

        tracing::debug!(keys = set.len(), "installed key set");
        Ok(set)
    }

    /// Installs a caller-supplied key set, stamped with the current time.
    pub fn replace_keys(&self, keys: Vec<SigningKey>) -> Arc<KeySet> {
        let set = Arc::new(KeySet::new(keys, self.time_source.now()));
        *self.current.write() = Some(Arc::clone(&set));
        tracing::info!(environment = %self.environment, keys = set.len(), "key set replaced");
        set
    }

    /// The currently installed key set, if any.
    #[must_use]
    pub fn snapshot(&self) -> Option<Arc<KeySet>> {
        self.current.read().clone()
    }

    /// Drops the installed key set; the next lookup fetches.
    pub fn clear(&self) {
        *self.current.write() = None;
        tracing::info!(environment = %self.environment, "key set cleared");
    }

    /// Number of fetches attempted through this cache.
    #[must_use]
    pub fn fetch_count(&self) -> u64 {
        self.fetches.load(Ordering::Acquire)
    }
}

impl fmt::Debug for KeyCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyCache")
            .field("environment", &self.environment)
            .field("lifetime", &self.lifetime)
            .field("keys", &self.snapshot().map(|set| set.len()))
            .field("fetches", &self.fetch_count())
            .finish_non_exhaustive()
    }
}
