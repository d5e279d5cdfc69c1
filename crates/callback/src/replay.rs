//! Callback replay detection by jti.
//!
//! Every genuine callback carries a unique `https://payconiq.com/jti`. A
//! [`ReplayDetector`] remembers the jtis of accepted callbacks for as long as
//! they could still pass the freshness check, and rejects a second
//! presentation inside that window.
//!
//! Replay detection is opt-in: attach a detector with
//! [`CallbackVerifier::with_replay_detector`](crate::CallbackVerifier::with_replay_detector).
//!
//! ```no_run
//! use std::sync::Arc;
//! use payconiq_callback::InMemoryReplayDetector;
//!
//! let detector = Arc::new(InMemoryReplayDetector::new(10_000));
//! ```

use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::{future::Cache, policy::EvictionPolicy};

use crate::error::{CallbackError, Result};

/// Longest time a jti is remembered. Longer windows are clamped.
pub const MAX_REPLAY_WINDOW: Duration = Duration::from_secs(24 * 60 * 60);

/// Tracks seen callback jtis and rejects duplicates.
#[async_trait]
pub trait ReplayDetector: Send + Sync {
    /// Records `jti` as seen for `window`, at most [`MAX_REPLAY_WINDOW`].
    ///
    /// # Errors
    ///
    /// Returns the INVALID "Replayed jti" error if `jti` was recorded before
    /// and has not expired yet.
    async fn check_and_mark(&self, jti: &str, window: Duration) -> Result<()>;
}

/// Expires each entry at the instant stored as its value.
struct WindowExpiry;

impl moka::Expiry<String, Instant> for WindowExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &Instant,
        created_at: Instant,
    ) -> Option<Duration> {
        Some(value.saturating_duration_since(created_at))
    }
}

/// In-memory [`ReplayDetector`] backed by a [`moka::future::Cache`].
///
/// Entries expire with their window; the capacity bound evicts the least
/// recently used entry first.
pub struct InMemoryReplayDetector {
    seen: Cache<String, Instant>,
}

impl InMemoryReplayDetector {
    /// Creates a detector tracking at most `max_capacity` jtis.
    #[must_use]
    pub fn new(max_capacity: u64) -> Self {
        let seen = Cache::builder()
            .max_capacity(max_capacity)
            .eviction_policy(EvictionPolicy::lru())
            .expire_after(WindowExpiry)
            .build();
        Self { seen }
    }
}

impl std::fmt::Debug for InMemoryReplayDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InMemoryReplayDetector")
            .field("tracked", &self.seen.entry_count())
            .finish()
    }
}

#[async_trait]
impl ReplayDetector for InMemoryReplayDetector {
    async fn check_and_mark(&self, jti: &str, window: Duration) -> Result<()> {
        let now = Instant::now();
        let expires_at = now
            .checked_add(window.min(MAX_REPLAY_WINDOW))
            .unwrap_or(now);
        let entry = self.seen.entry(jti.to_owned()).or_insert(expires_at).await;
        if entry.is_fresh() {
            Ok(())
        } else {
            tracing::warn!(jti, "callback jti replayed");
            Err(CallbackError::replayed_jti())
        }
    }
}
