//! Process-wide bearer token cache keyed by requested scope list.
//!
//! [`TokenCache::get_token`] reuses a cached [`Token`] while the current instant is strictly
//! before its expiry minus a ten second skew, and otherwise asks the injected
//! [`CredentialFetcher`] for a new one. Concurrent misses for the same scope key are coalesced
//! behind a per-key singleflight guard: the first caller fetches, the others wait on the guard
//! and then observe the freshly cached token. Fetch failures are returned verbatim and never
//! retried here; the processor folds them into its requeue path.

mod metrics;

pub use self::metrics::CacheMetrics;

// self
use crate::{
	_prelude::*,
	auth::{ScopeList, Token},
	error::CredentialError,
};

/// Boxed future returned by [`CredentialFetcher::fetch`].
pub type CredentialFuture<'a> =
	Pin<Box<dyn Future<Output = Result<Token, CredentialError>> + 'a + Send>>;

/// Capability that acquires a new bearer token for a scope list.
///
/// Implementations may block on network or secret-store I/O.
pub trait CredentialFetcher
where
	Self: Send + Sync,
{
	/// Fetches a token covering `scopes`.
	fn fetch<'a>(&'a self, scopes: &'a ScopeList) -> CredentialFuture<'a>;
}

/// Memoizes tokens per scope key; owned by the host process and shared by reference.
pub struct TokenCache {
	fetcher: Arc<dyn CredentialFetcher>,
	entries: RwLock<HashMap<String, Token>>,
	guards: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
	skew: Duration,
	metrics: CacheMetrics,
}
impl TokenCache {
	/// Safety margin subtracted from every token's stated expiry.
	pub const DEFAULT_SKEW: Duration = Duration::seconds(10);

	/// Creates an empty cache backed by `fetcher`.
	pub fn new(fetcher: Arc<dyn CredentialFetcher>) -> Self {
		Self {
			fetcher,
			entries: Default::default(),
			guards: Default::default(),
			skew: Self::DEFAULT_SKEW,
			metrics: Default::default(),
		}
	}

	/// Overrides the expiry skew; negative values are clamped to zero.
	pub fn with_skew(mut self, skew: Duration) -> Self {
		self.skew = if skew.is_negative() { Duration::ZERO } else { skew };

		self
	}

	/// Configured expiry skew.
	pub fn skew(&self) -> Duration {
		self.skew
	}

	/// Hit/fetch/failure counters.
	pub fn metrics(&self) -> &CacheMetrics {
		&self.metrics
	}

	/// Returns a fresh token for `scopes`, fetching only when the cached one is missing or
	/// within the skew of its expiry.
	pub async fn get_token(&self, scopes: &ScopeList) -> Result<Token, CredentialError> {
		self.get_token_with(scopes, OffsetDateTime::now_utc).await
	}

	/// Same as [`get_token`](Self::get_token) but evaluates freshness against a fixed instant.
	pub async fn get_token_at(
		&self,
		scopes: &ScopeList,
		now: OffsetDateTime,
	) -> Result<Token, CredentialError> {
		self.get_token_with(scopes, || now).await
	}

	/// Returns the cached token for `scopes` without checking freshness.
	pub fn peek(&self, scopes: &ScopeList) -> Option<Token> {
		self.entries.read().get(&scopes.cache_key()).cloned()
	}

	async fn get_token_with<F>(
		&self,
		scopes: &ScopeList,
		clock: F,
	) -> Result<Token, CredentialError>
	where
		F: Fn() -> OffsetDateTime,
	{
		let key = scopes.cache_key();

		if let Some(token) = self.fresh(&key, clock()) {
			return Ok(token);
		}

		let guard = self.guard(&key);
		let _singleflight = guard.lock().await;

		// Another caller may have refreshed while this one waited on the guard.
		if let Some(token) = self.fresh(&key, clock()) {
			return Ok(token);
		}

		tracing::info!(scope = %key, "getting new token");
		self.metrics.record_fetch();

		let token = self.fetcher.fetch(scopes).await.inspect_err(|err| {
			self.metrics.record_failure();
			tracing::warn!(scope = %key, error = %err, "token fetch failed");
		})?;

		tracing::info!(
			scope = %key,
			expires_at = %token.effective_expiry(self.skew),
			"got new token"
		);
		self.entries.write().insert(key, token.clone());

		Ok(token)
	}

	fn fresh(&self, key: &str, now: OffsetDateTime) -> Option<Token> {
		let entries = self.entries.read();
		let token = entries.get(key)?;

		if token.is_fresh_at(now, self.skew) {
			self.metrics.record_hit();
			tracing::debug!(
				scope = %key,
				expires_at = %token.effective_expiry(self.skew),
				"getting token from cache"
			);

			Some(token.clone())
		} else {
			tracing::debug!(
				scope = %key,
				expired_at = %token.effective_expiry(self.skew),
				"cached token expired"
			);

			None
		}
	}

	fn guard(&self, key: &str) -> Arc<AsyncMutex<()>> {
		let mut guards = self.guards.lock();

		guards.entry(key.to_owned()).or_insert_with(|| Arc::new(AsyncMutex::new(()))).clone()
	}
}
impl Debug for TokenCache {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("TokenCache")
			.field("cached_keys", &self.entries.read().len())
			.field("skew", &self.skew)
			.field("metrics", &self.metrics)
			.finish()
	}
}
