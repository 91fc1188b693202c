// std
use std::sync::atomic::{AtomicU64, Ordering};

/// Thread-safe counters for token cache lookups.
#[derive(Debug, Default)]
pub struct CacheMetrics {
	hits: AtomicU64,
	fetches: AtomicU64,
	failures: AtomicU64,
}
impl CacheMetrics {
	/// Lookups answered from the cache.
	pub fn hits(&self) -> u64 {
		self.hits.load(Ordering::Relaxed)
	}

	/// Calls made to the credential fetcher.
	pub fn fetches(&self) -> u64 {
		self.fetches.load(Ordering::Relaxed)
	}

	/// Fetcher calls that returned an error.
	pub fn failures(&self) -> u64 {
		self.failures.load(Ordering::Relaxed)
	}

	pub(crate) fn record_hit(&self) {
		self.hits.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_fetch(&self) {
		self.fetches.fetch_add(1, Ordering::Relaxed);
	}

	pub(crate) fn record_failure(&self) {
		self.failures.fetch_add(1, Ordering::Relaxed);
	}
}
