//! Bearer tokens issued by a credential fetcher.

pub mod secret;

// self
use crate::{
	_prelude::*,
	auth::{ScopeList, token::secret::TokenSecret},
};

/// Issued bearer credential; immutable once handed out by the cache.
#[derive(Clone)]
pub struct Token {
	/// Access token secret; callers must avoid logging it.
	pub access_token: TokenSecret,
	/// Instant the issuer stated the token stops being valid.
	pub expires_at: OffsetDateTime,
	/// Scopes the token was requested for.
	pub scopes: ScopeList,
}
impl Token {
	/// Creates a token expiring at the provided instant.
	pub fn new(
		access_token: impl Into<String>,
		expires_at: OffsetDateTime,
		scopes: ScopeList,
	) -> Self {
		Self { access_token: TokenSecret::new(access_token), expires_at, scopes }
	}

	/// Creates a token that expires `lifetime` after `issued_at`, saturating at the
	/// representable date range.
	pub fn expiring_in(
		access_token: impl Into<String>,
		issued_at: OffsetDateTime,
		lifetime: Duration,
		scopes: ScopeList,
	) -> Self {
		Self::new(access_token, issued_at.saturating_add(lifetime), scopes)
	}

	/// Expiry pulled forward by `skew`.
	pub fn effective_expiry(&self, skew: Duration) -> OffsetDateTime {
		self.expires_at - skew
	}

	/// Returns `true` while `instant` is strictly before the skew-adjusted expiry.
	pub fn is_fresh_at(&self, instant: OffsetDateTime, skew: Duration) -> bool {
		instant < self.effective_expiry(skew)
	}
}
impl Debug for Token {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("Token")
			.field("access_token", &"<redacted>")
			.field("expires_at", &self.expires_at)
			.field("scopes", &self.scopes)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;

	#[test]
	fn freshness_respects_skew_boundary() {
		let scopes = ScopeList::new(["events.write"]).expect("Scope fixture should be valid.");
		let token = Token::new("access", macros::datetime!(2025-01-01 01:00 UTC), scopes);
		let skew = Duration::seconds(10);

		assert!(token.is_fresh_at(macros::datetime!(2025-01-01 00:59:49 UTC), skew));
		assert!(!token.is_fresh_at(macros::datetime!(2025-01-01 00:59:50 UTC), skew));
		assert!(!token.is_fresh_at(macros::datetime!(2025-01-01 01:00 UTC), skew));
	}

	#[test]
	fn relative_expiry_and_debug_redaction() {
		let token = Token::expiring_in(
			"super-secret",
			macros::datetime!(2025-01-01 00:00 UTC),
			Duration::minutes(30),
			ScopeList::default(),
		);

		assert_eq!(token.expires_at, macros::datetime!(2025-01-01 00:30 UTC));
		assert!(!format!("{token:?}").contains("super-secret"));
	}

	#[test]
	fn oversized_lifetime_saturates() {
		let token = Token::expiring_in(
			"access",
			macros::datetime!(2025-01-01 00:00 UTC),
			Duration::MAX,
			ScopeList::default(),
		);

		assert!(token.expires_at > macros::datetime!(9999-01-01 00:00 UTC));
	}
}
