//! Time-to-live guard for queued events.

// self
use crate::_prelude::*;

/// Returns `true` iff the whole hours elapsed since `created_at` strictly exceed `ttl_hours`.
///
/// Elapsed time is truncated toward zero, so an event created in the future yields a negative
/// or zero hour count and is never expired for a non-negative TTL.
pub fn is_expired(created_at: OffsetDateTime, now: OffsetDateTime, ttl_hours: i64) -> bool {
	(now - created_at).whole_hours() > ttl_hours
}
