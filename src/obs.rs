//! Observability helpers for event handling.
//!
//! # Feature Flags
//!
//! - Spans named `queue_relay.handle` are always emitted through `tracing`, with the
//!   `message_id`, `event_id`, and `retries` fields.
//! - Enable `metrics` to increment the `queue_relay_outcome_total` counter once per handled
//!   message, labeled by `outcome`.

mod metrics;
mod tracing;

pub use self::metrics::*;
pub use self::tracing::*;

// self
use crate::{_prelude::*, processor::Outcome};

/// Terminal outcome labels recorded per handled message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HandleOutcome {
	/// Delivered downstream.
	Done,
	/// Sent back to the source queue.
	Requeued,
	/// Dropped as older than the time-to-live.
	Expired,
	/// Body could not be decoded.
	DecodeFailed,
	/// Retry budget spent.
	GaveUp,
	/// Requeue could not be scheduled.
	PublishFailed,
}
impl HandleOutcome {
	/// Returns a stable label suitable for span or metric fields.
	pub const fn as_str(self) -> &'static str {
		match self {
			HandleOutcome::Done => "done",
			HandleOutcome::Requeued => "requeued",
			HandleOutcome::Expired => "expired",
			HandleOutcome::DecodeFailed => "decode_failed",
			HandleOutcome::GaveUp => "gave_up",
			HandleOutcome::PublishFailed => "publish_failed",
		}
	}

	/// Classifies a handling result.
	pub fn of(result: &Result<Outcome>) -> Self {
		match result {
			Ok(Outcome::Done) => HandleOutcome::Done,
			Ok(Outcome::Requeued { .. }) => HandleOutcome::Requeued,
			Err(Error::Decode(_)) => HandleOutcome::DecodeFailed,
			Err(Error::Expired { .. }) => HandleOutcome::Expired,
			Err(Error::RequeuePublish(_)) => HandleOutcome::PublishFailed,
			Err(_) => HandleOutcome::GaveUp,
		}
	}
}
impl Display for HandleOutcome {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(self.as_str())
	}
}
