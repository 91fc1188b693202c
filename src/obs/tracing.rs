// crates.io
use tracing::{Instrument, Span, instrument::Instrumented};
// self
use crate::_prelude::*;

/// Span wrapping the handling of one inbound message.
#[derive(Clone, Debug)]
pub struct HandleSpan {
	span: Span,
}
impl HandleSpan {
	/// Opens a span for the message; event fields are filled once decoded.
	pub fn new(message_id: &str, retries: u32) -> Self {
		let span = tracing::info_span!(
			"queue_relay.handle",
			message_id,
			retries,
			event_id = tracing::field::Empty
		);

		Self { span }
	}

	/// Records the decoded event identifier.
	pub fn record_event(&self, event_id: &str) {
		self.span.record("event_id", event_id);
	}

	/// Instruments an async block without holding a guard across `.await` points.
	pub fn instrument<Fut>(&self, fut: Fut) -> Instrumented<Fut>
	where
		Fut: Future,
	{
		fut.instrument(self.span.clone())
	}
}
