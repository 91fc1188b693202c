//! Downstream receiver capability and the simulated receiver.

// crates.io
use rand::Rng;
// self
use crate::{
	_prelude::*,
	auth::Token,
	error::DownstreamError,
	event::Event,
};

/// Boxed future returned by [`DownstreamInvoker::invoke`].
pub type DownstreamFuture<'a> =
	Pin<Box<dyn Future<Output = Result<(), DownstreamError>> + 'a + Send>>;

/// Capability representing the protected resource events are forwarded to.
pub trait DownstreamInvoker
where
	Self: Send + Sync,
{
	/// Delivers `event` authorized by `token`; any error is retryable.
	fn invoke<'a>(&'a self, event: &'a Event, token: &'a Token) -> DownstreamFuture<'a>;
}

/// Stand-in receiver that sleeps for a random latency and rejects `"error"` messages.
#[derive(Clone, Debug)]
pub struct SimulatedInvoker {
	target: Url,
	min_latency_ms: u64,
	max_latency_ms: u64,
}
impl SimulatedInvoker {
	/// Payload that makes the simulated call fail.
	pub const FAILURE_SENTINEL: &'static str = "error";

	/// Creates a receiver with 300–1000 ms latency in 100 ms steps.
	pub fn new(target: Url) -> Self {
		Self { target, min_latency_ms: 300, max_latency_ms: 1_000 }
	}

	/// Overrides the latency range; bounds are rounded down to 100 ms steps.
	pub fn with_latency(mut self, min_ms: u64, max_ms: u64) -> Self {
		self.min_latency_ms = min_ms.min(max_ms);
		self.max_latency_ms = max_ms.max(min_ms);

		self
	}

	fn sample_latency(&self) -> u64 {
		let (lo, hi) = (self.min_latency_ms / 100, self.max_latency_ms / 100);

		rand::rng().random_range(lo..=hi) * 100
	}
}
impl DownstreamInvoker for SimulatedInvoker {
	fn invoke<'a>(&'a self, event: &'a Event, token: &'a Token) -> DownstreamFuture<'a> {
		Box::pin(async move {
			tracing::info!(
				target_url = %self.target,
				token_expiry = %token.expires_at,
				"simulating request"
			);

			let latency_ms = self.sample_latency();

			tokio::time::sleep(std::time::Duration::from_millis(latency_ms)).await;
			tracing::info!(latency_ms, "simulated request finished");

			if event.message == Self::FAILURE_SENTINEL {
				return Err(DownstreamError::Rejected { reason: "event error".into() });
			}

			Ok(())
		})
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use time::macros;
	// self
	use super::*;
	use crate::auth::ScopeList;

	fn fixtures(message: &str) -> (Event, Token) {
		let event = Event {
			id: "1".into(),
			message: message.into(),
			created_at: macros::datetime!(2025-06-01 11:00 UTC),
		};
		let token =
			Token::new("access", macros::datetime!(2025-06-01 13:00 UTC), ScopeList::default());

		(event, token)
	}

	fn invoker() -> SimulatedInvoker {
		SimulatedInvoker::new(
			Url::parse("https://callee.example.com/events").expect("Target fixture should parse."),
		)
		.with_latency(0, 0)
	}

	#[tokio::test]
	async fn accepts_regular_messages() {
		let (event, token) = fixtures("ok");

		invoker().invoke(&event, &token).await.expect("Regular messages should be accepted.");
	}

	#[tokio::test]
	async fn rejects_sentinel_message() {
		let (event, token) = fixtures(SimulatedInvoker::FAILURE_SENTINEL);
		let err = invoker()
			.invoke(&event, &token)
			.await
			.expect_err("The sentinel message should be rejected.");

		assert!(matches!(err, DownstreamError::Rejected { .. }));
	}

	#[test]
	fn latency_samples_stay_in_range() {
		let invoker = invoker().with_latency(300, 1_000);

		for _ in 0..64 {
			let latency = invoker.sample_latency();

			assert!((300..=1_000).contains(&latency));
			assert_eq!(latency % 100, 0);
		}
	}
}
