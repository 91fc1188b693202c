//! Per-message handling protocol.
//!
//! [`EventProcessor::handle`] walks one inbound message through decode, time-to-live check,
//! token acquisition, and downstream delivery. Decode and expiry failures are terminal and never
//! requeued. Token and delivery failures are retryable: while the retry budget allows, the
//! message is republished to its source queue with an incremented retry count and the failure is
//! absorbed; once the budget is spent the failure is surfaced as
//! [`Error::RetryThresholdExceeded`]. A requeue that cannot be published is always surfaced.
//!
//! Token failures share the delivery failure path and budget; they have no separate policy.

// self
use crate::{
	_prelude::*,
	auth::ScopeList,
	cache::TokenCache,
	config::ProcessorOptions,
	downstream::DownstreamInvoker,
	error::ConfigError,
	event::{Event, InboundBatch, InboundMessage},
	expiry,
	obs::{self, HandleOutcome, HandleSpan},
	requeue::{self, RequeuePublisher},
	retry::{self, RetryDecision},
};

/// Non-error result of handling one message.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Outcome {
	/// Delivered downstream.
	Done,
	/// Delivery failed and the message was republished.
	Requeued {
		/// Retry count carried by the republished message.
		retries: u32,
		/// Delivery delay applied to the republished message.
		delay_seconds: u32,
	},
}

/// Composes the token cache and collaborators into the handling protocol.
///
/// The token cache is shared by reference so one cache serves every invocation hosted by the
/// same process, including concurrent ones.
#[derive(Clone)]
pub struct EventProcessor {
	options: ProcessorOptions,
	scopes: ScopeList,
	token_cache: Arc<TokenCache>,
	invoker: Arc<dyn DownstreamInvoker>,
	publisher: Arc<dyn RequeuePublisher>,
}
impl EventProcessor {
	/// Creates a processor, validating the configured scope string once.
	pub fn new(
		options: ProcessorOptions,
		token_cache: Arc<TokenCache>,
		invoker: Arc<dyn DownstreamInvoker>,
		publisher: Arc<dyn RequeuePublisher>,
	) -> Result<Self> {
		let scopes = ScopeList::from_str(&options.oauth2_scope).map_err(ConfigError::from)?;

		Ok(Self { options, scopes, token_cache, invoker, publisher })
	}

	/// Options the processor was built with.
	pub fn options(&self) -> &ProcessorOptions {
		&self.options
	}

	/// Scopes requested for every delivery.
	pub fn scopes(&self) -> &ScopeList {
		&self.scopes
	}

	/// Shared token cache.
	pub fn token_cache(&self) -> &Arc<TokenCache> {
		&self.token_cache
	}

	/// Handles one message against the current clock.
	pub async fn handle(&self, message: &InboundMessage) -> Result<Outcome> {
		self.handle_at(message, OffsetDateTime::now_utc()).await
	}

	/// Handles one message, evaluating the time-to-live against `now`.
	///
	/// Token freshness is always evaluated against the real clock.
	pub async fn handle_at(
		&self,
		message: &InboundMessage,
		now: OffsetDateTime,
	) -> Result<Outcome> {
		let retries = message.retries();
		let span = HandleSpan::new(&message.message_id, retries);
		let result = span.instrument(self.process(message, retries, now, &span)).await;

		obs::record_outcome(HandleOutcome::of(&result));

		result
	}

	/// Handles every record of a batch in delivery order.
	///
	/// A failing record does not stop the remaining ones; each failure is reported with the
	/// record's message identifier.
	pub async fn handle_batch(&self, batch: &InboundBatch) -> BatchReport {
		let mut report = BatchReport::default();

		for record in &batch.records {
			match self.handle(record).await {
				Ok(outcome) => report.completed.push((record.message_id.clone(), outcome)),
				Err(error) => report
					.failures
					.push(BatchItemFailure { message_id: record.message_id.clone(), error }),
			}
		}

		report
	}

	async fn process(
		&self,
		message: &InboundMessage,
		retries: u32,
		now: OffsetDateTime,
		span: &HandleSpan,
	) -> Result<Outcome> {
		let event = message.decode_event().inspect_err(|err| {
			tracing::error!(error = %err, "unable to decode event body");
		})?;

		span.record_event(&event.id);

		let ttl_hours = self.options.ttl_hours;

		if expiry::is_expired(event.created_at, now, ttl_hours) {
			tracing::warn!(
				created_at = %event.created_at,
				ttl_hours,
				"event expired, dropping without requeue"
			);

			return Err(Error::Expired { id: event.id, created_at: event.created_at, ttl_hours });
		}

		match self.deliver(&event).await {
			Ok(()) => {
				tracing::info!(delay_ms = self.options.delay_ms, "processed event, pausing");
				tokio::time::sleep(std::time::Duration::from_millis(self.options.delay_ms)).await;
				tracing::info!("done");

				Ok(Outcome::Done)
			},
			Err(err) => self.handle_failure(message, &event, retries, err).await,
		}
	}

	async fn deliver(&self, event: &Event) -> Result<()> {
		let token = self.token_cache.get_token(&self.scopes).await?;

		self.invoker.invoke(event, &token).await?;

		Ok(())
	}

	async fn handle_failure(
		&self,
		message: &InboundMessage,
		event: &Event,
		retries: u32,
		err: Error,
	) -> Result<Outcome> {
		tracing::warn!(error = %err, "event handling failed");

		let max_retries = self.options.max_retries;

		match retry::decide(retries, max_retries) {
			RetryDecision::Requeue { retries } => {
				tracing::info!(attempt = retries, "sending event back to source queue");

				let request = requeue::build_requeue_request(
					message,
					retries,
					self.options.delay_ms,
					self.publisher.as_ref(),
				)?;
				let delay_seconds = request.delay_seconds;

				self.publisher.publish(request).await.inspect_err(|e| {
					tracing::error!(error = %e, "unable to requeue event");
				})?;

				Ok(Outcome::Requeued { retries, delay_seconds })
			},
			RetryDecision::GiveUp => {
				tracing::warn!(max_retries, "unable to process event, reached retry threshold");

				Err(Error::RetryThresholdExceeded {
					id: event.id.clone(),
					max_retries,
					source: Box::new(err),
				})
			},
		}
	}
}
impl Debug for EventProcessor {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("EventProcessor")
			.field("options", &self.options)
			.field("scopes", &self.scopes)
			.field("token_cache", &self.token_cache)
			.finish()
	}
}

/// Per-record failure inside a batch.
#[derive(Debug)]
pub struct BatchItemFailure {
	/// Transport identifier of the failed record.
	pub message_id: String,
	/// Terminal error for the record.
	pub error: Error,
}

/// Result of handling every record of a batch.
#[derive(Debug, Default)]
pub struct BatchReport {
	/// Records handled without error, with their outcomes.
	pub completed: Vec<(String, Outcome)>,
	/// Records that ended in a terminal error.
	pub failures: Vec<BatchItemFailure>,
}
impl BatchReport {
	/// Returns `true` when no record failed.
	pub fn is_success(&self) -> bool {
		self.failures.is_empty()
	}

	/// Identifiers of the failed records, in delivery order.
	pub fn failed_message_ids(&self) -> Vec<&str> {
		self.failures.iter().map(|failure| failure.message_id.as_str()).collect()
	}
}
