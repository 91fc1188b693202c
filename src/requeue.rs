//! Requeue requests and the publisher capability that schedules them.
//!
//! A requeue re-submits the original body byte-for-byte to the queue the message came from,
//! overwriting the [`RETRY_ATTRIBUTE`] with the new count and delaying delivery linearly:
//! `floor(base_delay_ms / 1000) * retries` seconds.

// self
use crate::{_prelude::*, error::PublishError, event::{InboundMessage, RETRY_ATTRIBUTE}};

/// Boxed future returned by [`RequeuePublisher::publish`].
pub type PublishFuture<'a> = Pin<Box<dyn Future<Output = Result<(), PublishError>> + 'a + Send>>;

/// Capability that re-submits messages to a queue.
pub trait RequeuePublisher
where
	Self: Send + Sync,
{
	/// Derives the destination address from the source identifier the message arrived with.
	///
	/// The default convention treats the source as a queue ARN and resolves its URL.
	fn destination_for(&self, source_address: &str) -> Result<String, PublishError> {
		let arn = QueueArn::from_str(source_address)?;

		Ok(arn.queue_url().to_string())
	}

	/// Sends the request; failures are not retried by the caller.
	fn publish(&self, request: RequeueRequest) -> PublishFuture<'_>;
}

/// Outbound message scheduled for later redelivery.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RequeueRequest {
	/// Queue address the message is sent to.
	pub destination_address: String,
	/// Original body, unchanged.
	pub body: Vec<u8>,
	/// Attributes to attach; contains the new retry count.
	pub attributes: HashMap<String, String>,
	/// Declared data type per attribute (`Number` for the retry count).
	pub attribute_types: HashMap<String, &'static str>,
	/// Delivery delay.
	pub delay_seconds: u32,
}
impl RequeueRequest {
	/// Retry count carried by this request, if present and numeric.
	pub fn retries(&self) -> Option<u32> {
		self.attributes.get(RETRY_ATTRIBUTE)?.parse().ok()
	}
}

/// Linear backoff: whole seconds of the base delay scaled by the attempt number.
pub fn requeue_delay_seconds(base_delay_ms: u64, retries: u32) -> u32 {
	let base_secs = u32::try_from(base_delay_ms / 1_000).unwrap_or(u32::MAX);

	base_secs.saturating_mul(retries)
}

/// Builds the requeue request for `message` carrying `retries`.
///
/// Only the retry attribute is written; other inbound attributes are not forwarded.
pub fn build_requeue_request(
	message: &InboundMessage,
	retries: u32,
	base_delay_ms: u64,
	publisher: &dyn RequeuePublisher,
) -> Result<RequeueRequest, PublishError> {
	let destination_address = publisher.destination_for(&message.source_address)?;

	Ok(RequeueRequest {
		destination_address,
		body: message.body.clone(),
		attributes: HashMap::from([(RETRY_ATTRIBUTE.to_owned(), retries.to_string())]),
		attribute_types: HashMap::from([(RETRY_ATTRIBUTE.to_owned(), "Number")]),
		delay_seconds: requeue_delay_seconds(base_delay_ms, retries),
	})
}

/// Parsed `arn:<partition>:<service>:<region>:<account>:<resource>` identifier of a queue.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct QueueArn {
	/// Partition, e.g. `aws`.
	pub partition: String,
	/// Service namespace, e.g. `sqs`.
	pub service: String,
	/// Region the queue lives in.
	pub region: String,
	/// Owning account identifier.
	pub account_id: String,
	/// Queue name.
	pub resource: String,
}
impl QueueArn {
	/// Queue URL in the `https://sqs.<region>.amazonaws.com/<account>/<resource>` form.
	pub fn queue_url(&self) -> String {
		format!("https://sqs.{}.amazonaws.com/{}/{}", self.region, self.account_id, self.resource)
	}
}
impl FromStr for QueueArn {
	type Err = PublishError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let invalid = |reason: &str| PublishError::Addressing {
			source_address: s.to_owned(),
			reason: reason.to_owned(),
		};
		let mut parts = s.splitn(6, ':');

		if parts.next() != Some("arn") {
			return Err(invalid("missing `arn:` prefix"));
		}

		let mut field = |name: &str| {
			parts.next().map(str::to_owned).ok_or_else(|| invalid(&format!("missing {name}")))
		};
		let partition = field("partition")?;
		let service = field("service")?;
		let region = field("region")?;
		let account_id = field("account")?;
		let resource = field("resource")?;

		if region.is_empty() || account_id.is_empty() || resource.is_empty() {
			return Err(invalid("region, account, and resource must be non-empty"));
		}

		Ok(Self { partition, service, region, account_id, resource })
	}
}
impl Display for QueueArn {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		write!(
			f,
			"arn:{}:{}:{}:{}:{}",
			self.partition, self.service, self.region, self.account_id, self.resource
		)
	}
}

/// Thread-safe publisher that keeps sent requests in-process for tests and demos.
#[derive(Clone, Debug, Default)]
pub struct MemoryPublisher(Arc<RwLock<Vec<RequeueRequest>>>);
impl MemoryPublisher {
	/// Snapshot of every request published so far.
	pub fn published(&self) -> Vec<RequeueRequest> {
		self.0.read().clone()
	}

	/// Number of requests published so far.
	pub fn len(&self) -> usize {
		self.0.read().len()
	}

	/// Returns `true` when nothing has been published.
	pub fn is_empty(&self) -> bool {
		self.0.read().is_empty()
	}
}
impl RequeuePublisher for MemoryPublisher {
	fn publish(&self, request: RequeueRequest) -> PublishFuture<'_> {
		let sent = self.0.clone();

		Box::pin(async move {
			sent.write().push(request);

			Ok(())
		})
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	const SOURCE: &str = "arn:aws:sqs:eu-west-1:123456789012:events";

	#[test]
	fn linear_delay_scales_with_attempt() {
		assert_eq!(requeue_delay_seconds(3_000, 1), 3);
		assert_eq!(requeue_delay_seconds(3_000, 3), 9);
		assert_eq!(requeue_delay_seconds(2_999, 4), 8);
		assert_eq!(requeue_delay_seconds(999, 5), 0);
		assert_eq!(requeue_delay_seconds(u64::MAX, 2), u32::MAX);
	}

	#[test]
	fn arn_resolves_to_queue_url() {
		let arn = QueueArn::from_str(SOURCE).expect("ARN fixture should parse.");

		assert_eq!(arn.region, "eu-west-1");
		assert_eq!(arn.queue_url(), "https://sqs.eu-west-1.amazonaws.com/123456789012/events");
		assert_eq!(arn.to_string(), SOURCE);
	}

	#[test]
	fn malformed_arns_are_addressing_errors() {
		for bogus in ["", "events", "arn:aws:sqs", "arn:aws:sqs::123456789012:events"] {
			assert!(
				matches!(QueueArn::from_str(bogus), Err(PublishError::Addressing { .. })),
				"`{bogus}` should be rejected."
			);
		}
	}

	#[test]
	fn request_carries_body_and_overwrites_retry_attribute() {
		let message = InboundMessage::new(SOURCE, br#"{"id":"1"}"#.to_vec())
			.with_attribute(RETRY_ATTRIBUTE, "1")
			.with_attribute("Trace", "abc");
		let request = build_requeue_request(&message, 2, 3_000, &MemoryPublisher::default())
			.expect("Requeue request should build.");

		assert_eq!(
			request.destination_address,
			"https://sqs.eu-west-1.amazonaws.com/123456789012/events"
		);
		assert_eq!(request.body, message.body);
		assert_eq!(request.retries(), Some(2));
		assert_eq!(request.attributes.len(), 1);
		assert_eq!(request.attribute_types.get(RETRY_ATTRIBUTE), Some(&"Number"));
		assert_eq!(request.delay_seconds, 6);
	}

	#[tokio::test]
	async fn memory_publisher_records_requests() {
		let publisher = MemoryPublisher::default();
		let message = InboundMessage::new(SOURCE, b"{}".to_vec());
		let request = build_requeue_request(&message, 1, 0, &publisher)
			.expect("Requeue request should build.");

		publisher.publish(request.clone()).await.expect("Memory publish should succeed.");

		assert_eq!(publisher.published(), vec![request]);
	}
}
