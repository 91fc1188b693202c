#![allow(dead_code)]

// std
use std::sync::{
	Arc,
	atomic::{AtomicBool, AtomicU32, Ordering},
};
// crates.io
use time::{Duration, OffsetDateTime, format_description::well_known::Rfc3339};
use url::Url;
// self
use queue_relay::{
	auth::{ScopeList, Token},
	cache::{CredentialFetcher, CredentialFuture},
	config::ProcessorOptions,
	downstream::{DownstreamFuture, DownstreamInvoker},
	error::{CredentialError, DownstreamError},
	event::{Event, InboundMessage, RETRY_ATTRIBUTE},
};

pub const SOURCE_ARN: &str = "arn:aws:sqs:eu-west-1:123456789012:events";
pub const SOURCE_QUEUE_URL: &str = "https://sqs.eu-west-1.amazonaws.com/123456789012/events";

/// Fetcher that counts calls and issues `token-<n>` with a fixed lifetime.
pub struct CountingFetcher {
	calls: AtomicU32,
	lifetime: Duration,
	delay: std::time::Duration,
	failing: AtomicBool,
}
impl CountingFetcher {
	pub fn new(lifetime: Duration) -> Self {
		Self {
			calls: AtomicU32::new(0),
			lifetime,
			delay: std::time::Duration::ZERO,
			failing: AtomicBool::new(false),
		}
	}

	pub fn with_delay(mut self, delay: std::time::Duration) -> Self {
		self.delay = delay;

		self
	}

	pub fn set_failing(&self, failing: bool) {
		self.failing.store(failing, Ordering::SeqCst);
	}

	pub fn calls(&self) -> u32 {
		self.calls.load(Ordering::SeqCst)
	}
}
impl CredentialFetcher for CountingFetcher {
	fn fetch<'a>(&'a self, scopes: &'a ScopeList) -> CredentialFuture<'a> {
		Box::pin(async move {
			let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;

			if !self.delay.is_zero() {
				tokio::time::sleep(self.delay).await;
			}
			if self.failing.load(Ordering::SeqCst) {
				return Err(CredentialError::Source { message: "secret store unavailable".into() });
			}

			Ok(Token::expiring_in(
				format!("token-{call}"),
				OffsetDateTime::now_utc(),
				self.lifetime,
				scopes.clone(),
			))
		})
	}
}

/// Invoker that records delivered event ids and fails for the `"error"` payload.
#[derive(Default)]
pub struct RecordingInvoker {
	delivered: parking_lot::Mutex<Vec<(String, String)>>,
}
impl RecordingInvoker {
	/// Delivered `(event id, access token)` pairs.
	pub fn delivered(&self) -> Vec<(String, String)> {
		self.delivered.lock().clone()
	}
}
impl DownstreamInvoker for RecordingInvoker {
	fn invoke<'a>(&'a self, event: &'a Event, token: &'a Token) -> DownstreamFuture<'a> {
		Box::pin(async move {
			if event.message == "error" {
				return Err(DownstreamError::Rejected { reason: "event error".into() });
			}

			self.delivered.lock().push((event.id.clone(), token.access_token.expose().to_owned()));

			Ok(())
		})
	}
}

pub fn test_options(max_retries: u32) -> ProcessorOptions {
	ProcessorOptions {
		delay_ms: 3_000,
		ttl_hours: 24,
		max_retries,
		downstream_url: Url::parse("https://callee.example.com/events")
			.expect("Downstream fixture URL should parse."),
		oauth2_scope: "events.read events.write".into(),
	}
}

pub fn event_body(id: &str, message: &str, created_at: OffsetDateTime) -> String {
	format!(
		r#"{{"id":"{id}","message":"{message}","createdAt":"{}"}}"#,
		created_at.format(&Rfc3339).expect("Timestamp fixture should format.")
	)
}

pub fn message(id: &str, payload: &str, created_at: OffsetDateTime) -> InboundMessage {
	InboundMessage::new(SOURCE_ARN, event_body(id, payload, created_at))
		.with_message_id(format!("msg-{id}"))
}

pub fn with_retries(message: InboundMessage, retries: u32) -> InboundMessage {
	message.with_attribute(RETRY_ATTRIBUTE, retries.to_string())
}
