//! Walks two queued events through the relay: one is delivered with a client-credentials token
//! fetched from a mock endpoint, the other fails downstream and is requeued with a delay.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
use time::{Duration, OffsetDateTime, format_description::well_known::Rfc3339};
use url::Url;
// self
use queue_relay::{
	cache::TokenCache,
	config::ProcessorOptions,
	credential::{ClientCredentials, ClientCredentialsFetcher, StaticCredentialSource},
	downstream::SimulatedInvoker,
	event::{InboundBatch, InboundMessage},
	processor::EventProcessor,
	requeue::MemoryPublisher,
};

const SOURCE: &str = "arn:aws:sqs:us-east-1:000000000000:demo-events";

fn record(id: &str, message: &str) -> Result<InboundMessage> {
	let created_at = (OffsetDateTime::now_utc() - Duration::minutes(5)).format(&Rfc3339)?;
	let body = format!(r#"{{"id":"{id}","message":"{message}","createdAt":"{created_at}"}}"#);

	Ok(InboundMessage::new(SOURCE, body).with_message_id(format!("demo-{id}")))
}

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let token_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/token");
			then.status(200).header("content-type", "application/json").body(
				"{\"access_token\":\"demo-access\",\"token_type\":\"bearer\",\"expires_in\":900}",
			);
		})
		.await;
	let source = StaticCredentialSource::new(ClientCredentials::new("demo-client", "demo-secret"));
	let fetcher =
		ClientCredentialsFetcher::new(&Url::parse(&server.url("/token"))?, Arc::new(source))?;
	let options = ProcessorOptions {
		delay_ms: 1_000,
		ttl_hours: 24,
		max_retries: 3,
		downstream_url: Url::parse("https://callee.example.com/events")?,
		oauth2_scope: "events.write".into(),
	};
	let invoker = SimulatedInvoker::new(options.downstream_url.clone()).with_latency(100, 300);
	let publisher = MemoryPublisher::default();
	let processor = EventProcessor::new(
		options,
		Arc::new(TokenCache::new(Arc::new(fetcher))),
		Arc::new(invoker),
		Arc::new(publisher.clone()),
	)?;
	let batch = InboundBatch::from(vec![record("1", "hello")?, record("2", "error")?]);
	let report = processor.handle_batch(&batch).await;

	for (message_id, outcome) in &report.completed {
		println!("{message_id}: {outcome:?}.");
	}
	for request in publisher.published() {
		println!(
			"Requeued to {} with retries {:?} after {}s.",
			request.destination_address,
			request.retries(),
			request.delay_seconds
		);
	}

	token_mock.assert_async().await;

	Ok(())
}
