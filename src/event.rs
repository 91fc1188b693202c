//! Queued events and the transport envelope that carries them.

// self
use crate::_prelude::*;

/// Message attribute carrying the decimal retry count.
pub const RETRY_ATTRIBUTE: &str = "Retries";

/// Event payload decoded from a message body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
	/// Producer-assigned identifier.
	pub id: String,
	/// Opaque payload forwarded downstream.
	pub message: String,
	/// Creation instant used for time-to-live enforcement.
	#[serde(with = "time::serde::rfc3339")]
	pub created_at: OffsetDateTime,
}
impl Event {
	/// Decodes an event from a JSON body, reporting the failing path on error.
	pub fn decode(body: &[u8]) -> Result<Self> {
		let mut de = serde_json::Deserializer::from_slice(body);

		serde_path_to_error::deserialize(&mut de).map_err(Error::Decode)
	}
}

/// Envelope delivered by the queue transport; read-only to the processor.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InboundMessage {
	/// Transport-assigned identifier used when reporting batch failures.
	pub message_id: String,
	/// Raw message body.
	pub body: Vec<u8>,
	/// String-valued message attributes.
	pub attributes: HashMap<String, String>,
	/// Identifier of the queue the message was received from.
	pub source_address: String,
}
impl InboundMessage {
	/// Creates an envelope without attributes.
	pub fn new(source_address: impl Into<String>, body: impl Into<Vec<u8>>) -> Self {
		Self { source_address: source_address.into(), body: body.into(), ..Default::default() }
	}

	/// Sets the transport identifier.
	pub fn with_message_id(mut self, message_id: impl Into<String>) -> Self {
		self.message_id = message_id.into();

		self
	}

	/// Adds or replaces an attribute.
	pub fn with_attribute(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
		self.attributes.insert(key.into(), value.into());

		self
	}

	/// Retry count carried by the [`RETRY_ATTRIBUTE`] attribute.
	///
	/// A missing attribute means zero. A value that is not a non-negative decimal integer is also
	/// read as zero.
	pub fn retries(&self) -> u32 {
		let Some(raw) = self.attributes.get(RETRY_ATTRIBUTE) else {
			return 0;
		};

		raw.trim().parse().unwrap_or_else(|_| {
			tracing::warn!(
				message_id = %self.message_id,
				value = %raw,
				"unparsable retry attribute, treating as zero"
			);

			0
		})
	}

	/// Decodes the body into an [`Event`].
	pub fn decode_event(&self) -> Result<Event> {
		Event::decode(&self.body)
	}
}

/// Every record delivered by one transport invocation.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct InboundBatch {
	/// Records in delivery order.
	pub records: Vec<InboundMessage>,
}
impl From<Vec<InboundMessage>> for InboundBatch {
	fn from(records: Vec<InboundMessage>) -> Self {
		Self { records }
	}
}
