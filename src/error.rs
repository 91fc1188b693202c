//! Relay-level error types shared across the token cache, collaborators, and the processor.

// self
use crate::_prelude::*;

/// Relay-wide result type alias returning [`Error`] by default.
pub type Result<T, E = Error> = std::result::Result<T, E>;

type BoxError = Box<dyn StdError + Send + Sync>;

/// Canonical relay error surfaced to the invocation's caller.
#[derive(Debug, ThisError)]
pub enum Error {
	/// Local configuration problem.
	#[error(transparent)]
	Config(#[from] ConfigError),
	/// Message body is not a valid event; never requeued.
	#[error("Unable to decode event body.")]
	Decode(#[source] serde_path_to_error::Error<serde_json::Error>),
	/// Event is older than the configured time-to-live; never requeued.
	#[error("Event `{id}` created at {created_at} is older than {ttl_hours} hours.")]
	Expired {
		/// Event identifier.
		id: String,
		/// Creation instant carried by the event.
		created_at: OffsetDateTime,
		/// Configured time-to-live in hours.
		ttl_hours: i64,
	},
	/// Bearer credential could not be acquired; retryable.
	#[error(transparent)]
	CredentialFetch(#[from] CredentialError),
	/// Downstream receiver rejected or failed the call; retryable.
	#[error(transparent)]
	Downstream(#[from] DownstreamError),
	/// A retryable failure occurred after the retry budget was spent.
	#[error("Unable to process event `{id}`, reached threshold of {max_retries} retries.")]
	RetryThresholdExceeded {
		/// Event identifier.
		id: String,
		/// Configured retry budget.
		max_retries: u32,
		/// Failure observed on the final attempt.
		#[source]
		source: Box<Error>,
	},
	/// The requeue itself could not be scheduled.
	#[error(transparent)]
	RequeuePublish(#[from] PublishError),
}
impl Error {
	/// Returns `true` for failures that are folded into the requeue path.
	pub fn is_retryable(&self) -> bool {
		matches!(self, Self::CredentialFetch(_) | Self::Downstream(_))
	}
}

/// Configuration and validation failures.
#[derive(Debug, ThisError)]
pub enum ConfigError {
	/// Required environment variable is absent.
	#[error("Environment variable `{key}` is not set.")]
	MissingVariable {
		/// Variable name.
		key: &'static str,
	},
	/// Environment variable holds a value that cannot be parsed.
	#[error("Environment variable `{key}` is invalid.")]
	InvalidVariable {
		/// Variable name.
		key: &'static str,
		/// Underlying parsing failure.
		#[source]
		source: BoxError,
	},
	/// Configured scope string cannot be turned into a scope list.
	#[error("Configured scopes are invalid.")]
	InvalidScope(#[from] crate::auth::ScopeValidationError),
	/// Token endpoint URL cannot be parsed by the OAuth client.
	#[error("Token endpoint URL is invalid.")]
	InvalidTokenEndpoint {
		/// Underlying parsing failure.
		#[source]
		source: url::ParseError,
	},
	/// HTTP client could not be constructed.
	#[error("HTTP client could not be constructed.")]
	HttpClientBuild {
		/// Underlying transport builder failure.
		#[source]
		source: BoxError,
	},
}
impl ConfigError {
	/// Wraps a parsing failure for the named variable.
	pub fn invalid_variable(
		key: &'static str,
		src: impl 'static + Send + Sync + StdError,
	) -> Self {
		Self::InvalidVariable { key, source: Box::new(src) }
	}

	/// Wraps a transport's builder failure inside [`ConfigError`].
	pub fn http_client_build(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::HttpClientBuild { source: Box::new(src) }
	}
}
#[cfg(feature = "reqwest")]
impl From<ReqwestError> for ConfigError {
	fn from(e: ReqwestError) -> Self {
		Self::http_client_build(e)
	}
}

/// Failures raised while acquiring a bearer credential.
#[derive(Debug, ThisError)]
pub enum CredentialError {
	/// Client credentials could not be loaded from their source.
	#[error("Client credentials could not be loaded: {message}.")]
	Source {
		/// Source-supplied message.
		message: String,
	},
	/// Client credentials document is malformed.
	#[error("Client credentials document is malformed.")]
	SourceParse(#[source] serde_path_to_error::Error<serde_json::Error>),
	/// Token endpoint returned an OAuth error or an unexpected response.
	#[error("Token endpoint rejected the request: {message}.")]
	Endpoint {
		/// Provider-supplied or relay-supplied message.
		message: String,
		/// HTTP status code, when available.
		status: Option<u16>,
		/// Retry-After hint from upstream, if supplied.
		retry_after: Option<Duration>,
	},
	/// Token endpoint responded with JSON that could not be parsed.
	#[error("Token endpoint returned malformed JSON.")]
	ResponseParse {
		/// Structured parsing failure.
		#[source]
		source: serde_path_to_error::Error<serde_json::Error>,
		/// HTTP status code, when available.
		status: Option<u16>,
	},
	/// Token endpoint returned an `expires_in` that does not fit a timestamp offset.
	#[error("The expires_in value is out of range.")]
	ExpiresInOutOfRange,
	/// Network or I/O failure while calling the token endpoint.
	#[error("Network error occurred while calling the token endpoint.")]
	Transport {
		/// Transport-specific failure.
		#[source]
		source: BoxError,
	},
}
impl CredentialError {
	/// Wraps a transport-specific network error.
	pub fn transport(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Transport { source: Box::new(src) }
	}
}

/// Failures reported by the downstream receiver.
#[derive(Debug, ThisError)]
pub enum DownstreamError {
	/// Receiver processed the call and refused the event.
	#[error("Downstream rejected the event: {reason}.")]
	Rejected {
		/// Receiver-supplied reason.
		reason: String,
	},
	/// Receiver could not be reached.
	#[error("Downstream call failed.")]
	Transport {
		/// Transport-specific failure.
		#[source]
		source: BoxError,
	},
}
impl DownstreamError {
	/// Wraps a transport-specific failure.
	pub fn transport(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Transport { source: Box::new(src) }
	}
}

/// Failures raised while scheduling a requeue.
#[derive(Debug, ThisError)]
pub enum PublishError {
	/// Source address cannot be turned into a destination address.
	#[error("Cannot derive a requeue destination from `{source_address}`: {reason}.")]
	Addressing {
		/// Source identifier supplied by the transport.
		source_address: String,
		/// Reason the derivation failed.
		reason: String,
	},
	/// Queue backend refused or failed the send.
	#[error("Requeue publish failed.")]
	Backend {
		/// Backend-specific failure.
		#[source]
		source: BoxError,
	},
}
impl PublishError {
	/// Wraps a backend-specific failure.
	pub fn backend(src: impl 'static + Send + Sync + StdError) -> Self {
		Self::Backend { source: Box::new(src) }
	}
}
