//! OAuth 2.0 client-credentials fetcher backing the token cache.
//!
//! Every fetch loads the client credentials from a [`CredentialSource`] (deployments typically
//! back it with a secret store that caches on its own) and performs a `client_credentials`
//! grant for the requested scopes. A response without a positive `expires_in` yields a token
//! that is already at its expiry, so it is used once and never served from the cache.

// crates.io
use oauth2::{
	AuthType, ClientId, ClientSecret, HttpClientError, RequestTokenError, Scope, TokenResponse,
	TokenUrl,
	basic::{BasicClient, BasicRequestTokenError, BasicTokenResponse},
};
use serde::Deserializer;
// self
use crate::{
	_prelude::*,
	auth::{ScopeList, Token, TokenSecret},
	cache::{CredentialFetcher, CredentialFuture},
	error::{ConfigError, CredentialError},
	http::{ReqwestHttpClient, ResponseMetadata, ResponseMetadataSlot},
};

/// Boxed future returned by [`CredentialSource::load`].
pub type CredentialSourceFuture<'a> =
	Pin<Box<dyn Future<Output = Result<ClientCredentials, CredentialError>> + 'a + Send>>;

/// Capability that supplies OAuth client credentials.
pub trait CredentialSource
where
	Self: Send + Sync,
{
	/// Loads the current client credentials.
	fn load(&self) -> CredentialSourceFuture<'_>;
}

/// Client identifier and secret, as stored in the secret document
/// `{"clientId": "...", "clientSecret": "..."}`.
#[derive(Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientCredentials {
	/// OAuth 2.0 client identifier.
	pub client_id: String,
	/// OAuth 2.0 client secret.
	#[serde(deserialize_with = "deserialize_secret")]
	pub client_secret: TokenSecret,
}
impl ClientCredentials {
	/// Creates credentials from raw values.
	pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
		Self { client_id: client_id.into(), client_secret: TokenSecret::new(client_secret) }
	}

	/// Parses the secret document, reporting the failing path on error.
	pub fn from_secret_json(document: &str) -> Result<Self, CredentialError> {
		let mut de = serde_json::Deserializer::from_str(document);

		serde_path_to_error::deserialize(&mut de).map_err(CredentialError::SourceParse)
	}
}
impl Debug for ClientCredentials {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientCredentials")
			.field("client_id", &self.client_id)
			.field("client_secret", &self.client_secret)
			.finish()
	}
}

fn deserialize_secret<'de, D>(deserializer: D) -> Result<TokenSecret, D::Error>
where
	D: Deserializer<'de>,
{
	String::deserialize(deserializer).map(TokenSecret::from)
}

/// Source that always returns the same credentials.
#[derive(Clone, Debug)]
pub struct StaticCredentialSource(ClientCredentials);
impl StaticCredentialSource {
	/// Wraps fixed credentials.
	pub fn new(credentials: ClientCredentials) -> Self {
		Self(credentials)
	}
}
impl CredentialSource for StaticCredentialSource {
	fn load(&self) -> CredentialSourceFuture<'_> {
		let credentials = self.0.clone();

		Box::pin(async move { Ok(credentials) })
	}
}

/// [`CredentialFetcher`] performing the `client_credentials` grant.
#[derive(Clone)]
pub struct ClientCredentialsFetcher {
	token_url: TokenUrl,
	source: Arc<dyn CredentialSource>,
	http_client: ReqwestHttpClient,
	auth_type: AuthType,
}
impl ClientCredentialsFetcher {
	/// Creates a fetcher for `token_url` using HTTP Basic client authentication and a
	/// non-redirecting HTTP client.
	pub fn new(token_url: &Url, source: Arc<dyn CredentialSource>) -> Result<Self, ConfigError> {
		let token_url = TokenUrl::new(token_url.to_string())
			.map_err(|source| ConfigError::InvalidTokenEndpoint { source })?;

		Ok(Self {
			token_url,
			source,
			http_client: ReqwestHttpClient::without_redirects()?,
			auth_type: AuthType::BasicAuth,
		})
	}

	/// Replaces the HTTP client.
	pub fn with_http_client(mut self, http_client: ReqwestHttpClient) -> Self {
		self.http_client = http_client;

		self
	}

	/// Sends the client credentials in the request body (`client_secret_post`).
	pub fn with_request_body_auth(mut self) -> Self {
		self.auth_type = AuthType::RequestBody;

		self
	}

	async fn exchange(&self, scopes: &ScopeList) -> Result<Token, CredentialError> {
		let credentials = self.source.load().await?;
		let client = BasicClient::new(ClientId::new(credentials.client_id))
			.set_client_secret(ClientSecret::new(credentials.client_secret.expose().to_owned()))
			.set_token_uri(self.token_url.clone())
			.set_auth_type(self.auth_type.clone());
		let slot = ResponseMetadataSlot::default();
		let handle = self.http_client.instrumented(slot.clone());
		let mut request = client.exchange_client_credentials();

		for scope in scopes {
			request = request.add_scope(Scope::new(scope.clone()));
		}

		let issued_at = OffsetDateTime::now_utc();
		let response = request
			.request_async(&handle)
			.await
			.map_err(|err| map_request_error(slot.take(), err))?;

		map_token_response(scopes, issued_at, response)
	}
}
impl CredentialFetcher for ClientCredentialsFetcher {
	fn fetch<'a>(&'a self, scopes: &'a ScopeList) -> CredentialFuture<'a> {
		Box::pin(self.exchange(scopes))
	}
}
impl Debug for ClientCredentialsFetcher {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("ClientCredentialsFetcher")
			.field("token_url", &self.token_url.as_str())
			.field("auth_type", &self.auth_type)
			.finish()
	}
}

fn map_token_response(
	scopes: &ScopeList,
	issued_at: OffsetDateTime,
	response: BasicTokenResponse,
) -> Result<Token, CredentialError> {
	let lifetime = match response.expires_in() {
		Some(expires_in) => i64::try_from(expires_in.as_secs())
			.map(Duration::seconds)
			.map_err(|_| CredentialError::ExpiresInOutOfRange)?,
		None => Duration::ZERO,
	};
	// Lifetimes that fit an i64 can still overflow the representable date range.
	let expires_at =
		issued_at.checked_add(lifetime).ok_or(CredentialError::ExpiresInOutOfRange)?;

	Ok(Token::new(response.access_token().secret().to_owned(), expires_at, scopes.clone()))
}

fn map_request_error(
	meta: Option<ResponseMetadata>,
	err: BasicRequestTokenError<HttpClientError<ReqwestError>>,
) -> CredentialError {
	let status = meta.as_ref().and_then(|m| m.status);
	let retry_after = meta.as_ref().and_then(|m| m.retry_after);

	match err {
		RequestTokenError::ServerResponse(response) => {
			let message = match response.error_description() {
				Some(description) => format!("{}: {description}", response.error()),
				None => response.error().to_string(),
			};

			CredentialError::Endpoint { message, status, retry_after }
		},
		RequestTokenError::Request(HttpClientError::Reqwest(inner)) =>
			CredentialError::transport(*inner),
		RequestTokenError::Request(HttpClientError::Io(inner)) => CredentialError::transport(inner),
		RequestTokenError::Request(HttpClientError::Http(inner)) =>
			CredentialError::transport(inner),
		RequestTokenError::Request(other) =>
			CredentialError::Endpoint { message: other.to_string(), status, retry_after },
		RequestTokenError::Parse(source, _body) =>
			CredentialError::ResponseParse { source, status },
		RequestTokenError::Other(message) =>
			CredentialError::Endpoint { message, status, retry_after },
	}
}

#[cfg(test)]
mod tests {
	// crates.io
	use oauth2::{AccessToken, EmptyExtraTokenFields, StandardTokenResponse, basic::BasicTokenType};
	use time::macros;
	// self
	use super::*;

	fn token_response(expires_in: Option<u64>) -> BasicTokenResponse {
		let mut response = StandardTokenResponse::new(
			AccessToken::new("issued".into()),
			BasicTokenType::Bearer,
			EmptyExtraTokenFields {},
		);

		response.set_expires_in(expires_in.map(std::time::Duration::from_secs).as_ref());

		response
	}

	#[test]
	fn secret_document_parses_and_redacts() {
		let credentials = ClientCredentials::from_secret_json(
			r#"{"clientId":"relay","clientSecret":"hunter2"}"#,
		)
		.expect("Secret document should parse.");

		assert_eq!(credentials.client_id, "relay");
		assert_eq!(credentials.client_secret.expose(), "hunter2");
		assert!(!format!("{credentials:?}").contains("hunter2"));
	}

	#[test]
	fn secret_document_errors_name_the_missing_field() {
		let err = ClientCredentials::from_secret_json(r#"{"clientId":"relay"}"#)
			.expect_err("Documents without a secret must be rejected.");

		assert!(matches!(err, CredentialError::SourceParse(_)));
	}

	#[test]
	fn fetcher_accepts_absolute_token_urls() {
		let source = Arc::new(StaticCredentialSource::new(ClientCredentials::new("id", "secret")));
		let url = Url::parse("https://auth.example.com/oauth2/token")
			.expect("Token URL fixture should parse.");

		assert!(ClientCredentialsFetcher::new(&url, source).is_ok());
	}

	#[test]
	fn token_lifetime_is_measured_from_issue() {
		let issued_at = macros::datetime!(2025-06-01 12:00 UTC);
		let scopes = ScopeList::default();
		let token = map_token_response(&scopes, issued_at, token_response(Some(1_800)))
			.expect("Regular lifetimes should map.");

		assert_eq!(token.expires_at, macros::datetime!(2025-06-01 12:30 UTC));

		let single_use = map_token_response(&scopes, issued_at, token_response(None))
			.expect("Missing lifetimes should map.");

		assert_eq!(single_use.expires_at, issued_at);
	}

	#[test]
	fn lifetime_past_the_date_range_is_rejected() {
		let issued_at = macros::datetime!(2025-06-01 12:00 UTC);
		let scopes = ScopeList::default();

		for expires_in in [1_000_000_000_000, u64::MAX] {
			let err = map_token_response(&scopes, issued_at, token_response(Some(expires_in)))
				.expect_err("Lifetimes beyond the representable range must be rejected.");

			assert!(matches!(err, CredentialError::ExpiresInOutOfRange));
		}
	}
}
