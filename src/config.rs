//! Processor options and environment-backed configuration loading.

// self
use crate::{_prelude::*, error::ConfigError};

/// Options consumed by [`EventProcessor`](crate::processor::EventProcessor).
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessorOptions {
	/// Post-success pacing hold, also the base of the linear requeue delay.
	pub delay_ms: u64,
	/// Maximum event age in whole hours.
	pub ttl_hours: i64,
	/// Retry budget per logical event.
	pub max_retries: u32,
	/// Address of the downstream receiver.
	pub downstream_url: Url,
	/// Space-separated scopes requested for the bearer token.
	pub oauth2_scope: String,
}

/// Full deployment configuration: processor options plus credential acquisition settings.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProcessorConfig {
	/// Options handed to the processor.
	pub options: ProcessorOptions,
	/// OAuth 2.0 token endpoint used by the client-credentials grant.
	pub oauth2_token_url: Url,
	/// Name of the secret holding the client credentials document.
	///
	/// The crate does not read secrets itself; this is handed to the deployment's secret-store
	/// [`CredentialSource`](crate::credential::CredentialSource), whose `load` resolves it to
	/// [`ClientCredentials`](crate::credential::ClientCredentials).
	pub oauth2_secret_name: String,
}
impl ProcessorConfig {
	/// Pacing and requeue base delay in milliseconds.
	pub const DELAY_MS: &'static str = "DELAY_MS";
	/// Downstream receiver URL.
	pub const CALLEE_URL: &'static str = "CALLEE_URL";
	/// Event time-to-live in hours.
	pub const EXPIRES_IN_HOURS: &'static str = "EXPIRES_IN_HOURS";
	/// Retry budget.
	pub const MAX_RETRIES: &'static str = "MAX_RETRIES";
	/// Space-separated scope string.
	pub const OAUTH2_SCOPE: &'static str = "OAUTH2_SCOPE";
	/// Client credentials secret name.
	pub const OAUTH2_SECRET_NAME: &'static str = "OAUTH2_SECRET_NAME";
	/// Token endpoint URL.
	pub const OAUTH2_TOKEN_URL: &'static str = "OAUTH2_TOKEN_URL";

	/// Loads the configuration from process environment variables.
	pub fn from_env() -> Result<Self, ConfigError> {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	/// Loads the configuration through an arbitrary variable lookup.
	pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
	where
		F: Fn(&str) -> Option<String>,
	{
		let options = ProcessorOptions {
			delay_ms: parse_var(&lookup, Self::DELAY_MS)?,
			ttl_hours: parse_var(&lookup, Self::EXPIRES_IN_HOURS)?,
			max_retries: parse_var(&lookup, Self::MAX_RETRIES)?,
			downstream_url: parse_var(&lookup, Self::CALLEE_URL)?,
			oauth2_scope: lookup(Self::OAUTH2_SCOPE)
				.map(|scope| scope.trim().to_owned())
				.unwrap_or_default(),
		};

		Ok(Self {
			options,
			oauth2_token_url: parse_var(&lookup, Self::OAUTH2_TOKEN_URL)?,
			oauth2_secret_name: required_var(&lookup, Self::OAUTH2_SECRET_NAME)?,
		})
	}
}

fn required_var<F>(lookup: &F, key: &'static str) -> Result<String, ConfigError>
where
	F: Fn(&str) -> Option<String>,
{
	lookup(key).ok_or(ConfigError::MissingVariable { key })
}

fn parse_var<F, T>(lookup: &F, key: &'static str) -> Result<T, ConfigError>
where
	F: Fn(&str) -> Option<String>,
	T: FromStr,
	T::Err: 'static + Send + Sync + StdError,
{
	required_var(lookup, key)?
		.trim()
		.parse()
		.map_err(|e| ConfigError::invalid_variable(key, e))
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	fn lookup(overrides: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
		let mut vars: HashMap<String, String> = [
			("DELAY_MS", "3000"),
			("EXPIRES_IN_HOURS", "24"),
			("MAX_RETRIES", "3"),
			("CALLEE_URL", "https://callee.example.com/events"),
			("OAUTH2_SCOPE", "events.read events.write"),
			("OAUTH2_TOKEN_URL", "https://auth.example.com/oauth2/token"),
			("OAUTH2_SECRET_NAME", "event-relay/oauth2"),
		]
		.into_iter()
		.map(|(k, v)| (k.to_owned(), v.to_owned()))
		.collect();

		for (k, v) in overrides {
			vars.insert((*k).to_owned(), (*v).to_owned());
		}

		move |key| vars.get(key).cloned()
	}

	#[test]
	fn loads_every_variable() {
		let config = ProcessorConfig::from_lookup(lookup(&[]))
			.expect("Complete configuration should load.");

		assert_eq!(config.options.delay_ms, 3_000);
		assert_eq!(config.options.ttl_hours, 24);
		assert_eq!(config.options.max_retries, 3);
		assert_eq!(config.options.downstream_url.as_str(), "https://callee.example.com/events");
		assert_eq!(config.options.oauth2_scope, "events.read events.write");
		assert_eq!(config.oauth2_token_url.host_str(), Some("auth.example.com"));
		assert_eq!(config.oauth2_secret_name, "event-relay/oauth2");
	}

	#[test]
	fn numeric_variables_must_parse() {
		let err = ProcessorConfig::from_lookup(lookup(&[("MAX_RETRIES", "many")]))
			.expect_err("Non-numeric retry budgets must be rejected.");

		assert!(matches!(err, ConfigError::InvalidVariable { key: "MAX_RETRIES", .. }));

		let err = ProcessorConfig::from_lookup(lookup(&[("CALLEE_URL", "not a url")]))
			.expect_err("Invalid URLs must be rejected.");

		assert!(matches!(err, ConfigError::InvalidVariable { key: "CALLEE_URL", .. }));
	}

	#[test]
	fn scope_variable_is_trimmed_and_optional() {
		let config = ProcessorConfig::from_lookup(lookup(&[("OAUTH2_SCOPE", " events.read ")]))
			.expect("Padded scope strings should load.");

		assert_eq!(config.options.oauth2_scope, "events.read");

		let config = ProcessorConfig::from_lookup(|key| {
			(key != ProcessorConfig::OAUTH2_SCOPE).then(|| {
				match key {
					ProcessorConfig::CALLEE_URL | ProcessorConfig::OAUTH2_TOKEN_URL =>
						"https://example.com",
					_ => "1",
				}
				.to_owned()
			})
		})
		.expect("An absent scope variable should load.");

		assert!(config.options.oauth2_scope.is_empty());
	}

	#[test]
	fn missing_variables_are_reported_by_name() {
		let err = ProcessorConfig::from_lookup(|key| {
			(key != ProcessorConfig::DELAY_MS).then(|| "1".to_owned())
		})
		.expect_err("Missing variables must be rejected.");

		assert!(matches!(err, ConfigError::MissingVariable { key: "DELAY_MS" }));
	}
}
