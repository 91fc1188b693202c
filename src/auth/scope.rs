//! Ordered scope lists used to request credentials and to key the token cache.

// std
use std::slice::Iter;
// self
use crate::_prelude::*;

/// Errors emitted when validating scopes.
#[derive(Clone, Debug, PartialEq, Eq, ThisError)]
pub enum ScopeValidationError {
	/// Empty scope entries are not allowed (e.g. doubled separators).
	#[error("Scope entries cannot be empty.")]
	Empty,
	/// Scopes cannot contain embedded whitespace characters.
	#[error("Scope contains whitespace: {scope}.")]
	ContainsWhitespace {
		/// The offending scope string.
		scope: String,
	},
}

/// Scopes in caller-supplied order.
///
/// Unlike a normalized set, the order is preserved and no deduplication happens: the cache key
/// is the scopes joined by a single space exactly as given, so callers must pass scopes in a
/// canonical order to share cached tokens.
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct ScopeList(Arc<[String]>);
impl ScopeList {
	/// Builds a scope list from any iterator, rejecting empty or whitespace-bearing entries.
	pub fn new<I, S>(scopes: I) -> Result<Self, ScopeValidationError>
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		let mut list = Vec::new();

		for scope in scopes {
			let owned: String = scope.into();

			if owned.is_empty() {
				return Err(ScopeValidationError::Empty);
			}
			if owned.chars().any(char::is_whitespace) {
				return Err(ScopeValidationError::ContainsWhitespace { scope: owned });
			}

			list.push(owned);
		}

		Ok(Self(Arc::from(list)))
	}

	/// Number of scopes.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns true if no scopes are requested.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Iterator over scopes in request order.
	pub fn iter(&self) -> Iter<'_, String> {
		self.0.iter()
	}

	/// Cache key: scopes joined by a single space in the order given.
	pub fn cache_key(&self) -> String {
		self.0.join(" ")
	}

	/// Returns the underlying slice of scope strings.
	pub fn as_slice(&self) -> &[String] {
		&self.0
	}
}
impl Debug for ScopeList {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("ScopeList").field(&self.0).finish()
	}
}
impl Display for ScopeList {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str(&self.cache_key())
	}
}
impl<'a> IntoIterator for &'a ScopeList {
	type IntoIter = Iter<'a, String>;
	type Item = &'a String;

	fn into_iter(self) -> Self::IntoIter {
		self.0.iter()
	}
}
impl FromStr for ScopeList {
	type Err = ScopeValidationError;

	/// Splits on single spaces; an empty string is an empty list.
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		if s.is_empty() {
			return Ok(Self::default());
		}

		Self::new(s.split(' '))
	}
}
