//! Redacted bearer token wrapper and response-body extraction.

// self
use crate::_prelude::*;

/// Opaque bearer credential that redacts itself in logs.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccessToken(String);
impl AccessToken {
	/// Wraps a new token string.
	pub fn new(value: impl Into<String>) -> Self {
		Self(value.into())
	}

	/// Returns the inner token value. Callers must avoid logging this string.
	pub fn expose(&self) -> &str {
		&self.0
	}

	/// Formats the token as an `Authorization` header value.
	pub fn bearer(&self) -> String {
		format!("Bearer {}", self.0)
	}

	/// Reads the token stored at `pointer` (RFC 6901) inside a JSON body.
	///
	/// Returns `Ok(None)` when the pointer does not resolve to a non-empty string.
	pub fn from_json_body(body: &[u8], pointer: &str) -> Result<Option<Self>, serde_json::Error> {
		let value = serde_json::from_slice::<serde_json::Value>(body)?;

		Ok(value
			.pointer(pointer)
			.and_then(serde_json::Value::as_str)
			.map(str::trim)
			.filter(|token| !token.is_empty())
			.map(Self::new))
	}
}
impl AsRef<str> for AccessToken {
	fn as_ref(&self) -> &str {
		self.expose()
	}
}
impl Debug for AccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("AccessToken").field(&"<redacted>").finish()
	}
}
impl Display for AccessToken {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.write_str("<redacted>")
	}
}

/// Extracts the bearer credential from an `Authorization` header value.
pub fn bearer_credential(header: &str) -> Option<&str> {
	let (scheme, credential) = header.trim().split_once(' ')?;

	if scheme.eq_ignore_ascii_case("bearer") {
		Some(credential.trim()).filter(|value| !value.is_empty())
	} else {
		None
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;

	#[test]
	fn token_formatters_redact() {
		let token = AccessToken::new("super-secret");

		assert_eq!(format!("{token:?}"), "AccessToken(\"<redacted>\")");
		assert_eq!(format!("{token}"), "<redacted>");
		assert_eq!(token.bearer(), "Bearer super-secret");
	}

	#[test]
	fn json_extraction_requires_non_empty_string() {
		let body = br#"{"data":{"accessToken":"T2","blank":"  ","number":7}}"#;

		assert_eq!(
			AccessToken::from_json_body(body, "/data/accessToken")
				.expect("Fixture body should parse."),
			Some(AccessToken::new("T2"))
		);
		assert_eq!(
			AccessToken::from_json_body(body, "/data/blank").expect("Fixture body should parse."),
			None
		);
		assert_eq!(
			AccessToken::from_json_body(body, "/data/number").expect("Fixture body should parse."),
			None
		);
		assert_eq!(
			AccessToken::from_json_body(body, "/missing").expect("Fixture body should parse."),
			None
		);
		assert!(AccessToken::from_json_body(b"<html>", "/data/accessToken").is_err());
	}

	#[test]
	fn bearer_credential_parses_scheme_case_insensitively() {
		assert_eq!(bearer_credential("Bearer abc"), Some("abc"));
		assert_eq!(bearer_credential("bearer  abc "), Some("abc"));
		assert_eq!(bearer_credential("Basic abc"), None);
		assert_eq!(bearer_credential("Bearer "), None);
		assert_eq!(bearer_credential("Bearer"), None);
	}
}
