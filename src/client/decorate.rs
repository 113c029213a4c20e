//! Outbound request decoration: bearer token and CSRF echo.

// self
use crate::{
	auth::TokenStore,
	client::AuthClient,
	config::ClientConfig,
	http::{ApiRequest, HeaderName, HeaderValue, HttpTransport},
	obs,
	session::SessionSurface,
};

/// Attaches the stored access token and the CSRF cookie echo to outgoing requests.
///
/// Absent tokens and cookies are valid states; the request then goes out anonymous or without
/// the CSRF header. The decorator only reads the token store.
pub struct OutboundDecorator<'a> {
	config: &'a ClientConfig,
	tokens: &'a TokenStore,
	surface: &'a dyn SessionSurface,
}
impl<'a> OutboundDecorator<'a> {
	/// Creates a decorator over the provided configuration, store, and surface.
	pub fn new(
		config: &'a ClientConfig,
		tokens: &'a TokenStore,
		surface: &'a dyn SessionSurface,
	) -> Self {
		Self { config, tokens, surface }
	}

	/// Decorates `request` in place.
	pub fn apply(&self, request: &mut ApiRequest) {
		if self.config.is_refresh(request.url()) {
			// The refresh call must never carry the token it is replacing.
			request.deauthorize();
		} else if let Some(token) = self.tokens.get() {
			if !request.authorize(&token) {
				obs::warn_tolerated(
					"access token cannot be encoded as a header; sending anonymously",
					&request.url().path(),
				);
			}
		}

		self.echo_csrf(request);
	}

	fn echo_csrf(&self, request: &mut ApiRequest) {
		let Some(cookie) = self.surface.cookie(&self.config.csrf.cookie) else {
			return;
		};

		match (
			HeaderName::from_bytes(self.config.csrf.header.as_bytes()),
			HeaderValue::from_str(&cookie),
		) {
			(Ok(name), Ok(value)) => {
				request.headers_mut().insert(name, value);
			},
			_ => obs::warn_tolerated(
				"CSRF cookie cannot be echoed as a header; skipping",
				&self.config.csrf.header,
			),
		}
	}
}

impl<T> AuthClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Applies the outbound decorator for this client session to `request`.
	pub fn decorate(&self, request: &mut ApiRequest) {
		OutboundDecorator::new(self.config(), self.tokens(), self.surface.as_ref()).apply(request);
	}
}

#[cfg(test)]
mod tests {
	// self
	use super::*;
	use crate::{
		_prelude::*,
		auth::AccessToken,
		http::{Method, header},
		session::MemorySurface,
	};

	fn fixture() -> (ClientConfig, TokenStore, MemorySurface) {
		let config = ClientConfig::builder(
			Url::parse("https://api.example.com").expect("Fixture base URL should parse."),
		)
		.build()
		.expect("Fixture configuration should validate.");

		(config, TokenStore::default(), MemorySurface::default())
	}

	fn request(config: &ClientConfig, path: &str) -> ApiRequest {
		ApiRequest::new(Method::GET, config.resolve(path).expect("Fixture path should resolve."))
	}

	#[test]
	fn attaches_token_and_csrf_to_ordinary_requests() {
		let (config, tokens, surface) = fixture();
		let mut request = request(&config, "/a");

		tokens.set(AccessToken::new("T1"));
		surface.set_cookie("XSRF-TOKEN", "csrf-1");
		OutboundDecorator::new(&config, &tokens, &surface).apply(&mut request);

		assert_eq!(request.bearer(), Some("T1"));
		assert_eq!(
			request.headers().get("x-xsrf-token").and_then(|value| value.to_str().ok()),
			Some("csrf-1")
		);
	}

	#[test]
	fn refresh_call_never_carries_a_token() {
		let (config, tokens, surface) = fixture();
		let mut request = request(&config, "/auth/reissue").with_header(
			header::AUTHORIZATION,
			HeaderValue::from_static("Bearer default-from-caller"),
		);

		tokens.set(AccessToken::new("T1"));
		surface.set_cookie("XSRF-TOKEN", "csrf-1");
		OutboundDecorator::new(&config, &tokens, &surface).apply(&mut request);

		assert!(!request.is_authorized());
		assert!(request.headers().contains_key("x-xsrf-token"));
	}

	#[test]
	fn missing_token_and_cookie_leave_request_untouched() {
		let (config, tokens, surface) = fixture();
		let mut request = request(&config, "/a");

		OutboundDecorator::new(&config, &tokens, &surface).apply(&mut request);

		assert!(request.headers().is_empty());
	}

	#[test]
	fn unencodable_cookie_is_skipped() {
		let (config, tokens, surface) = fixture();
		let mut request = request(&config, "/a");

		surface.set_cookie("XSRF-TOKEN", "line\nbreak");
		OutboundDecorator::new(&config, &tokens, &surface).apply(&mut request);

		assert!(!request.headers().contains_key("x-xsrf-token"));
	}
}
