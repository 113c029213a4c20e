//! Single-flight access-token reissue for authenticated HTTP clients: one refresh per expiry,
//! ordered replay of every request that tripped it, and clean session teardown when it fails.

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod http;
pub mod obs;
pub mod session;
#[cfg(any(test, feature = "test"))]
pub mod _preludet {
	//! Convenience re-exports and helpers for integration tests; enabled via `cfg(test)` or the
	//! `test` crate feature.

	pub use crate::_prelude::*;

	// std
	use std::collections::VecDeque;
	// crates.io
	use tokio::sync::Notify;
	// self
	use crate::{
		client::AuthClient,
		config::ClientConfig,
		http::{ApiRequest, ApiResponse, HttpTransport, Method, StatusCode, TransportFuture},
		session::{MemorySurface, SessionSurface},
	};

	/// Client type alias used by scripted-transport integration tests.
	pub type ScriptedTestClient = AuthClient<ScriptedTransport>;

	/// Transport failure emitted by [`ScriptedTransport`] when a script asks for one.
	#[derive(Debug, ThisError)]
	#[error("Scripted transport failure: {0}.")]
	pub struct ScriptedTransportError(pub String);

	/// One scripted reply.
	#[derive(Clone, Debug)]
	pub enum ScriptedReply {
		/// Respond with the given status and JSON body.
		Respond(u16, String),
		/// Fail at the transport layer.
		Fail(String),
	}

	/// Snapshot of a request the scripted transport received.
	#[derive(Clone, Debug)]
	pub struct RecordedCall {
		/// Request method.
		pub method: Method,
		/// Request path.
		pub path: String,
		/// Authorization header value, if any.
		pub authorization: Option<String>,
		/// Header value copied from the CSRF cookie, if any.
		pub csrf: Option<String>,
	}

	type Responder = Arc<dyn Fn(&ApiRequest) -> ScriptedReply + Send + Sync>;

	/// In-process transport that answers requests from per-path scripts and records every call.
	///
	/// Requests to a path marked with [`ScriptedTransport::gate`] park until
	/// [`ScriptedTransport::open_gate`] releases them, which lets tests hold a refresh in flight.
	#[derive(Default)]
	pub struct ScriptedTransport {
		scripts: Mutex<HashMap<String, VecDeque<ScriptedReply>>>,
		responders: Mutex<HashMap<String, Responder>>,
		calls: Mutex<Vec<RecordedCall>>,
		gates: Mutex<HashMap<String, Arc<Notify>>>,
	}
	impl ScriptedTransport {
		/// Queues replies for a path; each call pops one, the last reply repeats.
		pub fn script<I>(&self, path: &str, replies: I) -> &Self
		where
			I: IntoIterator<Item = ScriptedReply>,
		{
			self.scripts.lock().entry(path.to_owned()).or_default().extend(replies);

			self
		}

		/// Installs a responder computing replies from the request (e.g., by bearer token).
		pub fn respond_with<F>(&self, path: &str, responder: F) -> &Self
		where
			F: 'static + Fn(&ApiRequest) -> ScriptedReply + Send + Sync,
		{
			self.responders.lock().insert(path.to_owned(), Arc::new(responder));

			self
		}

		/// Parks every request to `path` until [`ScriptedTransport::open_gate`] is called.
		pub fn gate(&self, path: &str) -> &Self {
			self.gates.lock().insert(path.to_owned(), Arc::new(Notify::new()));

			self
		}

		/// Releases requests parked on `path` and removes the gate.
		pub fn open_gate(&self, path: &str) {
			if let Some(gate) = self.gates.lock().remove(path) {
				gate.notify_waiters();
				gate.notify_one();
			}
		}

		/// Returns every recorded call in arrival order.
		pub fn calls(&self) -> Vec<RecordedCall> {
			self.calls.lock().clone()
		}

		/// Returns recorded calls for a single path.
		pub fn calls_to(&self, path: &str) -> Vec<RecordedCall> {
			self.calls.lock().iter().filter(|call| call.path == path).cloned().collect()
		}

		fn next_reply(&self, request: &ApiRequest) -> ScriptedReply {
			let path = request.url().path().to_owned();
			let responder = self.responders.lock().get(&path).cloned();

			if let Some(responder) = responder {
				return (*responder)(request);
			}

			let mut scripts = self.scripts.lock();

			match scripts.get_mut(&path) {
				Some(queue) if queue.len() > 1 => queue.pop_front().unwrap_or_else(not_found),
				Some(queue) => queue.front().cloned().unwrap_or_else(not_found),
				None => not_found(),
			}
		}
	}
	impl HttpTransport for ScriptedTransport {
		type Error = ScriptedTransportError;

		fn execute(&self, request: ApiRequest) -> TransportFuture<'_, Self::Error> {
			Box::pin(async move {
				let path = request.url().path().to_owned();

				self.calls.lock().push(RecordedCall {
					method: request.method().clone(),
					path: path.clone(),
					authorization: header_string(&request, "authorization"),
					csrf: header_string(&request, "x-xsrf-token"),
				});

				let gate = self.gates.lock().get(&path).cloned();

				if let Some(gate) = gate {
					gate.notified().await;
				}

				match self.next_reply(&request) {
					ScriptedReply::Respond(status, body) => Ok(ApiResponse::new(
						StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
						body.into_bytes(),
					)),
					ScriptedReply::Fail(message) => Err(ScriptedTransportError(message)),
				}
			})
		}
	}

	fn not_found() -> ScriptedReply {
		ScriptedReply::Respond(404, "{}".into())
	}

	fn header_string(request: &ApiRequest, name: &str) -> Option<String> {
		request.headers().get(name).and_then(|value| value.to_str().ok()).map(str::to_owned)
	}

	/// Base URL used by scripted tests.
	pub const TEST_BASE_URL: &str = "https://api.example.com";

	/// Builds a default configuration rooted at [`TEST_BASE_URL`].
	pub fn test_config() -> ClientConfig {
		ClientConfig::builder(
			Url::parse(TEST_BASE_URL).expect("Test base URL should parse successfully."),
		)
		.build()
		.expect("Default test configuration should validate.")
	}

	/// Builds a client over a fresh [`ScriptedTransport`] and [`MemorySurface`] with a CSRF
	/// cookie and the provided token already installed.
	pub fn build_scripted_client(
		token: Option<&str>,
	) -> (ScriptedTestClient, Arc<ScriptedTransport>, Arc<MemorySurface>) {
		let transport = Arc::new(ScriptedTransport::default());
		let surface = Arc::new(MemorySurface::default());

		surface.set_cookie("XSRF-TOKEN", "csrf-fixture");
		surface
			.mark_session("has_session")
			.expect("Memory surface should accept the session marker.");

		let session: Arc<dyn SessionSurface> = surface.clone();
		let client = AuthClient::with_transport(test_config(), transport.clone(), session)
			.expect("Scripted client should build from the default test configuration.");

		if let Some(token) = token {
			client.install_token(token);
		}

		(client, transport, surface)
	}

	/// Builds an ordinary `GET` request for `path` against [`TEST_BASE_URL`].
	pub fn get(path: &str) -> ApiRequest {
		ApiRequest::new(
			Method::GET,
			Url::parse(TEST_BASE_URL)
				.and_then(|base| base.join(path))
				.expect("Test request URL should parse successfully."),
		)
	}

	/// JSON body carrying `token` at the default token pointer.
	pub fn token_body(token: &str) -> String {
		serde_json::json!({ "data": { "accessToken": token } }).to_string()
	}
}

mod _prelude {
	pub use std::{
		collections::HashMap,
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		sync::Arc,
	};

	pub use parking_lot::{Mutex, RwLock};
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use thiserror::Error as ThisError;
	pub use time::Duration;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(test)] use {color_eyre as _, httpmock as _};
