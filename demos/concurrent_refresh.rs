//! Demonstrates five requests expiring at once against a mock API: one refresh call is sent, and
//! every request is replayed with the reissued token.

// std
use std::sync::Arc;
// crates.io
use color_eyre::Result;
use httpmock::prelude::*;
// self
use reissue::{
	client::ReqwestAuthClient,
	config::ClientConfig,
	http::ApiRequest,
	session::{MemorySurface, SessionSurface},
	url::Url,
};

const PATHS: [&str; 5] = ["/profile", "/orders", "/inbox", "/settings", "/billing"];

#[tokio::main]
async fn main() -> Result<()> {
	color_eyre::install()?;

	let server = MockServer::start_async().await;
	let refresh_mock = server
		.mock_async(|when, then| {
			when.method(POST).path("/auth/reissue").header("x-xsrf-token", "demo-csrf");
			then.status(200)
				.header("content-type", "application/json")
				.body("{\"data\":{\"accessToken\":\"fresh-access\"}}");
		})
		.await;

	for path in PATHS {
		server
			.mock_async(|when, then| {
				when.method(GET).path(path).header("authorization", "Bearer expired-access");
				then.status(401).body("{}");
			})
			.await;
		server
			.mock_async(|when, then| {
				when.method(GET).path(path).header("authorization", "Bearer fresh-access");
				then.status(200).header("content-type", "application/json").body("{\"ok\":true}");
			})
			.await;
	}

	let surface = Arc::new(MemorySurface::default());

	surface.set_cookie("XSRF-TOKEN", "demo-csrf");
	surface.mark_session("has_session")?;

	let config = ClientConfig::builder(Url::parse(&server.url("/"))?).build()?;
	let client = ReqwestAuthClient::new(config, surface.clone())?;

	client.install_token("expired-access");

	let handles = PATHS
		.into_iter()
		.map(|path| {
			let client = client.clone();

			tokio::spawn(async move {
				let url = client.config().resolve(path)?;

				client.send(ApiRequest::get(url)).await.map(|response| (path, response.status()))
			})
		})
		.collect::<Vec<_>>();

	for handle in handles {
		let (path, status) = handle.await??;

		println!("{path} -> {status}.");
	}

	refresh_mock.assert_calls_async(1).await;

	println!(
		"Refresh calls: {}; requests queued behind it: {}.",
		client.refresh_metrics.attempts(),
		client.refresh_metrics.queued()
	);

	Ok(())
}
