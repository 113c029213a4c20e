#![cfg(feature = "test")]

// std
use std::{env, fs, path::PathBuf, process, time::SystemTime};
// self
use reissue::{
	_preludet::*,
	client::AuthClient,
	error::RefreshError,
	session::{FileSurface, SessionSurface},
};

fn temp_path() -> PathBuf {
	let nanos = SystemTime::now()
		.duration_since(SystemTime::UNIX_EPOCH)
		.map(|elapsed| elapsed.as_nanos())
		.unwrap_or_default();

	env::temp_dir().join(format!("reissue_session_file_it_{}_{nanos}.json", process::id()))
}

#[tokio::test]
async fn failed_refresh_persists_teardown_to_disk() {
	let path = temp_path();
	let surface = FileSurface::open(&path).expect("Failed to open file surface.");

	surface.set_cookie("XSRF-TOKEN", "csrf-file").expect("Failed to persist cookie.");
	surface.mark_session("has_session").expect("Failed to persist session marker.");

	let transport = Arc::new(ScriptedTransport::default());
	let session: Arc<dyn SessionSurface> = Arc::new(surface);
	let client: ScriptedTestClient =
		AuthClient::with_transport(test_config(), transport.clone(), session)
			.expect("Client should build over the file surface.");

	client.install_token("T1");
	transport
		.script("/a", [ScriptedReply::Respond(401, "{}".into())])
		.script("/auth/reissue", [ScriptedReply::Respond(403, "{}".into())]);

	let err = client.send(get("/a")).await.expect_err("Rejected refresh should surface.");

	assert!(matches!(err, Error::RefreshFailed(RefreshError::Rejected { status: 403 })));
	assert_eq!(transport.calls_to("/auth/reissue")[0].csrf.as_deref(), Some("csrf-file"));

	let reopened = FileSurface::open(&path).expect("Failed to reopen file surface.");

	assert!(!reopened.has_marker("has_session"));
	assert_eq!(reopened.location(), "/login");
	assert_eq!(reopened.cookie("XSRF-TOKEN").as_deref(), Some("csrf-file"));

	fs::remove_file(&path).unwrap_or_else(|e| {
		panic!("Failed to remove temporary session snapshot {}: {e}", path.display())
	});
}
