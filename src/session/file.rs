//! File-backed [`SessionSurface`] for CLI-style clients that outlive a single process.

// std
use std::{
	collections::BTreeSet,
	fs::{self, File},
	io::Write,
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	session::{SessionError, SessionSurface},
};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
struct Snapshot {
	#[serde(default)]
	cookies: HashMap<String, String>,
	#[serde(default)]
	markers: BTreeSet<String>,
	#[serde(default)]
	location: String,
}

/// Persists cookies, session markers, and the current location to a JSON file after each
/// mutation.
///
/// Navigation is recorded rather than performed: a redirect rewrites the stored location so the
/// embedding application can route to it on its next read.
#[derive(Clone, Debug)]
pub struct FileSurface {
	path: PathBuf,
	inner: Arc<RwLock<Snapshot>>,
}
impl FileSurface {
	/// Opens (or creates) a surface at the provided path, eagerly loading existing data.
	pub fn open(path: impl Into<PathBuf>) -> Result<Self, SessionError> {
		let path = path.into();

		Self::ensure_parent_exists(&path)?;

		let snapshot = Self::load_snapshot(&path)?;

		Ok(Self { path, inner: Arc::new(RwLock::new(snapshot)) })
	}

	/// Sets (or replaces) a readable cookie and persists it.
	pub fn set_cookie(
		&self,
		name: impl Into<String>,
		value: impl Into<String>,
	) -> Result<(), SessionError> {
		let mut guard = self.inner.write();

		guard.cookies.insert(name.into(), value.into());

		self.persist_locked(&guard)
	}

	/// Stored location.
	pub fn location(&self) -> String {
		self.inner.read().location.clone()
	}

	/// Returns `true` when the marker `key` is set.
	pub fn has_marker(&self, key: &str) -> bool {
		self.inner.read().markers.contains(key)
	}

	fn load_snapshot(path: &Path) -> Result<Snapshot, SessionError> {
		if !path.exists() {
			return Ok(Snapshot::default());
		}

		let bytes = fs::read(path).map_err(|e| SessionError::Backend {
			message: format!("Failed to read {}: {e}", path.display()),
		})?;

		if bytes.is_empty() {
			return Ok(Snapshot::default());
		}

		serde_json::from_slice(&bytes).map_err(|e| SessionError::Serialization {
			message: format!("Failed to parse {}: {e}", path.display()),
		})
	}

	fn ensure_parent_exists(path: &Path) -> Result<(), SessionError> {
		if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
			fs::create_dir_all(parent).map_err(|e| SessionError::Backend {
				message: format!("Failed to create session directory {}: {e}", parent.display()),
			})?;
		}

		Ok(())
	}

	fn persist_locked(&self, snapshot: &Snapshot) -> Result<(), SessionError> {
		Self::ensure_parent_exists(&self.path)?;

		let serialized =
			serde_json::to_vec_pretty(snapshot).map_err(|e| SessionError::Serialization {
				message: format!("Failed to serialize session snapshot: {e}"),
			})?;
		let mut tmp_path = self.path.clone();

		tmp_path.set_extension("tmp");

		{
			let mut file = File::create(&tmp_path).map_err(|e| SessionError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| SessionError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| SessionError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, &self.path).map_err(|e| SessionError::Backend {
			message: format!("Failed to replace {}: {e}", self.path.display()),
		})
	}
}
impl SessionSurface for FileSurface {
	fn cookie(&self, name: &str) -> Option<String> {
		self.inner.read().cookies.get(name).cloned()
	}

	fn mark_session(&self, key: &str) -> Result<(), SessionError> {
		let mut guard = self.inner.write();

		if guard.markers.insert(key.to_owned()) { self.persist_locked(&guard) } else { Ok(()) }
	}

	fn clear_session_marker(&self, key: &str) -> Result<(), SessionError> {
		let mut guard = self.inner.write();

		if guard.markers.remove(key) { self.persist_locked(&guard) } else { Ok(()) }
	}

	fn is_on_login(&self, location: &str) -> bool {
		self.inner.read().location == location
	}

	fn redirect_to_login(&self, location: &str) -> Result<(), SessionError> {
		let mut guard = self.inner.write();

		guard.location = location.to_owned();

		self.persist_locked(&guard)
	}
}

#[cfg(test)]
mod tests {
	// std
	use std::{env, process, time::SystemTime};
	// self
	use super::*;

	fn temp_path() -> PathBuf {
		let nanos = SystemTime::now()
			.duration_since(SystemTime::UNIX_EPOCH)
			.map(|elapsed| elapsed.as_nanos())
			.unwrap_or_default();

		env::temp_dir().join(format!("reissue_file_surface_{}_{nanos}.json", process::id()))
	}

	#[test]
	fn markers_and_location_survive_reopen() {
		let path = temp_path();
		let surface = FileSurface::open(&path).expect("Failed to open file surface.");

		surface.set_cookie("XSRF-TOKEN", "csrf-1").expect("Failed to persist cookie.");
		surface.mark_session("has_session").expect("Failed to persist session marker.");
		drop(surface);

		let reopened = FileSurface::open(&path).expect("Failed to reopen file surface.");

		assert!(reopened.has_marker("has_session"));
		assert_eq!(reopened.cookie("XSRF-TOKEN").as_deref(), Some("csrf-1"));

		reopened.clear_session_marker("has_session").expect("Failed to clear session marker.");
		reopened.redirect_to_login("/login").expect("Failed to persist redirect.");

		let reopened = FileSurface::open(&path).expect("Failed to reopen file surface.");

		assert!(!reopened.has_marker("has_session"));
		assert!(reopened.is_on_login("/login"));
		assert_eq!(reopened.location(), "/login");

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary session snapshot {}: {e}", path.display())
		});
	}

	#[test]
	fn corrupt_snapshot_is_reported() {
		let path = temp_path();

		fs::write(&path, b"not json").expect("Failed to write corrupt fixture.");

		let err = FileSurface::open(&path).expect_err("Corrupt snapshot should fail to load.");

		assert!(matches!(err, SessionError::Serialization { .. }));

		fs::remove_file(&path).unwrap_or_else(|e| {
			panic!("Failed to remove temporary session snapshot {}: {e}", path.display())
		});
	}
}
