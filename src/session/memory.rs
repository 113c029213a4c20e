//! Thread-safe in-memory [`SessionSurface`] for local development and tests.

// std
use std::collections::HashSet;
// self
use crate::{
	_prelude::*,
	session::{SessionError, SessionSurface},
};

#[derive(Debug, Default)]
struct Snapshot {
	cookies: HashMap<String, String>,
	markers: HashSet<String>,
	location: String,
	redirects: Vec<String>,
}

/// Surface that keeps cookies, markers, and navigation in-process and records every redirect.
#[derive(Clone, Debug, Default)]
pub struct MemorySurface(Arc<RwLock<Snapshot>>);
impl MemorySurface {
	/// Sets (or replaces) a readable cookie.
	pub fn set_cookie(&self, name: impl Into<String>, value: impl Into<String>) {
		self.0.write().cookies.insert(name.into(), value.into());
	}

	/// Removes a cookie.
	pub fn remove_cookie(&self, name: &str) {
		self.0.write().cookies.remove(name);
	}

	/// Overrides the current location.
	pub fn set_location(&self, location: impl Into<String>) {
		self.0.write().location = location.into();
	}

	/// Current location.
	pub fn location(&self) -> String {
		self.0.read().location.clone()
	}

	/// Returns `true` when the marker `key` is set.
	pub fn has_marker(&self, key: &str) -> bool {
		self.0.read().markers.contains(key)
	}

	/// Every redirect issued so far, oldest first.
	pub fn redirects(&self) -> Vec<String> {
		self.0.read().redirects.clone()
	}
}
impl SessionSurface for MemorySurface {
	fn cookie(&self, name: &str) -> Option<String> {
		self.0.read().cookies.get(name).cloned()
	}

	fn mark_session(&self, key: &str) -> Result<(), SessionError> {
		self.0.write().markers.insert(key.to_owned());

		Ok(())
	}

	fn clear_session_marker(&self, key: &str) -> Result<(), SessionError> {
		self.0.write().markers.remove(key);

		Ok(())
	}

	fn is_on_login(&self, location: &str) -> bool {
		self.0.read().location == location
	}

	fn redirect_to_login(&self, location: &str) -> Result<(), SessionError> {
		let mut guard = self.0.write();

		guard.location = location.to_owned();
		guard.redirects.push(location.to_owned());

		Ok(())
	}
}
