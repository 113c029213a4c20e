//! Persistence surface contracts and built-in implementations.
//!
//! The client reads the CSRF cookie, flips the "has active session" marker, and sends the
//! user to the login surface through [`SessionSurface`]; it never touches cookies or storage
//! directly.

pub mod file;
pub mod memory;

pub use file::FileSurface;
pub use memory::MemorySurface;

// self
use crate::_prelude::*;

/// Client-side persistence and navigation surface.
pub trait SessionSurface
where
	Self: Send + Sync,
{
	/// Reads a readable (non HTTP-only) cookie.
	fn cookie(&self, name: &str) -> Option<String>;

	/// Persists the "has active session" marker under `key`.
	fn mark_session(&self, key: &str) -> Result<(), SessionError>;

	/// Removes the "has active session" marker stored under `key`.
	fn clear_session_marker(&self, key: &str) -> Result<(), SessionError>;

	/// Returns `true` when the user is already on the login surface at `location`.
	fn is_on_login(&self, location: &str) -> bool;

	/// Navigates the user to the login surface at `location`.
	fn redirect_to_login(&self, location: &str) -> Result<(), SessionError>;
}

/// Error type produced by [`SessionSurface`] implementations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize, ThisError)]
pub enum SessionError {
	/// Serialization failures surfaced by the backend.
	#[error("Serialization error: {message}.")]
	Serialization {
		/// Human-readable error payload.
		message: String,
	},
	/// Backend-level failure for the storage engine.
	#[error("Backend failure: {message}.")]
	Backend {
		/// Human-readable error payload.
		message: String,
	},
}
