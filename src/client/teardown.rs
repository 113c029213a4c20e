//! Session teardown after an unrecoverable refresh failure, and explicit logout.

// self
use crate::{_prelude::*, client::AuthClient, http::HttpTransport, obs};

impl<T> AuthClient<T>
where
	T: ?Sized + HttpTransport,
{
	/// Ends the session locally: clears the token and the session marker.
	///
	/// Unlike a failed refresh, logout does not navigate; the caller decides where to go next.
	pub fn logout(&self) -> Result<()> {
		self.tokens().clear();
		self.surface.clear_session_marker(&self.config().session_marker)?;

		Ok(())
	}

	/// Clears the token and session marker, then sends the user to the login surface unless
	/// they are already there.
	///
	/// Surface failures are logged and tolerated; the token store is always cleared.
	pub(crate) fn tear_down(&self) {
		let config = self.config();

		self.tokens().clear();

		if let Err(e) = self.surface.clear_session_marker(&config.session_marker) {
			obs::warn_tolerated("session marker could not be cleared during teardown", &e);
		}
		if self.surface.is_on_login(&config.login_location) {
			return;
		}
		if let Err(e) = self.surface.redirect_to_login(&config.login_location) {
			obs::warn_tolerated("redirect to login failed during teardown", &e);
		}
	}
}
