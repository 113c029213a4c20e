//! Process-wide holder for the current access token of one client session.

// self
use crate::{_prelude::*, auth::AccessToken};

/// What the token slot currently holds.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum TokenState {
	/// No token has been installed since the store was created.
	#[default]
	Vacant,
	/// A token is installed.
	Active(AccessToken),
	/// The session was ended by logout or teardown; cleared until the next install.
	Ended,
}

/// Shared, in-memory access token slot.
///
/// Clones share the same slot, so every handle of one [`AuthClient`](crate::client::AuthClient)
/// observes the same token. Nothing is persisted; the slot starts vacant.
#[derive(Clone, Debug, Default)]
pub struct TokenStore(Arc<RwLock<TokenState>>);
impl TokenStore {
	/// Returns a copy of the current token, if any.
	pub fn get(&self) -> Option<AccessToken> {
		match &*self.0.read() {
			TokenState::Active(token) => Some(token.clone()),
			TokenState::Vacant | TokenState::Ended => None,
		}
	}

	/// Returns a snapshot of the slot.
	pub fn state(&self) -> TokenState {
		self.0.read().clone()
	}

	/// Replaces the current token.
	pub fn set(&self, token: AccessToken) {
		*self.0.write() = TokenState::Active(token);
	}

	/// Removes the current token and marks the session as ended.
	pub fn clear(&self) {
		*self.0.write() = TokenState::Ended;
	}

	/// Returns `true` when a token is installed.
	pub fn is_set(&self) -> bool {
		matches!(*self.0.read(), TokenState::Active(_))
	}
}
