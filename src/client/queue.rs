//! FIFO queue of requests suspended on the in-flight refresh.

// std
use std::collections::VecDeque;
// crates.io
use tokio::sync::oneshot::{self, Receiver, Sender};
// self
use crate::{_prelude::*, auth::AccessToken, error::RefreshError, http::ApiRequest};

/// Outcome delivered to a waiter when the refresh it waits on settles.
pub type WaiterOutcome = Result<Settled, RefreshError>;

/// Successful resolution of a waiter.
#[derive(Clone, Debug)]
pub struct Settled {
	/// Token produced by the refresh.
	pub token: AccessToken,
	/// The waiter's request, carrying `token` with its attempt count advanced.
	pub replay: Option<ApiRequest>,
}

/// A suspended request plus the continuation that resumes it.
#[derive(Debug)]
pub struct PendingWaiter {
	request: Option<ApiRequest>,
	continuation: Sender<WaiterOutcome>,
}

/// Receiving half handed to a suspended caller.
#[derive(Debug)]
pub struct WaiterHandle(Receiver<WaiterOutcome>);
impl WaiterHandle {
	/// Suspends until the refresh settles.
	///
	/// A refresh whose driver vanished without settling resolves as [`RefreshError::Abandoned`].
	pub async fn settled(self) -> WaiterOutcome {
		self.0.await.unwrap_or(Err(RefreshError::Abandoned))
	}
}

/// Ordered waiters for one refresh cycle.
#[derive(Debug, Default)]
pub struct WaiterQueue(VecDeque<PendingWaiter>);
impl WaiterQueue {
	/// Appends a waiter and returns its handle.
	pub fn enqueue(&mut self, request: Option<ApiRequest>) -> WaiterHandle {
		let (continuation, receiver) = oneshot::channel();

		self.0.push_back(PendingWaiter { request, continuation });

		WaiterHandle(receiver)
	}

	/// Number of queued waiters.
	pub fn len(&self) -> usize {
		self.0.len()
	}

	/// Returns `true` when no waiter is queued.
	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	/// Drains every waiter in FIFO order, resolving or rejecting each, and returns how many
	/// waiters were still listening.
	///
	/// Waiters whose callers went away are skipped without affecting the others.
	pub fn flush(self, outcome: Result<&AccessToken, &RefreshError>) -> usize {
		let mut delivered = 0;

		for PendingWaiter { request, continuation } in self.0 {
			let message = match outcome {
				Ok(token) => Ok(Settled {
					token: token.clone(),
					replay: request.map(|request| request.retried_with(token)),
				}),
				Err(err) => Err(err.clone()),
			};

			if continuation.send(message).is_ok() {
				delivered += 1;
			}
		}

		delivered
	}
}
