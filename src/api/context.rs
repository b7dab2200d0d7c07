//! Cancellable call contexts passed into every network-issuing operation.

// std
use std::time::Duration as StdDuration;
// crates.io
use tokio::{sync::watch, time::Instant};
// self
use crate::_prelude::*;

/// Cloneable cancellation signal shared between a caller and the calls it governs.
#[derive(Clone, Debug)]
pub struct CancelToken(Arc<watch::Sender<bool>>);
impl CancelToken {
	/// Creates a token in the non-cancelled state.
	pub fn new() -> Self {
		let (tx, _) = watch::channel(false);

		Self(Arc::new(tx))
	}

	/// Cancels every call observing this token. Idempotent.
	pub fn cancel(&self) {
		self.0.send_replace(true);
	}

	/// Returns `true` once [`cancel`](Self::cancel) has been called.
	pub fn is_cancelled(&self) -> bool {
		*self.0.borrow()
	}

	/// Resolves when the token is cancelled.
	pub async fn cancelled(&self) {
		let mut rx = self.0.subscribe();
		let _ = rx.wait_for(|cancelled| *cancelled).await;
	}
}
impl Default for CancelToken {
	fn default() -> Self {
		Self::new()
	}
}

/// Deadline and cancellation state for a single logical operation.
///
/// [`CallContext::background`] never cancels. Contexts are cheap to clone and can be reused
/// across calls; every call re-checks the state before touching the network.
#[derive(Clone, Debug, Default)]
pub struct CallContext {
	deadline: Option<Instant>,
	cancel: Option<CancelToken>,
}
impl CallContext {
	/// Context without deadline or cancellation.
	pub fn background() -> Self {
		Self::default()
	}

	/// Adds a deadline `timeout` from now, keeping an earlier deadline if one is set.
	///
	/// A timeout too large to represent as an instant adds no deadline.
	pub fn with_timeout(self, timeout: StdDuration) -> Self {
		match Instant::now().checked_add(timeout) {
			Some(deadline) => self.with_deadline(deadline),
			None => self,
		}
	}

	/// Adds an absolute deadline, keeping an earlier deadline if one is set.
	pub fn with_deadline(mut self, deadline: Instant) -> Self {
		self.deadline = Some(match self.deadline {
			Some(current) => current.min(deadline),
			None => deadline,
		});

		self
	}

	/// Attaches a cancellation token.
	pub fn with_cancellation(mut self, token: CancelToken) -> Self {
		self.cancel = Some(token);

		self
	}

	/// Returns the effective deadline, if any.
	pub fn deadline(&self) -> Option<Instant> {
		self.deadline
	}

	/// Returns `true` when the attached token has been cancelled.
	pub fn is_cancelled(&self) -> bool {
		self.cancel.as_ref().is_some_and(CancelToken::is_cancelled)
	}

	/// Returns `true` when the deadline has passed.
	pub fn deadline_exceeded(&self) -> bool {
		self.deadline.is_some_and(|deadline| Instant::now() >= deadline)
	}

	/// Reports why the context is done, preferring cancellation over the deadline.
	pub fn err(&self) -> Option<Error> {
		if self.is_cancelled() {
			Some(Error::Cancelled)
		} else if self.deadline_exceeded() {
			Some(Error::DeadlineExceeded)
		} else {
			None
		}
	}

	/// Drives `fut` until it completes or the context is done.
	pub(crate) async fn run<F>(&self, fut: F) -> Result<F::Output>
	where
		F: Future,
	{
		if let Some(err) = self.err() {
			return Err(err);
		}
		if self.cancel.is_none() && self.deadline.is_none() {
			return Ok(fut.await);
		}

		let cancelled = async {
			match &self.cancel {
				Some(token) => token.cancelled().await,
				None => std::future::pending().await,
			}
		};
		let expired = async {
			match self.deadline {
				Some(deadline) => tokio::time::sleep_until(deadline).await,
				None => std::future::pending().await,
			}
		};

		tokio::select! {
			biased;
			_ = cancelled => Err(Error::Cancelled),
			_ = expired => Err(Error::DeadlineExceeded),
			output = fut => Ok(output),
		}
	}
}
