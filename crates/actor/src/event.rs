use std::time::Duration;

use parking_lot::{Condvar, Mutex};

/// Auto-reset wait/signal primitive shared between threads.
///
/// A signal raised while nobody waits is latched and consumed by the next
/// waiter, so a `signal` racing ahead of `wait` is never lost.
#[derive(Debug, Default)]
pub(crate) struct Event {
	signaled: Mutex<bool>,
	cond: Condvar,
}

impl Event {
	pub(crate) fn new() -> Self {
		Self::default()
	}

	/// Raises the event, waking one waiter.
	pub(crate) fn signal(&self) {
		let mut signaled = self.signaled.lock();
		*signaled = true;
		self.cond.notify_one();
	}

	/// Blocks until the event is raised, then resets it.
	pub(crate) fn wait(&self) {
		let mut signaled = self.signaled.lock();
		while !*signaled {
			self.cond.wait(&mut signaled);
		}
		*signaled = false;
	}

	/// Blocks for at most `timeout`. Returns `true` if the event was raised.
	pub(crate) fn wait_timeout(&self, timeout: Duration) -> bool {
		let mut signaled = self.signaled.lock();
		if !*signaled {
			let _ = self.cond.wait_while_for(&mut signaled, |signaled| !*signaled, timeout);
		}
		std::mem::take(&mut *signaled)
	}
}
