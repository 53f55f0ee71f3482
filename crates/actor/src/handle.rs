use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;

use crate::Envelope;
use crate::current;
use crate::mailbox::Mailbox;

/// Process-unique actor identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActorId(u64);

impl ActorId {
	pub(crate) const fn new(raw: u64) -> Self {
		Self(raw)
	}

	pub const fn get(self) -> u64 {
		self.0
	}
}

impl std::fmt::Display for ActorId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "actor#{}", self.0)
	}
}

/// Where an actor's messages are processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SpawnMode {
	/// Scheduled onto the shared worker pool.
	#[default]
	Shared,
	/// Owns a dedicated worker thread for its whole life.
	Exclusive,
	/// Drained only by [`crate::this_thread::process_messages`] on the spawning thread.
	Bind,
}

/// Counted handle to one actor.
///
/// Cloning acquires a reference, dropping releases one; when the last
/// reference (handles and in-flight messages alike) is gone the actor is torn
/// down. Equality is identity of the underlying actor.
pub struct ActorRef {
	mailbox: Arc<Mailbox>,
}

impl ActorRef {
	/// Wraps a mailbox whose reference was already counted on our behalf.
	pub(crate) fn adopt(mailbox: Arc<Mailbox>) -> Self {
		Self { mailbox }
	}

	pub(crate) fn mailbox(&self) -> &Arc<Mailbox> {
		&self.mailbox
	}

	pub fn id(&self) -> ActorId {
		self.mailbox.id()
	}

	pub fn mode(&self) -> SpawnMode {
		self.mailbox.mode()
	}

	/// Delivers `message`. Returns `false` if the actor is being destroyed.
	///
	/// When called from inside a handler, that actor is recorded as sender.
	pub fn send<M>(&self, message: M) -> bool
	where
		M: Send + 'static,
	{
		self.deliver(current::actor(), message)
	}

	/// Delivers `message` with `sender` recorded as its origin.
	pub fn send_on_behalf<M>(&self, sender: &ActorRef, message: M) -> bool
	where
		M: Send + 'static,
	{
		self.deliver(Some(sender.clone()), message)
	}

	fn deliver<M>(&self, sender: Option<ActorRef>, message: M) -> bool
	where
		M: Send + 'static,
	{
		if self.mailbox.is_deleting() {
			return false;
		}
		self.mailbox.post(Envelope::new(sender, self.clone(), message))
	}

	/// Marks the actor for teardown. Queued messages are dropped.
	pub fn destroy(&self) {
		self.mailbox.deconstruct();
	}

	/// Marks the actor for teardown and blocks until it completed.
	pub fn destroy_and_wait(&self) {
		self.destroy();
		self.join();
	}

	/// Blocks until the actor has been torn down.
	///
	/// Returns immediately when called from the actor's own handler.
	pub fn join(&self) {
		self.mailbox.join(None);
	}

	/// Like [`Self::join`] with a deadline. Returns `true` if teardown completed.
	pub fn join_timeout(&self, timeout: Duration) -> bool {
		self.mailbox.join(Some(timeout))
	}

	/// Returns `true` once teardown has completed.
	pub fn is_terminated(&self) -> bool {
		self.mailbox.is_terminated()
	}

	/// Returns `true` once the actor has been marked for teardown.
	pub fn is_destroying(&self) -> bool {
		self.mailbox.is_deleting()
	}

	/// Racy count of queued messages.
	pub fn pending(&self) -> usize {
		self.mailbox.pending()
	}
}

impl Clone for ActorRef {
	fn clone(&self) -> Self {
		self.mailbox.acquire();
		Self {
			mailbox: Arc::clone(&self.mailbox),
		}
	}
}

impl Drop for ActorRef {
	fn drop(&mut self) {
		self.mailbox.release();
	}
}

impl PartialEq for ActorRef {
	fn eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.mailbox, &other.mailbox)
	}
}

impl Eq for ActorRef {}

impl Hash for ActorRef {
	fn hash<H: Hasher>(&self, state: &mut H) {
		std::ptr::hash(Arc::as_ptr(&self.mailbox), state);
	}
}

impl std::fmt::Debug for ActorRef {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ActorRef").field("id", &self.id()).field("mode", &self.mode()).finish()
	}
}
