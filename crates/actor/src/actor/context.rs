use super::Actor;
use super::dispatch::Handlers;
use crate::{ActorRef, Handle, SpawnMode};

/// Capabilities handed to lifecycle hooks and handlers.
pub struct Context<'a, A: Actor> {
	me: &'a ActorRef,
	sender: Option<&'a ActorRef>,
	handlers: &'a mut Handlers<A>,
	stopping: bool,
}

impl<'a, A: Actor> Context<'a, A> {
	pub(super) fn new(me: &'a ActorRef, sender: Option<&'a ActorRef>, handlers: &'a mut Handlers<A>) -> Self {
		Self {
			me,
			sender,
			handlers,
			stopping: false,
		}
	}

	/// Handle of the actor being dispatched.
	pub fn me(&self) -> &ActorRef {
		self.me
	}

	/// Sender of the current message, if it came from an actor.
	pub fn sender(&self) -> Option<&ActorRef> {
		self.sender
	}

	/// Installs the handler for messages of type `M`, replacing any previous one.
	///
	/// Takes effect from the next message on, also when called from the
	/// handler being replaced.
	pub fn handler<M, F>(&mut self, handler: F)
	where
		M: Send + 'static,
		F: FnMut(&mut A, &mut Context<'_, A>, M) + Send + 'static,
	{
		self.handlers.insert(handler);
	}

	/// Removes the handler for `M`. Later messages of that type are dropped.
	pub fn remove_handler<M: 'static>(&mut self) -> bool {
		self.handlers.remove::<M>()
	}

	pub fn has_handler<M: 'static>(&self) -> bool {
		self.handlers.contains::<M>()
	}

	/// Tears the actor down once the current handler returns.
	pub fn die(&mut self) {
		self.stopping = true;
	}

	pub fn is_stopping(&self) -> bool {
		self.stopping
	}

	/// Sends `message` back to the sender. `false` if there is none or it is gone.
	pub fn reply<M: Send + 'static>(&self, message: M) -> bool {
		self.sender.is_some_and(|sender| sender.send_on_behalf(self.me, message))
	}

	/// Runtime this actor belongs to, unless it has been dropped.
	pub fn runtime(&self) -> Option<Handle> {
		self.me.mailbox().runtime().map(Handle::from_shared)
	}

	/// Spawns a sibling actor on the pool of this actor's runtime.
	pub fn spawn<B: Actor>(&self, actor: B) -> Option<ActorRef> {
		self.spawn_with(SpawnMode::Shared, actor)
	}

	pub fn spawn_with<B: Actor>(&self, mode: SpawnMode, actor: B) -> Option<ActorRef> {
		Some(self.runtime()?.spawn_with(mode, actor))
	}
}
