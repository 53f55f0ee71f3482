//! Type-keyed handler table and the [`Body`] adapter for typed actors.

use std::any::{Any, TypeId};
use std::panic::{self, AssertUnwindSafe};

use rustc_hash::FxHashMap;

use super::{Actor, Context};
use crate::body::{Body, Flow};
use crate::{ActorRef, Envelope, current, panic_message};

type HandlerFn<A> = Box<dyn FnMut(&mut A, &mut Context<'_, A>, Box<dyn Any + Send>) + Send>;

enum Slot<A: Actor> {
	Ready(HandlerFn<A>),
	/// Checked out by the running dispatch.
	Running,
}

pub(crate) struct Handlers<A: Actor> {
	map: FxHashMap<TypeId, Slot<A>>,
}

impl<A: Actor> Default for Handlers<A> {
	fn default() -> Self {
		Self { map: FxHashMap::default() }
	}
}

impl<A: Actor> Handlers<A> {
	pub(super) fn insert<M, F>(&mut self, mut handler: F)
	where
		M: Send + 'static,
		F: FnMut(&mut A, &mut Context<'_, A>, M) + Send + 'static,
	{
		let erased: HandlerFn<A> = Box::new(move |actor: &mut A, ctx: &mut Context<'_, A>, payload: Box<dyn Any + Send>| {
			if let Ok(message) = payload.downcast::<M>() {
				handler(actor, ctx, *message);
			}
		});
		self.map.insert(TypeId::of::<M>(), Slot::Ready(erased));
	}

	pub(super) fn remove<M: 'static>(&mut self) -> bool {
		self.map.remove(&TypeId::of::<M>()).is_some()
	}

	pub(super) fn contains<M: 'static>(&self) -> bool {
		self.map.contains_key(&TypeId::of::<M>())
	}

	fn checkout(&mut self, message: TypeId) -> Option<HandlerFn<A>> {
		let slot = self.map.get_mut(&message)?;
		match std::mem::replace(slot, Slot::Running) {
			Slot::Ready(handler) => Some(handler),
			Slot::Running => panic!("handler dispatched while already running"),
		}
	}

	/// Puts a handler back unless it was replaced or removed while running.
	fn restore(&mut self, message: TypeId, handler: HandlerFn<A>) {
		if let Some(slot) = self.map.get_mut(&message)
			&& matches!(slot, Slot::Running)
		{
			*slot = Slot::Ready(handler);
		}
	}
}

/// A typed actor and its handler table, erased into a [`Body`].
pub(crate) struct Behavior<A: Actor> {
	actor: A,
	handlers: Handlers<A>,
}

impl<A: Actor> Behavior<A> {
	/// Runs [`Actor::started`] on the calling thread.
	///
	/// Returns [`Flow::Stop`] if the hook asked to die or panicked.
	pub(crate) fn start(actor: A, me: &ActorRef) -> (Self, Flow) {
		let mut behavior = Self {
			actor,
			handlers: Handlers::default(),
		};
		let scope = current::enter(me.clone());
		let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
			let mut ctx = Context::new(me, None, &mut behavior.handlers);
			behavior.actor.started(&mut ctx);
			ctx.is_stopping()
		}));
		drop(scope);

		let flow = match outcome {
			Ok(false) => Flow::Continue,
			Ok(true) => Flow::Stop,
			Err(payload) => {
				tracing::warn!(actor = %me.id(), panic = %panic_message(payload.as_ref()), "actor.start.panic");
				Flow::Stop
			}
		};
		(behavior, flow)
	}
}

impl<A: Actor> Body for Behavior<A> {
	fn dispatch(&mut self, envelope: Envelope) -> Flow {
		let Envelope {
			type_id,
			type_name,
			sender,
			target,
			payload,
		} = envelope;
		let Some(mut handler) = self.handlers.checkout(type_id) else {
			tracing::trace!(actor = %target.id(), message_type = type_name, "actor.message.unhandled");
			return Flow::Continue;
		};

		let mut ctx = Context::new(&target, sender.as_ref(), &mut self.handlers);
		let actor = &mut self.actor;
		let outcome = panic::catch_unwind(AssertUnwindSafe(|| handler(actor, &mut ctx, payload)));
		let stopping = ctx.is_stopping();
		self.handlers.restore(type_id, handler);

		if let Err(payload) = outcome {
			// The mailbox logs it; the handler stays installed.
			panic::resume_unwind(payload);
		}
		if stopping { Flow::Stop } else { Flow::Continue }
	}

	fn teardown(&mut self) {
		self.actor.stopped();
	}
}
