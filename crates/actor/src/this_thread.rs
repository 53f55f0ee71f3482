//! Actors bound to the calling OS thread.
//!
//! A bound actor never enters the worker pool. Its messages are handled only
//! when its thread calls [`process_messages`], which makes binding the way to
//! own thread-affine state such as a UI loop or a non-`Sync` handle.
//!
//! Each thread keeps one binding context. It appears on the first bound spawn
//! or [`enter`] and tears its actors down when the outermost [`BindingScope`]
//! ends or the thread exits.

use std::cell::RefCell;

use crate::ActorRef;
use crate::mailbox::{Dispatch, Mailbox};

#[derive(Default)]
struct Binding {
	depth: usize,
	actors: Vec<ActorRef>,
}

impl Drop for Binding {
	fn drop(&mut self) {
		teardown_all(std::mem::take(&mut self.actors));
	}
}

thread_local! {
	static BINDING: RefCell<Binding> = RefCell::new(Binding::default());
}

/// Nesting guard for the calling thread's binding context.
///
/// Dropping the outermost scope drains and destroys every actor bound to this
/// thread.
#[must_use = "bound actors are torn down when the scope drops"]
pub struct BindingScope {
	_not_send: std::marker::PhantomData<*const ()>,
}

/// Opens a binding scope on the calling thread.
pub fn enter() -> BindingScope {
	let _ = BINDING.try_with(|binding| binding.borrow_mut().depth += 1);
	BindingScope {
		_not_send: std::marker::PhantomData,
	}
}

impl Drop for BindingScope {
	fn drop(&mut self) {
		let released = BINDING
			.try_with(|binding| {
				let mut binding = binding.borrow_mut();
				binding.depth = binding.depth.saturating_sub(1);
				if binding.depth == 0 { std::mem::take(&mut binding.actors) } else { Vec::new() }
			})
			.unwrap_or_default();
		teardown_all(released);
	}
}

/// Handles every message queued for actors bound to this thread.
///
/// Messages sent while draining are handled in the same call. Returns the
/// number of messages handled. Re-entrant calls from a bound handler skip the
/// actor that is already dispatching.
pub fn process_messages() -> usize {
	let mut handled = 0;
	loop {
		let actors = bound();
		let round: usize = actors.iter().map(|actor| drain(actor.mailbox())).sum();
		drop(actors);
		handled += round;
		if round == 0 {
			break;
		}
	}
	prune();
	handled
}

/// Number of actors bound to this thread that are not torn down yet.
pub fn bound_count() -> usize {
	BINDING
		.try_with(|binding| binding.borrow().actors.iter().filter(|actor| !actor.is_terminated()).count())
		.unwrap_or(0)
}

/// Registers a freshly spawned bound actor with this thread.
pub(crate) fn bind(actor: &ActorRef) {
	let registered = BINDING.try_with(|binding| binding.borrow_mut().actors.push(actor.clone())).is_ok();
	if !registered {
		tracing::warn!(actor = %actor.id(), "actor.bind.thread_exiting");
		actor.destroy();
	}
}

fn bound() -> Vec<ActorRef> {
	BINDING.try_with(|binding| binding.borrow().actors.clone()).unwrap_or_default()
}

/// Forgets actors whose teardown has completed.
fn prune() {
	let finished = BINDING
		.try_with(|binding| {
			let mut binding = binding.borrow_mut();
			let (finished, alive): (Vec<_>, Vec<_>) = std::mem::take(&mut binding.actors).into_iter().partition(ActorRef::is_terminated);
			binding.actors = alive;
			finished
		})
		.unwrap_or_default();
	// Released outside the borrow: a final release may run teardown code that binds again.
	drop(finished);
}

fn drain(mailbox: &Mailbox) -> usize {
	if !mailbox.claim() {
		return 0;
	}
	let mut handled = 0;
	while mailbox.dispatch_one() == Dispatch::Handled {
		handled += 1;
	}
	mailbox.release_claim();
	handled
}

fn teardown_all(actors: Vec<ActorRef>) {
	for actor in &actors {
		drain(actor.mailbox());
		actor.destroy();
	}
}
