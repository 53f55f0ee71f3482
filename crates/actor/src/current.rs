//! Tracks which actor, if any, the calling thread is dispatching for.

use std::cell::RefCell;
use std::sync::Arc;

use crate::ActorRef;
use crate::mailbox::Mailbox;

thread_local! {
	static CURRENT: RefCell<Option<ActorRef>> = const { RefCell::new(None) };
}

/// Restores the previously dispatching actor on drop.
pub(crate) struct DispatchScope {
	previous: Option<ActorRef>,
}

/// Marks `actor` as dispatching on this thread until the scope drops.
pub(crate) fn enter(actor: ActorRef) -> DispatchScope {
	let previous = CURRENT.try_with(|current| current.replace(Some(actor))).ok().flatten();
	DispatchScope { previous }
}

impl Drop for DispatchScope {
	fn drop(&mut self) {
		let previous = self.previous.take();
		// The replaced handle is released after the cell borrow has ended.
		let _replaced = CURRENT.try_with(|current| current.replace(previous));
	}
}

/// Handle of the actor dispatching on this thread.
pub(crate) fn actor() -> Option<ActorRef> {
	CURRENT.try_with(|current| current.borrow().clone()).ok().flatten()
}

/// Returns `true` if `mailbox` belongs to the actor dispatching on this thread.
pub(crate) fn is(mailbox: &Mailbox) -> bool {
	CURRENT
		.try_with(|current| current.borrow().as_ref().is_some_and(|actor| std::ptr::eq(Arc::as_ptr(actor.mailbox()), mailbox)))
		.unwrap_or(false)
}
