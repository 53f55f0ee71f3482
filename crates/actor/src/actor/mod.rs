//! Typed actors: state plus a table of per-message-type handlers.
//!
//! An [`Actor`] registers handlers from [`Actor::started`] through its
//! [`Context`]. Each handler receives the actor state, the context (sender,
//! self handle, handler table) and the message by value.

mod context;
mod dispatch;

pub use context::Context;
pub(crate) use dispatch::Behavior;

/// Actor state driven by the runtime.
///
/// The runtime never runs two handlers of one actor at the same time, so
/// handlers get `&mut self` without further locking.
pub trait Actor: Send + Sized + 'static {
	/// Runs on the spawning thread before the actor is reachable.
	///
	/// Register handlers here. A panic tears the actor down right away.
	fn started(&mut self, ctx: &mut Context<'_, Self>) {
		let _ = ctx;
	}

	/// Runs once during teardown, after pending messages were dropped.
	fn stopped(&mut self) {}
}
