//! In-process actor runtime.
//!
//! Actors own private state and a mailbox. Messages are any `Send + 'static`
//! value, dispatched by type to the handler the actor registered for it, one
//! at a time per actor and in send order per sender. Pool-scheduled actors
//! share an adaptive set of worker threads; exclusive actors own a thread;
//! bound actors run only when their thread calls
//! [`this_thread::process_messages`].
//!
//! ```no_run
//! use weft_actor::{Actor, Context, Runtime};
//!
//! struct Counter(u64);
//! struct Inc;
//!
//! impl Actor for Counter {
//! 	fn started(&mut self, ctx: &mut Context<'_, Self>) {
//! 		ctx.handler(|counter: &mut Counter, _ctx, _: Inc| counter.0 += 1);
//! 	}
//! }
//!
//! let runtime = Runtime::with_defaults()?;
//! let counter = runtime.spawn(Counter(0));
//! counter.send(Inc);
//! counter.destroy_and_wait();
//! # Ok::<(), weft_actor::RuntimeError>(())
//! ```

mod actor;
mod body;
mod class;
mod config;
mod current;
mod envelope;
mod error;
mod event;
mod handle;
mod mailbox;
mod pool;
mod registry;
mod runtime;
mod scheduler;
mod spawn;
mod stack;
pub mod this_thread;


pub use actor::{Actor, Context};
pub use body::{Body, Flow};
pub use class::ThreadClass;
pub use config::RuntimeConfig;
pub use envelope::Envelope;
pub use error::RuntimeError;
pub use handle::{ActorId, ActorRef, SpawnMode};
pub use pool::PoolStats;
pub use registry::ActorRecord;
pub use runtime::{Handle, Runtime};

/// Renders a caught panic payload for logging.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
	if let Some(message) = payload.downcast_ref::<&'static str>() {
		(*message).to_string()
	} else if let Some(message) = payload.downcast_ref::<String>() {
		message.clone()
	} else {
		"non-string panic payload".to_string()
	}
}
