use crate::Envelope;

/// Continuation directive returned by one dispatch step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Flow {
	/// Keep processing messages.
	Continue,
	/// Tear this actor down once the current message is done.
	Stop,
}

/// Type-erased actor body the runtime dispatches into.
///
/// Typed actors get one through [`crate::Actor`]; proxies forwarding to
/// another transport implement it directly and inherit the same lifecycle
/// (serial dispatch, counted handles, teardown, join).
pub trait Body: Send + 'static {
	/// Handles one message. Never called concurrently for the same actor.
	fn dispatch(&mut self, envelope: Envelope) -> Flow;

	/// Runs once when the actor is torn down. Pending messages are already dropped.
	fn teardown(&mut self) {}
}

impl<F> Body for F
where
	F: FnMut(Envelope) -> Flow + Send + 'static,
{
	fn dispatch(&mut self, envelope: Envelope) -> Flow {
		self(envelope)
	}
}
