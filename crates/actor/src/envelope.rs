use std::any::{Any, TypeId};

use crate::ActorRef;

/// One message in flight.
///
/// The envelope holds a counted reference to its target, so an actor cannot
/// be reclaimed while messages addressed to it are still queued, and an
/// optional counted reference to the sender.
pub struct Envelope {
	pub(crate) type_id: TypeId,
	pub(crate) type_name: &'static str,
	pub(crate) sender: Option<ActorRef>,
	pub(crate) target: ActorRef,
	pub(crate) payload: Box<dyn Any + Send>,
}

impl Envelope {
	pub(crate) fn new<M>(sender: Option<ActorRef>, target: ActorRef, message: M) -> Self
	where
		M: Send + 'static,
	{
		Self {
			type_id: TypeId::of::<M>(),
			type_name: std::any::type_name::<M>(),
			sender,
			target,
			payload: Box::new(message),
		}
	}

	/// Dispatch key of the carried message.
	pub fn message_type(&self) -> TypeId {
		self.type_id
	}

	/// Rust type name of the carried message, for diagnostics.
	pub fn type_name(&self) -> &'static str {
		self.type_name
	}

	/// Returns `true` if the payload is an `M`.
	pub fn is<M: 'static>(&self) -> bool {
		self.type_id == TypeId::of::<M>()
	}

	pub fn sender(&self) -> Option<&ActorRef> {
		self.sender.as_ref()
	}

	pub fn target(&self) -> &ActorRef {
		&self.target
	}

	pub fn downcast_ref<M: 'static>(&self) -> Option<&M> {
		self.payload.downcast_ref::<M>()
	}

	/// Takes the payload out as an `M`, together with the sender.
	///
	/// Returns the envelope unchanged if the payload has another type.
	pub fn into_message<M: 'static>(self) -> Result<(Option<ActorRef>, M), Self> {
		if !self.is::<M>() {
			return Err(self);
		}
		let Self {
			type_id,
			type_name,
			sender,
			target,
			payload,
		} = self;
		match payload.downcast::<M>() {
			Ok(message) => Ok((sender, *message)),
			Err(payload) => Err(Self {
				type_id,
				type_name,
				sender,
				target,
				payload,
			}),
		}
	}
}

impl std::fmt::Debug for Envelope {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Envelope")
			.field("message", &self.type_name)
			.field("sender", &self.sender.as_ref().map(ActorRef::id))
			.field("target", &self.target.id())
			.finish()
	}
}
