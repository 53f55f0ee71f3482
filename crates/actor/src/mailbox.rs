//! Per-actor mailbox: queue, scheduling flags, reference count and teardown.
//!
//! Producers push onto a lock-free input stack. The single consumer owning
//! the mailbox (a pool worker, an exclusive worker or the binding thread)
//! swaps the whole input stack out whenever its local stack runs dry, which
//! restores arrival order per producer.
//!
//! `scheduled` doubles as the consumer claim: whoever set it owns dispatch
//! and teardown until it is cleared again.

use std::cell::RefCell;
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock, Weak};
use std::time::Duration;

use parking_lot::{Mutex, ReentrantMutex};

use crate::body::{Body, Flow};
use crate::event::Event;
use crate::handle::{ActorId, SpawnMode};
use crate::registry::ActorRecord;
use crate::runtime::Shared;
use crate::stack::InputStack;
use crate::{Envelope, current, panic_message};

/// Outcome of one consumer step.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Dispatch {
	/// One message was handed to the body.
	Handled,
	/// Nothing queued.
	Empty,
	/// The actor is being torn down; stop consuming.
	Closed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
	Alive,
	TearingDown,
	TornDown,
}

struct Lifecycle {
	phase: Phase,
	waiters: Vec<Arc<Event>>,
}

/// Consumer-side state. The body is checked out while a handler runs.
struct Core {
	local: Vec<Envelope>,
	body: Option<Box<dyn Body>>,
}

impl Core {
	fn select(&mut self, input: &InputStack<Envelope>) -> Option<Envelope> {
		if let Some(envelope) = self.local.pop() {
			return Some(envelope);
		}
		self.local = input.take_all();
		self.local.pop()
	}
}

pub(crate) struct Mailbox {
	id: ActorId,
	mode: SpawnMode,
	runtime: Weak<Shared>,
	slot: OnceLock<usize>,
	input: InputStack<Envelope>,
	queued: AtomicUsize,
	core: Mutex<Core>,
	refs: AtomicUsize,
	deleting: AtomicBool,
	scheduled: AtomicBool,
	lifecycle: ReentrantMutex<RefCell<Lifecycle>>,
	wake: Option<Event>,
}

impl Mailbox {
	/// Creates a mailbox holding one reference for the spawner.
	///
	/// Exclusive mailboxes start claimed by their dedicated worker.
	pub(crate) fn new(id: ActorId, mode: SpawnMode, runtime: Weak<Shared>) -> Self {
		let exclusive = mode == SpawnMode::Exclusive;
		Self {
			id,
			mode,
			runtime,
			slot: OnceLock::new(),
			input: InputStack::new(),
			queued: AtomicUsize::new(0),
			core: Mutex::new(Core {
				local: Vec::new(),
				body: None,
			}),
			refs: AtomicUsize::new(1),
			deleting: AtomicBool::new(false),
			scheduled: AtomicBool::new(exclusive),
			lifecycle: ReentrantMutex::new(RefCell::new(Lifecycle {
				phase: Phase::Alive,
				waiters: Vec::new(),
			})),
			wake: exclusive.then(Event::new),
		}
	}

	pub(crate) fn id(&self) -> ActorId {
		self.id
	}

	pub(crate) fn mode(&self) -> SpawnMode {
		self.mode
	}

	pub(crate) fn runtime(&self) -> Option<Arc<Shared>> {
		self.runtime.upgrade()
	}

	pub(crate) fn slot(&self) -> &OnceLock<usize> {
		&self.slot
	}

	pub(crate) fn install_body(&self, body: Box<dyn Body>) {
		self.core.lock().body = Some(body);
	}

	pub(crate) fn is_deleting(&self) -> bool {
		self.deleting.load(Ordering::SeqCst)
	}

	pub(crate) fn is_terminated(&self) -> bool {
		self.lifecycle.lock().borrow().phase == Phase::TornDown
	}

	pub(crate) fn pending(&self) -> usize {
		self.queued.load(Ordering::Acquire)
	}

	/// Racy hint that a consumer would find work.
	pub(crate) fn has_messages(&self) -> bool {
		self.queued.load(Ordering::SeqCst) > 0
	}

	pub(crate) fn record(&self) -> ActorRecord {
		ActorRecord {
			id: self.id,
			mode: self.mode,
			pending: self.pending(),
			scheduled: self.scheduled.load(Ordering::Acquire),
		}
	}

	pub(crate) fn acquire(&self) {
		let prev = self.refs.fetch_add(1, Ordering::Relaxed);
		assert!(prev > 0, "{} acquired after its last reference was released", self.id);
	}

	pub(crate) fn release(&self) {
		let prev = self.refs.fetch_sub(1, Ordering::AcqRel);
		assert!(prev > 0, "{} reference count underflow", self.id);
		if prev == 1 {
			self.deconstruct();
		}
	}

	/// Pushes one envelope. Lock-free, never blocks.
	pub(crate) fn enqueue(&self, envelope: Envelope) {
		self.queued.fetch_add(1, Ordering::SeqCst);
		self.input.push(envelope);
	}

	/// Consumer-only: next message in arrival order.
	#[cfg(test)]
	pub(crate) fn select_message(&self) -> Option<Envelope> {
		let envelope = self.core.lock().select(&self.input);
		if envelope.is_some() {
			self.queued.fetch_sub(1, Ordering::SeqCst);
		}
		envelope
	}

	/// Enqueues and schedules one envelope. Returns `false` if it was dropped.
	pub(crate) fn post(self: &Arc<Self>, envelope: Envelope) -> bool {
		self.enqueue(envelope);
		if self.is_deleting() {
			// Lost the race against teardown; make sure the envelope is purged.
			self.deconstruct();
			return false;
		}
		self.schedule();
		true
	}

	fn schedule(self: &Arc<Self>) {
		match self.mode {
			SpawnMode::Exclusive => {
				if let Some(wake) = &self.wake {
					wake.signal();
				}
			}
			SpawnMode::Bind => {}
			SpawnMode::Shared => {
				if self.scheduled.swap(true, Ordering::SeqCst) {
					return;
				}
				match self.runtime.upgrade() {
					Some(runtime) => runtime.make_ready(Arc::clone(self)),
					None => self.scheduled.store(false, Ordering::SeqCst),
				}
			}
		}
	}

	/// Claims the consumer role. Returns `false` if someone else holds it.
	pub(crate) fn claim(&self) -> bool {
		!self.scheduled.swap(true, Ordering::SeqCst)
	}

	/// Gives the consumer role up, finishing teardown if it was requested meanwhile.
	pub(crate) fn release_claim(&self) {
		self.scheduled.store(false, Ordering::SeqCst);
		if self.is_deleting() {
			self.deconstruct();
		}
	}

	/// Gives the consumer role up unless a racing send needs it.
	///
	/// Returns `false` if the claim was taken straight back because messages
	/// arrived after the queue was seen empty; the caller still owns it.
	pub(crate) fn unschedule(&self) -> bool {
		self.release_claim();
		if self.is_deleting() {
			return true;
		}
		!(self.has_messages() && self.claim())
	}

	/// Blocks an exclusive worker until the next send or teardown request.
	pub(crate) fn park_exclusive(&self) {
		if let Some(wake) = &self.wake {
			wake.wait();
		}
	}

	/// Consumer-only: dispatches at most one message.
	pub(crate) fn dispatch_one(&self) -> Dispatch {
		if self.is_deleting() {
			return Dispatch::Closed;
		}
		let (envelope, mut body) = {
			let mut core = self.core.lock();
			// No body yet: leave the queue alone for whoever installs one.
			let Some(body) = core.body.take() else {
				return Dispatch::Closed;
			};
			let Some(envelope) = core.select(&self.input) else {
				core.body = Some(body);
				return Dispatch::Empty;
			};
			self.queued.fetch_sub(1, Ordering::SeqCst);
			(envelope, body)
		};

		let scope = current::enter(envelope.target.clone());
		let message_type = envelope.type_name;
		let flow = match panic::catch_unwind(AssertUnwindSafe(|| body.dispatch(envelope))) {
			Ok(flow) => flow,
			Err(payload) => {
				tracing::warn!(actor = %self.id, message_type, panic = %panic_message(payload.as_ref()), "actor.handler.panic");
				Flow::Continue
			}
		};
		self.core.lock().body = Some(body);
		drop(scope);

		if flow == Flow::Stop {
			self.deconstruct();
		}
		Dispatch::Handled
	}

	/// Detaches every queued envelope. Drop the result outside any mailbox lock.
	fn purge(&self) -> Vec<Envelope> {
		let mut pending = {
			let mut core = self.core.lock();
			std::mem::take(&mut core.local)
		};
		pending.extend(self.input.take_all());
		if !pending.is_empty() {
			self.queued.fetch_sub(pending.len(), Ordering::SeqCst);
		}
		pending
	}

	/// Idempotent teardown request.
	///
	/// Marks the mailbox deleting. If a consumer holds it, that consumer
	/// finishes the job when it lets go; otherwise queued messages are
	/// dropped, the body is torn down, the actor leaves the live set and
	/// joiners are released.
	pub(crate) fn deconstruct(&self) {
		self.deleting.store(true, Ordering::SeqCst);
		if self.scheduled.load(Ordering::SeqCst) {
			if let Some(wake) = &self.wake {
				wake.signal();
			}
			return;
		}

		// Dropping envelopes may release this very mailbox again.
		drop(self.purge());

		let body = {
			let guard = self.lifecycle.lock();
			let mut lifecycle = guard.borrow_mut();
			if lifecycle.phase != Phase::Alive {
				return;
			}
			// A missing body is checked out by a dispatcher, which calls back in when done.
			let Some(body) = self.core.lock().body.take() else {
				return;
			};
			lifecycle.phase = Phase::TearingDown;
			body
		};

		let mut body = body;
		if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(|| body.teardown())) {
			tracing::warn!(actor = %self.id, panic = %panic_message(payload.as_ref()), "actor.teardown.panic");
		}
		drop(body);
		drop(self.purge());

		let waiters = {
			let guard = self.lifecycle.lock();
			let mut lifecycle = guard.borrow_mut();
			lifecycle.phase = Phase::TornDown;
			std::mem::take(&mut lifecycle.waiters)
		};
		if let (Some(&slot), Some(runtime)) = (self.slot.get(), self.runtime.upgrade()) {
			runtime.live.remove(slot, self);
		}
		tracing::debug!(actor = %self.id, mode = ?self.mode, joiners = waiters.len(), "actor.teardown");
		for waiter in waiters {
			waiter.signal();
		}
	}

	/// Blocks until teardown completed. Returns `false` on timeout.
	pub(crate) fn join(&self, timeout: Option<Duration>) -> bool {
		if current::is(self) {
			return true;
		}
		let event = {
			let guard = self.lifecycle.lock();
			let mut lifecycle = guard.borrow_mut();
			if lifecycle.phase == Phase::TornDown {
				return true;
			}
			let event = Arc::new(Event::new());
			lifecycle.waiters.push(Arc::clone(&event));
			event
		};
		let Some(timeout) = timeout else {
			event.wait();
			return true;
		};
		if event.wait_timeout(timeout) {
			return true;
		}
		let guard = self.lifecycle.lock();
		let mut lifecycle = guard.borrow_mut();
		lifecycle.waiters.retain(|waiter| !Arc::ptr_eq(waiter, &event));
		lifecycle.phase == Phase::TornDown
	}
}
