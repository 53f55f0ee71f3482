use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::thread::JoinHandle;

use crossbeam_channel::{Receiver, Sender};
use parking_lot::Mutex;

use crate::actor::{Actor, Behavior};
use crate::body::{Body, Flow};
use crate::config::RuntimeConfig;
use crate::handle::{ActorId, ActorRef, SpawnMode};
use crate::mailbox::Mailbox;
use crate::pool::{Pool, PoolStats};
use crate::registry::{ActorRecord, LiveSet};
use crate::spawn::spawn_named_thread;
use crate::{RuntimeError, ThreadClass, scheduler, this_thread};

/// State shared by the runtime, its threads and every mailbox.
pub(crate) struct Shared {
	pub(crate) config: RuntimeConfig,
	next_id: AtomicU64,
	terminating: AtomicBool,
	pub(crate) live: LiveSet,
	ready_tx: Sender<Arc<Mailbox>>,
	pub(crate) ready_rx: Receiver<Arc<Mailbox>>,
	pub(crate) pool: Pool,
}

impl Shared {
	/// Queues a claimed mailbox for the scheduler.
	pub(crate) fn make_ready(&self, mailbox: Arc<Mailbox>) {
		// Both channel ends live in `Shared`, so the send cannot fail.
		let _ = self.ready_tx.send(mailbox);
	}

	/// Takes the next ready mailbox without waiting for the scheduler.
	pub(crate) fn try_next_ready(&self) -> Option<Arc<Mailbox>> {
		self.ready_rx.try_recv().ok()
	}

	fn next_id(&self) -> ActorId {
		ActorId::new(self.next_id.fetch_add(1, Ordering::Relaxed).wrapping_add(1))
	}
}

/// Cloneable access to a runtime: spawning and introspection.
///
/// A handle does not keep the runtime running; shutdown is owned by
/// [`Runtime`].
#[derive(Clone)]
pub struct Handle {
	shared: Arc<Shared>,
}

impl Handle {
	pub(crate) fn from_shared(shared: Arc<Shared>) -> Self {
		Self { shared }
	}

	/// Spawns `actor` onto the shared worker pool.
	pub fn spawn<A: Actor>(&self, actor: A) -> ActorRef {
		self.spawn_with(SpawnMode::Shared, actor)
	}

	/// Spawns `actor` in the given mode.
	///
	/// [`Actor::started`] runs on the calling thread while the new mailbox is
	/// still held by the spawner. Messages sent meanwhile, including to itself,
	/// queue up and are dispatched once the hook returns.
	pub fn spawn_with<A: Actor>(&self, mode: SpawnMode, actor: A) -> ActorRef {
		let handle = self.allocate(mode);
		let (behavior, flow) = Behavior::start(actor, &handle);
		self.install(handle, Box::new(behavior), flow)
	}

	/// Spawns a raw body, e.g. a proxy forwarding to another transport.
	pub fn spawn_body(&self, mode: SpawnMode, body: Box<dyn Body>) -> ActorRef {
		let handle = self.allocate(mode);
		self.install(handle, body, Flow::Continue)
	}

	/// Creates a mailbox whose consumer claim belongs to the spawner until
	/// `install` hands it over.
	fn allocate(&self, mode: SpawnMode) -> ActorRef {
		let mailbox = Mailbox::new(self.shared.next_id(), mode, Arc::downgrade(&self.shared));
		let claimed = mode == SpawnMode::Exclusive || mailbox.claim();
		debug_assert!(claimed, "fresh mailbox already claimed");
		ActorRef::adopt(Arc::new(mailbox))
	}

	fn install(&self, handle: ActorRef, body: Box<dyn Body>, flow: Flow) -> ActorRef {
		let mailbox = handle.mailbox();
		mailbox.install_body(body);
		match mailbox.mode() {
			SpawnMode::Bind => this_thread::bind(&handle),
			SpawnMode::Shared | SpawnMode::Exclusive => self.shared.live.insert(mailbox),
		}
		tracing::debug!(actor = %mailbox.id(), mode = ?mailbox.mode(), "actor.spawn");

		// Still claimed, so this only marks it; whoever releases the claim tears down.
		let shutting_down = mailbox.mode() != SpawnMode::Bind && self.is_terminating();
		if flow == Flow::Stop || shutting_down {
			mailbox.deconstruct();
		}
		match mailbox.mode() {
			SpawnMode::Exclusive => self.shared.pool.start_exclusive(&self.shared, Arc::clone(mailbox)),
			SpawnMode::Shared => {
				if !mailbox.unschedule() {
					self.shared.make_ready(Arc::clone(mailbox));
				}
			}
			SpawnMode::Bind => mailbox.release_claim(),
		}
		handle
	}

	/// Returns `true` once shutdown has begun.
	pub fn is_terminating(&self) -> bool {
		self.shared.terminating.load(Ordering::SeqCst)
	}

	/// Number of pool-scheduled actors not yet torn down.
	pub fn live_count(&self) -> usize {
		self.shared.live.len()
	}

	/// Snapshots of every pool-scheduled actor not yet torn down, by id.
	pub fn actors(&self) -> Vec<ActorRecord> {
		self.shared.live.records()
	}

	/// Current worker thread counts of the pool.
	pub fn pool_stats(&self) -> PoolStats {
		self.shared.pool.stats()
	}
}

enum SchedulerState {
	Running { thread: JoinHandle<()>, stop: Sender<()> },
	Stopped,
}

/// Owning runtime instance. Dropping it shuts it down.
pub struct Runtime {
	handle: Handle,
	scheduler: Mutex<SchedulerState>,
}

impl Runtime {
	/// Starts a runtime: the scheduler thread starts now, workers on demand.
	pub fn new(config: RuntimeConfig) -> Result<Self, RuntimeError> {
		let (ready_tx, ready_rx) = crossbeam_channel::unbounded();
		let shared = Arc::new(Shared {
			config,
			next_id: AtomicU64::new(0),
			terminating: AtomicBool::new(false),
			live: LiveSet::default(),
			ready_tx,
			ready_rx,
			pool: Pool::default(),
		});

		let (stop, stop_rx) = crossbeam_channel::bounded::<()>(0);
		let name = format!("{}-scheduler", shared.config.thread_name);
		let thread_shared = Arc::clone(&shared);
		let thread = spawn_named_thread(ThreadClass::Scheduler, name, move || scheduler::run(&thread_shared, &stop_rx)).map_err(|source| {
			RuntimeError::ThreadSpawn {
				class: ThreadClass::Scheduler,
				source,
			}
		})?;

		tracing::debug!(pool_size = shared.config.pool_size(), max_workers = shared.config.max_workers, "runtime.start");
		Ok(Self {
			handle: Handle::from_shared(shared),
			scheduler: Mutex::new(SchedulerState::Running { thread, stop }),
		})
	}

	/// Starts a runtime with [`RuntimeConfig::default`].
	pub fn with_defaults() -> Result<Self, RuntimeError> {
		Self::new(RuntimeConfig::default())
	}

	/// Cloneable handle for spawning and introspection from other threads.
	pub fn handle(&self) -> &Handle {
		&self.handle
	}

	/// Tears every pool-scheduled actor down and stops all runtime threads.
	///
	/// Blocks until done. Concurrent and repeated calls return once the first
	/// one has finished. Bound actors belong to their threads and are not
	/// touched. Must not be called from inside a handler of this runtime.
	pub fn shutdown(&self) {
		let mut scheduler = self.scheduler.lock();
		let SchedulerState::Running { thread, stop } = std::mem::replace(&mut *scheduler, SchedulerState::Stopped) else {
			return;
		};

		let shared = &self.handle.shared;
		shared.terminating.store(true, Ordering::SeqCst);
		let live = shared.live.snapshot();
		tracing::info!(live = live.len(), "runtime.shutdown");
		for mailbox in &live {
			mailbox.deconstruct();
		}
		drop(live);
		shared.live.wait_drained();

		drop(stop);
		if thread.join().is_err() {
			tracing::error!("runtime.scheduler.panicked");
		}
		tracing::debug!("runtime.shutdown.complete");
	}
}

impl std::ops::Deref for Runtime {
	type Target = Handle;

	fn deref(&self) -> &Handle {
		&self.handle
	}
}

impl Drop for Runtime {
	fn drop(&mut self) {
		self.shutdown();
	}
}

#[cfg(test)]
mod tests;
