//! Worker threads: the shared pool and dedicated exclusive workers.
//!
//! A pool worker moves through `idle -> assigned -> draining -> idle`, or
//! retires when the scheduler reaps it or the pool stops. Exclusive workers
//! never join the pool; they live and die with their actor.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::Instant;

use parking_lot::{Condvar, Mutex};

use crate::config::RuntimeConfig;
use crate::event::Event;
use crate::mailbox::{Dispatch, Mailbox};
use crate::runtime::Shared;
use crate::spawn::spawn_named_thread;
use crate::ThreadClass;

/// Point-in-time worker counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PoolStats {
	/// Pool workers alive, busy or idle.
	pub workers: usize,
	/// Pool workers waiting for an assignment.
	pub idle: usize,
	/// Dedicated workers of exclusive actors.
	pub exclusive: usize,
}

#[derive(Default)]
struct SlotState {
	assigned: Option<Arc<Mailbox>>,
	retire: bool,
}

/// Control block shared between the scheduler and one pool worker.
pub(crate) struct WorkerSlot {
	id: usize,
	wake: Event,
	state: Mutex<SlotState>,
}

impl WorkerSlot {
	fn new(id: usize) -> Self {
		Self {
			id,
			wake: Event::new(),
			state: Mutex::new(SlotState::default()),
		}
	}

	pub(crate) fn assign(&self, mailbox: Arc<Mailbox>) {
		self.state.lock().assigned = Some(mailbox);
		self.wake.signal();
	}

	fn retire(&self) {
		self.state.lock().retire = true;
		self.wake.signal();
	}
}

struct Idle {
	since: Instant,
	worker: Arc<WorkerSlot>,
}

#[derive(Default)]
struct PoolState {
	idle: VecDeque<Idle>,
	workers: usize,
	exclusive: usize,
	next_id: usize,
	stopping: bool,
}

#[derive(Default)]
pub(crate) struct Pool {
	state: Mutex<PoolState>,
	changed: Condvar,
}

impl Pool {
	pub(crate) fn stats(&self) -> PoolStats {
		let state = self.state.lock();
		PoolStats {
			workers: state.workers,
			idle: state.idle.len(),
			exclusive: state.exclusive,
		}
	}

	/// Hands one ready mailbox to a worker, blocking while the pool is saturated.
	pub(crate) fn admit(&self, shared: &Arc<Shared>, mailbox: Arc<Mailbox>) {
		match self.acquire(shared) {
			Some(worker) => worker.assign(mailbox),
			None => mailbox.release_claim(),
		}
	}

	/// Pops an idle worker, creating one within the soft and hard caps.
	///
	/// Returns `None` only once the pool is stopping.
	fn acquire(&self, shared: &Arc<Shared>) -> Option<Arc<WorkerSlot>> {
		let config = &shared.config;
		let mut wait = config.tick_min;
		let mut state = self.state.lock();
		loop {
			if state.stopping {
				return None;
			}
			if let Some(idle) = state.idle.pop_back() {
				return Some(idle.worker);
			}
			if state.workers < config.pool_size()
				&& let Some(worker) = self.spawn_worker(shared, &mut state)
			{
				return Some(worker);
			}

			let timed_out = self.changed.wait_for(&mut state, wait).timed_out();
			if !timed_out || !state.idle.is_empty() {
				continue;
			}
			if state.workers + state.exclusive < config.max_workers
				&& let Some(worker) = self.spawn_worker(shared, &mut state)
			{
				return Some(worker);
			}
			tracing::debug!(workers = state.workers, exclusive = state.exclusive, wait_ms = wait.as_millis() as u64, "scheduler.backpressure");
			wait = (wait * 2).min(config.tick_max);
		}
	}

	fn spawn_worker(&self, shared: &Arc<Shared>, state: &mut PoolState) -> Option<Arc<WorkerSlot>> {
		let id = state.next_id;
		state.next_id = state.next_id.wrapping_add(1);
		let slot = Arc::new(WorkerSlot::new(id));
		let name = format!("{}-worker-{id}", shared.config.thread_name);
		let thread_shared = Arc::clone(shared);
		let thread_slot = Arc::clone(&slot);
		match spawn_named_thread(ThreadClass::Pool, name, move || run_worker(&thread_shared, &thread_slot)) {
			Ok(_) => {
				state.workers += 1;
				tracing::debug!(worker = id, workers = state.workers, "scheduler.worker.spawn");
				Some(slot)
			}
			Err(err) => {
				tracing::error!(worker = id, error = %err, "scheduler.worker.spawn_failed");
				None
			}
		}
	}

	/// Returns a worker to the idle set. `false` tells it to exit instead.
	fn park(&self, worker: &Arc<WorkerSlot>) -> bool {
		let mut state = self.state.lock();
		if state.stopping {
			return false;
		}
		state.idle.push_back(Idle {
			since: Instant::now(),
			worker: Arc::clone(worker),
		});
		self.changed.notify_all();
		true
	}

	fn worker_exited(&self, id: usize) {
		let mut state = self.state.lock();
		state.workers -= 1;
		tracing::debug!(worker = id, workers = state.workers, "worker.retire");
		self.changed.notify_all();
	}

	/// Retires workers idle for longer than the idle timeout, oldest first.
	pub(crate) fn reap(&self, config: &RuntimeConfig) -> usize {
		let mut state = self.state.lock();
		let now = Instant::now();
		let mut retired = 0;
		while state.idle.len() > config.min_idle_workers {
			let Some(oldest) = state.idle.front() else {
				break;
			};
			if now.duration_since(oldest.since) < config.idle_timeout {
				break;
			}
			if let Some(idle) = state.idle.pop_front() {
				idle.worker.retire();
				retired += 1;
			}
		}
		retired
	}

	/// Stops the pool and waits for every worker, exclusive ones included, to exit.
	pub(crate) fn stop(&self) {
		let mut state = self.state.lock();
		state.stopping = true;
		for idle in state.idle.drain(..) {
			idle.worker.retire();
		}
		while state.workers > 0 || state.exclusive > 0 {
			self.changed.wait(&mut state);
		}
	}

	/// Starts the dedicated worker of an exclusive actor.
	///
	/// The mailbox arrives already claimed; if no thread can be created the
	/// actor is torn down instead.
	pub(crate) fn start_exclusive(&self, shared: &Arc<Shared>, mailbox: Arc<Mailbox>) {
		self.state.lock().exclusive += 1;
		let name = format!("{}-exclusive-{}", shared.config.thread_name, mailbox.id().get());
		let thread_shared = Arc::clone(shared);
		let thread_mailbox = Arc::clone(&mailbox);
		if let Err(err) = spawn_named_thread(ThreadClass::Exclusive, name, move || run_exclusive(&thread_shared, &thread_mailbox)) {
			tracing::error!(actor = %mailbox.id(), error = %err, "exclusive.spawn_failed");
			self.exclusive_exited();
			mailbox.release_claim();
			mailbox.deconstruct();
		}
	}

	fn exclusive_exited(&self) {
		let mut state = self.state.lock();
		state.exclusive -= 1;
		self.changed.notify_all();
	}
}

fn run_worker(shared: &Arc<Shared>, slot: &Arc<WorkerSlot>) {
	loop {
		slot.wake.wait();
		let assigned = {
			let mut state = slot.state.lock();
			if state.retire {
				break;
			}
			state.assigned.take()
		};
		let Some(mailbox) = assigned else {
			continue;
		};
		drain(shared, mailbox);
		if !shared.pool.park(slot) {
			break;
		}
	}
	shared.pool.worker_exited(slot.id);
}

/// Drains mailboxes until the queue runs dry or the time slice expires.
///
/// When a mailbox empties, the worker stays hot by pulling the next ready
/// mailbox straight from the queue instead of going back through the
/// scheduler.
fn drain(shared: &Shared, mut mailbox: Arc<Mailbox>) {
	let slice = shared.config.time_slice;
	let mut started = Instant::now();
	loop {
		let next = match mailbox.dispatch_one() {
			Dispatch::Handled => {
				if started.elapsed() < slice {
					continue;
				}
				if mailbox.has_messages() && !mailbox.is_deleting() {
					shared.make_ready(mailbox);
				} else if !mailbox.unschedule() {
					shared.make_ready(mailbox);
				}
				return;
			}
			Dispatch::Empty => {
				if !mailbox.unschedule() {
					continue;
				}
				shared.try_next_ready()
			}
			Dispatch::Closed => {
				mailbox.release_claim();
				shared.try_next_ready()
			}
		};
		match next {
			Some(next) => {
				mailbox = next;
				started = Instant::now();
			}
			None => return,
		}
	}
}

fn run_exclusive(shared: &Shared, mailbox: &Mailbox) {
	tracing::debug!(actor = %mailbox.id(), "exclusive.start");
	loop {
		match mailbox.dispatch_one() {
			Dispatch::Handled => {}
			Dispatch::Empty => mailbox.park_exclusive(),
			Dispatch::Closed => break,
		}
	}
	mailbox.release_claim();
	shared.pool.exclusive_exited();
	tracing::debug!(actor = %mailbox.id(), "exclusive.exit");
}
