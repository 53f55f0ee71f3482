use std::sync::Arc;

use parking_lot::{Condvar, Mutex};
use slab::Slab;

use crate::handle::{ActorId, SpawnMode};
use crate::mailbox::Mailbox;

/// Snapshot of one live actor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorRecord {
	pub id: ActorId,
	pub mode: SpawnMode,
	pub pending: usize,
	pub scheduled: bool,
}

/// Set of pool-scheduled actors that have not finished teardown.
///
/// Bound actors never enter it; their binding thread owns them.
#[derive(Default)]
pub(crate) struct LiveSet {
	slots: Mutex<Slab<Arc<Mailbox>>>,
	drained: Condvar,
}

impl LiveSet {
	/// Inserts one mailbox and records its slot on it.
	pub(crate) fn insert(&self, mailbox: &Arc<Mailbox>) {
		let mut slots = self.slots.lock();
		let entry = slots.vacant_entry();
		let _ = mailbox.slot().set(entry.key());
		entry.insert(Arc::clone(mailbox));
	}

	/// Removes `mailbox` from `slot` if it still occupies it.
	pub(crate) fn remove(&self, slot: usize, mailbox: &Mailbox) {
		let removed = {
			let mut slots = self.slots.lock();
			let owned = slots.get(slot).is_some_and(|live| std::ptr::eq(Arc::as_ptr(live), mailbox));
			let removed = owned.then(|| slots.remove(slot));
			if slots.is_empty() {
				self.drained.notify_all();
			}
			removed
		};
		// Released outside the lock: the last drop may cascade into other teardowns.
		drop(removed);
	}

	pub(crate) fn len(&self) -> usize {
		self.slots.lock().len()
	}

	pub(crate) fn snapshot(&self) -> Vec<Arc<Mailbox>> {
		self.slots.lock().iter().map(|(_, mailbox)| Arc::clone(mailbox)).collect()
	}

	/// Blocks until every live actor has been torn down.
	pub(crate) fn wait_drained(&self) {
		let mut slots = self.slots.lock();
		while !slots.is_empty() {
			self.drained.wait(&mut slots);
		}
	}

	/// Returns snapshots sorted by actor id.
	pub(crate) fn records(&self) -> Vec<ActorRecord> {
		let mut records: Vec<_> = self.snapshot().iter().map(|mailbox| mailbox.record()).collect();
		records.sort_by_key(|record| record.id);
		records
	}
}
