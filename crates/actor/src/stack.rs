//! Multi-producer input stack for mailboxes.
//!
//! Producers only push; the single consumer only ever swaps the whole list
//! out. No node is popped individually from the shared head, so a recycled
//! node address can never be observed by a compare-exchange and ABA cannot
//! happen.

use std::marker::PhantomData;
use std::ptr;
use std::sync::atomic::{AtomicPtr, Ordering};

struct Node<T> {
	value: T,
	next: *mut Node<T>,
}

/// Lock-free LIFO with push-one and take-all operations.
pub(crate) struct InputStack<T> {
	head: AtomicPtr<Node<T>>,
	_owns: PhantomData<Box<Node<T>>>,
}

// SAFETY: nodes are owned by the stack until `take_all` hands them to exactly
// one caller; values only move between threads, so `T: Send` suffices.
unsafe impl<T: Send> Send for InputStack<T> {}
// SAFETY: shared access is limited to atomic operations on `head`.
unsafe impl<T: Send> Sync for InputStack<T> {}

impl<T> InputStack<T> {
	pub(crate) const fn new() -> Self {
		Self {
			head: AtomicPtr::new(ptr::null_mut()),
			_owns: PhantomData,
		}
	}

	/// Pushes one value. Never blocks.
	pub(crate) fn push(&self, value: T) {
		let node = Box::into_raw(Box::new(Node {
			value,
			next: ptr::null_mut(),
		}));
		let mut head = self.head.load(Ordering::Relaxed);
		loop {
			// SAFETY: `node` is not yet published, we still own it exclusively.
			unsafe { (*node).next = head };
			match self.head.compare_exchange_weak(head, node, Ordering::Release, Ordering::Relaxed) {
				Ok(_) => return,
				Err(current) => head = current,
			}
		}
	}

	/// Racy emptiness hint.
	#[cfg(test)]
	pub(crate) fn is_empty(&self) -> bool {
		self.head.load(Ordering::Acquire).is_null()
	}

	/// Detaches every pushed value, newest first.
	///
	/// Popping the returned vector from the back therefore yields values in
	/// push order.
	pub(crate) fn take_all(&self) -> Vec<T> {
		let mut cursor = self.head.swap(ptr::null_mut(), Ordering::Acquire);
		let mut out = Vec::new();
		while !cursor.is_null() {
			// SAFETY: the swap made this thread the sole owner of the detached list.
			let node = unsafe { Box::from_raw(cursor) };
			cursor = node.next;
			out.push(node.value);
		}
		out
	}
}

impl<T> Drop for InputStack<T> {
	fn drop(&mut self) {
		drop(self.take_all());
	}
}
