use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::{Receiver, select};

use crate::runtime::Shared;

/// Housekeeping timeout that backs off while the runtime is quiet.
#[derive(Debug, Clone, Copy)]
pub(crate) struct AdaptiveTimeout {
	min: Duration,
	max: Duration,
	current: Duration,
}

impl AdaptiveTimeout {
	pub(crate) fn new(min: Duration, max: Duration) -> Self {
		Self { min, max, current: min }
	}

	pub(crate) fn current(&self) -> Duration {
		self.current
	}

	pub(crate) fn grow(&mut self) {
		self.current = (self.current * 2).min(self.max);
	}

	pub(crate) fn reset(&mut self) {
		self.current = self.min;
	}
}

/// Scheduler thread body: admits ready mailboxes to pool workers until `stop` disconnects.
pub(crate) fn run(shared: &Arc<Shared>, stop: &Receiver<()>) {
	let mut tick = AdaptiveTimeout::new(shared.config.tick_min, shared.config.tick_max);
	tracing::debug!("scheduler.start");
	loop {
		select! {
			recv(shared.ready_rx) -> mailbox => match mailbox {
				Ok(mailbox) => {
					tick.reset();
					shared.pool.admit(shared, mailbox);
				}
				Err(_) => break,
			},
			recv(stop) -> _ => break,
			default(tick.current()) => {
				let retired = shared.pool.reap(&shared.config);
				if retired > 0 {
					tracing::debug!(retired, "scheduler.reap");
				}
				tick.grow();
			}
		}
	}
	shared.pool.stop();
	tracing::debug!("scheduler.exit");
}
