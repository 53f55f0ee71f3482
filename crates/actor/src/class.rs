/// Thread classes owned by the runtime, used for thread naming and observability.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ThreadClass {
	/// The single thread admitting ready mailboxes to pool workers.
	Scheduler,
	/// Shared pool worker draining whichever mailbox it is assigned.
	Pool,
	/// Worker permanently dedicated to one exclusive actor.
	Exclusive,
}

impl ThreadClass {
	pub(crate) const fn as_str(self) -> &'static str {
		match self {
			Self::Scheduler => "scheduler",
			Self::Pool => "pool",
			Self::Exclusive => "exclusive",
		}
	}
}

impl std::fmt::Display for ThreadClass {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.as_str())
	}
}
