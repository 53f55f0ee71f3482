use crate::ThreadClass;

/// Error returned when a runtime cannot be started.
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
	/// The OS refused to create a runtime thread.
	#[error("failed to spawn {class} thread")]
	ThreadSpawn {
		class: ThreadClass,
		#[source]
		source: std::io::Error,
	},
}
