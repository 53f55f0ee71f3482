use std::time::Duration;

/// Tuning for one runtime instance.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
	pub(crate) time_slice: Duration,
	pub(crate) idle_timeout: Duration,
	pub(crate) workers_per_core: usize,
	pub(crate) cores: usize,
	pub(crate) max_workers: usize,
	pub(crate) min_idle_workers: usize,
	pub(crate) tick_min: Duration,
	pub(crate) tick_max: Duration,
	pub(crate) thread_name: String,
}

impl Default for RuntimeConfig {
	fn default() -> Self {
		Self {
			time_slice: Duration::from_millis(10),
			idle_timeout: Duration::from_secs(2),
			workers_per_core: 2,
			cores: std::thread::available_parallelism().map_or(1, usize::from),
			max_workers: 512,
			min_idle_workers: 1,
			tick_min: Duration::from_millis(1),
			tick_max: Duration::from_millis(100),
			thread_name: "weft".to_string(),
		}
	}
}

impl RuntimeConfig {
	/// Maximum time a shared actor may occupy a worker before it is rescheduled.
	///
	/// # Panics
	///
	/// Panics if `slice` is zero.
	#[must_use]
	pub fn time_slice(mut self, slice: Duration) -> Self {
		assert!(!slice.is_zero(), "time slice must be > 0");
		self.time_slice = slice;
		self
	}

	/// How long a pool worker may sit idle before it is retired.
	#[must_use]
	pub fn idle_timeout(mut self, timeout: Duration) -> Self {
		self.idle_timeout = timeout;
		self
	}

	/// Pool workers created eagerly per core before admissions start waiting.
	///
	/// # Panics
	///
	/// Panics if `count` is zero.
	#[must_use]
	pub fn workers_per_core(mut self, count: usize) -> Self {
		assert!(count > 0, "workers per core must be > 0");
		self.workers_per_core = count;
		self
	}

	/// Overrides the detected core count.
	///
	/// # Panics
	///
	/// Panics if `cores` is zero.
	#[must_use]
	pub fn cores(mut self, cores: usize) -> Self {
		assert!(cores > 0, "core count must be > 0");
		self.cores = cores;
		self
	}

	/// Hard cap on worker threads, exclusive ones included.
	///
	/// # Panics
	///
	/// Panics if `max` is zero.
	#[must_use]
	pub fn max_workers(mut self, max: usize) -> Self {
		assert!(max > 0, "max workers must be > 0");
		self.max_workers = max;
		self
	}

	/// Idle pool workers kept alive regardless of the idle timeout.
	#[must_use]
	pub fn min_idle_workers(mut self, count: usize) -> Self {
		self.min_idle_workers = count;
		self
	}

	/// Bounds of the scheduler's adaptive housekeeping timeout.
	///
	/// # Panics
	///
	/// Panics if `min` is zero or greater than `max`.
	#[must_use]
	pub fn scheduler_tick(mut self, min: Duration, max: Duration) -> Self {
		assert!(!min.is_zero() && min <= max, "scheduler tick bounds must satisfy 0 < min <= max");
		self.tick_min = min;
		self.tick_max = max;
		self
	}

	/// Prefix for runtime thread names.
	#[must_use]
	pub fn thread_name(mut self, name: impl Into<String>) -> Self {
		self.thread_name = name.into();
		self
	}

	/// Pool workers admitted without waiting for one to free.
	pub(crate) fn pool_size(&self) -> usize {
		self.workers_per_core.saturating_mul(self.cores).min(self.max_workers)
	}
}
