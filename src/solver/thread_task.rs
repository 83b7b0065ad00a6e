use std::cmp::min;

/// Role assigned to one solver thread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ThreadTask {
    /// Sweep and hand samples to idle accumulators.
    Walker {
        /// Index into the per-walker RNG vector.
        rng_index: usize,
    },
    /// Wait for samples and measure them.
    Accumulator,
    /// Sweep and measure inline, skipping the rendezvous.
    WalkerAndAccumulator {
        /// Index into the per-walker RNG vector.
        rng_index: usize,
    },
}

/// Table assigning each thread id one of the roles. With `shared` set, the
/// first `min(walkers, accumulators)` threads do both roles and the table
/// shrinks accordingly.
#[derive(Debug, Clone)]
pub struct ThreadTaskHandler {
    tasks: Vec<ThreadTask>,
}

impl ThreadTaskHandler {
    /// Build the table for the given walker and accumulator counts.
    pub fn new(walkers: usize, accumulators: usize, shared: bool) -> Self {
        let combined = if shared { min(walkers, accumulators) } else { 0 };
        let mut tasks = Vec::with_capacity(walkers + accumulators - combined);
        for rng_index in 0..combined {
            tasks.push(ThreadTask::WalkerAndAccumulator { rng_index });
        }
        for rng_index in combined..walkers {
            tasks.push(ThreadTask::Walker { rng_index });
        }
        for _ in combined..accumulators {
            tasks.push(ThreadTask::Accumulator);
        }
        Self { tasks }
    }

    /// Number of threads to spawn.
    pub fn size(&self) -> usize {
        self.tasks.len()
    }

    /// The role of thread `id`.
    pub fn task(&self, id: usize) -> ThreadTask {
        self.tasks[id]
    }

    /// All roles in thread order.
    pub fn tasks(&self) -> &[ThreadTask] {
        &self.tasks
    }

    /// RNG index of the walker running on thread `id`. Panics for a pure
    /// accumulator thread.
    pub fn walker_id_to_rng_index(&self, id: usize) -> usize {
        match self.tasks[id] {
            ThreadTask::Walker { rng_index } | ThreadTask::WalkerAndAccumulator { rng_index } => {
                rng_index
            }
            ThreadTask::Accumulator => panic!("thread {} runs no walker", id),
        }
    }

    /// Index of thread `id` among the accumulator-capable threads, used to
    /// address per-accumulator bookkeeping.
    pub fn id_to_accum_index(&self, id: usize) -> usize {
        assert!(!matches!(self.tasks[id], ThreadTask::Walker { .. }));
        self.tasks[..id]
            .iter()
            .filter(|task| !matches!(task, ThreadTask::Walker { .. }))
            .count()
    }

    /// Log the thread-to-role assignment.
    pub fn print(&self) {
        for (id, task) in self.tasks.iter().enumerate() {
            let role = match task {
                ThreadTask::Walker { .. } => "walker",
                ThreadTask::Accumulator => "accumulator",
                ThreadTask::WalkerAndAccumulator { .. } => "walker and accumulator",
            };
            log::info!("thread {}: {}", id, role);
        }
    }
}
