//! Process- and thread-level parallelism support: the process collaborator
//! contract, the measurement partitioner, and the process-wide worker pool.

pub use self::thread_pool::*;
pub use self::workload::*;

/// The process-wide, grow-only worker pool.
pub mod thread_pool;
/// Deterministic splitting of a workload across workers.
pub mod workload;

/// Contract of the multi-process collaborator. The integration core is
/// per-process; it only ever asks which process it runs on and how many
/// processes exist.
pub trait Concurrency {
    /// The id of this process.
    fn id(&self) -> usize;

    /// The id of the first process.
    fn first(&self) -> usize {
        0
    }

    /// Total number of processes.
    fn number_of_processors(&self) -> usize;
}

/// Single-process stand-in used when no multi-process transport is wired in.
#[derive(Debug, Clone, Copy, Default)]
pub struct SerialConcurrency;

impl Concurrency for SerialConcurrency {
    fn id(&self) -> usize {
        0
    }

    fn number_of_processors(&self) -> usize {
        1
    }
}
