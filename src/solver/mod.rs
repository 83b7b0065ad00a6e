//! The threaded Monte Carlo integration core: parameters, the walker and
//! accumulator contracts, the per-thread task table, configuration snapshots
//! and the coordinating solver itself.

use thiserror::Error;

pub use self::config_dump::*;
pub use self::params::*;
pub use self::thread_task::*;
pub use self::threaded::*;
pub use self::traits::*;

/// On-disk configuration snapshots.
pub mod config_dump;
/// Monte Carlo integration parameters.
pub mod params;
/// Assignment of threads to walker and accumulator roles.
pub mod thread_task;
/// The coordinating solver.
pub mod threaded;
/// Walker and accumulator contracts.
pub mod traits;

/// Default generator handed to walkers.
pub type DefaultRng = rand_isaac::IsaacRng;

/// Errors raised by the solver and its snapshot archive.
#[derive(Debug, Error)]
pub enum SolverError {
    /// The thread configuration cannot drive the rendezvous.
    #[error(
        "both the number of walkers ({walkers}) and the number of accumulators \
         ({accumulators}) must be at least 1"
    )]
    InvalidThreadCounts {
        /// Configured walker count.
        walkers: usize,
        /// Configured accumulator count.
        accumulators: usize,
    },
    /// A snapshot file could not be opened, created or fully transferred.
    #[error("snapshot io failed: {0}")]
    Io(#[from] std::io::Error),
    /// A snapshot buffer could not be encoded or decoded.
    #[error("snapshot encoding failed: {0}")]
    Encoding(#[from] serde_cbor::Error),
}
