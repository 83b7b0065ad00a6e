#![deny(
    missing_docs,
    unreachable_pub,
    missing_debug_implementations,
    trivial_casts,
    trivial_numeric_casts,
    unsafe_code,
    unused_import_braces,
    unused_qualifications
)]

//! `cluster_qmc` is a library for threaded Monte Carlo integration of cluster
//! quantum impurity problems. It coordinates walker tasks (Markov-chain
//! sweeps) and accumulator tasks (estimator updates) over a shared rendezvous
//! queue, supports resuming a run from on-disk configuration snapshots, and
//! post-processes accumulated single-particle functions against cluster,
//! time-reversal, spin and Matsubara symmetries.

/// Column-major matrices and lightweight non-owning views.
pub mod linalg;
/// Work partitioning and the process-wide worker pool.
pub mod parallel;
/// The threaded Monte Carlo solver and its collaborator contracts.
pub mod solver;
/// Symmetrization of accumulated single-particle functions.
pub mod symmetrize;
