//! Symmetrization of accumulated single-particle functions: idempotent
//! projections onto the subspace respecting imaginary-time anti-periodicity,
//! Matsubara Hermiticity, spin symmetry and the cluster point group.

use thiserror::Error;

pub use self::domains::*;
pub use self::scalar::*;
pub use self::single_particle::*;

/// Domain descriptors, function storage and the cluster symmetry table.
pub mod domains;
/// Scalar abstraction over real and complex function values.
pub mod scalar;
/// The symmetrization passes and their dispatch.
pub mod single_particle;

/// Residuals above this value are reported when diagnostics are requested.
pub const SYMMETRY_TOLERANCE: f64 = 1e-6;

/// Errors raised while building or symmetrizing single-particle functions.
#[derive(Debug, Error)]
pub enum SymmetrizeError {
    /// The cluster point group must contain at least one element.
    #[error("the cluster symmetry group is empty")]
    EmptySymmetryGroup,
    /// The flattened data does not match the domain sizes.
    #[error("data of length {len} does not fill a domain product of volume {expected}")]
    ShapeMismatch {
        /// Number of values supplied.
        len: usize,
        /// Product of the domain sizes.
        expected: usize,
    },
    /// A symmetry table entry points outside the cluster or band range.
    #[error("symmetry table entry ({site}, {band}) is out of range")]
    InvalidTableEntry {
        /// Mapped site index.
        site: usize,
        /// Mapped band index.
        band: usize,
    },
    /// The function's domain product has no symmetrization rule.
    #[error("no symmetrization rule for the domain signature {0:?}")]
    UnsupportedSignature(Vec<SpDomain>),
    /// A cluster domain was found but no symmetry table was supplied.
    #[error("a cluster domain requires a symmetry table")]
    MissingSymmetryTable,
}
