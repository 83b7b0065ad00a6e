//! Dense column-major matrices and the non-owning views used on the sampling
//! hot path. Views never own or allocate; they borrow a window of an existing
//! matrix and resolve element `(i, j)` to `base[i + j * ld]`.

pub use self::matrix::*;
pub use self::matrix_view::*;

/// Owning column-major matrix storage.
pub mod matrix;
/// Read-only and read-write matrix windows.
pub mod matrix_view;
