use num_complex::Complex64;
use num_traits::Zero;
use std::ops::{Add, AddAssign, Neg, Sub};

/// Value type of a single-particle function. Covers the real and complex
/// scalars the symmetrization passes operate on; conjugation is the identity
/// on real values.
pub trait SpScalar:
    Copy
    + Zero
    + Add<Output = Self>
    + Sub<Output = Self>
    + Neg<Output = Self>
    + AddAssign
    + Send
    + Sync
    + 'static
{
    /// Complex conjugate.
    fn conj(self) -> Self;

    /// Multiply by a real factor.
    fn scale(self, factor: f64) -> Self;

    /// Absolute value.
    fn modulus(self) -> f64;
}

impl SpScalar for f64 {
    fn conj(self) -> Self {
        self
    }

    fn scale(self, factor: f64) -> Self {
        self * factor
    }

    fn modulus(self) -> f64 {
        self.abs()
    }
}

impl SpScalar for Complex64 {
    fn conj(self) -> Self {
        Complex64::conj(&self)
    }

    fn scale(self, factor: f64) -> Self {
        self * factor
    }

    fn modulus(self) -> f64 {
        self.norm()
    }
}
