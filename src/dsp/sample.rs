//! Sample types accepted by the generic filtering blocks

use std::ops::{Add, Mul, Sub};

use num_complex::Complex32;

/// A value that can be pushed through a real-coefficient filter
pub trait Sample:
    Copy + Add<Output = Self> + Sub<Output = Self> + Mul<f32, Output = Self> + Send + 'static
{
    fn zero() -> Self;

    /// Squared magnitude
    fn energy(self) -> f32;
}

impl Sample for f32 {
    fn zero() -> Self {
        0.0
    }

    fn energy(self) -> f32 {
        self * self
    }
}

impl Sample for Complex32 {
    fn zero() -> Self {
        Complex32::new(0.0, 0.0)
    }

    fn energy(self) -> f32 {
        self.norm_sqr()
    }
}
