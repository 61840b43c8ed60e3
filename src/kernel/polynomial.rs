//! Polynomial Kernel Implementation
//!
//! The polynomial kernel is defined as:
//! K(x, y) = (γ * <x, y> + r)^d
//!
//! Where:
//! - γ (gamma): scaling factor for the dot product
//! - r (coef0): independent term in the polynomial
//! - d (degree): degree of the polynomial

use crate::kernel::traits::Kernel;
use ndarray::ArrayView1;
use serde::{Deserialize, Serialize};

/// Polynomial kernel with configurable degree, gamma, and coefficient
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PolynomialKernel {
    /// Scaling factor for the dot product
    pub gamma: f64,
    /// Independent term in the polynomial
    pub coef0: f64,
    /// Degree of the polynomial, may be fractional
    pub degree: f64,
}

impl PolynomialKernel {
    /// Creates a new polynomial kernel with the specified parameters
    ///
    /// # Arguments
    /// * `degree` - Degree of the polynomial (must be > 0)
    /// * `gamma` - Scaling factor for the dot product (must be > 0)
    /// * `coef0` - Independent term in the polynomial
    ///
    /// # Examples
    /// ```
    /// use smosvm::kernel::PolynomialKernel;
    ///
    /// // Quadratic kernel: (x·y + 1)²
    /// let quad_kernel = PolynomialKernel::new(2.0, 1.0, 1.0);
    /// assert_eq!(quad_kernel.degree, 2.0);
    /// ```
    ///
    /// # Panics
    /// Panics if degree or gamma is not positive
    pub fn new(degree: f64, gamma: f64, coef0: f64) -> Self {
        assert!(degree > 0.0, "Polynomial degree must be positive");
        assert!(gamma > 0.0, "Gamma must be positive");

        Self {
            gamma,
            coef0,
            degree,
        }
    }

    /// Creates a quadratic kernel: (γ * <x,y> + 1)²
    pub fn quadratic(gamma: f64) -> Self {
        Self::new(2.0, gamma, 1.0)
    }

    /// Creates a cubic kernel: (γ * <x,y> + 1)³
    pub fn cubic(gamma: f64) -> Self {
        Self::new(3.0, gamma, 1.0)
    }
}

impl Kernel for PolynomialKernel {
    fn compute(&self, x: ArrayView1<'_, f64>, y: ArrayView1<'_, f64>) -> f64 {
        let base = self.gamma * x.dot(&y) + self.coef0;

        // Integral degrees keep negative bases well defined
        if self.degree.fract() == 0.0 && self.degree <= i32::MAX as f64 {
            base.powi(self.degree as i32)
        } else {
            base.powf(self.degree)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_polynomial_kernel_quadratic() {
        let kernel = PolynomialKernel::quadratic(1.0);
        let x = array![1.0, 2.0];
        let y = array![3.0, 4.0];

        // (1 * 11 + 1)^2 = 144
        assert_relative_eq!(kernel.compute(x.view(), y.view()), 144.0);
    }

    #[test]
    fn test_polynomial_kernel_negative_base() {
        let kernel = PolynomialKernel::new(3.0, 1.0, 0.0);
        let x = array![1.0];
        let y = array![-2.0];

        assert_relative_eq!(kernel.compute(x.view(), y.view()), -8.0);
    }

    #[test]
    fn test_polynomial_kernel_degree_one_is_affine() {
        let kernel = PolynomialKernel::new(1.0, 0.5, 2.0);
        let x = array![2.0, 2.0];
        let y = array![1.0, 3.0];

        assert_relative_eq!(kernel.compute(x.view(), y.view()), 0.5 * 8.0 + 2.0);
    }

    #[test]
    #[should_panic(expected = "Polynomial degree must be positive")]
    fn test_polynomial_kernel_invalid_degree() {
        PolynomialKernel::new(0.0, 1.0, 0.0);
    }
}
