//! Dense kernel matrices

use crate::kernel::Kernel;
use ndarray::{Array2, ArrayView2};

/// Full symmetric Gram matrix `K[i, j] = k(x_i, x_j)` over the rows of `x`
pub fn gram_matrix<K: Kernel + ?Sized>(kernel: &K, x: ArrayView2<'_, f64>) -> Array2<f64> {
    let n = x.nrows();
    let mut gram = Array2::zeros((n, n));
    for i in 0..n {
        for j in 0..=i {
            let value = kernel.compute(x.row(i), x.row(j));
            gram[[i, j]] = value;
            gram[[j, i]] = value;
        }
    }
    gram
}

/// Kernel values between every row of `a` (rows of the result) and every row of `b`
pub fn cross_kernel_matrix<K: Kernel + ?Sized>(
    kernel: &K,
    a: ArrayView2<'_, f64>,
    b: ArrayView2<'_, f64>,
) -> Array2<f64> {
    Array2::from_shape_fn((a.nrows(), b.nrows()), |(i, j)| {
        kernel.compute(a.row(i), b.row(j))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{LinearKernel, RBFKernel};
    use approx::assert_relative_eq;
    use ndarray::array;

    #[test]
    fn test_gram_matrix_linear() {
        let x = array![[1.0, 0.0], [0.0, 2.0], [1.0, 1.0]];
        let gram = gram_matrix(&LinearKernel::new(), x.view());

        assert_eq!(gram.dim(), (3, 3));
        assert_eq!(gram, x.dot(&x.t()));
    }

    #[test]
    fn test_gram_matrix_symmetric() {
        let x = array![[0.1, 0.2], [1.5, -0.3], [2.0, 2.0], [-1.0, 0.5]];
        let gram = gram_matrix(&RBFKernel::new(0.7), x.view());

        for i in 0..4 {
            assert_relative_eq!(gram[[i, i]], 1.0);
            for j in 0..4 {
                assert_eq!(gram[[i, j]], gram[[j, i]]);
            }
        }
    }

    #[test]
    fn test_cross_kernel_matrix_shape() {
        let a = array![[1.0, 0.0], [0.0, 1.0], [1.0, 1.0]];
        let b = array![[2.0, 3.0], [4.0, 5.0]];
        let cross = cross_kernel_matrix(&LinearKernel::new(), a.view(), b.view());

        assert_eq!(cross.dim(), (3, 2));
        assert_eq!(cross, a.dot(&b.t()));
    }
}
