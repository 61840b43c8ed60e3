//! SMO for binary soft-margin classification
//!
//! Platt's pairwise analytic update driven by the two-threshold optimality
//! check of Keerthi et al.: instead of a single bias estimate the solver
//! tracks `b_up` (smallest residual over the samples that may still move up)
//! and `b_low` (largest residual over those that may move down). The problem
//! is optimal once `b_up >= b_low - 2 * tol`.
//!
//! Residuals follow the convention `E_i = f(x_i) - y_i` where `f` is the
//! decision function without bias.

use crate::core::{ClassificationSolution, Result, SVMError, SmoConfig};
use crate::solver::{run_outer_loop, ErrorCache, SmoEngine, ThresholdScan, Thresholds};
use log::debug;
use ndarray::{Array1, ArrayView1, ArrayView2};

/// Relative change of `alpha2` below which a step counts as no progress
const MIN_STEP: f64 = 1e-12;
/// Tie tolerance between the endpoint objectives when `eta <= 0`
const ENDPOINT_TIE: f64 = 1e-12;
/// Multipliers within this fraction of `C` of a bound are snapped onto it
const BOUND_SNAP: f64 = 1e-8;

/// Active-set category of one training sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClassificationSet {
    /// `0 < alpha < C`
    Free,
    /// `y = +1`, `alpha = 0`
    PositiveLower,
    /// `y = -1`, `alpha = C`
    NegativeUpper,
    /// `y = +1`, `alpha = C`
    PositiveUpper,
    /// `y = -1`, `alpha = 0`
    NegativeLower,
}

impl ClassificationSet {
    pub fn of(alpha: f64, label: f64, c: f64) -> Self {
        if alpha > 0.0 && alpha < c {
            ClassificationSet::Free
        } else if label > 0.0 {
            if alpha <= 0.0 {
                ClassificationSet::PositiveLower
            } else {
                ClassificationSet::PositiveUpper
            }
        } else if alpha <= 0.0 {
            ClassificationSet::NegativeLower
        } else {
            ClassificationSet::NegativeUpper
        }
    }

    /// Samples whose residual can bound `b_up`
    pub fn in_up_set(self) -> bool {
        matches!(
            self,
            ClassificationSet::Free
                | ClassificationSet::PositiveLower
                | ClassificationSet::NegativeUpper
        )
    }

    /// Samples whose residual can bound `b_low`
    pub fn in_low_set(self) -> bool {
        matches!(
            self,
            ClassificationSet::Free
                | ClassificationSet::PositiveUpper
                | ClassificationSet::NegativeLower
        )
    }
}

/// Solver state for one classification problem.
///
/// Borrows the features, the `±1` labels and the precomputed Gram matrix;
/// owns the multipliers and all bookkeeping.
pub struct SmoClassifier<'a> {
    x: ArrayView2<'a, f64>,
    y: ArrayView1<'a, f64>,
    k: ArrayView2<'a, f64>,
    c: f64,
    tol: f64,
    alphas: Array1<f64>,
    errors: ErrorCache,
    sets: Vec<ClassificationSet>,
    thresholds: Thresholds,
    weights: Option<Array1<f64>>,
}

impl<'a> SmoClassifier<'a> {
    /// Set up the all-zero starting point.
    ///
    /// Labels must already be `±1` and both classes must be present.
    pub fn new(
        x: ArrayView2<'a, f64>,
        y: ArrayView1<'a, f64>,
        k: ArrayView2<'a, f64>,
        config: &SmoConfig,
    ) -> Result<Self> {
        config.validate()?;
        let n = y.len();
        if x.nrows() != n {
            return Err(SVMError::DimensionMismatch {
                expected: n,
                actual: x.nrows(),
            });
        }
        if k.dim() != (n, n) {
            return Err(SVMError::InvalidDataset(format!(
                "kernel matrix is {}x{}, expected {n}x{n}",
                k.nrows(),
                k.ncols()
            )));
        }
        if let Some(bad) = y.iter().find(|&&label| label != 1.0 && label != -1.0) {
            return Err(SVMError::InvalidLabel(format!(
                "solver labels must be +1 or -1, got {bad}"
            )));
        }

        let b_up_idx = y.iter().position(|&label| label > 0.0).ok_or_else(|| {
            SVMError::InvalidDataset("training set has no positive sample".to_string())
        })?;
        let b_low_idx = y.iter().position(|&label| label < 0.0).ok_or_else(|| {
            SVMError::InvalidDataset("training set has no negative sample".to_string())
        })?;

        let c = config.c;
        Ok(Self {
            x,
            y,
            k,
            c,
            tol: config.tol,
            alphas: Array1::zeros(n),
            errors: ErrorCache::from_values(y.iter().map(|&label| -label)),
            sets: y
                .iter()
                .map(|&label| ClassificationSet::of(0.0, label, c))
                .collect(),
            thresholds: Thresholds {
                b_up: -1.0,
                b_up_idx,
                b_low: 1.0,
                b_low_idx,
            },
            weights: config.linear_kernel.then(|| Array1::zeros(x.ncols())),
        })
    }

    pub fn alphas(&self) -> ArrayView1<'_, f64> {
        self.alphas.view()
    }

    pub fn weights(&self) -> Option<ArrayView1<'_, f64>> {
        self.weights.as_ref().map(|w| w.view())
    }

    pub fn category(&self, i: usize) -> ClassificationSet {
        self.sets[i]
    }

    pub fn error_cache(&self) -> &ErrorCache {
        &self.errors
    }

    /// Bias estimate from the midpoint of the threshold pair
    pub fn bias(&self) -> f64 {
        -(self.thresholds.b_low + self.thresholds.b_up) / 2.0
    }

    /// Run the outer loop to convergence and hand back the multipliers
    pub fn solve(mut self) -> Result<ClassificationSolution> {
        let stats = run_outer_loop(&mut self)?;
        let bias = self.bias();
        debug!(
            "classification SMO finished: {} sweeps, {} updates, gap {:.3e}, bias {:.6}",
            stats.sweeps, stats.updates, stats.gap, bias
        );

        Ok(ClassificationSolution {
            alphas: self.alphas,
            bias,
            weights: self.weights,
            stats,
        })
    }

    /// `sum_j alpha_j y_j K[i, j] - y_i`, computed from scratch
    fn fresh_error(&self, i: usize) -> f64 {
        let row = self.k.row(i);
        let output: f64 = self
            .alphas
            .iter()
            .zip(self.y.iter())
            .zip(row.iter())
            .filter(|((&alpha, _), _)| alpha != 0.0)
            .map(|((&alpha, &label), &k)| alpha * label * k)
            .sum();
        output - self.y[i]
    }

    fn take_step(&mut self, i1: usize, i2: usize) -> Result<bool> {
        if i1 == i2 {
            return Ok(false);
        }

        let c = self.c;
        let (alpha1, alpha2) = (self.alphas[i1], self.alphas[i2]);
        let (y1, y2) = (self.y[i1], self.y[i2]);
        let e1 = self.errors.current(i1)?;
        let e2 = self.errors.current(i2)?;
        let s = y1 * y2;

        let (low, high) = if y1 != y2 {
            ((alpha2 - alpha1).max(0.0), (c + alpha2 - alpha1).min(c))
        } else {
            ((alpha2 + alpha1 - c).max(0.0), (alpha2 + alpha1).min(c))
        };
        if low >= high {
            return Ok(false);
        }

        let k11 = self.k[[i1, i1]];
        let k12 = self.k[[i1, i2]];
        let k22 = self.k[[i2, i2]];
        let eta = k11 + k22 - 2.0 * k12;

        let a2 = if eta > 0.0 {
            (alpha2 + y2 * (e1 - e2) / eta).clamp(low, high)
        } else {
            // Objective is linear along the constraint line: take the better end
            let slope = y2 * (e1 - e2);
            let (l_obj, h_obj) = (slope * low, slope * high);
            if l_obj > h_obj + ENDPOINT_TIE {
                low
            } else if l_obj < h_obj - ENDPOINT_TIE {
                high
            } else {
                alpha2
            }
        };

        if (a2 - alpha2).abs() < MIN_STEP * (a2 + alpha2 + MIN_STEP) {
            return Ok(false);
        }
        let a1 = alpha1 + s * (alpha2 - a2);

        let d1 = y1 * (a1 - alpha1);
        let d2 = y2 * (a2 - alpha2);

        if let Some(w) = self.weights.as_mut() {
            w.scaled_add(d1, &self.x.row(i1));
            w.scaled_add(d2, &self.x.row(i2));
        }

        for i in 0..self.sets.len() {
            if i == i1 || i == i2 {
                continue;
            }
            if self.sets[i] == ClassificationSet::Free {
                self.errors
                    .shift(i, d1 * self.k[[i1, i]] + d2 * self.k[[i2, i]]);
            } else {
                self.errors.invalidate(i);
            }
        }
        self.errors.store(i1, e1 + d1 * k11 + d2 * k12);
        self.errors.store(i2, e2 + d1 * k12 + d2 * k22);

        self.alphas[i1] = snap_to_bounds(a1, c);
        self.alphas[i2] = snap_to_bounds(a2, c);
        for i in [i1, i2] {
            self.sets[i] = ClassificationSet::of(self.alphas[i], self.y[i], c);
        }

        self.thresholds = self.rescan_thresholds(i1, i2)?;
        Ok(true)
    }

    /// Thresholds over the free samples plus the two just updated
    fn rescan_thresholds(&self, i1: usize, i2: usize) -> Result<Thresholds> {
        let mut scan = ThresholdScan::new();
        for (i, set) in self.sets.iter().enumerate() {
            if *set == ClassificationSet::Free {
                let e = self.errors.current(i)?;
                scan.offer_low(i, e);
                scan.offer_up(i, e);
            }
        }
        for i in [i1, i2] {
            let set = self.sets[i];
            if set == ClassificationSet::Free {
                continue;
            }
            let e = self.errors.current(i)?;
            if set.in_low_set() {
                scan.offer_low(i, e);
            } else {
                scan.offer_up(i, e);
            }
        }
        scan.finish()
    }

    fn examine_example(&mut self, i2: usize) -> Result<bool> {
        let set = self.sets[i2];
        let e2 = if set == ClassificationSet::Free {
            self.errors.current(i2)?
        } else {
            let e2 = self.fresh_error(i2);
            self.errors.store(i2, e2);
            if set.in_up_set() && e2 < self.thresholds.b_up {
                self.thresholds.tighten_up(i2, e2);
            } else if set.in_low_set() && e2 > self.thresholds.b_low {
                self.thresholds.tighten_low(i2, e2);
            }
            e2
        };

        let th = self.thresholds;
        let two_tol = 2.0 * self.tol;
        let mut partner = None;
        if set.in_up_set() && th.b_low - e2 > two_tol {
            partner = Some(th.b_low_idx);
        }
        if set.in_low_set() && e2 - th.b_up > two_tol {
            partner = Some(th.b_up_idx);
        }
        let Some(mut i1) = partner else {
            return Ok(false);
        };

        // A free sample may violate both ways: pair with the farther bound
        if set == ClassificationSet::Free {
            i1 = if th.b_low - e2 > e2 - th.b_up {
                th.b_low_idx
            } else {
                th.b_up_idx
            };
        }

        self.take_step(i1, i2)
    }
}

fn snap_to_bounds(alpha: f64, c: f64) -> f64 {
    if alpha > c - BOUND_SNAP * c {
        c
    } else if alpha < BOUND_SNAP * c {
        0.0
    } else {
        alpha
    }
}

impl SmoEngine for SmoClassifier<'_> {
    fn size(&self) -> usize {
        self.alphas.len()
    }

    fn tol(&self) -> f64 {
        self.tol
    }

    fn is_free(&self, i: usize) -> bool {
        self.sets[i] == ClassificationSet::Free
    }

    fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    fn examine(&mut self, i2: usize) -> Result<bool> {
        self.examine_example(i2)
    }

    fn pair_update(&mut self, i1: usize, i2: usize) -> Result<bool> {
        self.take_step(i1, i2)
    }

    fn objective(&self) -> f64 {
        let v = &self.alphas * &self.y;
        0.5 * v.dot(&self.k.dot(&v)) - self.alphas.sum()
    }
}

/// Train a binary soft-margin classifier.
///
/// `labels` must be `±1`; `kernel_matrix` is the full Gram matrix over the
/// rows of `features`. Set `config.linear_kernel` to also get the primal
/// weight vector.
pub fn train_classifier(
    features: ArrayView2<'_, f64>,
    labels: ArrayView1<'_, f64>,
    kernel_matrix: ArrayView2<'_, f64>,
    config: &SmoConfig,
) -> Result<ClassificationSolution> {
    SmoClassifier::new(features.view(), labels.view(), kernel_matrix.view(), config)?.solve()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kernel::{gram_matrix, LinearKernel, RBFKernel};
    use approx::assert_abs_diff_eq;
    use ndarray::{array, Array2};

    fn separable() -> (Array2<f64>, Array1<f64>) {
        let x = array![
            [2.0, 2.0],
            [3.0, 3.0],
            [2.0, 3.0],
            [3.0, 2.0],
            [-2.0, -2.0],
            [-3.0, -3.0],
            [-2.0, -3.0],
            [-3.0, -2.0]
        ];
        let y = array![1.0, 1.0, 1.0, 1.0, -1.0, -1.0, -1.0, -1.0];
        (x, y)
    }

    fn linear_config() -> SmoConfig {
        SmoConfig {
            c: 1.0,
            tol: 1e-3,
            linear_kernel: true,
            ..SmoConfig::default()
        }
    }

    /// Two interleaved rings, not linearly separable
    fn rings(n: usize) -> (Array2<f64>, Array1<f64>) {
        let mut x = Array2::zeros((n, 2));
        let mut y = Array1::zeros(n);
        for i in 0..n {
            let angle = i as f64 * 0.7;
            let radius = if i % 2 == 0 { 1.0 } else { 2.2 };
            x[[i, 0]] = radius * angle.cos();
            x[[i, 1]] = radius * angle.sin();
            y[i] = if i % 2 == 0 { 1.0 } else { -1.0 };
        }
        (x, y)
    }

    #[test]
    fn test_initial_state() {
        let (x, y) = separable();
        let k = gram_matrix(&LinearKernel::new(), x.view());
        let smo = SmoClassifier::new(x.view(), y.view(), k.view(), &linear_config()).unwrap();

        assert_eq!(smo.thresholds().b_up, -1.0);
        assert_eq!(smo.thresholds().b_up_idx, 0);
        assert_eq!(smo.thresholds().b_low, 1.0);
        assert_eq!(smo.thresholds().b_low_idx, 4);
        assert_eq!(smo.category(0), ClassificationSet::PositiveLower);
        assert_eq!(smo.category(4), ClassificationSet::NegativeLower);
        assert_eq!(smo.error_cache().get(0), Some(-1.0));
        assert_eq!(smo.error_cache().get(4), Some(1.0));
        assert_eq!(smo.weights().unwrap(), array![0.0, 0.0]);
    }

    #[test]
    fn test_single_class_rejected() {
        let x = array![[1.0], [2.0]];
        let y = array![1.0, 1.0];
        let k = gram_matrix(&LinearKernel::new(), x.view());
        let result = SmoClassifier::new(x.view(), y.view(), k.view(), &SmoConfig::default());
        assert!(matches!(result, Err(SVMError::InvalidDataset(_))));
    }

    #[test]
    fn test_separable_support_vectors() {
        let (x, y) = separable();
        let k = gram_matrix(&LinearKernel::new(), x.view());
        let solution = train_classifier(x.view(), y.view(), k.view(), &linear_config()).unwrap();

        for (i, &alpha) in solution.alphas.iter().enumerate() {
            if i == 0 || i == 4 {
                assert_abs_diff_eq!(alpha, 0.0625, epsilon = 1e-6);
            } else {
                assert_eq!(alpha, 0.0);
            }
        }

        let w = solution.weights.unwrap();
        assert_abs_diff_eq!(w[0], 0.25, epsilon = 1e-6);
        assert_abs_diff_eq!(w[1], 0.25, epsilon = 1e-6);
        assert_abs_diff_eq!(solution.bias, 0.0, epsilon = 1e-6);
        assert!(solution.stats.gap <= 2e-3);
    }

    #[test]
    fn test_same_label_pair_at_zero_is_rejected() {
        let (x, y) = separable();
        let k = gram_matrix(&LinearKernel::new(), x.view());
        let mut smo = SmoClassifier::new(x.view(), y.view(), k.view(), &linear_config()).unwrap();

        // Both alphas zero with equal labels leaves an empty segment
        assert!(!smo.pair_update(0, 1).unwrap());
        assert!(!smo.pair_update(2, 2).unwrap());
        assert_eq!(smo.alphas().sum(), 0.0);
    }

    #[test]
    fn test_degenerate_curvature_moves_to_better_end() {
        // Identical inputs give eta = 0
        let x = array![[1.0], [1.0]];
        let y = array![1.0, -1.0];
        let k = gram_matrix(&LinearKernel::new(), x.view());
        let config = SmoConfig {
            c: 2.0,
            ..SmoConfig::default()
        };
        let mut smo = SmoClassifier::new(x.view(), y.view(), k.view(), &config).unwrap();

        assert!(smo.pair_update(0, 1).unwrap());
        assert_eq!(smo.alphas(), array![2.0, 2.0]);
        assert_eq!(smo.category(0), ClassificationSet::PositiveUpper);
        assert_eq!(smo.category(1), ClassificationSet::NegativeUpper);
        assert_eq!(smo.thresholds().b_low, -1.0);
        assert_eq!(smo.thresholds().b_up, 1.0);
    }

    #[test]
    fn test_constraints_hold_after_every_update() {
        let (x, y) = rings(24);
        let kernel = RBFKernel::new(0.5);
        let k = gram_matrix(&kernel, x.view());
        let config = SmoConfig {
            c: 2.0,
            ..SmoConfig::default()
        };
        let mut smo = SmoClassifier::new(x.view(), y.view(), k.view(), &config).unwrap();

        let mut updates = 0;
        for _ in 0..200 {
            let mut changed = false;
            for i in 0..smo.size() {
                if smo.examine(i).unwrap() {
                    changed = true;
                    updates += 1;
                    let balance: f64 = smo.alphas().dot(&y);
                    // snapping onto a bound moves alpha by at most 1e-8 * C
                    assert_abs_diff_eq!(balance, 0.0, epsilon = 1e-6);
                    for &alpha in smo.alphas().iter() {
                        assert!((0.0..=2.0).contains(&alpha));
                    }
                }
            }
            if !changed {
                break;
            }
        }
        assert!(updates > 0);
    }

    #[test]
    fn test_rbf_converges_and_separates() {
        let (x, y) = rings(40);
        let k = gram_matrix(&RBFKernel::new(1.0), x.view());
        let config = SmoConfig {
            c: 10.0,
            ..SmoConfig::default()
        };
        let solution = train_classifier(x.view(), y.view(), k.view(), &config).unwrap();

        assert!(solution.weights.is_none());
        assert!(solution.stats.gap <= 2.0 * config.tol + 1e-12);

        let coef = &solution.alphas * &y;
        let decision = k.dot(&coef) + solution.bias;
        let correct = decision
            .iter()
            .zip(y.iter())
            .filter(|(&f, &label)| f * label > 0.0)
            .count();
        assert!(correct >= 38, "only {correct} of 40 on the right side");
    }

    #[test]
    fn test_incremental_weights_match_multipliers() {
        let (x, y) = rings(20);
        let k = gram_matrix(&LinearKernel::new(), x.view());
        let config = SmoConfig {
            c: 0.5,
            linear_kernel: true,
            ..SmoConfig::default()
        };
        let solution = train_classifier(x.view(), y.view(), k.view(), &config).unwrap();

        let expected = x.t().dot(&(&solution.alphas * &y));
        let w = solution.weights.unwrap();
        assert_abs_diff_eq!(w[0], expected[0], epsilon = 1e-6);
        assert_abs_diff_eq!(w[1], expected[1], epsilon = 1e-6);
    }

    #[test]
    fn test_reexamining_converged_free_sample_is_noop() {
        let (x, y) = separable();
        let k = gram_matrix(&LinearKernel::new(), x.view());
        let mut smo = SmoClassifier::new(x.view(), y.view(), k.view(), &linear_config()).unwrap();
        run_outer_loop(&mut smo).unwrap();

        assert!(smo.is_free(0));
        let alphas = smo.alphas().to_owned();
        let thresholds = *smo.thresholds();
        let errors = smo.error_cache().clone();

        assert!(!smo.examine(0).unwrap());
        assert_eq!(smo.alphas(), alphas);
        assert_eq!(*smo.thresholds(), thresholds);
        assert_eq!(*smo.error_cache(), errors);
    }
}
