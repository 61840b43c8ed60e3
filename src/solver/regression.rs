//! SMO for epsilon-insensitive support vector regression
//!
//! Every sample carries two multipliers, `alpha_plus` and `alpha_minus`, of
//! which at most one is non-zero. The pair update follows Smola & Schölkopf
//! (as refined by Flake & Lawrence): the four sign quadrants of the two
//! samples are visited in turn until none applies. Optimality uses the
//! two-threshold test of Shevade et al.
//!
//! Residuals follow the convention `E_i = y_i - f(x_i)` where `f` is the
//! regression function without bias.

use crate::core::{RegressionSolution, Result, SVMError, SmoConfig};
use crate::solver::{run_outer_loop, ErrorCache, SmoEngine, ThresholdScan, Thresholds};
use log::debug;
use ndarray::{Array1, ArrayView1, ArrayView2};

/// Smallest multiplier change that counts as progress
const MIN_CHANGE: f64 = 1e-12;
/// Multipliers within this fraction of `C` of a bound are snapped onto it
const BOUND_SNAP: f64 = 1e-10;

/// Active-set category of one training sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegressionSet {
    /// `0 < alpha_plus < C` or `0 < alpha_minus < C`
    Free,
    /// `alpha_plus = alpha_minus = 0`
    BothZero,
    /// `alpha_plus = 0`, `alpha_minus = C`
    MinusAtBound,
    /// `alpha_plus = C`, `alpha_minus = 0`
    PlusAtBound,
}

impl RegressionSet {
    pub fn of(alpha_plus: f64, alpha_minus: f64, c: f64) -> Result<Self> {
        let interior = |alpha: f64| alpha > 0.0 && alpha < c;
        if interior(alpha_plus) || interior(alpha_minus) {
            Ok(RegressionSet::Free)
        } else if alpha_plus == 0.0 && alpha_minus == 0.0 {
            Ok(RegressionSet::BothZero)
        } else if alpha_plus == 0.0 && alpha_minus == c {
            Ok(RegressionSet::MinusAtBound)
        } else if alpha_plus == c && alpha_minus == 0.0 {
            Ok(RegressionSet::PlusAtBound)
        } else {
            Err(SVMError::UnexpectedState(format!(
                "multiplier pair ({alpha_plus}, {alpha_minus}) fits no category for C = {c}"
            )))
        }
    }
}

/// Which pair of multipliers one branch of the pair update moves
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Quadrant {
    PlusPlus,
    PlusMinus,
    MinusPlus,
    MinusMinus,
}

impl Quadrant {
    const ALL: [Quadrant; 4] = [
        Quadrant::PlusPlus,
        Quadrant::PlusMinus,
        Quadrant::MinusPlus,
        Quadrant::MinusMinus,
    ];
}

/// Working copy of the four multipliers touched by one pair update
#[derive(Debug, Clone, Copy)]
struct PairAlphas {
    p1: f64,
    n1: f64,
    p2: f64,
    n2: f64,
}

impl PairAlphas {
    fn net1(&self) -> f64 {
        self.p1 - self.n1
    }

    fn net2(&self) -> f64 {
        self.p2 - self.n2
    }

    /// Whether the quadrant can still move given `delta_e = E1 - E2`
    fn admits(&self, quadrant: Quadrant, delta_e: f64, eps: f64) -> bool {
        let two_eps = 2.0 * eps;
        match quadrant {
            Quadrant::PlusPlus => {
                (self.p1 > 0.0 || (self.n1 == 0.0 && delta_e > 0.0))
                    && (self.p2 > 0.0 || (self.n2 == 0.0 && delta_e < 0.0))
            }
            Quadrant::PlusMinus => {
                (self.p1 > 0.0 || (self.n1 == 0.0 && delta_e > two_eps))
                    && (self.n2 > 0.0 || (self.p2 == 0.0 && delta_e > two_eps))
            }
            Quadrant::MinusPlus => {
                (self.n1 > 0.0 || (self.p1 == 0.0 && delta_e < -two_eps))
                    && (self.p2 > 0.0 || (self.n2 == 0.0 && delta_e < -two_eps))
            }
            Quadrant::MinusMinus => {
                (self.n1 > 0.0 || (self.p1 == 0.0 && delta_e < 0.0))
                    && (self.n2 > 0.0 || (self.p2 == 0.0 && delta_e > 0.0))
            }
        }
    }
}

/// Solver state for one regression problem
pub struct SmoRegressor<'a> {
    x: ArrayView2<'a, f64>,
    y: ArrayView1<'a, f64>,
    k: ArrayView2<'a, f64>,
    c: f64,
    tol: f64,
    epsilon: f64,
    alphas_plus: Array1<f64>,
    alphas_minus: Array1<f64>,
    errors: ErrorCache,
    sets: Vec<RegressionSet>,
    thresholds: Thresholds,
    weights: Option<Array1<f64>>,
}

impl<'a> SmoRegressor<'a> {
    /// Set up the all-zero starting point. The thresholds start out as the
    /// tube around the first target.
    pub fn new(
        x: ArrayView2<'a, f64>,
        y: ArrayView1<'a, f64>,
        k: ArrayView2<'a, f64>,
        config: &SmoConfig,
    ) -> Result<Self> {
        config.validate()?;
        let n = y.len();
        if n == 0 {
            return Err(SVMError::EmptyDataset);
        }
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

        let eps = config.epsilon;
        Ok(Self {
            x,
            y,
            k,
            c: config.c,
            tol: config.tol,
            epsilon: eps,
            alphas_plus: Array1::zeros(n),
            alphas_minus: Array1::zeros(n),
            errors: ErrorCache::from_values(y.iter().copied()),
            sets: vec![RegressionSet::BothZero; n],
            thresholds: Thresholds {
                b_up: y[0] + eps,
                b_up_idx: 0,
                b_low: y[0] - eps,
                b_low_idx: 0,
            },
            weights: config.linear_kernel.then(|| Array1::zeros(x.ncols())),
        })
    }

    pub fn alphas_plus(&self) -> ArrayView1<'_, f64> {
        self.alphas_plus.view()
    }

    pub fn alphas_minus(&self) -> ArrayView1<'_, f64> {
        self.alphas_minus.view()
    }

    pub fn weights(&self) -> Option<ArrayView1<'_, f64>> {
        self.weights.as_ref().map(|w| w.view())
    }

    pub fn category(&self, i: usize) -> RegressionSet {
        self.sets[i]
    }

    pub fn error_cache(&self) -> &ErrorCache {
        &self.errors
    }

    pub fn bias(&self) -> f64 {
        (self.thresholds.b_low + self.thresholds.b_up) / 2.0
    }

    pub fn solve(mut self) -> Result<RegressionSolution> {
        let stats = run_outer_loop(&mut self)?;
        let bias = self.bias();
        debug!(
            "regression SMO finished: {} sweeps, {} updates, gap {:.3e}, bias {:.6}",
            stats.sweeps, stats.updates, stats.gap, bias
        );

        Ok(RegressionSolution {
            alphas_plus: self.alphas_plus,
            alphas_minus: self.alphas_minus,
            bias,
            weights: self.weights,
            stats,
        })
    }

    fn is_interior(&self, alpha: f64) -> bool {
        alpha > 0.0 && alpha < self.c
    }

    /// `y_i - sum_j (alpha_plus_j - alpha_minus_j) K[i, j]`, from scratch
    fn fresh_error(&self, i: usize) -> f64 {
        let row = self.k.row(i);
        let output: f64 = self
            .alphas_plus
            .iter()
            .zip(self.alphas_minus.iter())
            .zip(row.iter())
            .map(|((&plus, &minus), &k)| (plus - minus) * k)
            .sum();
        self.y[i] - output
    }

    fn take_step(&mut self, i1: usize, i2: usize) -> Result<bool> {
        if i1 == i2 {
            return Ok(false);
        }

        let c = self.c;
        let eps = self.epsilon;
        let old = PairAlphas {
            p1: self.alphas_plus[i1],
            n1: self.alphas_minus[i1],
            p2: self.alphas_plus[i2],
            n2: self.alphas_minus[i2],
        };
        let e1 = self.errors.current(i1)?;
        let e2 = self.errors.current(i2)?;

        let k11 = self.k[[i1, i1]];
        let k12 = self.k[[i1, i2]];
        let k22 = self.k[[i2, i2]];
        let eta = (k11 + k22 - 2.0 * k12).max(0.0);
        // net1 + net2 stays fixed
        let gamma = old.net1() + old.net2();

        let mut cur = old;
        let mut delta_e = e1 - e2;
        let mut visited = [false; 4];
        let mut changed = false;

        loop {
            let Some(slot) = (0..Quadrant::ALL.len())
                .find(|&slot| !visited[slot] && cur.admits(Quadrant::ALL[slot], delta_e, eps))
            else {
                break;
            };
            visited[slot] = true;
            let quadrant = Quadrant::ALL[slot];

            let (low, high, alpha2, gradient) = match quadrant {
                Quadrant::PlusPlus => ((gamma - c).max(0.0), gamma.min(c), cur.p2, -delta_e),
                Quadrant::PlusMinus => (
                    (-gamma).max(0.0),
                    (c - gamma).min(c),
                    cur.n2,
                    delta_e - 2.0 * eps,
                ),
                Quadrant::MinusPlus => (
                    gamma.max(0.0),
                    (c + gamma).min(c),
                    cur.p2,
                    -(delta_e + 2.0 * eps),
                ),
                Quadrant::MinusMinus => ((-gamma - c).max(0.0), (-gamma).min(c), cur.n2, delta_e),
            };
            if low >= high {
                break;
            }

            // `gradient` is the descent direction of the objective in alpha2
            let a2 = if eta > 0.0 {
                (alpha2 + gradient / eta).clamp(low, high)
            } else if gradient * low > gradient * high {
                low
            } else {
                high
            };
            let step = a2 - alpha2;
            let net2_before = cur.net2();

            // negligible moves are dropped, not committed with a later case
            if step.abs() > MIN_CHANGE {
                changed = true;
                match quadrant {
                    Quadrant::PlusPlus => {
                        cur.p1 -= step;
                        cur.p2 = a2;
                    }
                    Quadrant::PlusMinus => {
                        cur.p1 += step;
                        cur.n2 = a2;
                    }
                    Quadrant::MinusPlus => {
                        cur.n1 += step;
                        cur.p2 = a2;
                    }
                    Quadrant::MinusMinus => {
                        cur.n1 -= step;
                        cur.n2 = a2;
                    }
                }
            }

            delta_e += eta * (cur.net2() - net2_before);
        }

        if !changed {
            return Ok(false);
        }

        let d1 = cur.net1() - old.net1();
        let d2 = cur.net2() - old.net2();

        if let Some(w) = self.weights.as_mut() {
            w.scaled_add(d1, &self.x.row(i1));
            w.scaled_add(d2, &self.x.row(i2));
        }

        for i in 0..self.sets.len() {
            if i == i1 || i == i2 {
                continue;
            }
            if self.sets[i] == RegressionSet::Free {
                self.errors
                    .shift(i, -(d1 * self.k[[i1, i]] + d2 * self.k[[i2, i]]));
            } else {
                self.errors.invalidate(i);
            }
        }
        self.errors.store(i1, e1 - (d1 * k11 + d2 * k12));
        self.errors.store(i2, e2 - (d1 * k12 + d2 * k22));

        self.alphas_plus[i1] = snap_to_bounds(cur.p1, c);
        self.alphas_minus[i1] = snap_to_bounds(cur.n1, c);
        self.alphas_plus[i2] = snap_to_bounds(cur.p2, c);
        self.alphas_minus[i2] = snap_to_bounds(cur.n2, c);
        for i in [i1, i2] {
            self.sets[i] = RegressionSet::of(self.alphas_plus[i], self.alphas_minus[i], c)?;
        }

        self.thresholds = self.rescan_thresholds(i1, i2)?;
        Ok(true)
    }

    fn rescan_thresholds(&self, i1: usize, i2: usize) -> Result<Thresholds> {
        let eps = self.epsilon;
        let mut scan = ThresholdScan::new();

        for (i, set) in self.sets.iter().enumerate() {
            if *set != RegressionSet::Free {
                continue;
            }
            let e = self.errors.current(i)?;
            let plus_free = self.is_interior(self.alphas_plus[i]);
            let minus_free = self.is_interior(self.alphas_minus[i]);

            if !(plus_free && scan.offer_low(i, e - eps)) && minus_free {
                scan.offer_low(i, e + eps);
            }
            if !(plus_free && scan.offer_up(i, e - eps)) && minus_free {
                scan.offer_up(i, e + eps);
            }
        }

        for i in [i1, i2] {
            let e = self.errors.current(i)?;
            match self.sets[i] {
                RegressionSet::Free => {}
                RegressionSet::BothZero => {
                    scan.offer_low(i, e - eps);
                    scan.offer_up(i, e + eps);
                }
                RegressionSet::MinusAtBound => {
                    scan.offer_low(i, e + eps);
                }
                RegressionSet::PlusAtBound => {
                    scan.offer_up(i, e - eps);
                }
            }
        }

        scan.finish()
    }

    /// Partner for a sample offering `up_value` as an upper bound on the
    /// bias and `low_value` as a lower bound.
    ///
    /// The `b_up` test is only reached when `up_value` does not violate
    /// `b_low`. With `switch`, the partner moves to the other threshold when
    /// the offered value lies farther from it.
    fn choose_partner(
        &self,
        up_value: Option<f64>,
        low_value: Option<f64>,
        switch: bool,
    ) -> Option<usize> {
        let th = self.thresholds;
        let two_tol = 2.0 * self.tol;

        if let Some(v) = up_value.filter(|&v| th.b_low - v > two_tol) {
            if switch && v - th.b_up > th.b_low - v {
                return Some(th.b_up_idx);
            }
            return Some(th.b_low_idx);
        }
        if let Some(v) = low_value.filter(|&v| v - th.b_up > two_tol) {
            if switch && th.b_low - v > v - th.b_up {
                return Some(th.b_low_idx);
            }
            return Some(th.b_up_idx);
        }
        None
    }

    fn examine_example(&mut self, i2: usize) -> Result<bool> {
        let eps = self.epsilon;
        let set = self.sets[i2];

        let e2 = if set == RegressionSet::Free {
            self.errors.current(i2)?
        } else {
            let e2 = self.fresh_error(i2);
            self.errors.store(i2, e2);
            let th = &mut self.thresholds;
            match set {
                RegressionSet::BothZero => {
                    if e2 + eps < th.b_up {
                        th.tighten_up(i2, e2 + eps);
                    } else if e2 - eps > th.b_low {
                        th.tighten_low(i2, e2 - eps);
                    }
                }
                RegressionSet::MinusAtBound => {
                    if e2 + eps > th.b_low {
                        th.tighten_low(i2, e2 + eps);
                    }
                }
                RegressionSet::PlusAtBound => {
                    if e2 - eps < th.b_up {
                        th.tighten_up(i2, e2 - eps);
                    }
                }
                RegressionSet::Free => {}
            }
            e2
        };

        let partner = match set {
            RegressionSet::Free => {
                let value = if self.is_interior(self.alphas_plus[i2]) {
                    e2 - eps
                } else {
                    e2 + eps
                };
                self.choose_partner(Some(value), Some(value), true)
            }
            RegressionSet::BothZero => self.choose_partner(Some(e2 + eps), Some(e2 - eps), true),
            RegressionSet::MinusAtBound => self.choose_partner(None, Some(e2 + eps), false),
            RegressionSet::PlusAtBound => self.choose_partner(Some(e2 - eps), None, false),
        };

        match partner {
            Some(i1) => self.take_step(i1, i2),
            None => Ok(false),
        }
    }
}

fn snap_to_bounds(alpha: f64, c: f64) -> f64 {
    if alpha > c - BOUND_SNAP * c {
        c
    } else if alpha <= BOUND_SNAP * c {
        0.0
    } else {
        alpha
    }
}

impl SmoEngine for SmoRegressor<'_> {
    fn size(&self) -> usize {
        self.sets.len()
    }

    fn tol(&self) -> f64 {
        self.tol
    }

    fn is_free(&self, i: usize) -> bool {
        self.sets[i] == RegressionSet::Free
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
        let net = &self.alphas_plus - &self.alphas_minus;
        0.5 * net.dot(&self.k.dot(&net)) - self.y.dot(&net)
            + self.epsilon * (self.alphas_plus.sum() + self.alphas_minus.sum())
    }
}

/// Train an epsilon-insensitive regressor over a precomputed Gram matrix
pub fn train_regressor(
    features: ArrayView2<'_, f64>,
    targets: ArrayView1<'_, f64>,
    kernel_matrix: ArrayView2<'_, f64>,
    config: &SmoConfig,
) -> Result<RegressionSolution> {
    SmoRegressor::new(features.view(), targets.view(), kernel_matrix.view(), config)?.solve()
}
