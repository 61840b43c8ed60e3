//! Sequential Minimal Optimization solvers
//!
//! Two analytic solvers for the SVM dual problem over a precomputed Gram
//! matrix: [`SmoClassifier`] (Platt's SMO with the two-threshold
//! modification of Keerthi et al.) and [`SmoRegressor`] (Smola & Schölkopf's
//! regression SMO with the modification of Shevade et al.). Both plug into
//! the same outer loop, [`run_outer_loop`].

pub mod classification;
pub mod regression;
pub mod state;

pub use self::classification::*;
pub use self::regression::*;
pub use self::state::*;

use crate::core::{Result, SolverStats};
use log::{debug, log_enabled, Level};

/// One SMO variant as seen by the outer loop
pub trait SmoEngine {
    /// Number of training samples
    fn size(&self) -> usize;

    /// Optimality tolerance
    fn tol(&self) -> f64;

    /// Whether sample `i` is in the free (non-bound) category
    fn is_free(&self, i: usize) -> bool;

    fn thresholds(&self) -> &Thresholds;

    /// Check sample `i2` for a KKT violation and, if one is found, try a joint
    /// update with a partner. Returns whether the multipliers changed.
    fn examine(&mut self, i2: usize) -> Result<bool>;

    /// Jointly optimize the multipliers of `i1` and `i2`.
    /// Returns whether a strictly improving update was made.
    fn pair_update(&mut self, i1: usize, i2: usize) -> Result<bool>;

    /// Dual objective value (minimization form)
    fn objective(&self) -> f64;
}

/// Alternate full sweeps with sweeps over the free samples until a full
/// sweep makes no update.
pub fn run_outer_loop<E: SmoEngine + ?Sized>(engine: &mut E) -> Result<SolverStats> {
    let n = engine.size();
    let tol = engine.tol();

    let mut stats = SolverStats::default();
    let mut num_changed = 0;
    let mut examine_all = true;

    while num_changed > 0 || examine_all {
        stats.sweeps += 1;
        num_changed = 0;

        if examine_all {
            for i in 0..n {
                if engine.examine(i)? {
                    num_changed += 1;
                }
            }
            stats.updates += num_changed;
        } else {
            for i in 0..n {
                if !engine.is_free(i) {
                    continue;
                }
                if engine.examine(i)? {
                    num_changed += 1;
                    stats.updates += 1;
                }
                // optimality on the free set is attained
                if engine.thresholds().is_optimal(tol) {
                    num_changed = 0;
                    break;
                }
            }
        }

        if log_enabled!(Level::Debug) {
            debug!(
                "sweep {:4} ({}): {} updates, gap {:.4e}, objective {:.6e}",
                stats.sweeps,
                if examine_all { "all" } else { "free" },
                num_changed,
                engine.thresholds().gap(),
                engine.objective()
            );
        }

        if examine_all {
            examine_all = false;
        } else if num_changed == 0 {
            examine_all = true;
        }
    }

    stats.gap = engine.thresholds().gap();
    Ok(stats)
}
