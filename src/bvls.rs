use nalgebra::{DMatrix, DVector};


#[derive(Copy, Clone, PartialEq, Debug)]
enum VarState {
    AtLower,
    AtUpper,
    Free,
}

/// Diagnostics from a bounded least-squares solve, handed back to callers
/// untouched.
#[derive(Debug, Clone)]
pub struct BvlsResult {
    /// Solution vector.
    pub x: DVector<f64>,
    /// Half the squared residual norm at the solution.
    pub cost: f64,
    /// Largest violation of the first-order optimality conditions.
    pub optimality: f64,
    /// Per-variable bound state: -1 at lower, 0 free, +1 at upper.
    pub active_mask: Vec<i8>,
    pub n_iters: usize,
    pub converged: bool,
}

/// Solve `min ||A x - b||` subject to `lower <= x <= upper` with an
/// active-set bounded-variable method (Stark-Parker BVLS).
///
/// Variables start on their lower bound (or at 0 when unbounded below). Each
/// outer iteration frees the bound variable whose gradient most favors
/// leaving its bound, then re-solves the unconstrained subproblem on the
/// free set, walking partial steps and re-binding variables that hit a bound
/// on the way. Terminates when the Kuhn-Tucker conditions hold to within
/// `tol`, or after an iteration cap.
///
/// The unconstrained subproblems are solved by SVD, robust to rank-deficient
/// free-column sets.
pub fn bvls(aa: &DMatrix<f64>, bb: &DVector<f64>,
            lower: &[f64], upper: &[f64], tol: f64) -> BvlsResult {
    let n_vars = aa.ncols();
    assert_eq!(lower.len(), n_vars);
    assert_eq!(upper.len(), n_vars);

    let mut xx = DVector::zeros(n_vars);
    let mut states = vec![VarState::AtLower; n_vars];
    for ii in 0..n_vars {
        if lower[ii].is_finite() {
            xx[ii] = lower[ii];
        } else if upper[ii].is_finite() && upper[ii] < 0. {
            xx[ii] = upper[ii];
            states[ii] = VarState::AtUpper;
        }
        // an unbounded-below variable rests at 0 but is still "at lower"
        // until it is freed
    }

    let max_iters = 10 * n_vars + 10;
    let mut n_iters = 0;
    let mut converged = false;

    while n_iters < max_iters {
        n_iters += 1;

        // gradient of the residual: ww = A^T (b - A x); a positive entry
        // means increasing that variable reduces the cost
        let ww = aa.transpose() * (bb - aa * &xx);

        // most favorable bound variable to release
        let mut best: Option<(usize, f64)> = None;
        for ii in 0..n_vars {
            let favor = match states[ii] {
                VarState::AtLower => ww[ii],
                VarState::AtUpper => -ww[ii],
                VarState::Free => continue,
            };
            if favor > tol {
                match best {
                    Some((_, best_favor)) if best_favor >= favor => {}
                    _ => best = Some((ii, favor)),
                }
            }
        }

        match best {
            Some((ii, _)) => states[ii] = VarState::Free,
            None => {
                converged = true;
                break;
            }
        }

        // re-solve on the free set, binding variables that block the step
        loop {
            let free_idx: Vec<usize> = (0..n_vars)
                .filter(|ii| states[*ii] == VarState::Free)
                .collect();
            if free_idx.is_empty() {
                break;
            }

            // right-hand side with the bound variables' contribution removed
            let mut x_bound = xx.clone();
            for ii in &free_idx {
                x_bound[*ii] = 0.;
            }
            let b_free = bb - aa * x_bound;
            let a_free = aa.select_columns(free_idx.iter());

            let zz = match solve_free_subproblem(&a_free, &b_free) {
                Some(zz) => zz,
                None => break,
            };

            // largest feasible fraction of the step from x_free towards zz
            let mut alpha = 1.;
            let mut blocking: Option<(usize, f64)> = None;
            for (pos, ii) in free_idx.iter().enumerate() {
                let step = zz[pos] - xx[*ii];
                let (bound, violated) = if zz[pos] < lower[*ii] {
                    (lower[*ii], true)
                } else if zz[pos] > upper[*ii] {
                    (upper[*ii], true)
                } else {
                    (0., false)
                };
                if violated && step != 0. {
                    let frac = (bound - xx[*ii]) / step;
                    if frac < alpha {
                        alpha = frac;
                        blocking = Some((*ii, bound));
                    }
                }
            }

            for (pos, ii) in free_idx.iter().enumerate() {
                xx[*ii] += alpha * (zz[pos] - xx[*ii]);
            }

            match blocking {
                Some((ii, bound)) => {
                    xx[ii] = bound;
                    states[ii] = if bound == upper[ii] && upper[ii].is_finite() {
                        VarState::AtUpper
                    } else {
                        VarState::AtLower
                    };
                }
                None => break,
            }
        }
    }

    // final diagnostics
    let residual = bb - aa * &xx;
    let cost = 0.5 * residual.norm_squared();
    let ww = aa.transpose() * residual;
    let mut optimality: f64 = 0.;
    let mut active_mask = vec![0i8; n_vars];
    for ii in 0..n_vars {
        let violation = match states[ii] {
            VarState::Free => ww[ii].abs(),
            VarState::AtLower => {
                active_mask[ii] = -1;
                ww[ii].max(0.)
            }
            VarState::AtUpper => {
                active_mask[ii] = 1;
                (-ww[ii]).max(0.)
            }
        };
        optimality = optimality.max(violation);
    }

    BvlsResult{x: xx, cost, optimality, active_mask, n_iters, converged}
}

/// SVD solve of the unconstrained subproblem, trying progressively looser
/// singular-value cutoffs before giving up.
fn solve_free_subproblem(aa: &DMatrix<f64>, bb: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = aa.clone().svd(true, true);
    for svd_tol in &[1e-12, 1e-10, 1e-8] {
        if let Ok(zz) = svd.solve(bb, *svd_tol) {
            if zz.iter().all(|vv| vv.is_finite()) {
                return Some(zz);
            }
        }
    }
    None
}
