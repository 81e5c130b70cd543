use nalgebra::{DMatrix, DVector, SymmetricEigen};
use rand::Rng;
use rand::SeedableRng;
use rand_distr::StandardNormal;
use rand_isaac::Isaac64Rng;


/// Tuning knobs for the CMA-ES minimizer.
pub struct CmaesParams {
    /// Initial sampling standard deviation.
    pub sigma0: f64,
    /// RNG seed; runs with the same seed are bit-identical.
    pub seed: u64,
    /// Function evaluation budget; 0 picks a budget from the dimension.
    pub max_evals: usize,
    /// Stop once the sampling distribution has collapsed below this width.
    pub tol_x: f64,
}

impl CmaesParams {
    pub fn new(sigma0: f64, seed: u64) -> CmaesParams {
        CmaesParams {
            sigma0,
            seed,
            max_evals: 0,
            tol_x: 1e-12,
        }
    }
}

pub struct CmaesResult {
    /// Best point found across all evaluations.
    pub x_best: Vec<f64>,
    pub f_best: f64,
    pub n_evals: usize,
    pub n_iters: usize,
}

/// Minimize a function with (mu/mu_w, lambda)-CMA-ES.
///
/// This is the standard evolution strategy with rank-one and rank-mu
/// covariance updates and cumulative step-size adaptation. The covariance
/// eigendecomposition is refreshed every generation; problem dimensions here
/// (one variable per route) are small enough that this costs nothing.
///
/// There is no convergence test beyond the evaluation budget and the
/// distribution-width floor; the best iterate seen is returned
/// unconditionally.
pub fn minimize<F>(mut objective: F, x0: &[f64], params: &CmaesParams) -> CmaesResult
    where F: FnMut(&[f64]) -> f64,
{
    let nn = x0.len();
    if nn == 0 {
        let f_best = objective(&[]);
        return CmaesResult{x_best: vec![], f_best, n_evals: 1, n_iters: 0};
    }
    let n_f = nn as f64;

    // population and recombination parameters
    let lambda = 4 + (3. * n_f.ln()).floor() as usize;
    let mu = lambda / 2;
    let mut weights: Vec<f64> = (0..mu)
        .map(|ii| ((lambda as f64 + 1.) / 2.).ln() - ((ii + 1) as f64).ln())
        .collect();
    let weight_sum: f64 = weights.iter().sum();
    for ww in weights.iter_mut() {
        *ww /= weight_sum;
    }
    let mueff = 1. / weights.iter().map(|ww| ww * ww).sum::<f64>();

    // adaptation constants
    let cc = (4. + mueff / n_f) / (n_f + 4. + 2. * mueff / n_f);
    let cs = (mueff + 2.) / (n_f + mueff + 5.);
    let c1 = 2. / ((n_f + 1.3).powi(2) + mueff);
    let cmu = (1. - c1).min(2. * (mueff - 2. + 1. / mueff) / ((n_f + 2.).powi(2) + mueff));
    let damps = 1. + 2. * (((mueff - 1.) / (n_f + 1.)).sqrt() - 1.).max(0.) + cs;
    let chi_n = n_f.sqrt() * (1. - 1. / (4. * n_f) + 1. / (21. * n_f * n_f));

    let max_evals = if params.max_evals > 0 {
        params.max_evals
    } else {
        250 * (nn + 2) * (nn + 2)
    };

    let mut rng = Isaac64Rng::seed_from_u64(params.seed);
    let mut mean = DVector::from_column_slice(x0);
    let mut sigma = params.sigma0;
    let mut cov: DMatrix<f64> = DMatrix::identity(nn, nn);
    let mut ps: DVector<f64> = DVector::zeros(nn);
    let mut pc: DVector<f64> = DVector::zeros(nn);
    let mut b_mat: DMatrix<f64> = DMatrix::identity(nn, nn);
    let mut d_vec: DVector<f64> = DVector::from_element(nn, 1.);

    // evaluate the starting point so the result can never be worse than it
    let mut x_best = x0.to_vec();
    let mut f_best = objective(x0);
    let mut n_evals = 1;
    let mut n_iters = 0;

    while n_evals < max_evals {
        n_iters += 1;

        // sample and evaluate one generation
        let mut samples = Vec::with_capacity(lambda);
        for _ in 0..lambda {
            let zz = DVector::from_fn(nn, |_, _| rng.sample::<f64, _>(StandardNormal));
            let yy = &b_mat * zz.component_mul(&d_vec);
            let xx = &mean + sigma * &yy;
            let ff = objective(xx.as_slice());
            n_evals += 1;
            if ff < f_best {
                f_best = ff;
                x_best = xx.as_slice().to_vec();
            }
            samples.push((ff, yy, zz));
        }
        samples.sort_by(|aa, bb|
            aa.0.partial_cmp(&bb.0).unwrap_or(std::cmp::Ordering::Equal));

        // weighted recombination of the mu best
        let mut y_w: DVector<f64> = DVector::zeros(nn);
        let mut z_w: DVector<f64> = DVector::zeros(nn);
        for (ii, ww) in weights.iter().enumerate() {
            y_w += *ww * &samples[ii].1;
            z_w += *ww * &samples[ii].2;
        }
        mean += sigma * &y_w;

        // cumulative step-size adaptation; B z_w = C^(-1/2) y_w
        ps = (1. - cs) * &ps + (cs * (2. - cs) * mueff).sqrt() * (&b_mat * &z_w);
        let ps_norm = ps.norm();
        let hsig_denom = (1. - (1. - cs).powf(2. * n_evals as f64 / lambda as f64)).sqrt();
        let hsig = ps_norm / hsig_denom / chi_n < 1.4 + 2. / (n_f + 1.);

        pc = (1. - cc) * &pc;
        if hsig {
            pc += (cc * (2. - cc) * mueff).sqrt() * &y_w;
        }

        // rank-one and rank-mu covariance update
        let mut rank_mu: DMatrix<f64> = DMatrix::zeros(nn, nn);
        for (ii, ww) in weights.iter().enumerate() {
            let yy = &samples[ii].1;
            rank_mu += *ww * yy * yy.transpose();
        }
        let hsig_correction = if hsig { 0. } else { cc * (2. - cc) };
        cov = (1. - c1 - cmu) * &cov
            + c1 * (&pc * pc.transpose() + hsig_correction * &cov)
            + cmu * rank_mu;

        sigma *= ((cs / damps) * (ps_norm / chi_n - 1.)).exp();

        // refresh the sampling basis; symmetrize first against numeric drift
        cov = (&cov + cov.transpose()) * 0.5;
        let eigen = SymmetricEigen::new(cov.clone());
        b_mat = eigen.eigenvectors;
        d_vec = eigen.eigenvalues.map(|ev| ev.max(1e-30).sqrt());

        if sigma * d_vec.max() < params.tol_x {
            break;
        }
    }

    log::debug!("cma-es finished: f_best {:.6e} after {} evals / {} generations",
                f_best, n_evals, n_iters);

    CmaesResult{x_best, f_best, n_evals, n_iters}
}
