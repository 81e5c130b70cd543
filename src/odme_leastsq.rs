use std::collections::BTreeMap;

use nalgebra::{DMatrix, DVector};

use super::bvls::{bvls, BvlsResult};
use super::network::Network;
use super::od_matrix::OdMatrix;
use super::OdmeConfig;


/// Weight on an OD pair's seed-pinning equation.
///
/// Pairs referenced by observation rows are weighted in proportion to the
/// number of references; a pair known only from the seed keeps a unit weight
/// so the seed still pins it. A `seed_od_weight` of exactly 1 makes the
/// weight non-finite and the solve meaningless.
fn seed_row_weight(seed_od_weight: f64, n_refs: usize) -> f64 {
    if n_refs == 0 {
        return 1.;
    }
    seed_od_weight * n_refs as f64 / (1. - seed_od_weight)
}

/// Estimate an OD matrix as a bounded linear least-squares fit to the link
/// and turn counts.
///
/// One non-negative variable is created per OD pair that either crosses an
/// observed link or turn, or carries nonzero seed volume. The system has one
/// equation per link with a known count and per turn with a positive count,
/// with coefficients from the select-link and select-turn route-share maps,
/// plus one seed-pinning equation per variable pair present in the seed.
/// Row weights are applied by scaling the rows directly.
pub fn estimate_od(net: &Network,
                   od_seed: &OdMatrix,
                   config: &dyn OdmeConfig) -> (BvlsResult, OdMatrix) {
    let seed_od_weight = config.get_seed_od_weight();

    let select_link = net.select_link();
    let select_turn = net.select_turn();

    // observation rows exist only for links and turns with a known count
    let mut obs_rows: Vec<(&BTreeMap<(usize, usize), f64>, f64)> = vec![];
    for (key, coeffs) in &select_link {
        let target = net.link(key.0, key.1).target_volume;
        if target >= 0. {
            obs_rows.push((coeffs, target));
        }
    }
    for (key, coeffs) in &select_turn {
        if let Some(turn) = net.turn(*key) {
            if turn.target_volume > 0. {
                obs_rows.push((coeffs, turn.target_volume));
            }
        }
    }

    // the variable set: observed pairs first, then any remaining pair with
    // nonzero seed volume
    let mut var_indices: BTreeMap<(usize, usize), usize> = BTreeMap::new();
    for (coeffs, _) in &obs_rows {
        for pair in coeffs.keys() {
            let next = var_indices.len();
            var_indices.entry(*pair).or_insert(next);
        }
    }
    for (pair, seed_vol) in &od_seed.volume {
        if *seed_vol != 0. {
            let next = var_indices.len();
            var_indices.entry(*pair).or_insert(next);
        }
    }

    let mut var_counter: BTreeMap<(usize, usize), usize> = BTreeMap::new();
    for (coeffs, _) in &obs_rows {
        for pair in coeffs.keys() {
            *var_counter.entry(*pair).or_insert(0) += 1;
        }
    }

    let seed_rows: Vec<((usize, usize), f64)> = od_seed.volume.iter()
        .filter(|(pair, _)| var_indices.contains_key(pair))
        .map(|(pair, vol)| (*pair, *vol))
        .collect();

    let n_vars = var_indices.len();
    let n_rows = obs_rows.len() + seed_rows.len();
    log::debug!("least-squares odme: {} equations ({} observed), {} variables",
                n_rows, obs_rows.len(), n_vars);

    let mut aa = DMatrix::zeros(n_rows, n_vars);
    let mut bb = DVector::zeros(n_rows);
    for (row, (coeffs, target)) in obs_rows.iter().enumerate() {
        for (pair, ratio) in coeffs.iter() {
            aa[(row, var_indices[pair])] = *ratio;
        }
        bb[row] = *target;
    }
    for (ii, (pair, seed_vol)) in seed_rows.iter().enumerate() {
        let row = obs_rows.len() + ii;
        let n_refs = var_counter.get(pair).copied().unwrap_or(0);
        let weight = seed_row_weight(seed_od_weight, n_refs);
        aa[(row, var_indices[pair])] = weight;
        bb[row] = weight * seed_vol;
    }

    let lower = vec![0.; n_vars];
    let upper = vec![f64::INFINITY; n_vars];
    let result = bvls(&aa, &bb, &lower, &upper, config.get_leastsq_tolerance());

    let mut od_estimated = OdMatrix::from_source(od_seed, false, true);
    for (pair, col) in &var_indices {
        od_estimated.volume.insert(*pair, result.x[*col]);
    }
    od_estimated.set_margin_sums();

    log::info!("least-squares odme done: cost {:.4}, optimality {:.2e}, {} iterations",
               result.cost, result.optimality, result.n_iters);

    return (result, od_estimated);
}
