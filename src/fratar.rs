use super::od_matrix::{OdMatrix, NO_ZONE_TARGET};


/// Fixed number of biproportional factoring iterations. Termination is
/// guaranteed by the bounded count plus the final averaging of the last row
/// and column passes, which damps any remaining oscillation; there is no
/// convergence test.
static MAX_ITERATIONS: usize = 10;

#[derive(Copy, Clone)]
enum OdAxis {
    Origin,
    Destination,
}

/// One row or column scaling pass. Cells of a zone whose target is the
/// `NO_ZONE_TARGET` sentinel are left alone; cells of a zone whose margin
/// sum is zero are zeroed.
fn fratar_pass(od: &mut OdMatrix, axis: OdAxis) {
    let (targets, margin_sums) = match axis {
        OdAxis::Origin => (&od.targets_o, &od.sums_o),
        OdAxis::Destination => (&od.targets_d, &od.sums_d),
    };

    for (kk, vv) in od.volume.iter_mut() {
        let zone = match axis {
            OdAxis::Origin => kk.0,
            OdAxis::Destination => kk.1,
        };
        let target = targets.get(&zone).copied().unwrap_or(NO_ZONE_TARGET);
        if target == NO_ZONE_TARGET {
            continue;
        }
        let margin = margin_sums.get(&zone).copied().unwrap_or(0.);
        if margin == 0. {
            *vv = 0.;
        } else {
            *vv = *vv * target / margin;
        }
    }

    od.set_margin_sums();
}

/// Biproportional (Fratar) scaling of a seed matrix towards its per-zone
/// origin and destination targets.
///
/// Runs 10 iterations, each a row pass followed by a column pass, alternating
/// two working matrices so the final result can average the last row-pass
/// output with the last column-pass output.
pub fn fratar(od_seed: &OdMatrix) -> OdMatrix {
    let mut od_1 = OdMatrix::from_source(od_seed, true, true);
    let mut od_2 = OdMatrix::from_source(od_seed, true, true);

    for _ in 0..MAX_ITERATIONS {
        // swap matrices so results of both the row and column passes survive
        std::mem::swap(&mut od_1, &mut od_2);

        fratar_pass(&mut od_1, OdAxis::Origin);
        fratar_pass(&mut od_2, OdAxis::Destination);
    }

    let mut od_3 = OdMatrix::from_source(od_seed, false, true);
    for (kk, vv) in od_3.volume.iter_mut() {
        *vv = (od_1.volume[kk] + od_2.volume[kk]) / 2.0;
    }
    od_3.set_margin_sums();

    return od_3;
}


#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use std::collections::BTreeMap;

    fn sample_od() -> OdMatrix {
        let volume: BTreeMap<(usize, usize), f64> = vec![
            ((0, 0), 5.), ((0, 1), 10.),
            ((1, 0), 3.), ((1, 1), 33.),
        ].into_iter().collect();

        OdMatrix::new(volume,
                      vec![0, 1],
                      vec![0, 1],
                      vec![String::from("0"), String::from("1")],
                      vec![String::from("0"), String::from("1")],
                      vec![(0, 20.), (1, 30.)].into_iter().collect(),
                      vec![(0, 17.), (1, 51.)].into_iter().collect())
    }

    #[test]
    fn test_margins_reach_targets() {
        let result = fratar(&sample_od());

        assert_abs_diff_eq!(result.sums_o[&0], 20., epsilon = 0.1);
        assert_abs_diff_eq!(result.sums_o[&1], 30., epsilon = 0.1);
        assert_abs_diff_eq!(result.sums_d[&0], 17., epsilon = 0.1);
        assert_abs_diff_eq!(result.sums_d[&1], 51., epsilon = 0.1);

        assert!(result.volume.values().all(|vv| *vv >= 0.));
    }

    #[test]
    fn test_seed_is_untouched() {
        let seed = sample_od();
        let _ = fratar(&seed);
        assert_abs_diff_eq!(seed.volume[&(0, 0)], 5.);
        assert_abs_diff_eq!(seed.sums_o[&0], 15.);
    }

    #[test]
    fn test_sentinel_zone_is_not_scaled() {
        let mut seed = sample_od();
        seed.targets_o.insert(0, NO_ZONE_TARGET);
        let result = fratar(&seed);

        // row 1 and both columns still scale, so only check that the
        // unscaled origin was never forced towards a target
        assert!(result.volume.values().all(|vv| vv.is_finite() && *vv >= 0.));
        assert_abs_diff_eq!(result.sums_o[&1], 30., epsilon = 0.5);
    }

    #[test]
    fn test_zero_margin_zone_stays_zero() {
        let volume: BTreeMap<(usize, usize), f64> = vec![
            ((0, 0), 0.), ((0, 1), 0.),
            ((1, 0), 4.), ((1, 1), 6.),
        ].into_iter().collect();
        let seed = OdMatrix::new(volume,
                                 vec![0, 1],
                                 vec![0, 1],
                                 vec![String::from("0"), String::from("1")],
                                 vec![String::from("0"), String::from("1")],
                                 vec![(0, 10.), (1, 10.)].into_iter().collect(),
                                 vec![(0, 4.), (1, 6.)].into_iter().collect());

        let result = fratar(&seed);
        assert_abs_diff_eq!(result.volume[&(0, 0)], 0.);
        assert_abs_diff_eq!(result.volume[&(0, 1)], 0.);
        assert!(result.volume.values().all(|vv| vv.is_finite()));
    }
}
