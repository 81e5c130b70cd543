use super::cmaes;
use super::network::Network;
use super::od_matrix::OdMatrix;
use super::OdmeConfig;


// Seed volumes are scaled by this much when probing for the worst-case
// objective terms used as normalizers.
static PESSIMISTIC_MULTIPLIER: f64 = 5.;

/// Estimate the maximum network GEH by assigning every link and turn five
/// times its seed volume.
///
/// Mutates the network's assigned volumes; callers re-assign them before
/// reading (the objective function does so on every evaluation).
fn prep_max_net_geh(net: &mut Network) -> f64 {
    let seed_volumes: Vec<f64> = net.od_pairs.iter()
        .flat_map(|od| od.routes.iter().map(|rr| rr.seed_volume))
        .collect();
    let mut idx = 0;
    for od in &mut net.od_pairs {
        for route in &mut od.routes {
            route.assigned_volume = seed_volumes[idx] * PESSIMISTIC_MULTIPLIER;
            idx += 1;
        }
    }
    net.set_link_and_turn_volume_from_route();
    net.calc_network_geh();
    return net.total_geh;
}

/// Estimate the maximum sum of squared error between the seed and final OD.
fn prep_max_odsse(net: &Network, od_seed: &OdMatrix) -> f64 {
    let mut odsse = 0.;
    for od in &net.od_pairs {
        let seed_total = od_seed.volume.get(&(od.origin, od.destination))
            .copied().unwrap_or(0.);
        for route in &od.routes {
            let route_vol = seed_total * route.target_ratio * PESSIMISTIC_MULTIPLIER;
            odsse += (route_vol - route.seed_volume) * (route_vol - route.seed_volume);
        }
    }
    return odsse;
}

/// Estimate the maximum sum of squared route-ratio deviations, by assigning
/// nearly all of each OD pair's volume to the route with the smallest target
/// ratio and 0.01 to every other route.
fn prep_max_ratio_sse(net: &Network) -> f64 {
    let mut total_sum = 0.;

    for od in &net.od_pairs {
        let n_routes = od.routes.len();

        // route indices ordered by ascending target ratio
        let mut order: Vec<usize> = (0..n_routes).collect();
        order.sort_by(|aa, bb|
            od.routes[*aa].target_ratio.partial_cmp(&od.routes[*bb].target_ratio)
                .unwrap_or(std::cmp::Ordering::Equal));

        let mut sum_sq_diff = 0.;
        for (rank, route_idx) in order.iter().enumerate() {
            let est_ratio = if rank == 0 {
                1. - (n_routes as f64 - 1.) * 0.01
            } else {
                0.01
            };
            let est_rel_diff = est_ratio - (1. - est_ratio);
            let diff = est_rel_diff - od.routes[*route_idx].target_rel_diff;
            sum_sq_diff += diff * diff;
        }
        total_sum += sum_sq_diff;
    }

    return total_sum;
}

/// Estimate an OD matrix with CMA-ES so that link and turn volumes approach
/// their targets.
///
/// One decision variable is created per route; the modelled route volume is
/// `seed_total * target_ratio * x^2`, the squaring keeping volumes
/// non-negative without bound constraints. The objective mixes normalized
/// network GEH, deviation from the seed, and route-ratio deviation, with the
/// given weights. Normalizers come from a pessimistic worst-case evaluation
/// of each term and are forced to 1 when a degenerate network makes them
/// vanish.
///
/// The best iterate found is re-applied once at the end, leaving the route,
/// link, turn, and GEH state, and `od_estimated`, consistent with the
/// returned variables. No convergence check is made.
pub fn estimate_od(net: &mut Network,
                   od_seed: &OdMatrix,
                   od_estimated: &mut OdMatrix,
                   config: &dyn OdmeConfig) -> Vec<f64> {
    let weight_total_geh = config.get_weight_total_geh();
    let weight_odsse = config.get_weight_odsse();
    let weight_route_ratio = config.get_weight_route_ratio();

    // associate each route with an optimizer variable
    let mut p_counter = 0;
    for od in &mut net.od_pairs {
        for route in &mut od.routes {
            route.opt_var_index = Some(p_counter);
            p_counter += 1;
        }
    }

    net.init_seed_volumes(od_seed);

    let mut max_net_geh = prep_max_net_geh(net);
    if max_net_geh <= 0. {
        max_net_geh = 1.;
    }
    let mut max_odsse = prep_max_odsse(net, od_seed);
    if max_odsse <= 0. {
        max_odsse = 1.;
    }
    let mut max_ratio_sse = prep_max_ratio_sse(net);
    if max_ratio_sse <= 0. {
        max_ratio_sse = 1.;
    }

    log::debug!("cma-es odme: {} variables, normalizers geh {:.3} odsse {:.3} ratio {:.3}",
                p_counter, max_net_geh, max_odsse, max_ratio_sse);

    let mut objective_fn = |xx: &[f64]| -> f64 {
        let mut odsse = 0.;
        let mut ratio_sse = 0.;

        for od in &mut net.od_pairs {
            let seed_total = od_seed.volume.get(&(od.origin, od.destination))
                .copied().unwrap_or(0.);
            let mut est_total = 0.;
            for route in &mut od.routes {
                // multiplier is squared so the volume stays non-negative
                let var = route.opt_var_index.map(|ii| xx[ii]).unwrap_or(1.);
                let est_route_vol = seed_total * route.target_ratio * var * var;
                odsse += (est_route_vol - route.seed_volume)
                    * (est_route_vol - route.seed_volume);
                route.assigned_volume = est_route_vol;
                est_total += est_route_vol;
            }
            od.est_total_volume = est_total;
            od_estimated.volume.insert((od.origin, od.destination), est_total);

            for route in &mut od.routes {
                route.assigned_ratio = if est_total > 0. {
                    route.assigned_volume / est_total
                } else {
                    1.
                };
                let est_rel_diff = route.assigned_ratio - (1. - route.assigned_ratio);
                let ratio_diff = est_rel_diff - route.target_rel_diff;
                ratio_sse += ratio_diff * ratio_diff;
            }
        }

        net.set_link_and_turn_volume_from_route();
        net.calc_network_geh();

        weight_total_geh * (net.total_geh / max_net_geh)
            + weight_odsse * (odsse / max_odsse)
            + weight_route_ratio * (ratio_sse / max_ratio_sse)
    };

    let params = config.cmaes_params();
    let result = cmaes::minimize(&mut objective_fn, &vec![1.; p_counter], &params);

    // re-apply the best iterate so all derived state matches it
    objective_fn(&result.x_best);
    od_estimated.set_margin_sums();

    log::info!("cma-es odme done: objective {:.6} after {} evaluations",
               result.f_best, result.n_evals);

    return result.x_best;
}
