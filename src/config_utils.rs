use yaml_rust::Yaml;
use yaml_rust::YamlLoader;

use super::OdmeConfig;


/// Estimation settings with a usable default for every knob.
pub struct EstimationSettings {
    /// Weight of the normalized network GEH term in the CMA-ES objective.
    pub weight_total_geh: f64,
    /// Weight of the normalized seed-deviation term.
    pub weight_odsse: f64,
    /// Weight of the normalized route-ratio term.
    pub weight_route_ratio: f64,
    /// How strongly the least-squares fit is pinned to the seed, in (0, 1).
    pub seed_od_weight: f64,
    /// Optimality tolerance of the bounded least-squares solver.
    pub leastsq_tolerance: f64,
    /// Initial CMA-ES sampling standard deviation.
    pub cmaes_sigma0: f64,
    /// CMA-ES rng seed.
    pub cmaes_seed: u64,
    /// CMA-ES evaluation budget; 0 picks one from the problem size.
    pub cmaes_max_evals: usize,
}

impl EstimationSettings {
    pub fn new() -> EstimationSettings {
        EstimationSettings {
            weight_total_geh: 1.,
            weight_odsse: 0.1,
            weight_route_ratio: 1.,
            seed_od_weight: 0.5,
            leastsq_tolerance: 1e-10,
            cmaes_sigma0: 1.,
            cmaes_seed: 100,
            cmaes_max_evals: 0,
        }
    }

    /// Build settings from a parsed yaml document. Missing keys keep their
    /// defaults; unknown keys are ignored.
    pub fn from_yaml(yaml_cfg: &Yaml) -> EstimationSettings {
        let defaults = EstimationSettings::new();
        EstimationSettings {
            weight_total_geh: yaml_number(&yaml_cfg["weight_total_geh"])
                .unwrap_or(defaults.weight_total_geh),
            weight_odsse: yaml_number(&yaml_cfg["weight_odsse"])
                .unwrap_or(defaults.weight_odsse),
            weight_route_ratio: yaml_number(&yaml_cfg["weight_route_ratio"])
                .unwrap_or(defaults.weight_route_ratio),
            seed_od_weight: yaml_number(&yaml_cfg["seed_od_weight"])
                .unwrap_or(defaults.seed_od_weight),
            leastsq_tolerance: yaml_number(&yaml_cfg["leastsq_tolerance"])
                .unwrap_or(defaults.leastsq_tolerance),
            cmaes_sigma0: yaml_number(&yaml_cfg["cmaes_sigma0"])
                .unwrap_or(defaults.cmaes_sigma0),
            cmaes_seed: match yaml_cfg["cmaes_seed"].as_i64() {
                Some(vv) => vv as u64,
                None => defaults.cmaes_seed,
            },
            cmaes_max_evals: match yaml_cfg["cmaes_max_evals"].as_i64() {
                Some(vv) => vv as usize,
                None => defaults.cmaes_max_evals,
            },
        }
    }

    pub fn from_yaml_str(contents: &str) -> EstimationSettings {
        match YamlLoader::load_from_str(contents) {
            Ok(docs) => {
                if docs.is_empty() {
                    return EstimationSettings::new();
                }
                EstimationSettings::from_yaml(&docs[0])
            }
            Err(err) => {
                log::warn!("could not parse settings yaml, using defaults: {}", err);
                EstimationSettings::new()
            }
        }
    }
}

/// Yaml numbers written without a decimal point parse as integers; accept
/// either form.
fn yaml_number(node: &Yaml) -> Option<f64> {
    node.as_f64().or_else(|| node.as_i64().map(|vv| vv as f64))
}

impl OdmeConfig for EstimationSettings {
    fn get_weight_total_geh(&self) -> f64 {
        return self.weight_total_geh;
    }
    fn get_weight_odsse(&self) -> f64 {
        return self.weight_odsse;
    }
    fn get_weight_route_ratio(&self) -> f64 {
        return self.weight_route_ratio;
    }
    fn get_seed_od_weight(&self) -> f64 {
        return self.seed_od_weight;
    }
    fn get_leastsq_tolerance(&self) -> f64 {
        return self.leastsq_tolerance;
    }
    fn get_cmaes_sigma0(&self) -> f64 {
        return self.cmaes_sigma0;
    }
    fn get_cmaes_seed(&self) -> u64 {
        return self.cmaes_seed;
    }
    fn get_cmaes_max_evals(&self) -> usize {
        return self.cmaes_max_evals;
    }
}
