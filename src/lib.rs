// imports of other modules from this crate
mod geh;
pub use geh::geh;

mod geometry;
pub use geometry::Point2d;

mod dijkstra;
pub use dijkstra::{node_seq, shortest_paths, ShortestPaths};

mod od_matrix;
pub use od_matrix::{OdMatrix, NO_ZONE_TARGET};

mod network;
pub use network::{LinkRecord, NetLink, NetNode, NetOdPair, NetRoute, Network,
                  NodeRecord, RouteRecord, TurnData, TurnTargetRecord, NO_TARGET};

mod fratar;
pub use fratar::fratar;

mod cmaes;
pub use cmaes::{CmaesParams, CmaesResult};

mod odme_cmaes;
pub use odme_cmaes::estimate_od as estimate_od_cmaes;

mod bvls;
pub use bvls::{bvls, BvlsResult};

mod odme_leastsq;
pub use odme_leastsq::estimate_od as estimate_od_leastsq;

mod config_utils;
pub use config_utils::EstimationSettings;

mod model;
pub use model::{Model, RouteInfo, SeedVolumeRecord, ZoneRole, ZoneTargetRecord};

#[cfg(test)]
mod test_utils;


/// Defines common elements for all estimation config.
pub trait OdmeConfig {
    fn get_weight_total_geh(&self) -> f64;
    fn get_weight_odsse(&self) -> f64;
    fn get_weight_route_ratio(&self) -> f64;
    fn get_seed_od_weight(&self) -> f64;
    fn get_leastsq_tolerance(&self) -> f64;
    fn get_cmaes_sigma0(&self) -> f64;
    fn get_cmaes_seed(&self) -> u64;
    fn get_cmaes_max_evals(&self) -> usize;

    fn cmaes_params(&self) -> CmaesParams {
        let mut params = CmaesParams::new(self.get_cmaes_sigma0(),
                                          self.get_cmaes_seed());
        params.max_evals = self.get_cmaes_max_evals();
        return params;
    }
}
