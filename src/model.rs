use std::collections::BTreeMap;

use super::bvls::BvlsResult;
use super::config_utils::EstimationSettings;
use super::fratar::fratar;
use super::network::{LinkRecord, Network, NodeRecord, RouteRecord, TurnData,
                     TurnTargetRecord};
use super::od_matrix::OdMatrix;
use super::{odme_cmaes, odme_leastsq};


/// One seed-matrix cell, keyed by zone display names.
#[derive(Debug, Clone)]
pub struct SeedVolumeRecord {
    pub origin_name: String,
    pub destination_name: String,
    pub volume: f64,
}

#[derive(Copy, Clone, PartialEq, Debug)]
pub enum ZoneRole {
    Origin,
    Destination,
}

/// A per-zone production or attraction target, keyed by zone display name.
#[derive(Debug, Clone)]
pub struct ZoneTargetRecord {
    pub zone_name: String,
    pub role: ZoneRole,
    pub target: f64,
}

/// A route's OD pair and node sequence, for display and export.
#[derive(Debug, Clone)]
pub struct RouteInfo {
    pub origin: usize,
    pub destination: usize,
    pub origin_name: String,
    pub destination_name: String,
    pub name: String,
    pub nodes: Vec<usize>,
}

/// Owns the network and the OD matrices and keeps them consistent as data is
/// imported and estimators run.
///
/// After any estimator runs, `od_estimated` holds its result and `od_diff`
/// holds the cell-wise difference between the estimate and the seed.
pub struct Model {
    pub net: Option<Network>,
    pub od_seed: Option<OdMatrix>,
    pub od_estimated: Option<OdMatrix>,
    pub od_diff: Option<OdMatrix>,
    pub settings: EstimationSettings,
}

impl Model {
    pub fn new() -> Model {
        Model {
            net: None,
            od_seed: None,
            od_estimated: None,
            od_diff: None,
            settings: EstimationSettings::new(),
        }
    }

    /// Build the network, its turns and its shortest-path routes from node
    /// and link records. Replaces any previous network and drops the
    /// matrices tied to it.
    pub fn load_network(&mut self, nodes: Vec<NodeRecord>, links: Vec<LinkRecord>) -> bool {
        if nodes.is_empty() {
            log::warn!("No node records given; network not built");
            return false;
        }

        let mut net = Network::new();
        for record in nodes {
            net.add_node(record);
        }
        for record in links {
            net.add_link(record);
        }
        net.init_turns();
        net.init_routes();

        self.net = Some(net);
        self.od_seed = None;
        self.od_estimated = None;
        self.od_diff = None;
        return true;
    }

    /// Build the seed matrix from (origin name, destination name, volume)
    /// records. Zone lists follow the order of first appearance; records
    /// naming unknown nodes are logged and skipped.
    ///
    /// Zone targets start from the link counts around each zone: the summed
    /// outgoing counts for an origin, the summed incoming counts for a
    /// destination. Imported zone targets may override these later.
    pub fn load_seed_matrix(&mut self, records: &[SeedVolumeRecord]) -> bool {
        let net = match &mut self.net {
            Some(net) => net,
            None => {
                log::warn!("Cannot load a seed matrix before a network");
                return false;
            }
        };

        let mut volume: BTreeMap<(usize, usize), f64> = BTreeMap::new();
        let mut origins: Vec<usize> = vec![];
        let mut destinations: Vec<usize> = vec![];
        let mut names_o: Vec<String> = vec![];
        let mut names_d: Vec<String> = vec![];

        for record in records {
            let oo = match net.get_node_key_by_name(&record.origin_name) {
                Some(kk) => kk,
                None => {
                    log::warn!("Unknown origin zone {}; seed record skipped",
                               record.origin_name);
                    continue;
                }
            };
            let dd = match net.get_node_key_by_name(&record.destination_name) {
                Some(kk) => kk,
                None => {
                    log::warn!("Unknown destination zone {}; seed record skipped",
                               record.destination_name);
                    continue;
                }
            };

            if !origins.contains(&oo) {
                origins.push(oo);
                names_o.push(record.origin_name.clone());
            }
            if !destinations.contains(&dd) {
                destinations.push(dd);
                names_d.push(record.destination_name.clone());
            }
            volume.insert((oo, dd), record.volume);
        }

        if volume.is_empty() {
            log::warn!("No usable seed records; seed matrix not built");
            return false;
        }

        let targets_o = origins.iter()
            .map(|oo| (*oo, zone_target_from_outgoing_links(net, *oo)))
            .collect();
        let targets_d = destinations.iter()
            .map(|dd| (*dd, zone_target_from_incoming_links(net, *dd)))
            .collect();

        let od_seed = OdMatrix::new(volume, origins, destinations,
                                    names_o, names_d, targets_o, targets_d);
        net.init_seed_volumes(&od_seed);

        self.od_estimated = Some(OdMatrix::from_source(&od_seed, false, true));
        self.od_diff = Some(OdMatrix::from_source(&od_seed, false, false));
        self.od_seed = Some(od_seed);
        return true;
    }

    /// Override zone targets with imported values. Records naming unknown
    /// nodes, or zones outside the seed matrix, are logged and skipped.
    pub fn import_zone_targets(&mut self, records: &[ZoneTargetRecord]) -> bool {
        let net = match &self.net {
            Some(net) => net,
            None => return false,
        };
        let od_seed = match &mut self.od_seed {
            Some(od) => od,
            None => return false,
        };

        for record in records {
            let key = match net.get_node_key_by_name(&record.zone_name) {
                Some(kk) => kk,
                None => {
                    log::warn!("Unknown zone {}; target skipped", record.zone_name);
                    continue;
                }
            };
            let targets = match record.role {
                ZoneRole::Origin => &mut od_seed.targets_o,
                ZoneRole::Destination => &mut od_seed.targets_d,
            };
            if !targets.contains_key(&key) {
                log::warn!("Zone {} has no {:?} role in the seed matrix; target skipped",
                           record.zone_name, record.role);
                continue;
            }
            targets.insert(key, record.target);
        }
        return true;
    }

    pub fn import_turn_targets(&mut self, records: &[TurnTargetRecord]) -> bool {
        let net = match &mut self.net {
            Some(net) => net,
            None => return false,
        };
        net.import_turn_targets(records);
        if let Some(od_seed) = &self.od_seed {
            net.init_seed_volumes(od_seed);
        }
        return true;
    }

    /// Replace the shortest-path routes with user-supplied ones, then re-seed
    /// the route, link, and turn volumes if a seed matrix is loaded.
    pub fn import_routes(&mut self, records: &[RouteRecord]) -> bool {
        let net = match &mut self.net {
            Some(net) => net,
            None => return false,
        };
        net.import_routes(records);
        if let Some(od_seed) = &self.od_seed {
            net.init_seed_volumes(od_seed);
        }
        return true;
    }

    /// Run the CMA-ES estimator and return the per-route multipliers, or
    /// `None` when the network or seed matrix is missing.
    pub fn estimate_od_cmaes(&mut self) -> Option<Vec<f64>> {
        let net = self.net.as_mut()?;
        let od_seed = self.od_seed.as_ref()?;

        let mut od_estimated = OdMatrix::from_source(od_seed, false, true);
        let multipliers = odme_cmaes::estimate_od(net, od_seed, &mut od_estimated,
                                                  &self.settings);
        self.od_diff = Some(od_estimated.diff(od_seed));
        self.od_estimated = Some(od_estimated);
        return Some(multipliers);
    }

    /// Run biproportional scaling towards the zone targets.
    pub fn estimate_od_fratar(&mut self) -> Option<&OdMatrix> {
        let od_seed = self.od_seed.as_ref()?;

        let od_estimated = fratar(od_seed);
        self.od_diff = Some(od_estimated.diff(od_seed));
        self.od_estimated = Some(od_estimated);
        return self.od_estimated.as_ref();
    }

    /// Run the bounded least-squares estimator against the link and turn
    /// counts.
    pub fn estimate_od_leastsq(&mut self) -> Option<BvlsResult> {
        let net = self.net.as_ref()?;
        let od_seed = self.od_seed.as_ref()?;

        let (result, od_estimated) = odme_leastsq::estimate_od(net, od_seed,
                                                               &self.settings);
        self.od_diff = Some(od_estimated.diff(od_seed));
        self.od_estimated = Some(od_estimated);
        return Some(result);
    }

    /// The estimated OD volumes as (origin name, destination name, volume)
    /// rows.
    pub fn get_od_volume_list(&self) -> Vec<(String, String, f64)> {
        let net = match &self.net {
            Some(net) => net,
            None => return vec![],
        };
        let od = match &self.od_estimated {
            Some(od) => od,
            None => return vec![],
        };
        od.volume.iter()
            .map(|((oo, dd), vv)| (net.node(*oo).name.clone(),
                                   net.node(*dd).name.clone(), *vv))
            .collect()
    }

    /// The assigned volume of every route as (origin name, destination name,
    /// route name, volume) rows.
    pub fn get_route_volume_list(&self) -> Vec<(String, String, String, f64)> {
        let net = match &self.net {
            Some(net) => net,
            None => return vec![],
        };
        net.od_pairs.iter().flat_map(|od| {
            let o_name = net.node(od.origin).name.clone();
            let d_name = net.node(od.destination).name.clone();
            od.routes.iter().map(move |rr|
                (o_name.clone(), d_name.clone(), rr.name.clone(), rr.assigned_volume))
        }).collect()
    }

    pub fn get_turn_list(&self) -> Vec<&TurnData> {
        match &self.net {
            Some(net) => net.turns().collect(),
            None => vec![],
        }
    }

    /// Every route's OD pair and node sequence.
    pub fn get_route_list(&self) -> Vec<RouteInfo> {
        let net = match &self.net {
            Some(net) => net,
            None => return vec![],
        };
        net.od_pairs.iter().flat_map(|od| {
            od.routes.iter().map(move |rr| RouteInfo {
                origin: od.origin,
                destination: od.destination,
                origin_name: net.node(od.origin).name.clone(),
                destination_name: net.node(od.destination).name.clone(),
                name: rr.name.clone(),
                nodes: rr.nodes.clone(),
            })
        }).collect()
    }
}

/// Summed counts of the counted links leaving a zone.
fn zone_target_from_outgoing_links(net: &Network, zone: usize) -> f64 {
    net.node(zone).neighbors.values()
        .filter(|ll| ll.target_volume >= 0.)
        .map(|ll| ll.target_volume)
        .sum()
}

/// Summed counts of the counted links entering a zone.
fn zone_target_from_incoming_links(net: &Network, zone: usize) -> f64 {
    net.links()
        .filter(|((_, jj), ll)| *jj == zone && ll.target_volume >= 0.)
        .map(|(_, ll)| ll.target_volume)
        .sum()
}
