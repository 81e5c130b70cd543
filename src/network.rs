use std::collections::{BTreeMap, HashMap};
use itertools::Itertools;

use super::dijkstra;
use super::geh::geh;
use super::geometry::Point2d;
use super::od_matrix::OdMatrix;


/// Sentinel target volume meaning "no observed count for this link or turn".
pub static NO_TARGET: f64 = -1.0;

/// Input record for one network node.
#[derive(Debug, Clone)]
pub struct NodeRecord {
    pub name: String,
    pub x: f64,
    pub y: f64,
    pub is_origin: bool,
    pub is_destination: bool,
}

/// Input record for one directed link, with endpoints given by node name.
#[derive(Debug, Clone)]
pub struct LinkRecord {
    pub from_name: String,
    pub to_name: String,
    pub cost: f64,
    pub name: String,
    pub target_volume: f64,
    pub shape_points: Vec<Point2d>,
}

/// Input record for one turn target, with nodes given by name.
#[derive(Debug, Clone)]
pub struct TurnTargetRecord {
    pub a_name: String,
    pub b_name: String,
    pub c_name: String,
    pub name: String,
    pub target_volume: f64,
}

/// Input record for one user-supplied route.
#[derive(Debug, Clone)]
pub struct RouteRecord {
    pub origin_name: String,
    pub destination_name: String,
    pub target_ratio: f64,
    pub node_names: Vec<String>,
}

/// A junction in the network graph. Two connected nodes form a link; three
/// consecutive nodes form a turn.
#[derive(Debug)]
pub struct NetNode {
    pub key: usize,
    pub name: String,
    pub pos: Point2d,
    /// Whether trips may start at this node.
    pub is_origin: bool,
    /// Whether trips may end at this node.
    pub is_destination: bool,
    /// Adjacency list: downstream node key to the link reaching it.
    pub neighbors: BTreeMap<usize, NetLink>,
    /// Keys of nodes with a link into this node.
    pub up_neighbors: Vec<usize>,
}

/// Data carried by one directed link.
#[derive(Debug)]
pub struct NetLink {
    /// Routing friction used by the shortest-route search.
    pub cost: f64,
    pub name: String,
    /// Observed count to match, or `NO_TARGET`.
    pub target_volume: f64,
    pub link_index: usize,
    /// Flow currently assigned from the route volumes.
    pub assigned_volume: f64,
    pub geh: f64,
    /// Flow assigned from the seed OD matrix.
    pub seed_volume: f64,
    /// Display geometry only; carries no routing semantics.
    pub shape_points: Vec<Point2d>,
}

/// Data carried by one turn, a movement across three consecutive nodes.
#[derive(Debug)]
pub struct TurnData {
    pub key: (usize, usize, usize),
    pub name: String,
    pub seed_volume: f64,
    pub target_volume: f64,
    pub assigned_volume: f64,
    pub geh: f64,
}

/// One path from an OD pair's origin to its destination.
#[derive(Debug, Clone)]
pub struct NetRoute {
    /// Node keys along the route, origin first.
    pub nodes: Vec<usize>,
    /// Derived name, unique within the OD pair when a unique link exists;
    /// legitimately empty otherwise.
    pub name: String,
    pub seed_volume: f64,
    /// Desired share of the OD pair's volume on this route. Shares are
    /// normalized to sum to 1 across the pair's routes.
    pub target_ratio: f64,
    /// target_ratio - (1 - target_ratio).
    pub target_rel_diff: f64,
    pub assigned_volume: f64,
    pub assigned_ratio: f64,
    /// Position of this route among the optimizer's decision variables.
    pub opt_var_index: Option<usize>,
}

/// An origin-destination pair and its candidate routes.
#[derive(Debug)]
pub struct NetOdPair {
    pub origin: usize,
    pub destination: usize,
    pub seed_total_volume: f64,
    pub est_total_volume: f64,
    pub routes: Vec<NetRoute>,
}

/// The network graph: nodes and links in adjacency lists, plus turns and the
/// OD pairs with their routes.
///
/// Topology is fixed once built; estimator runs only rewrite the
/// assigned-volume, ratio, and GEH fields.
pub struct Network {
    graph: BTreeMap<usize, NetNode>,
    node_keys_by_name: HashMap<String, usize>,
    turns: BTreeMap<(usize, usize, usize), TurnData>,
    n_links: usize,
    pub od_pairs: Vec<NetOdPair>,
    /// Grand total of link and turn GEH values, per `calc_network_geh`.
    pub total_geh: f64,
}

impl Network {
    pub fn new() -> Network {
        Network {
            graph: BTreeMap::new(),
            node_keys_by_name: HashMap::new(),
            turns: BTreeMap::new(),
            n_links: 0,
            od_pairs: vec![],
            total_geh: 0.,
        }
    }

    /// Add a node to the graph. A record whose name is already taken is
    /// logged and skipped, since links and turns address nodes by name.
    pub fn add_node(&mut self, record: NodeRecord) {
        if self.node_keys_by_name.contains_key(&record.name) {
            log::warn!("Duplicate node name {}; record skipped", record.name);
            return;
        }
        let key = self.graph.len();
        self.node_keys_by_name.insert(record.name.clone(), key);
        self.graph.insert(key, NetNode {
            key,
            name: record.name,
            pos: Point2d::new(record.x, record.y),
            is_origin: record.is_origin,
            is_destination: record.is_destination,
            neighbors: BTreeMap::new(),
            up_neighbors: vec![],
        });
    }

    /// Connect two nodes to form a link. Returns false (after logging) if
    /// either endpoint name is unknown.
    pub fn add_link(&mut self, record: LinkRecord) -> bool {
        let i_key = match self.get_node_key_by_name(&record.from_name) {
            Some(kk) => kk,
            None => {
                log::warn!("Link {}: unknown from-node {}", record.name, record.from_name);
                return false;
            }
        };
        let j_key = match self.get_node_key_by_name(&record.to_name) {
            Some(kk) => kk,
            None => {
                log::warn!("Link {}: unknown to-node {}", record.name, record.to_name);
                return false;
            }
        };

        let link = NetLink {
            cost: record.cost,
            name: record.name,
            target_volume: record.target_volume,
            link_index: self.n_links,
            assigned_volume: 0.,
            geh: 0.,
            seed_volume: 0.,
            shape_points: record.shape_points,
        };

        self.graph.get_mut(&i_key).unwrap().neighbors.insert(j_key, link);
        self.n_links += 1;
        self.graph.get_mut(&j_key).unwrap().up_neighbors.push(i_key);
        return true;
    }

    /// Node accessor. Panics on an unknown key; keys handed out by this
    /// network are always valid, and external names are resolved through
    /// `get_node_key_by_name`.
    pub fn node(&self, key: usize) -> &NetNode {
        &self.graph[&key]
    }

    pub fn get_node_key_by_name(&self, name: &str) -> Option<usize> {
        self.node_keys_by_name.get(name).copied()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &NetNode> {
        self.graph.values()
    }

    pub fn n_nodes(&self) -> usize {
        self.graph.len()
    }

    pub fn n_links(&self) -> usize {
        self.n_links
    }

    pub fn link(&self, ii: usize, jj: usize) -> &NetLink {
        &self.graph[&ii].neighbors[&jj]
    }

    pub fn link_mut(&mut self, ii: usize, jj: usize) -> &mut NetLink {
        self.graph.get_mut(&ii).unwrap().neighbors.get_mut(&jj).unwrap()
    }

    /// Iterate all links as ((from key, to key), link data).
    pub fn links(&self) -> impl Iterator<Item = ((usize, usize), &NetLink)> {
        self.graph.values().flat_map(|node| {
            let ii = node.key;
            node.neighbors.iter().map(move |(jj, link)| ((ii, *jj), link))
        })
    }

    fn links_mut(&mut self) -> impl Iterator<Item = ((usize, usize), &mut NetLink)> {
        self.graph.values_mut().flat_map(|node| {
            let ii = node.key;
            node.neighbors.iter_mut().map(move |(jj, link)| ((ii, *jj), link))
        })
    }

    pub fn turn(&self, key: (usize, usize, usize)) -> Option<&TurnData> {
        self.turns.get(&key)
    }

    pub fn turns(&self) -> impl Iterator<Item = &TurnData> {
        self.turns.values()
    }

    /// Enumerate every (i, j, k) such that i->j and j->k are both links.
    pub fn init_turns(&mut self) {
        for (ii, node1) in &self.graph {
            for jj in node1.neighbors.keys() {
                for kk in self.graph[jj].neighbors.keys() {
                    let key = (*ii, *jj, *kk);
                    self.turns.insert(key, TurnData {
                        key,
                        name: format!("{}_{}_{}", ii, jj, kk),
                        seed_volume: 0.,
                        target_volume: 0.,
                        assigned_volume: 0.,
                        geh: 0.,
                    });
                }
            }
        }
    }

    /// Build the default OD pairs: one shortest route from every origin node
    /// to every reachable destination node. An unreachable destination
    /// simply produces no OD pair.
    pub fn init_routes(&mut self) {
        let origin_keys: Vec<usize> =
            self.graph.values().filter(|nn| nn.is_origin).map(|nn| nn.key).collect();
        let destination_keys: Vec<usize> =
            self.graph.values().filter(|nn| nn.is_destination).map(|nn| nn.key).collect();

        let mut od_pairs = vec![];
        for ii in &origin_keys {
            let paths = dijkstra::shortest_paths(self, *ii);
            for jj in &destination_keys {
                let node_seq = dijkstra::node_seq(&paths, *ii, *jj);
                if node_seq.is_empty() {
                    continue;
                }
                od_pairs.push(NetOdPair {
                    origin: *ii,
                    destination: *jj,
                    seed_total_volume: 0.,
                    est_total_volume: 0.,
                    routes: vec![NetRoute {
                        nodes: node_seq,
                        name: String::new(),
                        seed_volume: 0.,
                        target_ratio: 1.,
                        target_rel_diff: 1.,
                        assigned_volume: 0.,
                        assigned_ratio: 1.,
                        opt_var_index: None,
                    }],
                });
            }
        }
        self.od_pairs = od_pairs;

        self.set_route_names();
    }

    /// Assign route names within each OD pair by finding a link unique to
    /// each route. With routes A-X-Y-B and A-X-C-Y-B, the links X-Y and X-C
    /// are each used by only one route, so the routes become "X_Y" and
    /// "X_C". A route with no unique link keeps an empty name.
    pub fn set_route_names(&mut self) {
        let mut od_pairs = std::mem::take(&mut self.od_pairs);

        for od in &mut od_pairs {
            if od.routes.len() < 2 {
                // a lone route needs no distinguishing name
                continue;
            }

            // count how often each link is used amongst the pair's routes
            let mut link_counts: BTreeMap<(usize, usize), usize> = BTreeMap::new();
            for route in &od.routes {
                for (aa, bb) in route.nodes.iter().tuple_windows::<(_, _)>() {
                    *link_counts.entry((*aa, *bb)).or_insert(0) += 1;
                }
            }
            let mut unique_links: Vec<(usize, usize)> = link_counts.iter()
                .filter(|(_, nn)| **nn == 1)
                .map(|(ll, _)| *ll)
                .collect();

            for route in &mut od.routes {
                for (aa, bb) in route.nodes.iter().tuple_windows::<(_, _)>() {
                    if let Some(pos) = unique_links.iter().position(|ll| *ll == (*aa, *bb)) {
                        route.name = format!("{}_{}",
                                             self.graph[aa].name, self.graph[bb].name);
                        // a link names at most one route
                        unique_links.remove(pos);
                        break;
                    }
                }
            }
        }

        self.od_pairs = od_pairs;
    }

    /// Recompute every link and turn assigned volume from the route volumes.
    /// A single-node route contributes nothing, a two-node route one link,
    /// and longer routes every consecutive link and turn.
    pub fn set_link_and_turn_volume_from_route(&mut self) {
        let mut link_adds: Vec<((usize, usize), f64)> = vec![];
        let mut turn_adds: Vec<((usize, usize, usize), f64)> = vec![];
        for od in &self.od_pairs {
            for route in &od.routes {
                for (ii, jj) in route.nodes.iter().tuple_windows::<(_, _)>() {
                    link_adds.push(((*ii, *jj), route.assigned_volume));
                }
                for (ii, jj, kk) in route.nodes.iter().tuple_windows::<(_, _, _)>() {
                    turn_adds.push(((*ii, *jj, *kk), route.assigned_volume));
                }
            }
        }

        for (_, link) in self.links_mut() {
            link.assigned_volume = 0.;
        }
        for turn in self.turns.values_mut() {
            turn.assigned_volume = 0.;
        }

        for (key, vol) in link_adds {
            self.link_mut(key.0, key.1).assigned_volume += vol;
        }
        for (key, vol) in turn_adds {
            if let Some(turn) = self.turns.get_mut(&key) {
                turn.assigned_volume += vol;
            }
        }
    }

    /// Sum the GEH of every link, and of every turn with a strictly positive
    /// target, into `total_geh`. Links join unconditionally, so an uncounted
    /// link is measured against its `NO_TARGET` sentinel and penalizes any
    /// volume assigned to it; only turns are filtered.
    pub fn calc_network_geh(&mut self) {
        let mut total_geh = 0.;

        for (_, link) in self.links_mut() {
            link.geh = geh(link.target_volume, link.assigned_volume);
            total_geh += link.geh;
        }

        for turn in self.turns.values_mut() {
            if turn.target_volume <= 0. {
                continue;
            }
            turn.geh = geh(turn.target_volume, turn.assigned_volume);
            total_geh += turn.geh;
        }

        self.total_geh = total_geh;
    }

    /// Assign route, link, and turn seed volumes from an OD matrix.
    pub fn init_seed_volumes(&mut self, od_mat: &OdMatrix) {
        for od in &mut self.od_pairs {
            let od_volume = od_mat.volume.get(&(od.origin, od.destination))
                .copied().unwrap_or(0.);
            od.seed_total_volume = od_volume;
            for route in &mut od.routes {
                route.seed_volume = od_volume * route.target_ratio;
                route.assigned_volume = route.seed_volume;
            }
        }

        self.set_link_and_turn_volume_from_route();

        for (_, link) in self.links_mut() {
            link.seed_volume = link.assigned_volume;
        }
        for turn in self.turns.values_mut() {
            turn.seed_volume = turn.assigned_volume;
        }
    }

    /// Import turn target volumes. Records naming unknown nodes or turns
    /// that do not exist in the network are logged and skipped.
    pub fn import_turn_targets(&mut self, records: &[TurnTargetRecord]) {
        for record in records {
            let keys = [&record.a_name, &record.b_name, &record.c_name].iter()
                .map(|name| self.get_node_key_by_name(name))
                .collect::<Option<Vec<usize>>>();
            let keys = match keys {
                Some(keys) => keys,
                None => {
                    log::warn!("Cannot import turn {}: unknown node name", record.name);
                    continue;
                }
            };

            match self.turns.get_mut(&(keys[0], keys[1], keys[2])) {
                Some(turn) => {
                    turn.name = record.name.clone();
                    turn.target_volume = record.target_volume;
                }
                None => {
                    log::warn!("Cannot import turn {}: turn not found in network",
                               record.name);
                }
            }
        }
    }

    /// Replace OD-pair routes with user-supplied ones. All routes of a pair
    /// named in the records are dropped before the first record for that
    /// pair is added; ratios are then renormalized across every pair and the
    /// route names rebuilt.
    pub fn import_routes(&mut self, records: &[RouteRecord]) {
        let mut replaced_pairs = std::collections::HashSet::new();

        for record in records {
            let origin = self.get_node_key_by_name(&record.origin_name);
            let destination = self.get_node_key_by_name(&record.destination_name);
            let node_seq = record.node_names.iter()
                .map(|name| self.get_node_key_by_name(name))
                .collect::<Option<Vec<usize>>>();

            let (origin, destination, node_seq) = match (origin, destination, node_seq) {
                (Some(oo), Some(dd), Some(seq)) => (oo, dd, seq),
                _ => {
                    log::warn!("Cannot import route {} -> {}: unknown node name",
                               record.origin_name, record.destination_name);
                    continue;
                }
            };

            // every consecutive pair must be an existing link, or later
            // flow aggregation would address links the graph does not have
            let missing_link = node_seq.iter().tuple_windows::<(_, _)>()
                .find(|&(aa, bb)| !self.graph[aa].neighbors.contains_key(bb));
            if let Some((aa, bb)) = missing_link {
                log::warn!("Cannot import route {} -> {}: no link {} -> {}",
                           record.origin_name, record.destination_name,
                           self.graph[aa].name, self.graph[bb].name);
                continue;
            }

            let mut matched = false;
            for od in &mut self.od_pairs {
                if od.origin != origin || od.destination != destination {
                    continue;
                }
                matched = true;

                if replaced_pairs.insert((origin, destination)) {
                    od.routes.clear();
                }
                od.routes.push(NetRoute {
                    nodes: node_seq.clone(),
                    name: String::new(),
                    seed_volume: 0.,
                    target_ratio: record.target_ratio,
                    target_rel_diff: 0.,
                    assigned_volume: 0.,
                    assigned_ratio: 0.,
                    opt_var_index: None,
                });
            }
            if !matched {
                log::warn!("Cannot import route {} -> {}: no such OD pair",
                           record.origin_name, record.destination_name);
            }
        }

        // normalize target ratios within each OD pair
        for od in &mut self.od_pairs {
            let mut ratio_sum: f64 = od.routes.iter().map(|rr| rr.target_ratio).sum();
            if ratio_sum == 0. {
                ratio_sum = 1.;
            }
            for route in &mut od.routes {
                route.target_ratio /= ratio_sum;
                route.target_rel_diff = route.target_ratio - (1. - route.target_ratio);
            }
        }

        self.set_route_names();
    }

    /// For every link traversed by at least one route, map each contributing
    /// OD pair to the sum of target ratios of that pair's routes through the
    /// link.
    pub fn select_link(&self) -> BTreeMap<(usize, usize), BTreeMap<(usize, usize), f64>> {
        let mut selected: BTreeMap<(usize, usize), BTreeMap<(usize, usize), f64>> =
            BTreeMap::new();
        for od in &self.od_pairs {
            let pair_key = (od.origin, od.destination);
            for route in &od.routes {
                for (ii, jj) in route.nodes.iter().tuple_windows::<(_, _)>() {
                    *selected.entry((*ii, *jj)).or_insert_with(BTreeMap::new)
                        .entry(pair_key).or_insert(0.) += route.target_ratio;
                }
            }
        }
        return selected;
    }

    /// Turn analogue of `select_link`.
    pub fn select_turn(&self)
        -> BTreeMap<(usize, usize, usize), BTreeMap<(usize, usize), f64>> {
        let mut selected: BTreeMap<(usize, usize, usize), BTreeMap<(usize, usize), f64>> =
            BTreeMap::new();
        for od in &self.od_pairs {
            let pair_key = (od.origin, od.destination);
            for route in &od.routes {
                for (ii, jj, kk) in route.nodes.iter().tuple_windows::<(_, _, _)>() {
                    *selected.entry((*ii, *jj, *kk)).or_insert_with(BTreeMap::new)
                        .entry(pair_key).or_insert(0.) += route.target_ratio;
                }
            }
        }
        return selected;
    }
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils;
    use crate::test_utils::corridor_net;
    use approx::assert_abs_diff_eq;
    use std::collections::BTreeMap;

    #[test]
    fn test_init_turns() {
        let net = corridor_net();
        let turn_keys: Vec<(usize, usize, usize)> =
            net.turns().map(|tt| tt.key).collect();
        assert_eq!(turn_keys,
                   vec![(0, 2, 3), (1, 2, 3), (2, 3, 4), (2, 3, 5)]);
    }

    #[test]
    fn test_init_routes() {
        let net = corridor_net();
        let pairs: Vec<(usize, usize)> =
            net.od_pairs.iter().map(|od| (od.origin, od.destination)).collect();
        assert_eq!(pairs, vec![(0, 4), (0, 5), (1, 4), (1, 5)]);
        assert_eq!(net.od_pairs[0].routes[0].nodes, vec![0, 2, 3, 4]);
        assert_eq!(net.od_pairs[3].routes[0].nodes, vec![1, 2, 3, 5]);
    }

    #[test]
    fn test_unknown_link_endpoint_is_skipped() {
        let mut net = Network::new();
        net.add_node(NodeRecord {
            name: String::from("a"), x: 0., y: 0.,
            is_origin: true, is_destination: false,
        });
        assert!(!net.add_link(LinkRecord {
            from_name: String::from("a"),
            to_name: String::from("nope"),
            cost: 1.,
            name: String::from("bad"),
            target_volume: NO_TARGET,
            shape_points: vec![],
        }));
        assert_eq!(net.n_links(), 0);
    }

    #[test]
    fn test_route_names_disjoint_routes() {
        let mut net = corridor_net();
        // replace the (a, e) routes with two routes through disjoint links
        net.import_routes(&[
            RouteRecord {
                origin_name: String::from("a"),
                destination_name: String::from("e"),
                target_ratio: 0.8,
                node_names: vec!["a", "c", "d", "e"].iter()
                    .map(|ss| String::from(*ss)).collect(),
            },
            RouteRecord {
                origin_name: String::from("a"),
                destination_name: String::from("e"),
                target_ratio: 0.2,
                node_names: vec!["a", "c", "d", "f"].iter()
                    .map(|ss| String::from(*ss)).collect(),
            },
        ]);

        let od = &net.od_pairs[0];
        assert_eq!(od.routes.len(), 2);
        assert_eq!(od.routes[0].name, "d_e");
        assert_eq!(od.routes[1].name, "d_f");
        assert_abs_diff_eq!(od.routes[0].target_ratio, 0.8);
        assert_abs_diff_eq!(od.routes[0].target_rel_diff, 0.6);
        assert_abs_diff_eq!(od.routes[1].target_rel_diff, -0.6);
    }

    #[test]
    fn test_route_import_over_missing_link_skipped() {
        let mut net = corridor_net();
        // nodes a and e both exist, but no direct a -> e link does
        net.import_routes(&[RouteRecord {
            origin_name: String::from("a"),
            destination_name: String::from("e"),
            target_ratio: 1.,
            node_names: vec![String::from("a"), String::from("e")],
        }]);

        // the shortest-path route survives untouched
        let od = &net.od_pairs[0];
        assert_eq!(od.routes.len(), 1);
        assert_eq!(od.routes[0].nodes, vec![0, 2, 3, 4]);

        // re-seeding aggregates flows without addressing a missing link
        let od_mat = crate::OdMatrix::new(
            vec![((0, 4), 20.)].into_iter().collect(),
            vec![0], vec![4],
            vec![String::from("a")], vec![String::from("e")],
            BTreeMap::new(), BTreeMap::new());
        net.init_seed_volumes(&od_mat);
        assert_abs_diff_eq!(net.link(2, 3).seed_volume, 20.);
    }

    #[test]
    fn test_route_names_fully_overlapping() {
        let mut net = corridor_net();
        // two identical routes: no link is unique, so neither gets a name
        let record = RouteRecord {
            origin_name: String::from("a"),
            destination_name: String::from("e"),
            target_ratio: 0.5,
            node_names: vec!["a", "c", "d", "e"].iter()
                .map(|ss| String::from(*ss)).collect(),
        };
        net.import_routes(&[record.clone(), record]);

        let od = &net.od_pairs[0];
        assert_eq!(od.routes.len(), 2);
        assert_eq!(od.routes[0].name, "");
        assert_eq!(od.routes[1].name, "");
    }

    #[test]
    fn test_flow_aggregation() {
        let mut net = corridor_net();
        for od in &mut net.od_pairs {
            for route in &mut od.routes {
                route.assigned_volume = 10.;
            }
        }
        net.set_link_and_turn_volume_from_route();

        // both (0,4) and (0,5) pass over link (0,2)
        assert_abs_diff_eq!(net.link(0, 2).assigned_volume, 20.);
        // all four OD pairs share the corridor link
        assert_abs_diff_eq!(net.link(2, 3).assigned_volume, 40.);
        assert_abs_diff_eq!(net.link(3, 4).assigned_volume, 20.);
        assert_abs_diff_eq!(net.turn((2, 3, 5)).unwrap().assigned_volume, 20.);
        assert_abs_diff_eq!(net.turn((0, 2, 3)).unwrap().assigned_volume, 20.);
    }

    #[test]
    fn test_short_routes_contribute_no_turns() {
        let mut net = Network::new();
        for (name, oo, dd) in &[("a", true, true), ("b", false, true)] {
            net.add_node(NodeRecord {
                name: String::from(*name), x: 0., y: 0.,
                is_origin: *oo, is_destination: *dd,
            });
        }
        assert!(net.add_link(LinkRecord {
            from_name: String::from("a"),
            to_name: String::from("b"),
            cost: 1.,
            name: String::from("ab"),
            target_volume: 5.,
            shape_points: vec![],
        }));
        net.init_turns();
        net.init_routes();

        // (a, a) is a single-node route, (a, b) a one-link route
        assert_eq!(net.od_pairs.len(), 2);
        for od in &mut net.od_pairs {
            for route in &mut od.routes {
                route.assigned_volume = 7.;
            }
        }
        net.set_link_and_turn_volume_from_route();
        assert_abs_diff_eq!(net.link(0, 1).assigned_volume, 7.);
        assert_eq!(net.turns().count(), 0);
    }

    #[test]
    fn test_select_link() {
        let net = corridor_net();
        let select_link = net.select_link();

        let mut expected: BTreeMap<(usize, usize), BTreeMap<(usize, usize), f64>> =
            BTreeMap::new();
        expected.insert((0, 2), vec![((0, 4), 1.), ((0, 5), 1.)].into_iter().collect());
        expected.insert((1, 2), vec![((1, 4), 1.), ((1, 5), 1.)].into_iter().collect());
        expected.insert((2, 3), vec![((0, 4), 1.), ((0, 5), 1.),
                                     ((1, 4), 1.), ((1, 5), 1.)].into_iter().collect());
        expected.insert((3, 4), vec![((0, 4), 1.), ((1, 4), 1.)].into_iter().collect());
        expected.insert((3, 5), vec![((0, 5), 1.), ((1, 5), 1.)].into_iter().collect());

        assert_eq!(select_link.len(), expected.len());
        for (key, true_pairs) in &expected {
            let pairs: std::collections::HashMap<(usize, usize), f64> =
                select_link[key].iter().map(|(kk, vv)| (*kk, *vv)).collect();
            let true_pairs: std::collections::HashMap<(usize, usize), f64> =
                true_pairs.iter().map(|(kk, vv)| (*kk, *vv)).collect();
            test_utils::compare_hashmaps(&pairs, &true_pairs);
        }
    }

    #[test]
    fn test_select_turn() {
        let net = corridor_net();
        let select_turn = net.select_turn();

        let mut expected: BTreeMap<(usize, usize, usize), BTreeMap<(usize, usize), f64>> =
            BTreeMap::new();
        expected.insert((0, 2, 3), vec![((0, 4), 1.), ((0, 5), 1.)].into_iter().collect());
        expected.insert((1, 2, 3), vec![((1, 4), 1.), ((1, 5), 1.)].into_iter().collect());
        expected.insert((2, 3, 4), vec![((0, 4), 1.), ((1, 4), 1.)].into_iter().collect());
        expected.insert((2, 3, 5), vec![((0, 5), 1.), ((1, 5), 1.)].into_iter().collect());

        assert_eq!(select_turn, expected);
    }

    #[test]
    fn test_select_link_sums_route_ratios() {
        let mut net = corridor_net();
        // split (a, e) across two routes; the shared links should see the
        // summed ratio for that pair
        net.import_routes(&[
            RouteRecord {
                origin_name: String::from("a"),
                destination_name: String::from("e"),
                target_ratio: 0.75,
                node_names: vec!["a", "c", "d", "e"].iter()
                    .map(|ss| String::from(*ss)).collect(),
            },
            RouteRecord {
                origin_name: String::from("a"),
                destination_name: String::from("e"),
                target_ratio: 0.25,
                node_names: vec!["a", "c", "d", "e"].iter()
                    .map(|ss| String::from(*ss)).collect(),
            },
        ]);
        let select_link = net.select_link();
        assert_abs_diff_eq!(select_link[&(0, 2)][&(0, 4)], 1.);
        assert_abs_diff_eq!(select_link[&(3, 4)][&(0, 4)], 1.);
    }

    #[test]
    fn test_network_geh() {
        let mut net = corridor_net();
        for od in &mut net.od_pairs {
            for route in &mut od.routes {
                route.assigned_volume = 50.;
            }
        }
        net.set_link_and_turn_volume_from_route();
        net.calc_network_geh();

        // links carry targets (100, 75, 175, 50, 125) against assigned
        // volumes (100, 100, 200, 100, 100); turns have no targets yet
        let expected: f64 = crate::geh(100., 100.) + crate::geh(75., 100.)
            + crate::geh(175., 200.) + crate::geh(50., 100.) + crate::geh(125., 100.);
        assert_abs_diff_eq!(net.total_geh, expected, epsilon = 1e-12);

        // a turn with a positive target joins the sum
        net.import_turn_targets(&[TurnTargetRecord {
            a_name: String::from("c"),
            b_name: String::from("d"),
            c_name: String::from("e"),
            name: String::from("cde"),
            target_volume: 60.,
        }]);
        net.calc_network_geh();
        assert_abs_diff_eq!(net.total_geh, expected + crate::geh(60., 100.),
                            epsilon = 1e-12);
    }

    #[test]
    fn test_uncounted_links_join_network_geh() {
        // a link without a count is not exempt: it is measured against the
        // sentinel itself, penalizing any volume assigned over it
        let mut net = Network::new();
        for (name, oo, dd) in &[("a", true, false), ("b", false, false),
                                ("c", false, true)] {
            net.add_node(NodeRecord {
                name: String::from(*name), x: 0., y: 0.,
                is_origin: *oo, is_destination: *dd,
            });
        }
        for (from, to) in &[("a", "b"), ("b", "c")] {
            assert!(net.add_link(LinkRecord {
                from_name: String::from(*from),
                to_name: String::from(*to),
                cost: 1.,
                name: format!("{}-{}", from, to),
                target_volume: NO_TARGET,
                shape_points: vec![],
            }));
        }
        net.init_turns();
        net.init_routes();

        for od in &mut net.od_pairs {
            for route in &mut od.routes {
                route.assigned_volume = 100.;
            }
        }
        net.set_link_and_turn_volume_from_route();
        net.calc_network_geh();

        assert!(net.total_geh > 0.);
        assert_abs_diff_eq!(net.total_geh, 2. * geh(NO_TARGET, 100.),
                            epsilon = 1e-12);
        assert_abs_diff_eq!(net.link(0, 1).geh, geh(NO_TARGET, 100.),
                            epsilon = 1e-12);
    }

    #[test]
    fn test_import_turn_targets_unknown_skipped() {
        let mut net = corridor_net();
        net.import_turn_targets(&[
            TurnTargetRecord {
                a_name: String::from("zzz"),
                b_name: String::from("c"),
                c_name: String::from("d"),
                name: String::from("bad-node"),
                target_volume: 10.,
            },
            // d-e-f is not a turn in this network
            TurnTargetRecord {
                a_name: String::from("d"),
                b_name: String::from("e"),
                c_name: String::from("f"),
                name: String::from("bad-turn"),
                target_volume: 10.,
            },
        ]);
        assert!(net.turns().all(|tt| tt.target_volume == 0.));
    }

    #[test]
    fn test_init_seed_volumes() {
        let mut net = corridor_net();
        let od_mat = crate::OdMatrix::new(
            vec![((0, 4), 20.), ((0, 5), 80.), ((1, 4), 30.), ((1, 5), 45.)]
                .into_iter().collect(),
            vec![0, 1], vec![4, 5],
            vec![String::from("a"), String::from("b")],
            vec![String::from("e"), String::from("f")],
            BTreeMap::new(), BTreeMap::new());

        net.init_seed_volumes(&od_mat);

        assert_abs_diff_eq!(net.od_pairs[0].seed_total_volume, 20.);
        assert_abs_diff_eq!(net.od_pairs[0].routes[0].seed_volume, 20.);
        assert_abs_diff_eq!(net.link(0, 2).seed_volume, 100.);
        assert_abs_diff_eq!(net.link(2, 3).seed_volume, 175.);
        assert_abs_diff_eq!(net.turn((2, 3, 4)).unwrap().seed_volume, 50.);
    }
}
