use std::collections::HashMap;
use std::fmt::Debug;

use crate::network::{LinkRecord, Network, NodeRecord};


/// Checks that the contents of two hashmaps are the same.
pub fn compare_hashmaps<KK, VV>(query_map: &HashMap<KK, VV>, true_map: &HashMap<KK, VV>)
    where KK: Debug + Eq + std::hash::Hash,
    VV: Debug + PartialEq,
{
    assert_eq!(query_map.len(), true_map.len());

    for (true_key, true_val) in true_map {
        match query_map.get(true_key) {
            Some(val) => assert_eq!(val, true_val),
            None => assert!(false, "Key {:?} missing!", true_key),
        }
    }
}

/// The six-node test network: two origins feeding a shared corridor that
/// splits to two destinations. Every link carries a target count.
///
///   0 --        -- 4
///       \      /
///        2 -- 3
///       /      \
///   1 --        -- 5
pub fn corridor_net() -> Network {
    let mut net = Network::new();
    let specs = [
        ("a", true, false), ("b", true, false), ("c", false, false),
        ("d", false, false), ("e", false, true), ("f", false, true),
    ];
    for (name, is_origin, is_destination) in &specs {
        net.add_node(NodeRecord {
            name: String::from(*name),
            x: 0., y: 0.,
            is_origin: *is_origin,
            is_destination: *is_destination,
        });
    }
    let links = [
        ("a", "c", 100.), ("b", "c", 75.), ("c", "d", 175.),
        ("d", "e", 50.), ("d", "f", 125.),
    ];
    for (from, to, target) in &links {
        assert!(net.add_link(LinkRecord {
            from_name: String::from(*from),
            to_name: String::from(*to),
            cost: 1.,
            name: format!("{}-{}", from, to),
            target_volume: *target,
            shape_points: vec![],
        }));
    }
    net.init_turns();
    net.init_routes();
    return net;
}
