use std::cmp::Ordering;
use std::collections::hash_map::Entry::{Occupied, Vacant};
use std::collections::{BinaryHeap, HashMap, HashSet};

use super::network::Network;


/// Distances and predecessor links from a single-source shortest path search.
pub struct ShortestPaths {
    pub dist: HashMap<usize, f64>,
    pub prev: HashMap<usize, usize>,
}

/// Dijkstra's algorithm over the network adjacency lists, from `source` to
/// every reachable node. Link costs must be non-negative.
///
/// The frontier is a binary heap of (distance, node key) pairs, so ties in
/// distance are broken by the smallest node key; node keys are assigned in
/// insertion order, which makes the tie-break deterministic. A node is
/// relaxed only by a strictly shorter distance, so the first shortest
/// predecessor found is the one kept.
pub fn shortest_paths(net: &Network, source: usize) -> ShortestPaths {
    let mut dist = HashMap::new();
    let mut prev = HashMap::new();
    let mut visited = HashSet::new();

    let mut visit_next = BinaryHeap::new();
    dist.insert(source, 0.);
    visit_next.push(MinScored((0., source)));

    while let Some(MinScored((node_dist, node))) = visit_next.pop() {
        if !visited.insert(node) {
            continue;
        }
        for (next, link) in &net.node(node).neighbors {
            if visited.contains(next) {
                continue;
            }
            let alt = node_dist + link.cost;
            match dist.entry(*next) {
                Occupied(ent) => {
                    if alt < *ent.get() {
                        *ent.into_mut() = alt;
                        prev.insert(*next, node);
                        visit_next.push(MinScored((alt, *next)));
                    }
                }
                Vacant(ent) => {
                    ent.insert(alt);
                    prev.insert(*next, node);
                    visit_next.push(MinScored((alt, *next)));
                }
            }
        }
    }

    ShortestPaths{dist, prev}
}

/// Walk the predecessor links to extract the node sequence from `origin` to
/// `destination`. Returns an empty sequence if the destination is
/// unreachable, and a single-node sequence if origin and destination
/// coincide.
pub fn node_seq(paths: &ShortestPaths, origin: usize, destination: usize) -> Vec<usize> {
    if origin == destination {
        return vec![origin];
    }
    if !paths.prev.contains_key(&destination) {
        return vec![];
    }

    let mut seq = vec![];
    let mut uu = destination;
    while let Some(pp) = paths.prev.get(&uu) {
        seq.push(uu);
        uu = *pp;
    }
    if uu == origin {
        seq.push(origin);
    }
    seq.reverse();

    return seq;
}


/// Wrapper to order heap entries by ascending score, with NaN ordered last.
#[derive(Copy, Clone, Debug)]
pub struct MinScored<K>(pub K);

impl<K: PartialOrd> PartialEq for MinScored<K> {
    #[inline]
    fn eq(&self, other: &MinScored<K>) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl<K: PartialOrd> Eq for MinScored<K> {}

impl<K: PartialOrd> PartialOrd for MinScored<K> {
    #[inline]
    fn partial_cmp(&self, other: &MinScored<K>) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<K: PartialOrd> Ord for MinScored<K> {
    #[inline]
    fn cmp(&self, other: &MinScored<K>) -> Ordering {
        let a = &self.0;
        let b = &other.0;
        if a == b {
            Ordering::Equal
        } else if a < b {
            Ordering::Greater
        } else if a > b {
            Ordering::Less
        } else if a.ne(a) && b.ne(b) {
            // these are the NaN cases
            Ordering::Equal
        } else if a.ne(a) {
            // Order NaN less, so that it is last in the MinScored order
            Ordering::Less
        } else {
            Ordering::Greater
        }
    }
}
