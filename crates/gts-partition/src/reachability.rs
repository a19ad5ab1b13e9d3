//! Transitive closure and strongly connected sets over small directed graphs.

use std::collections::{BTreeMap, BTreeSet, VecDeque};

/// For every node, the set of nodes reachable through one or more edges.
///
/// Nodes that only appear as successors get an entry too. A node reaches
/// itself only when it lies on a cycle.
pub fn reachable<N: Ord + Clone>(graph: &BTreeMap<N, BTreeSet<N>>) -> BTreeMap<N, BTreeSet<N>> {
    let mut nodes: BTreeSet<&N> = graph.keys().collect();
    nodes.extend(graph.values().flatten());

    let mut result = BTreeMap::new();
    for start in nodes {
        let mut seen: BTreeSet<N> = BTreeSet::new();
        let mut queue: VecDeque<&N> = VecDeque::new();
        queue.push_back(start);
        while let Some(node) = queue.pop_front() {
            let Some(successors) = graph.get(node) else {
                continue;
            };
            for next in successors {
                if seen.insert(next.clone()) {
                    queue.push_back(next);
                }
            }
        }
        result.insert(start.clone(), seen);
    }
    result
}

/// Strongly connected sets with more than one member, each listed once.
pub fn nontrivial_components<N: Ord + Clone>(graph: &BTreeMap<N, BTreeSet<N>>) -> Vec<BTreeSet<N>> {
    let reach = reachable(graph);
    let mut assigned: BTreeSet<&N> = BTreeSet::new();
    let mut components = Vec::new();

    for (node, reached) in &reach {
        if assigned.contains(node) {
            continue;
        }
        let component: BTreeSet<N> = reached
            .iter()
            .filter(|other| reach.get(*other).is_some_and(|back| back.contains(node)))
            .cloned()
            .collect();
        for member in &component {
            if let Some((key, _)) = reach.get_key_value(member) {
                assigned.insert(key);
            }
        }
        if component.len() > 1 {
            components.push(component);
        }
    }
    components
}
