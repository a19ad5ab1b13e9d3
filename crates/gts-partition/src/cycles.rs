//! Cycle search at two granularities.
//!
//! Grouping cycles: a directory level can have a cycle between its nodes even
//! though the targets inside them are acyclic. Such a cycle always shows up as
//! an alternating sequence of jumps between targets:
//! - a sibling jump moves between two targets folded into the same node;
//! - a graph jump follows dependencies out of a target's node and lands
//!   anywhere reachable from there.
//!
//! Target cycles: a cycle between individual targets survives every possible
//! placement, so it is reported to the user instead of being hoisted away.

use crate::reachability::reachable;
use gts_core::error::{CycleEdge, PartitionError, Result};
use gts_core::level::LevelNode;
use gts_core::model::RecipeSet;
use std::collections::{BTreeMap, BTreeSet, VecDeque};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Jump {
    /// `from` and `to` are folded into the same node.
    Sibling { from: String, to: String },
    /// `to` is reachable from `from` through a target outside `from`'s node.
    Graph { from: String, to: String },
}

impl Jump {
    pub fn from(&self) -> &str {
        match self {
            Self::Sibling { from, .. } | Self::Graph { from, .. } => from,
        }
    }

    pub fn to(&self) -> &str {
        match self {
            Self::Sibling { to, .. } | Self::Graph { to, .. } => to,
        }
    }

    fn is_sibling(&self) -> bool {
        matches!(self, Self::Sibling { .. })
    }
}

/// Find the shortest closed jump sequences through a grouped subgraph.
///
/// `dependencies` is the target-level graph restricted to the targets of
/// interest and `group_of` maps each of them to its level node. Sequences
/// start with a sibling jump, alternate kinds and never revisit a target.
/// They are extended one jump per round; the search stops at the first round
/// that closes any sequence, or when nothing can be extended.
///
/// Each result lists the targets the sequence departs from, rotated to start
/// at the smallest id. Results are sorted and free of duplicates.
pub fn find_group_cycles(
    dependencies: &BTreeMap<String, BTreeSet<String>>,
    group_of: &BTreeMap<String, LevelNode>,
) -> Vec<Vec<String>> {
    let mut groups: BTreeMap<&LevelNode, Vec<&String>> = BTreeMap::new();
    for (id, node) in group_of {
        groups.entry(node).or_default().push(id);
    }
    let siblings = |id: &str| -> Vec<&String> {
        group_of
            .get(id)
            .and_then(|node| groups.get(node))
            .map(|members| members.iter().copied().filter(|m| m.as_str() != id).collect())
            .unwrap_or_default()
    };

    let steps = graph_steps(dependencies, group_of, &groups);

    let mut frontier: Vec<Vec<Jump>> = Vec::new();
    for members in groups.values().filter(|m| m.len() > 1) {
        for from in members {
            for to in members {
                if from != to {
                    frontier.push(vec![Jump::Sibling {
                        from: (*from).clone(),
                        to: (*to).clone(),
                    }]);
                }
            }
        }
    }

    while !frontier.is_empty() {
        let mut closed = Vec::new();
        let mut next = Vec::new();

        for sequence in &frontier {
            let Some(last) = sequence.last() else {
                continue;
            };
            let start = sequence[0].from();
            let extensions: Vec<Jump> = if last.is_sibling() {
                steps
                    .get(last.to())
                    .into_iter()
                    .flatten()
                    .map(|to| Jump::Graph {
                        from: last.to().to_string(),
                        to: to.clone(),
                    })
                    .collect()
            } else {
                siblings(last.to())
                    .into_iter()
                    .map(|to| Jump::Sibling {
                        from: last.to().to_string(),
                        to: to.clone(),
                    })
                    .collect()
            };

            for jump in extensions {
                if jump.to() == start {
                    let mut done = sequence.clone();
                    done.push(jump);
                    closed.push(done);
                } else if !sequence.iter().any(|j| j.from() == jump.to() || j.to() == jump.to()) {
                    let mut longer = sequence.clone();
                    longer.push(jump);
                    next.push(longer);
                }
            }
        }

        if !closed.is_empty() {
            tracing::debug!(
                sequences = closed.len(),
                length = closed[0].len(),
                "closed grouping cycles"
            );
            return deduplicate_cycles(
                closed
                    .iter()
                    .map(|seq| seq.iter().map(|j| j.from().to_string()).collect()),
            );
        }
        frontier = next;
    }

    Vec::new()
}

/// Graph jump targets per target. From `k`, every target `v` outside `k`'s
/// node that `k` reaches, plus everything `v` reaches. Targets alone in their
/// node get none, since no sibling jump can lead to them.
fn graph_steps(
    dependencies: &BTreeMap<String, BTreeSet<String>>,
    group_of: &BTreeMap<String, LevelNode>,
    groups: &BTreeMap<&LevelNode, Vec<&String>>,
) -> BTreeMap<String, BTreeSet<String>> {
    let reach = reachable(dependencies);
    let mut steps: BTreeMap<String, BTreeSet<String>> = BTreeMap::new();

    for (k, reached) in &reach {
        let Some(own) = group_of.get(k) else { continue };
        if groups.get(own).is_none_or(|m| m.len() < 2) {
            continue;
        }
        let entry = steps.entry(k.clone()).or_default();
        for v in reached {
            if group_of.get(v) == Some(own) {
                continue;
            }
            entry.insert(v.clone());
            if let Some(beyond) = reach.get(v) {
                entry.extend(beyond.iter().cloned());
            }
        }
    }
    steps
}

/// Rotate each cycle to start at its smallest id, then drop repeats.
fn deduplicate_cycles(cycles: impl Iterator<Item = Vec<String>>) -> Vec<Vec<String>> {
    let mut seen: BTreeSet<Vec<String>> = BTreeSet::new();
    for mut cycle in cycles {
        if let Some(min_pos) = cycle
            .iter()
            .enumerate()
            .min_by_key(|(_, v)| *v)
            .map(|(i, _)| i)
        {
            cycle.rotate_left(min_pos);
        }
        seen.insert(cycle);
    }
    seen.into_iter().collect()
}

/// The shortest cycle between individual targets, if there is one.
///
/// Among cycles of minimal length the one through the smallest id is chosen,
/// and at every step the smallest successor still on a shortest way back.
pub fn shortest_target_cycle(graph: &BTreeMap<String, BTreeSet<String>>) -> Option<Vec<String>> {
    let mut reverse: BTreeMap<&String, Vec<&String>> = BTreeMap::new();
    for (from, successors) in graph {
        for to in successors {
            reverse.entry(to).or_default().push(from);
        }
    }

    let mut best: Option<(usize, &String, BTreeMap<&String, usize>)> = None;
    for start in graph.keys() {
        let distances = distances_to(start, &reverse);
        let length = graph[start]
            .iter()
            .filter_map(|next| distances.get(next))
            .min()
            .map(|d| d + 1);
        if let Some(length) = length
            && best.as_ref().is_none_or(|(shortest, _, _)| length < *shortest)
        {
            best = Some((length, start, distances));
        }
    }

    let (length, start, distances) = best?;
    let mut cycle = vec![start.clone()];
    let mut current = start;
    for _ in 1..length {
        current = graph[current]
            .iter()
            .filter_map(|next| distances.get(next).map(|d| (*d, next)))
            .min()
            .map(|(_, next)| next)?;
        cycle.push(current.clone());
    }
    Some(cycle)
}

/// Breadth-first distances from every node to `target`, following edges
/// backwards.
fn distances_to<'a>(
    target: &'a String,
    reverse: &BTreeMap<&'a String, Vec<&'a String>>,
) -> BTreeMap<&'a String, usize> {
    let mut distances = BTreeMap::new();
    distances.insert(target, 0);
    let mut queue = VecDeque::from([target]);
    while let Some(node) = queue.pop_front() {
        let d = distances[node];
        for &prev in reverse.get(node).into_iter().flatten() {
            if !distances.contains_key(prev) {
                distances.insert(prev, d + 1);
                queue.push_back(prev);
            }
        }
    }
    distances
}

/// Fail with [`PartitionError::UnbreakableCycle`] if targets depend on each
/// other in a loop. No hoist can fix such a cycle.
pub fn check_unbreakable(set: &RecipeSet) -> Result<()> {
    let graph = set.dependency_graph();
    let Some(cycle) = shortest_target_cycle(&graph) else {
        return Ok(());
    };

    let edges = cycle
        .iter()
        .zip(cycle.iter().cycle().skip(1))
        .map(|(from, to)| CycleEdge {
            from: from.clone(),
            to: to.clone(),
            provenance: set.get(from).and_then(|t| t.provenance.clone()),
        })
        .collect();

    Err(PartitionError::UnbreakableCycle { cycle, edges })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn deps(edges: &[(&str, &[&str])]) -> BTreeMap<String, BTreeSet<String>> {
        edges
            .iter()
            .map(|(k, vs)| ((*k).to_string(), vs.iter().map(|v| (*v).to_string()).collect()))
            .collect()
    }

    fn groups(pairs: &[(&str, &str)]) -> BTreeMap<String, LevelNode> {
        pairs
            .iter()
            .map(|(id, dir)| ((*id).to_string(), LevelNode::Directory((*dir).to_string())))
            .collect()
    }

    fn ids(cycle: &[&str]) -> Vec<String> {
        cycle.iter().map(|s| (*s).to_string()).collect()
    }

    #[test]
    fn test_two_directory_chain() {
        // A = {p1, p3}, B = {p2, p4}; p1 → p2 → p3 → p4.
        let d = deps(&[("p1", &["p2"]), ("p2", &["p3"]), ("p3", &["p4"]), ("p4", &[])]);
        let g = groups(&[("p1", "A"), ("p2", "B"), ("p3", "A"), ("p4", "B")]);

        let cycles = find_group_cycles(&d, &g);
        // p3 →sibling p1 →graph p3 (through p2), and p4 →sibling p2 →graph p4.
        assert_eq!(cycles, vec![ids(&["p1", "p3"]), ids(&["p2", "p4"])]);
    }

    #[test]
    fn test_graph_jump_includes_first_target_outside() {
        // a1 → b1, b2 → a2. Only b1 itself closes the loop back into B.
        let d = deps(&[("a1", &["b1"]), ("b1", &[]), ("b2", &["a2"]), ("a2", &[])]);
        let g = groups(&[("a1", "A"), ("a2", "A"), ("b1", "B"), ("b2", "B")]);

        let cycles = find_group_cycles(&d, &g);
        assert!(!cycles.is_empty());
        for cycle in &cycles {
            assert_eq!(cycle.len(), 4);
        }
        assert!(cycles.contains(&ids(&["a1", "b1", "b2", "a2"])));
    }

    #[test]
    fn test_no_grouping_cycle() {
        let d = deps(&[("a1", &["b1"]), ("a2", &["b2"]), ("b1", &[]), ("b2", &[])]);
        let g = groups(&[("a1", "A"), ("a2", "A"), ("b1", "B"), ("b2", "B")]);
        assert!(find_group_cycles(&d, &g).is_empty());
    }

    #[test]
    fn test_lone_targets_never_start_a_cycle() {
        let d = deps(&[("x", &["y"]), ("y", &[])]);
        let mut g = groups(&[]);
        g.insert("x".into(), LevelNode::Target("x".into()));
        g.insert("y".into(), LevelNode::Target("y".into()));
        assert!(find_group_cycles(&d, &g).is_empty());
    }

    #[test]
    fn test_cycle_through_lone_target() {
        // a1 → t → a2 where t sits directly at the level.
        let d = deps(&[("a1", &["t"]), ("t", &["a2"]), ("a2", &[])]);
        let mut g = groups(&[("a1", "A"), ("a2", "A")]);
        g.insert("t".into(), LevelNode::Target("t".into()));

        let cycles = find_group_cycles(&d, &g);
        assert_eq!(cycles, vec![ids(&["a1", "a2"])]);
        assert!(cycles.iter().flatten().all(|id| id != "t"));
    }

    #[test]
    fn test_deduplicate_rotates_to_smallest() {
        let cycles = vec![ids(&["c", "a", "b"]), ids(&["a", "b", "c"]), ids(&["b", "a"])];
        let result = deduplicate_cycles(cycles.into_iter());
        assert_eq!(result, vec![ids(&["a", "b"]), ids(&["a", "b", "c"])]);
    }

    #[test]
    fn test_shortest_target_cycle_prefers_short_then_small() {
        let g = deps(&[
            ("a", &["b"]),
            ("b", &["c"]),
            ("c", &["a"]),
            ("x", &["y"]),
            ("y", &["x"]),
        ]);
        assert_eq!(shortest_target_cycle(&g), Some(ids(&["x", "y"])));

        let g = deps(&[("c", &["a"]), ("a", &["b"]), ("b", &["c"])]);
        assert_eq!(shortest_target_cycle(&g), Some(ids(&["a", "b", "c"])));
    }

    #[test]
    fn test_shortest_target_cycle_picks_smallest_successor() {
        // Two ways back to a of equal length; the one through b wins.
        let g = deps(&[("a", &["c", "b"]), ("b", &["a"]), ("c", &["a"])]);
        assert_eq!(shortest_target_cycle(&g), Some(ids(&["a", "b"])));
    }

    #[test]
    fn test_acyclic_has_no_target_cycle() {
        let g = deps(&[("a", &["b"]), ("b", &["c"]), ("c", &[])]);
        assert_eq!(shortest_target_cycle(&g), None);
    }
}
