//! The graph of one directory level.
//!
//! At `subgroup`, a target whose actual path equals `subgroup` is its own node.
//! A target deeper in the tree folds into the node of the child directory it
//! lives under. Edges keep only dependencies that cross between nodes.

use crate::model::{DirPath, RecipeSet};
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fmt;
use std::rc::Rc;

/// A node of a level view. Directories order before targets.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(tag = "kind", content = "name", rename_all = "snake_case")]
pub enum LevelNode {
    Directory(String),
    Target(String),
}

impl LevelNode {
    /// The node `id` folds into at depth `depth`, given its actual path.
    /// The path must be at least `depth` segments long.
    pub fn fold(actual_path: &[String], id: &str, depth: usize) -> Self {
        match actual_path.get(depth) {
            Some(segment) => Self::Directory(segment.clone()),
            None => Self::Target(id.to_string()),
        }
    }

    pub fn is_directory(&self) -> bool {
        matches!(self, Self::Directory(_))
    }
}

impl fmt::Display for LevelNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Directory(name) => write!(f, "{name}/"),
            Self::Target(id) => write!(f, "{id}"),
        }
    }
}

/// A target-level dependency that produced a level edge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Witness {
    pub source: String,
    pub dependency: String,
}

/// Level graph at one directory path, built from actual paths at a given
/// generation of the recipe set.
#[derive(Debug, Clone)]
pub struct LevelView {
    subgroup: DirPath,
    generation: u64,
    /// Node → target ids folded into it.
    members: BTreeMap<LevelNode, BTreeSet<String>>,
    /// Target id → its node.
    group_of: BTreeMap<String, LevelNode>,
    /// Node → successor nodes. Every node is a key.
    edges: BTreeMap<LevelNode, BTreeSet<LevelNode>>,
    witnesses: BTreeMap<(LevelNode, LevelNode), Vec<Witness>>,
}

impl LevelView {
    pub fn build(set: &RecipeSet, subgroup: &[String]) -> Self {
        let depth = subgroup.len();
        let mut members: BTreeMap<LevelNode, BTreeSet<String>> = BTreeMap::new();
        let mut group_of = BTreeMap::new();

        for target in set.members_under(subgroup) {
            let node = LevelNode::fold(target.actual_path(), &target.id, depth);
            members
                .entry(node.clone())
                .or_default()
                .insert(target.id.clone());
            group_of.insert(target.id.clone(), node);
        }

        let mut edges: BTreeMap<LevelNode, BTreeSet<LevelNode>> = members
            .keys()
            .map(|node| (node.clone(), BTreeSet::new()))
            .collect();
        let mut witnesses: BTreeMap<(LevelNode, LevelNode), Vec<Witness>> = BTreeMap::new();

        for (id, from) in &group_of {
            let Some(target) = set.get(id) else { continue };
            for dep in &target.dependencies {
                // Dependencies outside this subtree are not part of the level.
                let Some(to) = group_of.get(dep) else { continue };
                if to == from {
                    continue;
                }
                edges.entry(from.clone()).or_default().insert(to.clone());
                witnesses
                    .entry((from.clone(), to.clone()))
                    .or_default()
                    .push(Witness {
                        source: id.clone(),
                        dependency: dep.clone(),
                    });
            }
        }

        Self {
            subgroup: subgroup.to_vec(),
            generation: set.generation(),
            members,
            group_of,
            edges,
            witnesses,
        }
    }

    pub fn subgroup(&self) -> &[String] {
        &self.subgroup
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn nodes(&self) -> impl Iterator<Item = &LevelNode> {
        self.members.keys()
    }

    pub fn edges(&self) -> &BTreeMap<LevelNode, BTreeSet<LevelNode>> {
        &self.edges
    }

    pub fn edge_count(&self) -> usize {
        self.edges.values().map(BTreeSet::len).sum()
    }

    /// Target ids folded into `node`.
    pub fn members(&self, node: &LevelNode) -> Option<&BTreeSet<String>> {
        self.members.get(node)
    }

    /// The node target `id` folds into, if it lives in this subtree.
    pub fn group_of(&self, id: &str) -> Option<&LevelNode> {
        self.group_of.get(id)
    }

    /// The `(source, dependency)` target pairs behind the edge `from → to`.
    pub fn witnesses(&self, from: &LevelNode, to: &LevelNode) -> &[Witness] {
        self.witnesses
            .get(&(from.clone(), to.clone()))
            .map_or(&[], Vec::as_slice)
    }
}

/// Memoized level views keyed by `(subgroup, generation)`.
///
/// A cache belongs to one [`RecipeSet`]. Views from older generations can
/// never be asked for again and are dropped whenever a newer one is built.
#[derive(Debug, Default)]
pub struct LevelCache {
    views: HashMap<(DirPath, u64), Rc<LevelView>>,
    hits: usize,
    misses: usize,
}

impl LevelCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The level view of `set` at `subgroup`, building it on a miss.
    pub fn view(&mut self, set: &RecipeSet, subgroup: &[String]) -> Rc<LevelView> {
        let generation = set.generation();
        let key = (subgroup.to_vec(), generation);
        if let Some(view) = self.views.get(&key) {
            self.hits += 1;
            return Rc::clone(view);
        }

        self.misses += 1;
        self.views.retain(|(_, g), _| *g == generation);
        let view = Rc::new(LevelView::build(set, subgroup));
        self.views.insert(key, Rc::clone(&view));
        view
    }

    pub fn hits(&self) -> usize {
        self.hits
    }

    pub fn misses(&self) -> usize {
        self.misses
    }

    pub fn len(&self) -> usize {
        self.views.len()
    }

    pub fn is_empty(&self) -> bool {
        self.views.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::RecipeRecord;

    fn dir(name: &str) -> LevelNode {
        LevelNode::Directory(name.to_string())
    }

    fn target(id: &str) -> LevelNode {
        LevelNode::Target(id.to_string())
    }

    fn sample_set() -> RecipeSet {
        RecipeSet::from_records(vec![
            RecipeRecord::new("p1", &["p2"], &["g", "A"]),
            RecipeRecord::new("p2", &["p3"], &["g", "B"]),
            RecipeRecord::new("p3", &[], &["g", "A"]),
            RecipeRecord::new("top", &["p1"], &["g"]),
            RecipeRecord::new("outside", &[], &["h"]),
            RecipeRecord::new("uses_outside", &["outside"], &["g", "B"]),
        ])
        .unwrap()
    }

    #[test]
    fn test_fold_and_order() {
        let path = vec!["a".to_string(), "b".to_string()];
        assert_eq!(LevelNode::fold(&path, "x", 1), dir("b"));
        assert_eq!(LevelNode::fold(&path, "x", 2), target("x"));
        assert!(dir("z") < target("a"));
        assert_eq!(dir("sub").to_string(), "sub/");
        assert_eq!(target("x").to_string(), "x");
    }

    #[test]
    fn test_level_nodes_and_edges() {
        let set = sample_set();
        let view = LevelView::build(&set, &["g".to_string()]);

        let nodes: Vec<&LevelNode> = view.nodes().collect();
        assert_eq!(nodes, vec![&dir("A"), &dir("B"), &target("top")]);

        assert!(view.edges()[&dir("A")].contains(&dir("B")));
        assert!(view.edges()[&dir("B")].contains(&dir("A")));
        assert!(view.edges()[&target("top")].contains(&dir("A")));
        // uses_outside → outside leaves the subtree and is dropped.
        assert_eq!(view.edge_count(), 3);

        assert_eq!(view.group_of("p3"), Some(&dir("A")));
        assert_eq!(view.group_of("outside"), None);
        assert_eq!(view.members(&dir("B")).unwrap().len(), 2);
    }

    #[test]
    fn test_intra_group_edges_hidden() {
        let set = RecipeSet::from_records(vec![
            RecipeRecord::new("a", &["b"], &["d", "x"]),
            RecipeRecord::new("b", &[], &["d", "y"]),
        ])
        .unwrap();

        let root = LevelView::build(&set, &[]);
        assert_eq!(root.edge_count(), 0);
        assert_eq!(root.nodes().count(), 1);

        let d = LevelView::build(&set, &["d".to_string()]);
        assert_eq!(d.edge_count(), 1);
    }

    #[test]
    fn test_witnesses_explain_edges() {
        let set = sample_set();
        let view = LevelView::build(&set, &["g".to_string()]);

        let ab = view.witnesses(&dir("A"), &dir("B"));
        assert_eq!(
            ab,
            &[Witness {
                source: "p1".into(),
                dependency: "p2".into()
            }]
        );
        assert!(view.witnesses(&dir("A"), &target("top")).is_empty());
    }

    #[test]
    fn test_cache_hits_until_hoist() {
        let mut set = sample_set();
        let g = vec!["g".to_string()];
        let mut cache = LevelCache::new();

        let first = cache.view(&set, &g);
        let again = cache.view(&set, &g);
        assert!(Rc::ptr_eq(&first, &again));
        assert_eq!((cache.hits(), cache.misses()), (1, 1));

        set.hoist("p1", &g).unwrap();
        let fresh = cache.view(&set, &g);
        assert!(!Rc::ptr_eq(&first, &fresh));
        assert_eq!(fresh.generation(), 1);
        assert_eq!(fresh.group_of("p1"), Some(&target("p1")));
        // The stale generation was evicted.
        assert_eq!(cache.len(), 1);
    }
}
