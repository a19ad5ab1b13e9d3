//! Bottom-up resolution of grouping cycles over the directory tree.

use crate::cycles::{check_unbreakable, find_group_cycles};
use crate::hoist::choose_hoists;
use crate::reachability::nontrivial_components;
use gts_core::config::ResolveConfig;
use gts_core::error::{PartitionError, Result};
use gts_core::level::{LevelCache, LevelNode, LevelView};
use gts_core::model::{RecipeSet, display_path};
use std::collections::{BTreeMap, BTreeSet};

/// Counters from one resolution run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResolveStats {
    pub levels: usize,
    pub passes: usize,
    pub hoists: usize,
}

/// Hoist targets until no directory level has a cycle.
///
/// Children are resolved before their parent. At each level the view is
/// rebuilt after every round of hoists until it has no strongly connected
/// set. Target-level cycles are rejected up front since no hoist breaks them.
pub fn resolve_tree(
    set: &mut RecipeSet,
    cache: &mut LevelCache,
    config: &ResolveConfig,
) -> Result<ResolveStats> {
    check_unbreakable(set)?;

    let mut stats = ResolveStats::default();
    resolve_level(set, cache, config, &[], &mut stats)?;
    tracing::debug!(
        levels = stats.levels,
        passes = stats.passes,
        hoists = stats.hoists,
        "tree resolved"
    );
    Ok(stats)
}

fn resolve_level(
    set: &mut RecipeSet,
    cache: &mut LevelCache,
    config: &ResolveConfig,
    subgroup: &[String],
    stats: &mut ResolveStats,
) -> Result<()> {
    for child in set.child_directories(subgroup) {
        let mut path = subgroup.to_vec();
        path.push(child);
        resolve_level(set, cache, config, &path, stats)?;
    }
    stats.levels += 1;

    // Every pass that finds a cycle hoists at least one target to this
    // level, so a correct run needs at most one pass per member plus one.
    let bound = config
        .max_level_passes
        .unwrap_or_else(|| set.members_under(subgroup).count() + 1);

    for pass in 0.. {
        let view = cache.view(set, subgroup);
        let components = nontrivial_components(view.edges());
        if components.is_empty() {
            return Ok(());
        }
        if pass >= bound {
            return Err(PartitionError::Internal(format!(
                "level {} still has {} cyclic set(s) after {} passes",
                display_path(subgroup),
                components.len(),
                pass
            )));
        }
        stats.passes += 1;
        tracing::debug!(
            level = %display_path(subgroup),
            pass,
            cyclic_sets = components.len(),
            "resolving level"
        );

        let mut moved = 0;
        for component in &components {
            let (dependencies, group_of) = component_subgraph(set, &view, component);
            let cycles = find_group_cycles(&dependencies, &group_of);
            if cycles.is_empty() {
                return Err(PartitionError::Internal(format!(
                    "no grouping cycle found in cyclic set {{{}}} at level {}",
                    describe_nodes(component),
                    display_path(subgroup)
                )));
            }

            let chosen = choose_hoists(&cycles, config);
            tracing::debug!(
                level = %display_path(subgroup),
                cycles = cycles.len(),
                hoists = ?chosen,
                "hoisting"
            );
            for id in &chosen {
                if set.hoist(id, subgroup)? {
                    moved += 1;
                }
            }
        }

        if moved == 0 {
            return Err(PartitionError::Internal(format!(
                "hoisting made no progress at level {}",
                display_path(subgroup)
            )));
        }
        stats.hoists += moved;
    }

    Ok(())
}

/// The target-level graph of the targets folded into `component`, and the
/// node each of them belongs to.
fn component_subgraph(
    set: &RecipeSet,
    view: &LevelView,
    component: &BTreeSet<LevelNode>,
) -> (BTreeMap<String, BTreeSet<String>>, BTreeMap<String, LevelNode>) {
    let group_of: BTreeMap<String, LevelNode> = component
        .iter()
        .filter_map(|node| view.members(node).map(|ids| (node, ids)))
        .flat_map(|(node, ids)| ids.iter().map(move |id| (id.clone(), node.clone())))
        .collect();

    let dependencies = group_of
        .keys()
        .map(|id| {
            let deps = set
                .get(id)
                .map(|t| {
                    t.dependencies
                        .iter()
                        .filter(|d| group_of.contains_key(*d))
                        .cloned()
                        .collect()
                })
                .unwrap_or_default();
            (id.clone(), deps)
        })
        .collect();

    (dependencies, group_of)
}

fn describe_nodes(nodes: &BTreeSet<LevelNode>) -> String {
    nodes
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Fail if any directory level of `set` still has a cycle.
pub fn verify_acyclic(set: &RecipeSet, cache: &mut LevelCache) -> Result<()> {
    for path in set.directory_paths() {
        let view = cache.view(set, &path);
        let components = nontrivial_components(view.edges());
        if let Some(component) = components.first() {
            return Err(PartitionError::Internal(format!(
                "level {} is cyclic after resolution: {{{}}}",
                display_path(&path),
                describe_nodes(component)
            )));
        }
    }
    Ok(())
}
