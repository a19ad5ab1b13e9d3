//! Emission order for every directory of a resolved tree.

use crate::reachability::reachable;
use gts_core::error::{PartitionError, Result};
use gts_core::level::{LevelCache, LevelNode, LevelView};
use gts_core::model::{RecipeSet, display_path};
use gts_core::plan::{LevelEntry, LevelPlan};
use std::collections::BTreeSet;

/// Order the nodes of one level so that each comes after everything it
/// depends on.
///
/// Placement happens in rounds. Each round first places, sorted by name,
/// every directory whose dependencies are all placed, then every target
/// whose dependencies are all placed (including directories placed earlier
/// in the same round). Directories therefore lead whenever dependencies
/// allow it.
pub fn order_level(view: &LevelView) -> Result<Vec<LevelNode>> {
    let reach = reachable(view.edges());
    let mut pending: BTreeSet<&LevelNode> = view.nodes().collect();
    let mut placed: BTreeSet<&LevelNode> = BTreeSet::new();
    let mut order = Vec::with_capacity(pending.len());

    while !pending.is_empty() {
        let mut progress = 0;
        for directories in [true, false] {
            let batch: Vec<&LevelNode> = pending
                .iter()
                .copied()
                .filter(|node| node.is_directory() == directories)
                .filter(|node| {
                    reach
                        .get(*node)
                        .is_none_or(|deps| deps.iter().all(|d| placed.contains(d)))
                })
                .collect();
            for node in batch {
                pending.remove(node);
                placed.insert(node);
                order.push(node.clone());
                progress += 1;
            }
        }
        if progress == 0 {
            return Err(PartitionError::Internal(format!(
                "level {} has a dependency cycle and cannot be ordered",
                display_path(view.subgroup())
            )));
        }
    }
    Ok(order)
}

/// Emission order of every directory, top-down, children sorted.
pub fn emit_levels(set: &RecipeSet, cache: &mut LevelCache) -> Result<Vec<LevelPlan>> {
    set.directory_paths()
        .into_iter()
        .map(|path| {
            let view = cache.view(set, &path);
            let entries = order_level(&view)?
                .into_iter()
                .map(LevelEntry::from)
                .collect();
            Ok(LevelPlan { path, entries })
        })
        .collect()
}
