//! Partitioning of build recipes into a cycle-free directory tree.
//!
//! [`partition`] validates the records, hoists targets out of their preferred
//! directories until no directory level has a dependency cycle, and returns
//! a [`Plan`] with every target's directory and each directory's emission
//! order.

pub mod cycles;
pub mod emitter;
pub mod hoist;
pub mod reachability;
pub mod resolver;

use gts_core::config::{GtsConfig, ResolveConfig};
use gts_core::error::Result;
use gts_core::level::LevelCache;
use gts_core::model::{RecipeRecord, RecipeSet, prune_unavailable};
use gts_core::plan::{Hoist, Plan};
use gts_core::schema::CURRENT_VERSION;
use std::collections::BTreeSet;

/// Run the whole pipeline on raw records.
///
/// Records listed in `config.input.unavailable`, and everything depending on
/// them, are dropped before validation.
pub fn partition(records: Vec<RecipeRecord>, config: &GtsConfig) -> Result<Plan> {
    let records = if config.input.unavailable.is_empty() {
        records
    } else {
        let unavailable: BTreeSet<String> = config.input.unavailable.iter().cloned().collect();
        let (kept, removed) = prune_unavailable(records, &unavailable);
        if !removed.is_empty() {
            tracing::warn!(count = removed.len(), "skipped unavailable recipes");
        }
        kept
    };

    let mut set = RecipeSet::from_records(records)?;
    partition_set(&mut set, &config.resolve)
}

/// Resolve an already validated set in place and build its plan.
pub fn partition_set(set: &mut RecipeSet, config: &ResolveConfig) -> Result<Plan> {
    let mut cache = LevelCache::new();
    let stats = resolver::resolve_tree(set, &mut cache, config)?;
    resolver::verify_acyclic(set, &mut cache)?;
    let levels = emitter::emit_levels(set, &mut cache)?;

    let hoists: Vec<Hoist> = set
        .hoisted()
        .map(|t| Hoist {
            target: t.id.clone(),
            preferred_path: t.preferred_path.clone(),
            actual_path: t.actual_path().to_vec(),
        })
        .collect();
    log_hoist_summary(&hoists);
    tracing::debug!(
        targets = set.len(),
        levels = stats.levels,
        passes = stats.passes,
        cache_hits = cache.hits(),
        cache_misses = cache.misses(),
        "partition complete"
    );

    Ok(Plan {
        version: CURRENT_VERSION.to_string(),
        assignments: set.assignments(),
        hoists,
        levels,
    })
}

fn log_hoist_summary(hoists: &[Hoist]) {
    if hoists.is_empty() {
        return;
    }
    for hoist in hoists {
        tracing::info!("{}", hoist.describe());
    }
    tracing::info!(
        "{} target(s) placed outside their preferred directory",
        hoists.len()
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use gts_core::error::PartitionError;

    #[test]
    fn test_partition_reports_hoists_sorted() {
        let records = vec![
            RecipeRecord::new("p4", &[], &["g", "B"]),
            RecipeRecord::new("p3", &["p4"], &["g", "A"]),
            RecipeRecord::new("p2", &["p3"], &["g", "B"]),
            RecipeRecord::new("p1", &["p2"], &["g", "A"]),
        ];
        let plan = partition(records, &GtsConfig::default()).unwrap();

        let hoisted: Vec<&str> = plan.hoists.iter().map(|h| h.target.as_str()).collect();
        assert_eq!(hoisted, vec!["p1", "p2"]);
        assert_eq!(plan.version, CURRENT_VERSION);
        assert_eq!(plan.assignments.len(), 4);
    }

    #[test]
    fn test_partition_prunes_unavailable() {
        let mut config = GtsConfig::default();
        config.input.unavailable = vec!["libvpx".into()];
        let records = vec![
            RecipeRecord::new("codec", &["libvpx"], &["codecs"]),
            RecipeRecord::new("ui", &[], &["apps"]),
        ];
        let plan = partition(records.clone(), &config).unwrap();
        assert_eq!(plan.assignments.keys().collect::<Vec<_>>(), vec!["ui"]);

        let err = partition(records, &GtsConfig::default()).unwrap_err();
        assert!(matches!(err, PartitionError::DanglingDependency { .. }));
    }

    #[test]
    fn test_empty_input() {
        let plan = partition(Vec::new(), &GtsConfig::default()).unwrap();
        assert!(plan.assignments.is_empty());
        assert_eq!(plan.levels.len(), 1);
    }
}
