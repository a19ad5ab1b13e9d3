//! Recipe model: input records, the validated target set, and directory paths.
//!
//! A target's directory membership is never stored. It is always derived from
//! `actual_path`, which only [`RecipeSet::hoist`] may change.

use crate::error::{PartitionError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

/// A directory path as path segments, shallow to deep. The root is empty.
pub type DirPath = Vec<String>;

/// True when `prefix` is a prefix of `path`. Equal paths count.
pub fn path_starts_with(path: &[String], prefix: &[String]) -> bool {
    path.len() >= prefix.len() && path[..prefix.len()] == *prefix
}

/// Render a path as "a/b/c", or "." for the root.
pub fn display_path(path: &[String]) -> String {
    if path.is_empty() {
        ".".to_string()
    } else {
        path.join("/")
    }
}

/// Parse "a/b/c" into segments. "", "." and "/" are the root.
pub fn parse_path(text: &str) -> DirPath {
    text.split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .map(String::from)
        .collect()
}

/// One recipe as produced by the recipe collector.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeRecord {
    #[serde(alias = "provides")]
    pub id: String,
    #[serde(default, alias = "ddeps")]
    pub dependencies: BTreeSet<String>,
    #[serde(alias = "ideal_path")]
    pub preferred_path: DirPath,
    /// Where the recipe was declared, for error messages.
    #[serde(default, alias = "debuginfo", skip_serializing_if = "Option::is_none")]
    pub provenance: Option<String>,
}

impl RecipeRecord {
    pub fn new(id: impl Into<String>, dependencies: &[&str], preferred_path: &[&str]) -> Self {
        Self {
            id: id.into(),
            dependencies: dependencies.iter().map(|d| (*d).to_string()).collect(),
            preferred_path: preferred_path.iter().map(|s| (*s).to_string()).collect(),
            provenance: None,
        }
    }

    pub fn with_provenance(mut self, provenance: impl Into<String>) -> Self {
        self.provenance = Some(provenance.into());
        self
    }
}

/// A validated target. `actual_path` is always a prefix of `preferred_path`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub id: String,
    pub dependencies: BTreeSet<String>,
    pub preferred_path: DirPath,
    pub provenance: Option<String>,
    actual_path: DirPath,
}

impl Target {
    pub fn actual_path(&self) -> &[String] {
        &self.actual_path
    }

    pub fn is_hoisted(&self) -> bool {
        self.actual_path.len() < self.preferred_path.len()
    }
}

/// The full set of targets, keyed by id.
///
/// `generation` increases on every effective hoist, so anything derived from
/// actual paths can be cached per `(subgroup, generation)`.
#[derive(Debug, Clone, Default)]
pub struct RecipeSet {
    targets: BTreeMap<String, Target>,
    generation: u64,
}

impl RecipeSet {
    /// Validate records and build the set. Every `actual_path` starts equal
    /// to its `preferred_path`.
    ///
    /// Rejects duplicate ids, self-dependencies and dependencies on ids no
    /// record provides. Checks run in that order so the first problem
    /// reported is stable for a given input.
    pub fn from_records(records: Vec<RecipeRecord>) -> Result<Self> {
        let mut targets = BTreeMap::new();
        for record in records {
            if targets.contains_key(&record.id) {
                return Err(PartitionError::DuplicateTarget {
                    id: record.id,
                    provenance: record.provenance,
                });
            }
            let target = Target {
                id: record.id.clone(),
                dependencies: record.dependencies,
                actual_path: record.preferred_path.clone(),
                preferred_path: record.preferred_path,
                provenance: record.provenance,
            };
            targets.insert(record.id, target);
        }

        for target in targets.values() {
            if target.dependencies.contains(&target.id) {
                return Err(PartitionError::SelfDependency {
                    id: target.id.clone(),
                    provenance: target.provenance.clone(),
                });
            }
        }

        for target in targets.values() {
            if let Some(missing) = target
                .dependencies
                .iter()
                .find(|dep| !targets.contains_key(*dep))
            {
                return Err(PartitionError::DanglingDependency {
                    id: missing.clone(),
                    referenced_by: target.id.clone(),
                    provenance: target.provenance.clone(),
                });
            }
        }

        Ok(Self {
            targets,
            generation: 0,
        })
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn get(&self, id: &str) -> Option<&Target> {
        self.targets.get(id)
    }

    /// All targets in id order.
    pub fn targets(&self) -> impl Iterator<Item = &Target> {
        self.targets.values()
    }

    /// Targets whose actual path lies at or below `subgroup`.
    pub fn members_under<'a>(&'a self, subgroup: &'a [String]) -> impl Iterator<Item = &'a Target> {
        self.targets
            .values()
            .filter(move |t| path_starts_with(&t.actual_path, subgroup))
    }

    /// Names of the immediate child directories of `subgroup` that contain
    /// at least one target.
    pub fn child_directories(&self, subgroup: &[String]) -> BTreeSet<String> {
        self.members_under(subgroup)
            .filter_map(|t| t.actual_path.get(subgroup.len()).cloned())
            .collect()
    }

    /// Every directory path of the resolved tree: the root plus every prefix
    /// of every actual path, in top-down pre-order with children sorted.
    pub fn directory_paths(&self) -> Vec<DirPath> {
        let mut paths: BTreeSet<DirPath> = BTreeSet::new();
        paths.insert(Vec::new());
        for target in self.targets.values() {
            for depth in 1..=target.actual_path.len() {
                paths.insert(target.actual_path[..depth].to_vec());
            }
        }
        // Lexicographic order on segment vectors is exactly pre-order.
        paths.into_iter().collect()
    }

    /// id → direct dependencies, for the whole target-level graph.
    pub fn dependency_graph(&self) -> BTreeMap<String, BTreeSet<String>> {
        self.targets
            .values()
            .map(|t| (t.id.clone(), t.dependencies.clone()))
            .collect()
    }

    /// Move `id` up to `subgroup`. `subgroup` must be a prefix of the
    /// target's current actual path. Returns whether anything changed.
    pub fn hoist(&mut self, id: &str, subgroup: &[String]) -> Result<bool> {
        let target = self
            .targets
            .get_mut(id)
            .ok_or_else(|| PartitionError::Internal(format!("hoist of unknown target {id}")))?;

        if !path_starts_with(&target.actual_path, subgroup) {
            return Err(PartitionError::Internal(format!(
                "cannot hoist {id} from {} to {}: not an ancestor",
                display_path(&target.actual_path),
                display_path(subgroup)
            )));
        }
        if target.actual_path.len() == subgroup.len() {
            return Ok(false);
        }

        target.actual_path = subgroup.to_vec();
        self.generation += 1;
        Ok(true)
    }

    /// id → actual path for every target.
    pub fn assignments(&self) -> BTreeMap<String, DirPath> {
        self.targets
            .values()
            .map(|t| (t.id.clone(), t.actual_path.clone()))
            .collect()
    }

    /// Targets placed above their preferred directory, in id order.
    pub fn hoisted(&self) -> impl Iterator<Item = &Target> {
        self.targets.values().filter(|t| t.is_hoisted())
    }
}

/// Drop every record listed in `unavailable`, then every record depending
/// (transitively) on a dropped one.
///
/// Returns the kept records in input order and the sorted removed ids.
pub fn prune_unavailable(
    records: Vec<RecipeRecord>,
    unavailable: &BTreeSet<String>,
) -> (Vec<RecipeRecord>, Vec<String>) {
    let mut removed: BTreeSet<String> = BTreeSet::new();
    let mut kept = records;

    loop {
        let gone = |id: &String| unavailable.contains(id) || removed.contains(id);
        let (drop, keep): (Vec<RecipeRecord>, Vec<RecipeRecord>) = kept
            .into_iter()
            .partition(|r| gone(&r.id) || r.dependencies.iter().any(gone));
        kept = keep;
        if drop.is_empty() {
            break;
        }
        for record in drop {
            if unavailable.contains(&record.id) {
                warn!(id = %record.id, "recipe is unavailable, skipping");
            } else {
                let culprit = record
                    .dependencies
                    .iter()
                    .find(|d| unavailable.contains(*d) || removed.contains(*d))
                    .cloned()
                    .unwrap_or_default();
                warn!(id = %record.id, dependency = %culprit, "skipping recipe with unavailable dependency");
            }
            removed.insert(record.id);
        }
    }

    (kept, removed.into_iter().collect())
}
