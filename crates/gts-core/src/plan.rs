//! The partitioner's output: where every target goes, and the emission order
//! of every directory.

use crate::level::LevelNode;
use crate::model::{DirPath, display_path};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One entry of a directory's emission order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LevelEntry {
    Target { id: String },
    Subdirectory { name: String },
}

impl From<LevelNode> for LevelEntry {
    fn from(node: LevelNode) -> Self {
        match node {
            LevelNode::Directory(name) => Self::Subdirectory { name },
            LevelNode::Target(id) => Self::Target { id },
        }
    }
}

/// The ordered entries of one directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LevelPlan {
    pub path: DirPath,
    pub entries: Vec<LevelEntry>,
}

/// A target placed above its preferred directory.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Hoist {
    pub target: String,
    pub preferred_path: DirPath,
    pub actual_path: DirPath,
}

impl Hoist {
    pub fn describe(&self) -> String {
        format!(
            "{}: preferred {}, placed in {}",
            self.target,
            display_path(&self.preferred_path),
            display_path(&self.actual_path)
        )
    }
}

/// Complete result of a partitioning run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Plan {
    pub version: String,
    /// id → actual path.
    pub assignments: BTreeMap<String, DirPath>,
    /// Sorted by target id.
    #[serde(default)]
    pub hoists: Vec<Hoist>,
    /// Top-down pre-order, children sorted.
    pub levels: Vec<LevelPlan>,
}

impl Plan {
    pub fn level(&self, path: &[String]) -> Option<&LevelPlan> {
        self.levels.iter().find(|l| l.path == path)
    }

    pub fn actual_path(&self, id: &str) -> Option<&[String]> {
        self.assignments.get(id).map(Vec::as_slice)
    }
}
