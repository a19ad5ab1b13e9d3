//! Error type shared by the model, the resolver and the emitter.

use serde::Serialize;
use thiserror::Error;

pub type Result<T, E = PartitionError> = std::result::Result<T, E>;

/// One dependency edge of a reported cycle, with the provenance of the
/// recipe that declared it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CycleEdge {
    pub from: String,
    pub to: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provenance: Option<String>,
}

#[derive(Debug, Error)]
pub enum PartitionError {
    #[error("multiple recipes provide target {id}{}", provenance_suffix(.provenance))]
    DuplicateTarget {
        id: String,
        provenance: Option<String>,
    },

    #[error("target {id} depends on itself{}", provenance_suffix(.provenance))]
    SelfDependency {
        id: String,
        provenance: Option<String>,
    },

    #[error(
        "target {referenced_by} depends on {id}, which no recipe provides{}",
        provenance_suffix(.provenance)
    )]
    DanglingDependency {
        id: String,
        referenced_by: String,
        provenance: Option<String>,
    },

    #[error("dependency cycle that no hoist can break: {}", format_cycle(.cycle))]
    UnbreakableCycle {
        cycle: Vec<String>,
        edges: Vec<CycleEdge>,
    },

    #[error("internal partitioner error: {0}")]
    Internal(String),
}

impl PartitionError {
    /// True for errors caused by the input recipes rather than by a defect
    /// in the partitioner.
    pub fn is_user_error(&self) -> bool {
        !matches!(self, Self::Internal(_))
    }

    /// Extra lines worth showing under the one-line message.
    pub fn details(&self) -> Vec<String> {
        match self {
            Self::UnbreakableCycle { edges, .. } => edges
                .iter()
                .map(|edge| match &edge.provenance {
                    Some(p) => format!("{} depends on {} (declared at {})", edge.from, edge.to, p),
                    None => format!("{} depends on {}", edge.from, edge.to),
                })
                .collect(),
            _ => Vec::new(),
        }
    }
}

fn provenance_suffix(provenance: &Option<String>) -> String {
    provenance
        .as_deref()
        .map_or_else(String::new, |p| format!(" (declared at {p})"))
}

/// Format a cycle as "a → b → c → a".
pub fn format_cycle(cycle: &[String]) -> String {
    match cycle.first() {
        Some(first) => {
            let mut parts: Vec<&str> = cycle.iter().map(String::as_str).collect();
            parts.push(first);
            parts.join(" → ")
        }
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_cycle_closes_loop() {
        let cycle = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        assert_eq!(format_cycle(&cycle), "a → b → c → a");
        assert_eq!(format_cycle(&[]), "");
    }

    #[test]
    fn test_display_includes_provenance() {
        let err = PartitionError::DuplicateTarget {
            id: "libfoo".into(),
            provenance: Some("src/meson.build:12".into()),
        };
        assert_eq!(
            err.to_string(),
            "multiple recipes provide target libfoo (declared at src/meson.build:12)"
        );

        let err = PartitionError::SelfDependency {
            id: "x".into(),
            provenance: None,
        };
        assert_eq!(err.to_string(), "target x depends on itself");
    }

    #[test]
    fn test_user_error_classification() {
        assert!(
            PartitionError::UnbreakableCycle {
                cycle: vec!["a".into()],
                edges: vec![],
            }
            .is_user_error()
        );
        assert!(!PartitionError::Internal("boom".into()).is_user_error());
    }

    #[test]
    fn test_cycle_details_list_edges() {
        let err = PartitionError::UnbreakableCycle {
            cycle: vec!["a".into(), "b".into()],
            edges: vec![
                CycleEdge {
                    from: "a".into(),
                    to: "b".into(),
                    provenance: Some("a.build:3".into()),
                },
                CycleEdge {
                    from: "b".into(),
                    to: "a".into(),
                    provenance: None,
                },
            ],
        };
        assert_eq!(
            err.details(),
            vec![
                "a depends on b (declared at a.build:3)".to_string(),
                "b depends on a".to_string(),
            ]
        );
    }
}
