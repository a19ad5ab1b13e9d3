//! Core types for grouped-topo-sort.
//!
//! Provides the recipe model ([`model::RecipeSet`]) with its preferred/actual path
//! invariant, the per-directory level view ([`level::LevelView`]), the emitted
//! [`plan::Plan`], configuration, and JSON persistence.

pub mod config;
pub mod error;
pub mod level;
pub mod model;
pub mod plan;
pub mod schema;
pub mod storage;
