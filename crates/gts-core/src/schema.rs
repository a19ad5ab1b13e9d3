//! JSON encoding of recipe input and plans, with plan version checks.

use crate::model::RecipeRecord;
use crate::plan::Plan;
use anyhow::{Context, Result};
use std::io::Read;

pub const CURRENT_VERSION: &str = "1.0.0";

/// Validate a plan's schema version.
pub fn validate_version(plan: &Plan) -> Result<()> {
    if plan.version != CURRENT_VERSION {
        anyhow::bail!(
            "plan version mismatch: expected {}, found {}",
            CURRENT_VERSION,
            plan.version
        );
    }
    Ok(())
}

/// Serialize a plan to a pretty-printed JSON string.
pub fn plan_to_json(plan: &Plan) -> Result<String> {
    serde_json::to_string_pretty(plan).context("failed to serialize plan to JSON")
}

/// Deserialize a plan from a JSON string.
pub fn plan_from_json(json: &str) -> Result<Plan> {
    let plan: Plan = serde_json::from_str(json).context("failed to deserialize plan from JSON")?;
    validate_version(&plan)?;
    Ok(plan)
}

/// Parse a JSON array of recipe records.
pub fn records_from_json(json: &str) -> Result<Vec<RecipeRecord>> {
    serde_json::from_str(json).context("failed to parse recipe records")
}

/// Parse a JSON array of recipe records from a reader.
pub fn records_from_reader(reader: impl Read) -> Result<Vec<RecipeRecord>> {
    serde_json::from_reader(reader).context("failed to parse recipe records")
}
