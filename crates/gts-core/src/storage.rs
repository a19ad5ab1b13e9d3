//! Read recipe input and read/write plan files.

use crate::model::RecipeRecord;
use crate::plan::Plan;
use crate::schema;
use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

const GTS_DIR: &str = ".gts";
const CONFIG_FILE: &str = "config.toml";

/// Get the path to the per-project settings directory.
pub fn gts_dir(project_root: &Path) -> PathBuf {
    project_root.join(GTS_DIR)
}

/// Get the path to the project's config file.
pub fn config_file(project_root: &Path) -> PathBuf {
    gts_dir(project_root).join(CONFIG_FILE)
}

/// Load recipe records from a JSON file.
pub fn load_records(path: &Path) -> Result<Vec<RecipeRecord>> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read recipes from {}", path.display()))?;
    schema::records_from_json(&json).with_context(|| format!("in {}", path.display()))
}

/// Load a plan from disk.
pub fn load_plan(path: &Path) -> Result<Plan> {
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read plan from {}", path.display()))?;
    schema::plan_from_json(&json)
}

/// Save a plan to disk, creating parent directories if needed.
pub fn save_plan(path: &Path, plan: &Plan) -> Result<()> {
    if let Some(dir) = path.parent()
        && !dir.as_os_str().is_empty()
    {
        fs::create_dir_all(dir)
            .with_context(|| format!("failed to create directory {}", dir.display()))?;
    }

    let mut json = schema::plan_to_json(plan)?;
    json.push('\n');
    fs::write(path, json).with_context(|| format!("failed to write plan to {}", path.display()))?;

    Ok(())
}
