//! CLI binary for grouped-topo-sort: place build recipes in a directory tree
//! whose per-directory recipe order is free of cycles.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use gts_core::config::GtsConfig;
use gts_core::error::PartitionError;
use gts_core::level::{LevelCache, LevelView};
use gts_core::model::{RecipeRecord, RecipeSet, display_path, parse_path, prune_unavailable};
use gts_core::plan::{LevelEntry, Plan};
use gts_core::{schema, storage};
use gts_partition::{cycles, emitter, partition, resolver};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

#[derive(Parser)]
#[command(
    name = "grouped-topo-sort",
    about = "Partition build recipes into a cycle-free directory tree"
)]
struct Cli {
    /// Project root directory holding .gts/config.toml (defaults to current directory)
    #[arg(short, long, global = true)]
    project: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Resolve recipe placement and write the plan as JSON
    Resolve {
        /// Recipe records (JSON array); reads stdin if omitted
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Where to write the plan; prints to stdout if omitted
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Recipe ids that cannot be built (repeatable)
        #[arg(long)]
        unavailable: Vec<String>,
    },

    /// Validate recipes without resolving them
    Check {
        /// Recipe records (JSON array); reads stdin if omitted
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Print the per-directory emission order of a stored plan
    Levels {
        /// Plan file written by `resolve`
        #[arg(long)]
        plan: PathBuf,
    },

    /// Resolve, then show one directory level and why each edge exists
    Explain {
        /// Recipe records (JSON array); reads stdin if omitted
        #[arg(short, long)]
        input: Option<PathBuf>,

        /// Directory path, e.g. "src/lib" ("." for the root)
        #[arg(long, default_value = ".")]
        path: String,

        /// Print the level as JSON instead of text
        #[arg(long)]
        json: bool,
    },
}

fn get_project_root(cli: &Cli) -> Result<PathBuf> {
    match &cli.project {
        Some(p) => Ok(p.clone()),
        None => std::env::current_dir().context("failed to get current directory"),
    }
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => report(&err),
    }
}

fn run(cli: Cli) -> Result<()> {
    let project_root = get_project_root(&cli)?;

    match cli.command {
        Commands::Resolve {
            input,
            output,
            unavailable,
        } => cmd_resolve(&project_root, input.as_deref(), output.as_deref(), unavailable),
        Commands::Check { input } => cmd_check(&project_root, input.as_deref()),
        Commands::Levels { plan } => cmd_levels(&plan),
        Commands::Explain { input, path, json } => {
            cmd_explain(&project_root, input.as_deref(), &path, json)
        }
    }
}

/// Print an error with a prefix telling input problems apart from bugs.
fn report(err: &anyhow::Error) -> ExitCode {
    let (code, lines) = describe_error(err);
    for line in lines {
        eprintln!("{line}");
    }
    ExitCode::from(code)
}

/// Exit status and message lines for a failed run: 1 for bad input or I/O,
/// 2 for internal defects.
fn describe_error(err: &anyhow::Error) -> (u8, Vec<String>) {
    match err.downcast_ref::<PartitionError>() {
        Some(partition_err) if !partition_err.is_user_error() => (
            2,
            vec![format!(
                "internal error (this is a bug in grouped-topo-sort): {partition_err}"
            )],
        ),
        Some(partition_err) => {
            let mut lines = vec![format!("error: {partition_err}")];
            lines.extend(partition_err.details().into_iter().map(|l| format!("  {l}")));
            (1, lines)
        }
        None => (1, vec![format!("error: {err:#}")]),
    }
}

fn read_records(input: Option<&Path>) -> Result<Vec<RecipeRecord>> {
    match input {
        Some(path) => storage::load_records(path),
        None => schema::records_from_reader(std::io::stdin().lock()),
    }
}

/// Read, prune and validate records the way `resolve` does.
fn load_set(config: &GtsConfig, input: Option<&Path>) -> Result<RecipeSet> {
    let records = read_records(input)?;
    let unavailable: BTreeSet<String> = config.input.unavailable.iter().cloned().collect();
    let (records, _) = prune_unavailable(records, &unavailable);
    Ok(RecipeSet::from_records(records)?)
}

fn cmd_resolve(
    project_root: &Path,
    input: Option<&Path>,
    output: Option<&Path>,
    unavailable: Vec<String>,
) -> Result<()> {
    let mut config = GtsConfig::load(project_root)?;
    config.input.unavailable.extend(unavailable);

    let records = read_records(input)?;
    let plan = partition(records, &config)?;

    match output {
        Some(path) => {
            storage::save_plan(path, &plan)?;
            eprintln!(
                "Resolved {} targets in {} directories ({} hoisted), plan written to {}",
                plan.assignments.len(),
                plan.levels.len(),
                plan.hoists.len(),
                path.display()
            );
        }
        None => println!("{}", schema::plan_to_json(&plan)?),
    }
    Ok(())
}

fn cmd_check(project_root: &Path, input: Option<&Path>) -> Result<()> {
    let config = GtsConfig::load(project_root)?;
    let set = load_set(&config, input)?;
    cycles::check_unbreakable(&set)?;

    println!(
        "OK: {} recipes in {} directories, no dependency cycles between targets",
        set.len(),
        set.directory_paths().len()
    );
    Ok(())
}

fn cmd_levels(plan_path: &Path) -> Result<()> {
    let plan = storage::load_plan(plan_path)?;
    print!("{}", render_levels(&plan));
    Ok(())
}

fn cmd_explain(project_root: &Path, input: Option<&Path>, path: &str, json: bool) -> Result<()> {
    let config = GtsConfig::load(project_root)?;
    let mut set = load_set(&config, input)?;
    let mut cache = LevelCache::new();
    resolver::resolve_tree(&mut set, &mut cache, &config.resolve)?;

    let subgroup = parse_path(path);
    let view = cache.view(&set, &subgroup);
    if view.is_empty() {
        anyhow::bail!("no recipes live under {}", display_path(&subgroup));
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&explain_json(&view)?)?);
    } else {
        print!("{}", render_view(&view)?);
    }
    Ok(())
}

/// Text listing of every directory and its entries, in plan order.
fn render_levels(plan: &Plan) -> String {
    let mut out = String::new();
    for level in &plan.levels {
        out.push_str(&format!("{}:\n", display_path(&level.path)));
        for entry in &level.entries {
            match entry {
                LevelEntry::Subdirectory { name } => out.push_str(&format!("  subdir {name}\n")),
                LevelEntry::Target { id } => out.push_str(&format!("  target {id}\n")),
            }
        }
    }
    out
}

fn render_view(view: &LevelView) -> Result<String> {
    let order = emitter::order_level(view)?;
    let mut out = format!(
        "level {} ({} nodes, {} edges)\n",
        display_path(view.subgroup()),
        order.len(),
        view.edge_count()
    );
    out.push_str("order:\n");
    for node in &order {
        let size = view.members(node).map_or(0, BTreeSet::len);
        if node.is_directory() {
            out.push_str(&format!("  {node} ({size} targets)\n"));
        } else {
            out.push_str(&format!("  {node}\n"));
        }
    }
    if view.edge_count() > 0 {
        out.push_str("edges:\n");
    }
    for (from, successors) in view.edges() {
        for to in successors {
            out.push_str(&format!("  {from} -> {to}\n"));
            for witness in view.witnesses(from, to) {
                out.push_str(&format!(
                    "      {} depends on {}\n",
                    witness.source, witness.dependency
                ));
            }
        }
    }
    Ok(out)
}

fn explain_json(view: &LevelView) -> Result<serde_json::Value> {
    let order = emitter::order_level(view)?;
    let edges: Vec<serde_json::Value> = view
        .edges()
        .iter()
        .flat_map(|(from, successors)| successors.iter().map(move |to| (from, to)))
        .map(|(from, to)| {
            serde_json::json!({
                "from": from,
                "to": to,
                "witnesses": view.witnesses(from, to),
            })
        })
        .collect();

    Ok(serde_json::json!({
        "path": view.subgroup(),
        "order": order,
        "edges": edges,
    }))
}
