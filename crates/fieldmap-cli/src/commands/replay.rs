//! Replay command - drive a mapping session from an edit script.

use std::fs;
use std::path::{Path, PathBuf};

use clap::Args;
use console::style;
use serde::Serialize;
use tracing::{debug, info};

use fieldmap_core::document::{InvariantIssue, StructuredDocument};
use fieldmap_core::mapping::FieldMappingTable;
use fieldmap_core::rules::RuleEngine;
use fieldmap_core::store::{StoreAction, TransactionReport, TransactionStore};

use super::{load_config, load_fragments, load_layout};

/// Arguments for the replay command.
#[derive(Args)]
pub struct ReplayArgs {
    /// Fragment file (JSON)
    #[arg(required = true)]
    input: PathBuf,

    /// Edit script: a JSON list of store actions
    #[arg(short, long)]
    script: PathBuf,

    /// Seed the session by extracting with this layout map first
    #[arg(short, long)]
    layout: Option<PathBuf>,

    /// Output file (default: stdout)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

/// Final session state.
#[derive(Serialize)]
struct ReplayOutput<'a> {
    structured_document: &'a StructuredDocument,
    field_mapping_table: &'a FieldMappingTable,
    undo_depth: usize,
    redo_depth: usize,
    actions_applied: usize,
    actions_changed: usize,
    issues: Vec<InvariantIssue>,
}

pub async fn run(args: ReplayArgs, config_path: Option<&str>) -> anyhow::Result<()> {
    let config = load_config(config_path)?;
    let fragments = load_fragments(&args.input)?;
    let actions = load_script(&args.script)?;

    let mut store = TransactionStore::with_config(config.store).with_fragments(&fragments);
    let mut issues = Vec::new();

    if let Some(layout_path) = &args.layout {
        let layout = load_layout(layout_path)?;
        let outcome = RuleEngine::with_config(config.extraction).extract_layout(&layout, &fragments);
        info!(
            "Seeding session with {} extracted fields",
            outcome.extractions.len()
        );
        issues.extend(report_issues(store.apply_extraction(&outcome)));
    }

    let actions_applied = actions.len();
    let mut actions_changed = 0;

    for (i, action) in actions.into_iter().enumerate() {
        let name = action.name();
        let report = store.dispatch(action);
        debug!("Action {} ({}): changed={}", i + 1, name, report.changed);

        if report.changed {
            actions_changed += 1;
        }
        issues.extend(report_issues(report));
    }

    let output = ReplayOutput {
        structured_document: store.structured_document(),
        field_mapping_table: store.field_mapping_table(),
        undo_depth: store.history().undo_depth(),
        redo_depth: store.history().redo_depth(),
        actions_applied,
        actions_changed,
        issues,
    };
    let json = serde_json::to_string_pretty(&output)?;

    if let Some(output_path) = &args.output {
        fs::write(output_path, &json)?;
        println!(
            "{} Session state written to {}",
            style("✓").green(),
            output_path.display()
        );
    } else {
        println!("{}", json);
    }

    Ok(())
}

fn load_script(path: &Path) -> anyhow::Result<Vec<StoreAction>> {
    if !path.exists() {
        anyhow::bail!("Script file not found: {}", path.display());
    }

    let content = fs::read_to_string(path)?;
    serde_json::from_str(&content)
        .map_err(|e| anyhow::anyhow!("Invalid script {}: {}", path.display(), e))
}

/// Invariant issues of one step, with purged keys reported as orphans.
fn report_issues(report: TransactionReport) -> Vec<InvariantIssue> {
    report
        .purged_keys
        .into_iter()
        .map(|key| InvariantIssue::OrphanField { key })
        .chain(report.issues)
        .collect()
}
