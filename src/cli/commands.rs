//! Command dispatch

use std::io::{self, Write};
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_complete::generate;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::application::ApplicationError;
use crate::cli::args::{Cli, Commands, ConfigCommands, ViewArgs};
use crate::cli::error::{CliError, CliResult};
use crate::cli::output;
use crate::cli::tree_view::TreeDisplay;
use crate::config::{global_config_path, Settings};
use crate::domain::{
    positioned_nodes, visible_links, ChangeAnalysis, HierarchyTree, PositionedNode, VisibleLink,
};
use crate::infrastructure::di::ServiceContainer;
use crate::infrastructure::InfraError;
use crate::util::path::expand_path;

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let Some(command) = &cli.command else {
        return Err(CliError::Usage(
            "no command given, see --help".to_string(),
        ));
    };

    match command {
        Commands::Completion { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            let mut stdout = io::stdout().lock();
            generate(*shell, &mut cmd, name, &mut stdout);
            stdout
                .flush()
                .map_err(|e| InfraError::io("write completions", e))?;
            return Ok(());
        }
        Commands::Config {
            command: ConfigCommands::Template,
        } => {
            output::info(&Settings::template());
            return Ok(());
        }
        Commands::Config {
            command: ConfigCommands::Path,
        } => {
            return match global_config_path() {
                Some(path) => {
                    output::info(&path.display());
                    Ok(())
                }
                None => Err(CliError::Usage(
                    "cannot determine config directory".to_string(),
                )),
            };
        }
        _ => {}
    }

    let config_file = cli.config.as_deref().map(expand_path).transpose()?;
    let settings = Settings::load(config_file.as_deref())?;
    let container = ServiceContainer::new(settings);

    match command {
        Commands::Validate { snapshot, json } => cmd_validate(&container, snapshot, *json),
        Commands::Tree { snapshot, view } => cmd_tree(&container, snapshot, view),
        Commands::Layout { snapshot, view } => cmd_layout(&container, snapshot, view),
        Commands::Diff {
            baseline,
            target,
            json,
            tree,
        } => cmd_diff(&container, baseline, target, *json, *tree),
        Commands::Export { snapshot, out } => cmd_export(&container, snapshot, out),
        Commands::Config {
            command: ConfigCommands::Show,
        } => {
            output::info(&container.settings.to_toml()?);
            Ok(())
        }
        Commands::Config { .. } | Commands::Completion { .. } => Ok(()),
    }
}

fn resolve(path: &Path) -> CliResult<PathBuf> {
    Ok(expand_path(path)?)
}

fn to_json<T: Serialize + ?Sized>(value: &T) -> CliResult<String> {
    serde_json::to_string_pretty(value).map_err(|e| {
        ApplicationError::OperationFailed {
            context: "serialize output".to_string(),
            source: Box::new(e),
        }
        .into()
    })
}

#[instrument(skip(container))]
fn cmd_validate(container: &ServiceContainer, snapshot: &Path, json: bool) -> CliResult<()> {
    let path = resolve(snapshot)?;
    let snapshot = container.snapshots.load(&path)?;

    if json {
        output::info(&to_json(&snapshot.errors)?);
    } else if snapshot.is_valid() {
        output::success(&format!(
            "{}: {} records, no structural errors",
            path.display(),
            snapshot.records.len()
        ));
    } else {
        output::header(&format!("{}:", path.display()));
        for error in &snapshot.errors {
            output::failure(error);
        }
    }

    match snapshot.errors.len() {
        0 => Ok(()),
        n => Err(CliError::StructuralErrors(n)),
    }
}

/// Build the hierarchy and apply the requested expand flags.
fn view_hierarchy(
    container: &ServiceContainer,
    snapshot: &Path,
    view: &ViewArgs,
) -> CliResult<HierarchyTree> {
    let path = resolve(snapshot)?;
    let snapshot = container.snapshots.load(&path)?;
    if !snapshot.is_valid() {
        output::warning(&format!(
            "{} structural error(s), run `orgdelta validate` for details",
            snapshot.errors.len()
        ));
    }

    let mut tree = container.snapshots.hierarchy(&snapshot, view.all)?;
    for id in &view.expand {
        tree.set_expanded(id, true)
            .map_err(ApplicationError::from)?;
    }
    if let Some(id) = &view.reveal {
        tree.reveal(id).map_err(ApplicationError::from)?;
    }
    container.snapshots.relayout(&mut tree)?;
    debug!("visible hierarchy ready: {} nodes", tree.len());
    Ok(tree)
}

#[instrument(skip(container))]
fn cmd_tree(container: &ServiceContainer, snapshot: &Path, view: &ViewArgs) -> CliResult<()> {
    let tree = view_hierarchy(container, snapshot, view)?;
    output::info(&tree.to_termtree());
    Ok(())
}

#[derive(Serialize)]
struct LayoutView {
    nodes: Vec<PositionedNode>,
    links: Vec<VisibleLink>,
}

#[instrument(skip(container))]
fn cmd_layout(container: &ServiceContainer, snapshot: &Path, view: &ViewArgs) -> CliResult<()> {
    let tree = view_hierarchy(container, snapshot, view)?;
    let layout = LayoutView {
        nodes: positioned_nodes(&tree),
        links: visible_links(&tree),
    };
    output::info(&to_json(&layout)?);
    Ok(())
}

#[instrument(skip(container))]
fn cmd_diff(
    container: &ServiceContainer,
    baseline: &Path,
    target: &Path,
    json: bool,
    show_tree: bool,
) -> CliResult<()> {
    let baseline = resolve(baseline)?;
    let target = resolve(target)?;
    let comparison = container.comparison.compare(&baseline, &target)?;

    let Some(analysis) = &comparison.analysis else {
        if json {
            output::info("null");
        } else {
            output::warning("nothing to compare, a snapshot has no employees");
        }
        return Ok(());
    };

    if json {
        output::info(&to_json(analysis)?);
        return Ok(());
    }

    print_analysis(analysis);
    if show_tree {
        if let Some(tree) = &comparison.tree {
            output::info("");
            output::info(&tree.to_termtree());
        }
    }
    Ok(())
}

fn print_analysis(analysis: &ChangeAnalysis) {
    let s = &analysis.summary;

    if !analysis.new.is_empty() {
        output::header(&format!("New ({})", s.new_count));
        for record in &analysis.new {
            output::diff_add(record);
        }
    }
    if !analysis.moved.is_empty() {
        output::header(&format!("Moved ({})", s.moved_count));
        for moved in &analysis.moved {
            let from = moved
                .previous_manager_name
                .clone()
                .unwrap_or_else(|| moved.previous_manager_id.clone());
            output::diff_move(&format!(
                "{}: {} -> {}",
                moved.record, from, moved.record.manager_id
            ));
        }
    }
    if !analysis.exit.is_empty() {
        output::header(&format!("Exit ({})", s.exit_count));
        for record in &analysis.exit {
            output::diff_remove(record);
        }
    }
    if !analysis.cascade_effects.is_empty() {
        output::header(&format!(
            "Cascade ({} moves, {} affected)",
            s.total_cascade, s.total_affected
        ));
        for effect in &analysis.cascade_effects {
            output::diff_move(&format!(
                "{}: {} subordinate(s)",
                effect.moved_employee_id, effect.count
            ));
            output::detail(&effect.affected_subordinate_ids.join(", "));
        }
    }

    if analysis.is_empty() {
        output::success(&format!("no changes, {} unchanged", s.unchanged_count));
    } else {
        output::info(&format!(
            "{} new, {} moved, {} exit, {} unchanged",
            s.new_count, s.moved_count, s.exit_count, s.unchanged_count
        ));
    }
}

#[instrument(skip(container))]
fn cmd_export(container: &ServiceContainer, snapshot: &Path, out: &Path) -> CliResult<()> {
    let path = resolve(snapshot)?;
    let out = resolve(out)?;
    let snapshot = container.snapshots.load(&path)?;
    if !snapshot.is_valid() {
        output::warning(&format!(
            "{} structural error(s), exporting the first record of every employee id",
            snapshot.errors.len()
        ));
    }
    let written = container.snapshots.export(&snapshot, &out)?;
    output::success(&format!("exported {} records to {}", written, out.display()));
    Ok(())
}
