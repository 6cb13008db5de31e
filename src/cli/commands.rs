//! Command dispatch

use std::collections::{HashMap, HashSet};
use std::io;
use std::path::{Path, PathBuf};

use clap::CommandFactory;
use clap_complete::generate;
use serde::Serialize;
use tracing::{debug, instrument};

use crate::application::services::{EntityKind, RankingFilter};
use crate::cli::args::{Cli, Commands, ConfigCommands, SourceArgs};
use crate::cli::output;
use crate::cli::tree_view::{service_count_label, ToTermTree};
use crate::cli::{CliError, CliResult};
use crate::config::{global_config_path, local_config_path, Settings};
use crate::domain::TenantId;
use crate::infrastructure::{InfraError, ServiceContainer};

pub fn execute_command(cli: &Cli) -> CliResult<()> {
    let Some(command) = &cli.command else {
        return Ok(());
    };

    if let Commands::Completion { shell } = command {
        let mut cmd = Cli::command();
        let name = cmd.get_name().to_string();
        generate(*shell, &mut cmd, name, &mut io::stdout());
        return Ok(());
    }

    let local_dir = project_dir(cli)?;
    let settings = Settings::load(Some(local_dir.as_path()))?;
    debug!(?settings, "settings loaded");

    match command {
        Commands::Hierarchy { source, compact } => {
            let container = ServiceContainer::new(settings);
            cmd_hierarchy(&container, source, *compact)
        }
        Commands::Tree { source } => {
            let container = ServiceContainer::new(settings);
            cmd_tree(&container, source)
        }
        Commands::Rank {
            kind,
            source,
            only,
            limit,
            compact,
        } => {
            let container = ServiceContainer::new(settings);
            let filter = RankingFilter {
                only: (!only.is_empty()).then(|| only.iter().copied().collect::<HashSet<_>>()),
                limit: *limit,
            };
            cmd_rank(&container, source, (*kind).into(), &filter, *compact)
        }
        Commands::Config { command } => cmd_config(command, &settings, &local_dir),
        Commands::Completion { .. } => Ok(()),
    }
}

fn project_dir(cli: &Cli) -> CliResult<PathBuf> {
    match &cli.project_dir {
        Some(dir) if !dir.is_dir() => Err(CliError::InvalidArgs(format!(
            "not a directory: {}",
            dir.display()
        ))),
        Some(dir) => Ok(dir.clone()),
        None => std::env::current_dir()
            .map_err(|e| CliError::Infra(InfraError::io("resolve current directory", e))),
    }
}

/// Snapshot path from the command line, else from settings.
fn snapshot_path(source: &SourceArgs, settings: &Settings) -> CliResult<PathBuf> {
    source
        .snapshot
        .clone()
        .or_else(|| settings.snapshot.clone())
        .ok_or_else(|| {
            CliError::Usage(
                "no snapshot given: pass --snapshot or set `snapshot` in the config".to_string(),
            )
        })
}

fn print_json<T: Serialize + ?Sized>(value: &T, compact: bool) -> CliResult<()> {
    let rendered = if compact {
        serde_json::to_string(value)?
    } else {
        serde_json::to_string_pretty(value)?
    };
    output::info(&rendered);
    Ok(())
}

#[instrument(skip(container))]
fn cmd_hierarchy(container: &ServiceContainer, source: &SourceArgs, compact: bool) -> CliResult<()> {
    let snapshot = snapshot_path(source, &container.settings)?;
    let tenant = TenantId::new(source.tenant.as_str());
    let rows = container.hierarchy_listing(&snapshot, &tenant)?;
    if rows.is_empty() {
        output::warning(&format!("no active sectors for tenant {tenant}"));
    }
    print_json(rows.as_slice(), compact)
}

#[instrument(skip(container))]
fn cmd_tree(container: &ServiceContainer, source: &SourceArgs) -> CliResult<()> {
    let snapshot = snapshot_path(source, &container.settings)?;
    let tenant = TenantId::new(source.tenant.as_str());
    let arenas = container.hierarchy_forest(&snapshot, &tenant)?;
    let rows = container.hierarchy_listing(&snapshot, &tenant)?;
    let by_id: HashMap<_, _> = rows.iter().map(|row| (row.sector_id, row)).collect();
    let label = service_count_label(&by_id);

    output::header(&format!("Found {} trees for tenant {}:", arenas.len(), tenant));
    for arena in &arenas {
        output::info(&arena.to_term_tree(&label));
    }
    Ok(())
}

#[instrument(skip(container))]
fn cmd_rank(
    container: &ServiceContainer,
    source: &SourceArgs,
    kind: EntityKind,
    filter: &RankingFilter,
    compact: bool,
) -> CliResult<()> {
    let snapshot = snapshot_path(source, &container.settings)?;
    let tenant = TenantId::new(source.tenant.as_str());
    let rows = container.ranking(&snapshot, &tenant, kind, filter)?;
    if rows.is_empty() {
        output::warning(&format!("no rated {kind} entries for tenant {tenant}"));
    }
    print_json(&rows, compact)
}

fn cmd_config(command: &ConfigCommands, settings: &Settings, local_dir: &Path) -> CliResult<()> {
    match command {
        ConfigCommands::Show => {
            output::info(&settings.to_toml()?);
        }
        ConfigCommands::Path => {
            match global_config_path() {
                Some(path) => output::action("global", &path.display()),
                None => output::action("global", &"<no config directory>"),
            }
            output::action("local", &local_config_path(local_dir).display());
            output::detail(&"SECTORANK_* environment variables override both");
        }
        ConfigCommands::Template => {
            output::info(&Settings::template());
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[test]
    fn given_only_list_when_parsing_rank_then_splits_on_commas() {
        let cli = Cli::parse_from([
            "sectorank", "rank", "services", "--tenant", "t1", "--only", "3,5,8",
        ]);
        match cli.command {
            Some(Commands::Rank { only, .. }) => assert_eq!(only, vec![3, 5, 8]),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn given_no_snapshot_anywhere_when_resolving_then_usage_error() {
        let source = SourceArgs {
            tenant: "t1".to_string(),
            snapshot: None,
        };
        let result = snapshot_path(&source, &Settings::default());
        assert!(matches!(result, Err(CliError::Usage(_))));
    }
}
