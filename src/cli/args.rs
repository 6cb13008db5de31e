//! CLI argument definitions using clap

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum, ValueHint};

use crate::application::services::EntityKind;
use crate::domain::EntityId;

/// Sector hierarchy rollup and shrinkage-weighted ranking for service dashboards
#[derive(Parser, Debug)]
#[command(name = "sectorank")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase log verbosity (-d info, -dd debug, -ddd trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub debug: u8,

    /// Directory holding a local .sectorank.toml (default: cwd)
    #[arg(short = 'C', long, global = true, value_hint = ValueHint::DirPath)]
    pub project_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Where the rows come from and whose rows they are.
#[derive(Args, Debug, Clone)]
pub struct SourceArgs {
    /// Tenant whose data is used
    #[arg(short, long, env = "SECTORANK_TENANT")]
    pub tenant: String,

    /// Snapshot file (default: `snapshot` from config)
    #[arg(short, long, value_hint = ValueHint::FilePath)]
    pub snapshot: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Print the flattened sector hierarchy with consolidated service counts
    Hierarchy {
        #[command(flatten)]
        source: SourceArgs,
        /// Single-line JSON
        #[arg(long)]
        compact: bool,
    },

    /// Show the sector forest as a tree
    Tree {
        #[command(flatten)]
        source: SourceArgs,
    },

    /// Rank sectors or services by weighted score
    Rank {
        /// What to rank
        #[arg(value_enum)]
        kind: RankKind,
        #[command(flatten)]
        source: SourceArgs,
        /// Only rank these ids (comma-separated); the tenant-wide mean is kept
        #[arg(long, value_delimiter = ',')]
        only: Vec<EntityId>,
        /// Keep at most this many rows
        #[arg(short, long)]
        limit: Option<usize>,
        /// Single-line JSON
        #[arg(long)]
        compact: bool,
    },

    /// Manage settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Generate shell completions
    Completion {
        /// Shell type
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum RankKind {
    Sectors,
    Services,
}

impl From<RankKind> for EntityKind {
    fn from(kind: RankKind) -> Self {
        match kind {
            RankKind::Sectors => EntityKind::Sector,
            RankKind::Services => EntityKind::Service,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show effective configuration
    Show,
    /// Show config file locations
    Path,
    /// Print a commented config template
    Template,
}
