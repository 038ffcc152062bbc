//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

use macrobuild::util::shell::ColorChoice;

/// macrobuild - compile, package and test SAS macro-language projects
#[derive(Parser)]
#[command(name = "macrobuild")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Print errors only
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Coloring: auto, always, never
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Output format for messages
    #[arg(long, global = true, value_enum, default_value_t = MessageFormat::Human)]
    pub message_format: MessageFormat,

    /// Path to macrobuild.toml (default: search upward from the current directory)
    #[arg(long, global = true, env = "MACROBUILD_PROJECT")]
    pub project: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MessageFormat {
    Human,
    Json,
}

impl MessageFormat {
    pub fn is_json(&self) -> bool {
        *self == MessageFormat::Json
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compile sources into the build folder
    Compile(CompileArgs),

    /// Compile, then package the build folder into a deployment script
    Build(BuildArgs),

    /// Compile, then report test results and coverage
    Test(TestArgs),

    /// Remove the build folder
    Clean(CleanArgs),
}

/// Options shared by every command that resolves a target.
#[derive(Args, Debug, Clone, Default)]
pub struct TargetArgs {
    /// Target to use (default: the project's default target)
    #[arg(short, long)]
    pub target: Option<String>,

    /// Override the build folder
    #[arg(long)]
    pub build_folder: Option<PathBuf>,

    /// Override the deployment location
    #[arg(long)]
    pub app_loc: Option<String>,
}

#[derive(Args)]
pub struct CompileArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Compile even when the build folder is current
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Args)]
pub struct BuildArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Recompile even when the build folder is current
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ReportFormat {
    Table,
    Json,
}

#[derive(Args)]
pub struct TestArgs {
    #[command(flatten)]
    pub target: TargetArgs,

    /// Results document of a remote test run
    #[arg(long)]
    pub results: Option<PathBuf>,

    /// Folder the reports are written to (default: <project>/sasjsresults)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Console output format
    #[arg(long, value_enum, default_value_t = ReportFormat::Table)]
    pub format: ReportFormat,

    /// Recompile even when the build folder is current
    #[arg(short, long)]
    pub force: bool,
}

#[derive(Args)]
pub struct CleanArgs {
    #[command(flatten)]
    pub target: TargetArgs,
}
