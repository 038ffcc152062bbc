//! macrobuild CLI - compile, package and test SAS macro-language projects

use std::sync::Arc;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use macrobuild::util::diagnostic::emit;
use macrobuild::util::Shell;
use macrobuild::BuildError;

fn main() {
    let cli = Cli::parse();

    let filter = if cli.verbose {
        EnvFilter::new("macrobuild=debug")
    } else {
        EnvFilter::new("macrobuild=info")
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .without_time()
        .init();

    let shell = Arc::new(Shell::from_flags(
        cli.quiet,
        cli.verbose,
        cli.color,
        cli.message_format.is_json(),
    ));

    if let Err(e) = run(cli, &shell) {
        match e.downcast_ref::<BuildError>() {
            Some(build_error) if !shell.is_json() => {
                emit(&build_error.to_diagnostic(), shell.use_color());
            }
            _ => shell.error(format!("{:#}", e)),
        }
        std::process::exit(1);
    }
}

fn run(cli: Cli, shell: &Arc<Shell>) -> Result<()> {
    let project = cli.project.as_deref();
    match cli.command {
        Commands::Compile(args) => commands::compile::execute(args, project, shell),
        Commands::Build(args) => commands::build::execute(args, project, shell),
        Commands::Test(args) => commands::test::execute(args, project, shell),
        Commands::Clean(args) => commands::clean::execute(args, project, shell),
    }
}
