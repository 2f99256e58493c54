use std::process::ExitCode;

use clap::Parser;

use funcfig::cli::Cli;
use funcfig::collaborators::{KnClient, KubectlResources, ProcessBuilder};
use funcfig::commands::{self, Collaborators, Context};
use funcfig::logging::init_logging;
use funcfig::prompt::TerminalPrompter;
use funcfig::store;

fn main() -> ExitCode {
    let cli = Cli::parse();

    let builder = ProcessBuilder;
    let kn = KnClient::default();
    let kubectl = KubectlResources;
    let mut prompter = TerminalPrompter::new();
    let mut stdout = std::io::stdout().lock();

    let mut ctx = Context {
        config_file: store::config_file(),
        env_vars: std::env::vars().collect(),
        prompter: &mut prompter,
        out: &mut stdout,
        tools: Collaborators {
            builder: &builder,
            deployer: &kn,
            describer: &kn,
            lister: &kn,
            resources: &kubectl,
        },
    };

    // Logging must be up before any command runs, so the settings file is
    // consulted for `verbose` ahead of dispatch.
    init_logging(ctx.verbose(cli.verbose));

    match commands::run(cli, &mut ctx) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::debug!(event = "core.command.failed", kind = ?e.kind(), error = %e);
            report(e);
            ExitCode::FAILURE
        }
    }
}

#[cfg(feature = "rich-errors")]
fn report(e: funcfig::FuncError) {
    eprintln!("{:?}", miette::Report::new(e));
}

#[cfg(not(feature = "rich-errors"))]
fn report(e: funcfig::FuncError) {
    eprintln!("Error: {e}");
}
