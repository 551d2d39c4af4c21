use std::process::ExitCode;

use anyhow::{Context, Result};
use xcode_helper_cli::{parse_args, ConsoleReporter, Invocation, LinkSession, Reporter};
use xcode_helper_core::{init_tracing, LinkConfig, MappingRegistry};

fn main() -> ExitCode {
    let invocation = match parse_args(std::env::args_os()) {
        Ok(invocation) => invocation,
        Err(err) => err.exit(),
    };

    // Initialize logging
    init_tracing(invocation.verbose);

    match run(invocation) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            ConsoleReporter::default().error(&format!("{err:#}"));
            ExitCode::FAILURE
        }
    }
}

fn run(invocation: Invocation) -> Result<()> {
    let config = LinkConfig {
        verbose: invocation.verbose,
        ..Default::default()
    };
    tracing::debug!(data_dir = %config.data_dir.display(), "using data directory");

    let registry = MappingRegistry::load(&config).context("Failed to load framework mappings")?;
    let session = LinkSession::new(config, registry);
    session.handle_command(invocation.command)?;
    Ok(())
}
