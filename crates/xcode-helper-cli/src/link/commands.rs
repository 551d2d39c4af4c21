//! Command-line definition and parsing for the link commands

use std::{ffi::OsString, path::PathBuf};

use clap::{Arg, ArgAction, ArgMatches, Command};

/// Available link commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LinkCommand {
    /// Link a framework's sources into its consumer
    Enable {
        mapping: String,
        path: Option<PathBuf>,
        dry_run: bool,
    },
    /// Restore the packaged configuration
    Disable {
        mapping: String,
        path: Option<PathBuf>,
    },
    /// Show whether a mapping is linked
    Status { path: Option<PathBuf> },
    /// Recover a damaged target project
    Fix {
        mapping: Option<String>,
        path: Option<PathBuf>,
    },
}

/// A parsed command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub command: LinkCommand,
    pub verbose: bool,
}

fn path_arg() -> Arg {
    Arg::new("path")
        .short('p')
        .long("path")
        .value_name("DIR")
        .value_parser(clap::value_parser!(PathBuf))
        .help("Path to the project directory (defaults to the current directory)")
}

/// Build the `xcode-helper` command tree
pub fn build_cli() -> Command {
    Command::new("xcode-helper")
        .version(xcode_helper_core::VERSION)
        .about("Toggle Xcode projects between prebuilt xcframeworks and linked framework sources")
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .global(true)
                .help("Verbose output")
                .action(ArgAction::SetTrue),
        )
        .subcommand(
            Command::new("enable")
                .about("Enable local framework linking for debugging")
                .arg(
                    Arg::new("mapping")
                        .required(true)
                        .help("Framework mapping to enable (e.g. 'subscription')"),
                )
                .arg(path_arg())
                .arg(
                    Arg::new("dry-run")
                        .short('d')
                        .long("dry-run")
                        .help("Show changes without applying them")
                        .action(ArgAction::SetTrue),
                ),
        )
        .subcommand(
            Command::new("disable")
                .about("Disable local framework linking and restore the original configuration")
                .arg(
                    Arg::new("mapping")
                        .required(true)
                        .help("Framework mapping to disable (e.g. 'subscription')"),
                )
                .arg(path_arg()),
        )
        .subcommand(
            Command::new("status")
                .about("Show current framework linking status")
                .arg(path_arg()),
        )
        .subcommand(
            Command::new("fix")
                .about("Recover a corrupted target project from its backup or by regenerating it")
                .arg(Arg::new("mapping").help(
                    "Framework mapping to fix (defaults to the saved state or the only .xcodeproj here)",
                ))
                .arg(path_arg()),
        )
}

fn command_from_matches(matches: &ArgMatches) -> LinkCommand {
    let path = |m: &ArgMatches| m.get_one::<PathBuf>("path").cloned();
    let mapping = |m: &ArgMatches| m.get_one::<String>("mapping").cloned();

    match matches.subcommand() {
        Some(("enable", sub)) => LinkCommand::Enable {
            mapping: mapping(sub).unwrap_or_default(),
            path: path(sub),
            dry_run: sub.get_flag("dry-run"),
        },
        Some(("disable", sub)) => LinkCommand::Disable {
            mapping: mapping(sub).unwrap_or_default(),
            path: path(sub),
        },
        Some(("fix", sub)) => LinkCommand::Fix {
            mapping: mapping(sub),
            path: path(sub),
        },
        Some(("status", sub)) => LinkCommand::Status { path: path(sub) },
        // No subcommand shows the status of the current directory
        _ => LinkCommand::Status { path: None },
    }
}

/// Parse an argument list, program name first
pub fn parse_args<I, T>(args: I) -> Result<Invocation, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let matches = build_cli().try_get_matches_from(args)?;
    Ok(Invocation {
        command: command_from_matches(&matches),
        verbose: matches.get_flag("verbose"),
    })
}
