//! xcode-helper command line
//!
//! Enable, disable, inspect and repair framework linking between an Xcode
//! framework project and the app that consumes it. The orchestration lives in
//! [`link::LinkSession`]; the binary only parses arguments and reports errors.

pub mod link;

// Re-export commonly used types for convenience
pub use link::{
    build_cli, parse_args, ConsoleReporter, Invocation, LinkCommand, LinkSession, MemoryReporter,
    Reporter,
};
