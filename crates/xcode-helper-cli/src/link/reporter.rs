//! Console output for the link commands
//!
//! Commands talk to a [`Reporter`] rather than stdout so the same flows can
//! print coloured lines in a terminal or be captured in tests.

use std::{
    io::{self, IsTerminal},
    sync::{Arc, Mutex, PoisonError},
};

use crossterm::style::Stylize;

/// Trait for user-facing command output
pub trait Reporter: Send + Sync {
    /// Plain progress line
    fn info(&self, message: &str);

    /// Completed step
    fn success(&self, message: &str);

    /// Something was skipped or fell back
    fn warning(&self, message: &str);

    /// Fatal failure
    fn error(&self, message: &str);

    /// Detail only shown with `--verbose`
    fn verbose(&self, message: &str);
}

/// Terminal output, coloured only when the stream is a terminal
pub struct ConsoleReporter {
    verbose: bool,
    color_stdout: bool,
    color_stderr: bool,
}

impl ConsoleReporter {
    pub fn new(verbose: bool) -> Self {
        Self::with_color(
            verbose,
            io::stdout().is_terminal(),
            io::stderr().is_terminal(),
        )
    }

    /// Reporter with explicit colour decisions per stream
    pub fn with_color(verbose: bool, color_stdout: bool, color_stderr: bool) -> Self {
        Self {
            verbose,
            color_stdout,
            color_stderr,
        }
    }

    /// Text of one line as it is printed
    pub fn render(&self, level: ReportLevel, message: &str) -> String {
        let (text, color) = match level {
            ReportLevel::Info | ReportLevel::Success => (message.to_string(), self.color_stdout),
            ReportLevel::Warning => (format!("Warning: {message}"), self.color_stdout),
            ReportLevel::Error => (format!("Error: {message}"), self.color_stderr),
            ReportLevel::Verbose => (format!("[verbose] {message}"), self.color_stdout),
        };
        if !color {
            return text;
        }
        match level {
            ReportLevel::Info => text,
            ReportLevel::Success => text.green().to_string(),
            ReportLevel::Warning => text.yellow().to_string(),
            ReportLevel::Error => text.red().to_string(),
            ReportLevel::Verbose => text.dark_grey().to_string(),
        }
    }
}

impl Default for ConsoleReporter {
    fn default() -> Self {
        Self::new(false)
    }
}

impl Reporter for ConsoleReporter {
    fn info(&self, message: &str) {
        println!("{}", self.render(ReportLevel::Info, message));
    }

    fn success(&self, message: &str) {
        println!("{}", self.render(ReportLevel::Success, message));
    }

    fn warning(&self, message: &str) {
        println!("{}", self.render(ReportLevel::Warning, message));
    }

    fn error(&self, message: &str) {
        eprintln!("{}", self.render(ReportLevel::Error, message));
    }

    fn verbose(&self, message: &str) {
        if self.verbose {
            println!("{}", self.render(ReportLevel::Verbose, message));
        }
    }
}

/// Severity of a recorded line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportLevel {
    Info,
    Success,
    Warning,
    Error,
    Verbose,
}

/// Reporter that keeps every line in memory. Clones share the same buffer.
#[derive(Debug, Clone, Default)]
pub struct MemoryReporter {
    lines: Arc<Mutex<Vec<(ReportLevel, String)>>>,
}

impl MemoryReporter {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, level: ReportLevel, message: &str) {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((level, message.to_string()));
    }

    /// Recorded lines in order
    pub fn lines(&self) -> Vec<(ReportLevel, String)> {
        self.lines
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// All messages joined by newlines
    pub fn text(&self) -> String {
        self.lines()
            .into_iter()
            .map(|(_, message)| message)
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|(_, message)| message.contains(needle))
    }
}

impl Reporter for MemoryReporter {
    fn info(&self, message: &str) {
        self.push(ReportLevel::Info, message);
    }

    fn success(&self, message: &str) {
        self.push(ReportLevel::Success, message);
    }

    fn warning(&self, message: &str) {
        self.push(ReportLevel::Warning, message);
    }

    fn error(&self, message: &str) {
        self.push(ReportLevel::Error, message);
    }

    fn verbose(&self, message: &str) {
        self.push(ReportLevel::Verbose, message);
    }
}
