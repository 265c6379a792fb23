//! Human-readable status lines.
//!
//! Status lines are for people watching the terminal. They are not logs and
//! carry no machine-readable meaning.

use colored::Colorize;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    /// Section headers, one per run and one per dependency.
    Header,
    /// A step that is starting.
    Progress,
    /// The thing a step acts on: a path, a branch.
    Target,
    Warning,
}

/// Decorates `text` for a terminal according to `severity`.
pub fn paint(severity: Severity, text: &str) -> String {
    match severity {
        Severity::Header => text.bright_magenta().to_string(),
        Severity::Progress => text.bright_blue().to_string(),
        Severity::Target => text.bright_green().to_string(),
        Severity::Warning => text.bright_yellow().to_string(),
    }
}

/// One line of output made of differently styled spans.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusLine {
    spans: Vec<(Severity, String)>,
}

impl StatusLine {
    pub fn new(severity: Severity, text: impl Into<String>) -> Self {
        StatusLine::default().then(severity, text)
    }

    pub fn then(mut self, severity: Severity, text: impl Into<String>) -> Self {
        self.spans.push((severity, text.into()));
        self
    }

    pub fn spans(&self) -> &[(Severity, String)] {
        &self.spans
    }

    pub fn painted(&self) -> String {
        self.join(|severity, text| paint(severity, text))
    }

    pub fn plain(&self) -> String {
        self.join(|_, text| text.to_owned())
    }

    fn join(&self, render: impl Fn(Severity, &str) -> String) -> String {
        self.spans
            .iter()
            .map(|(severity, text)| render(*severity, text))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

pub trait StatusSink {
    fn emit(&self, line: StatusLine);
}

/// Prints colored status lines to stdout.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalSink;

impl StatusSink for TerminalSink {
    fn emit(&self, line: StatusLine) {
        println!("{}", line.painted());
    }
}
