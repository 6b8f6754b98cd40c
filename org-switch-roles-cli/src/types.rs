//! CLI-specific type definitions.
//!
//! This module contains types that are specific to the CLI binary and should
//! not be part of the core library.

use std::fmt::Display;

use clap::ValueEnum;
use org_switch_roles_core::synthesis::TemplateFormat;

/// Exit codes for the CLI application.
///
/// - 0 indicates successful completion
/// - 1 indicates a failure (credentials, AWS API, file I/O, validation)
/// - 3 indicates that no accounts were found to create policies for
///
/// Usage errors keep clap's own exit code 2.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCode {
    /// Operation completed successfully
    Success,

    /// Any failure other than an empty account set
    Error,

    /// The resolved account set was empty; nothing was generated
    NoAccounts,
}

impl ExitCode {
    /// Convert to the integer exit code for process::exit()
    pub fn code(self) -> i32 {
        match self {
            Self::Success => 0,
            Self::Error => 1,
            Self::NoAccounts => 3,
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(exit_code: ExitCode) -> Self {
        exit_code.code()
    }
}

/// Template serialization selected on the command line
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Yaml,
    Json,
}

impl Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Yaml => write!(f, "yaml"),
            Self::Json => write!(f, "json"),
        }
    }
}

impl From<OutputFormat> for TemplateFormat {
    fn from(format: OutputFormat) -> Self {
        match format {
            OutputFormat::Yaml => Self::Yaml,
            OutputFormat::Json => Self::Json,
        }
    }
}
