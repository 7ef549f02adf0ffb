use std::path::PathBuf;

use clap::ValueEnum;

/// Shared output mode across all commands.
#[derive(Clone, Copy, Debug, Eq, PartialEq, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable lines with ✓/⚠/✗ markers.
    Text,
    /// Pretty-printed JSON document on stdout.
    Json,
}

/// Global flags available before or after subcommands.
#[derive(Clone, Debug)]
pub struct GlobalFlags {
    pub format: OutputFormat,
    pub quiet: bool,
    pub verbose: bool,
    pub project: Option<PathBuf>,
}

impl GlobalFlags {
    /// Directory where `.env` and `.fpt/config.toml` are looked up.
    #[must_use]
    pub fn project_root(&self) -> PathBuf {
        self.project.clone().unwrap_or_else(|| PathBuf::from("."))
    }

    /// Default log filter when `FPT_LOG` is unset. `--quiet` wins over
    /// `--verbose`.
    #[must_use]
    pub const fn log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else if self.verbose {
            "debug"
        } else {
            "info"
        }
    }

    /// Progress bars only make sense for a person watching text output.
    #[must_use]
    pub const fn show_progress(&self) -> bool {
        !self.quiet && matches!(self.format, OutputFormat::Text)
    }
}
