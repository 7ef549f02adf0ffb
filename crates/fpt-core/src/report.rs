//! Injected reporting capability.
//!
//! Components receive an `Arc<dyn Reporter>` from the run that owns them
//! instead of reaching for a process-wide logger. `scoped` derives a child
//! reporter that tags every message with extra context (`table=tasks`,
//! `notification=n-1`, ...).
//!
//! [`TracingReporter`] forwards to `tracing`; [`MemoryReporter`] keeps entries
//! in memory so tests can assert on warnings.

use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

/// Severity of a reported message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ReportLevel {
    Debug,
    Info,
    Warn,
    Error,
}

impl fmt::Display for ReportLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        })
    }
}

pub trait Reporter: Send + Sync {
    fn log(&self, level: ReportLevel, message: &str);

    /// Child reporter carrying `key=value` in its scope.
    fn scoped(&self, key: &str, value: &str) -> Arc<dyn Reporter>;

    fn debug(&self, message: &str) {
        self.log(ReportLevel::Debug, message);
    }

    fn info(&self, message: &str) {
        self.log(ReportLevel::Info, message);
    }

    fn warn(&self, message: &str) {
        self.log(ReportLevel::Warn, message);
    }

    fn error(&self, message: &str) {
        self.log(ReportLevel::Error, message);
    }
}

fn extend_scope(scope: &str, key: &str, value: &str) -> String {
    if scope.is_empty() {
        format!("{key}={value}")
    } else {
        format!("{scope} {key}={value}")
    }
}

// ---------------------------------------------------------------------------
// TracingReporter
// ---------------------------------------------------------------------------

/// Reporter backed by the `tracing` subscriber installed by the binary.
#[derive(Debug, Clone, Default)]
pub struct TracingReporter {
    scope: String,
}

impl TracingReporter {
    #[must_use]
    pub fn new() -> Arc<dyn Reporter> {
        Arc::new(Self::default())
    }
}

impl Reporter for TracingReporter {
    fn log(&self, level: ReportLevel, message: &str) {
        let scope = self.scope.as_str();
        match level {
            ReportLevel::Debug => tracing::debug!(scope, "{message}"),
            ReportLevel::Info => tracing::info!(scope, "{message}"),
            ReportLevel::Warn => tracing::warn!(scope, "{message}"),
            ReportLevel::Error => tracing::error!(scope, "{message}"),
        }
    }

    fn scoped(&self, key: &str, value: &str) -> Arc<dyn Reporter> {
        Arc::new(Self {
            scope: extend_scope(&self.scope, key, value),
        })
    }
}

// ---------------------------------------------------------------------------
// MemoryReporter
// ---------------------------------------------------------------------------

/// One captured message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportEntry {
    pub level: ReportLevel,
    pub scope: String,
    pub message: String,
}

/// Reporter that records entries; children share the parent's buffer.
#[derive(Debug, Clone, Default)]
pub struct MemoryReporter {
    scope: String,
    entries: Arc<Mutex<Vec<ReportEntry>>>,
}

impl MemoryReporter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn entries(&self) -> Vec<ReportEntry> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Messages recorded at exactly `level`.
    #[must_use]
    pub fn messages(&self, level: ReportLevel) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|entry| entry.level == level)
            .map(|entry| entry.message)
            .collect()
    }
}

impl Reporter for MemoryReporter {
    fn log(&self, level: ReportLevel, message: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(ReportEntry {
                level,
                scope: self.scope.clone(),
                message: message.to_string(),
            });
    }

    fn scoped(&self, key: &str, value: &str) -> Arc<dyn Reporter> {
        Arc::new(Self {
            scope: extend_scope(&self.scope, key, value),
            entries: Arc::clone(&self.entries),
        })
    }
}
