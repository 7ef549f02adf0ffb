//! Line helpers for text output.

use serde::Serialize;

/// Marker printed in front of a result line.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Mark {
    Pass,
    Warn,
    Fail,
}

impl Mark {
    #[must_use]
    pub const fn from_ok(ok: bool) -> Self {
        if ok { Self::Pass } else { Self::Fail }
    }

    #[must_use]
    pub const fn symbol(self) -> &'static str {
        match self {
            Self::Pass => "✓",
            Self::Warn => "⚠",
            Self::Fail => "✗",
        }
    }
}

#[must_use]
pub fn line(mark: Mark, message: &str) -> String {
    format!("{} {message}", mark.symbol())
}

/// Byte count in megabytes with two decimals.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn megabytes(bytes: u64) -> String {
    format!("{:.2} MB", bytes as f64 / 1024.0 / 1024.0)
}

#[must_use]
pub fn rule() -> String {
    "=".repeat(32)
}
