//! Error types for the dashboard.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for dashboard operations.
pub type DashboardResult<T> = Result<T, DashboardError>;

/// Errors that stop the dashboard from producing views.
///
/// Empty selections and undefined aggregates are not errors; they come back
/// as empty tables and `None` values.
#[derive(Debug, Error)]
pub enum DashboardError {
    /// The roll table could not be read or parsed.
    #[error("data unavailable at {}: {reason}", path.display())]
    DataUnavailable { path: PathBuf, reason: String },

    /// The configuration file could not be read or parsed.
    #[error("invalid config {}: {reason}", path.display())]
    Config { path: PathBuf, reason: String },

    /// Writing the exported view bundle failed.
    #[error("could not export views to {}", path.display())]
    Export {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DashboardError {
    /// Wrap a loader failure, keeping the full context chain in the message.
    pub fn data_unavailable(path: impl Into<PathBuf>, err: &anyhow::Error) -> Self {
        DashboardError::DataUnavailable {
            path: path.into(),
            reason: format!("{err:#}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Context;

    #[test]
    fn data_unavailable_keeps_context_chain() {
        let err = Err::<(), _>(anyhow::anyhow!("no such file"))
            .context("opening CSV")
            .unwrap_err();
        let wrapped = DashboardError::data_unavailable("rolls.csv", &err);
        let msg = wrapped.to_string();
        assert!(msg.contains("rolls.csv"));
        assert!(msg.contains("opening CSV: no such file"));
    }
}
