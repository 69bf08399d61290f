use std::path::PathBuf;

use thiserror::Error;

/// Errors that abort a whole seeding run.
///
/// Anything that goes wrong inside a single row's transaction is not one of
/// these: row failures are rolled back, logged and collected in the report.
#[derive(Debug, Error)]
pub enum SeedError {
    #[error("category `{0}` has no configured id")]
    UnknownCategory(String),

    #[error("no data source configured for category `{0}`")]
    UnknownSource(String),

    #[error("{}: missing required `{column}` column", .path.display())]
    MissingColumn { path: PathBuf, column: &'static str },

    #[error("failed to read {}", .path.display())]
    Input {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("database connection failed: {0:#}")]
    Connection(anyhow::Error),

    #[error("invalid configuration: {0}")]
    Config(String),
}
