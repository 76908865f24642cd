use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableError {
    #[error("cannot open {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("{path} has no header row")]
    EmptyHeader { path: PathBuf },

    #[error("{path} is missing required column {column:?} (found: {found:?})")]
    MissingColumn {
        path: PathBuf,
        column: String,
        found: Vec<String>,
    },
}
