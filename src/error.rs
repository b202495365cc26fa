use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MetricsError {
    #[error("cannot compute {metric}: no query has a relevant item to look for (empty groundtruth?)")]
    EmptyDenominator { metric: &'static str },

    #[error("rank 0 recorded for query {query}; ranks are 1-based")]
    ZeroRank { query: String },
}

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to launch search engine `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("search engine i/o failed in {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("search engine exited with {status}: {stderr}")]
    ExitStatus { status: String, stderr: String },

    #[error("search engine produced no parsable query groups")]
    NoQueryGroups,
}
