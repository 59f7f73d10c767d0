use std::io;

use thiserror::Error;

/// Why a link was rejected by the extractor.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    #[error("link too short ({len} chars, need at least {min})")]
    TooShort { len: usize, min: usize },
    #[error("wrong link format, must be a tenhou link with a log parameter")]
    WrongPrefix,
    #[error("malformed player suffix '&tw={suffix}', expected exactly one digit")]
    MalformedPlayerSuffix { suffix: String },
}

/// Failure of the remote fetch.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("{url} answered {status}")]
    Status { status: u16, url: String },
}

/// Score normalization could not produce a consistent snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("score {value} is not a multiple of 100")]
    NotMultipleOf100 { value: i64 },
    #[error("score {value} is out of range")]
    OutOfRange { value: i64 },
    #[error("shifted total {total} cannot give every player 1000 points")]
    InsufficientTotal { total: i64 },
    #[error("redistribution did not settle after {rounds} rounds: {scores:?}")]
    DidNotSettle { rounds: usize, scores: [i64; 4] },
    #[error("postcondition violated: {0}")]
    Postcondition(String),
}

impl NormalizeError {
    /// True for the failures that point at a data or algorithm defect rather than bad input.
    pub fn is_internal(&self) -> bool {
        !matches!(
            self,
            NormalizeError::NotMultipleOf100 { .. } | NormalizeError::OutOfRange { .. }
        )
    }
}

/// Everything that can stop one link from being processed.
#[derive(Debug, Error)]
pub enum ItemError {
    #[error(transparent)]
    Format(#[from] FormatError),
    #[error("cannot download log: {0}")]
    Transport(#[from] TransportError),
    #[error("cannot run converter '{program}': {source}")]
    Converter {
        program: String,
        #[source]
        source: io::Error,
    },
    #[error("converted record {0} is missing or empty")]
    MissingConverted(String),
    #[error("malformed record: {0}")]
    MalformedRecord(String),
    #[error("hand {hand}: {source}")]
    Normalize {
        hand: usize,
        #[source]
        source: NormalizeError,
    },
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

impl ItemError {
    /// Extraction failures are skips, everything else counts as a failure.
    pub fn is_skip(&self) -> bool {
        matches!(self, ItemError::Format(_))
    }
}
