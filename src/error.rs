#![forbid(unsafe_code)]

//! Typed failures shared by the collector. Configuration problems are fatal;
//! API failures are recovered by the search and detail stages and kept as
//! [`FailureNote`]s.

use std::fmt;
use std::path::PathBuf;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{0} not found. Make sure it's in a .env file or set as an environment variable.")]
    MissingApiKey(&'static str),

    #[error("reading env file {path}: {source}")]
    EnvFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// A single failed call against the remote video API.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{endpoint} returned HTTP {status}: {body}")]
    Status {
        endpoint: &'static str,
        status: u16,
        body: String,
    },

    #[error("request to {endpoint} failed: {message}")]
    Transport {
        endpoint: &'static str,
        message: String,
    },

    #[error("decoding {endpoint} response: {source}")]
    Decode {
        endpoint: &'static str,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Search,
    Details,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Search => f.write_str("search"),
            Stage::Details => f.write_str("details"),
        }
    }
}

/// A request failure that was logged and recovered from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureNote {
    pub stage: Stage,
    pub query: String,
    pub detail: String,
}

impl fmt::Display for FailureNote {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] '{}': {}", self.stage, self.query, self.detail)
    }
}
