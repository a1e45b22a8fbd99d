use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("article not found or incomplete: missing {field}")]
    ArticleIncomplete { field: &'static str },

    #[error("article not found or incomplete: malformed record ({0})")]
    MalformedArticle(String),

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("rule pattern failed to compile: {0}")]
    Pattern(#[from] regex::Error),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration error: {0}")]
    Figment(#[from] Box<figment::Error>),

    #[error("invalid configuration value for '{field}': {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

impl From<figment::Error> for ConfigError {
    fn from(error: figment::Error) -> Self {
        Self::Figment(Box::new(error))
    }
}

#[derive(Debug, Error)]
pub enum JudgeError {
    #[error("content judge timed out after {0:?}")]
    Timeout(Duration),

    #[error("content judge transport error: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("content judge rejected credentials ({status})")]
    Auth { status: u16 },

    #[error("content judge API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("content judge returned no text")]
    EmptyResponse,

    #[error("content judge is disabled")]
    Disabled,
}

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("catalog HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("failed to read catalog {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse catalog: {0}")]
    Parse(String),
}
