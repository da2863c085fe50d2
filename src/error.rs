use thiserror::Error;

use crate::style::Style;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StyleError {
    #[error("{0:?} is already open")]
    AlreadyOpen(Style),

    #[error("{0:?} is not open")]
    NotOpen(Style),
}

/// Image download failure. Clonable so every waiter on a shared fetch gets
/// the same error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("failed to fetch image {url}: {message}")]
pub struct FetchError {
    pub url: String,
    pub message: String,
}

impl FetchError {
    pub fn new(url: &str, message: impl ToString) -> Self {
        Self {
            url: url.to_string(),
            message: message.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("unknown user {0}")]
    UnknownUser(u64),

    #[error("unknown channel {0}")]
    UnknownChannel(u64),

    #[error("formatting state violated: {0}")]
    Style(#[from] StyleError),

    #[error(transparent)]
    Image(#[from] FetchError),
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request to {path} failed: {source}")]
    Http {
        path: String,
        #[source]
        source: Box<ureq::Error>,
    },

    #[error("invalid snowflake {0:?}")]
    InvalidId(String),

    #[error("request to {path} returned HTTP {status}")]
    Status { path: String, status: u16 },
}

#[derive(Debug, Error)]
pub enum TranscribeError {
    #[error(transparent)]
    Render(#[from] RenderError),

    #[error("failed to write {path}: {source}")]
    Write {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Api(#[from] ApiError),
}
