use std::{io, path::PathBuf};
use thiserror::Error;

/// The error type returned by resolver, selector and downloader operations.
#[derive(Debug, Error)]
pub enum Error {
    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("upstream error: {0}")]
    Upstream(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("{tool} failed: {message}")]
    ExternalTool { tool: String, message: String },

    #[error("{} ({})", source, path.display())]
    FileSystem {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("upstream error: malformed json ({0})")]
    Json(#[from] serde_json::Error),

    #[error("upstream error: malformed manifest ({0})")]
    Manifest(#[from] quick_xml::DeError),
}

pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    pub(crate) fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    pub(crate) fn upstream(message: impl Into<String>) -> Self {
        Self::Upstream(message.into())
    }

    pub(crate) fn tool(tool: impl Into<String>, message: impl ToString) -> Self {
        Self::ExternalTool {
            tool: tool.into(),
            message: message.to_string(),
        }
    }

    pub(crate) fn fs(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::FileSystem {
            path: path.into(),
            source,
        }
    }

    /// Returns true when upstream rejected the request for lack of a login session.
    pub fn is_authorization(&self) -> bool {
        let message = match self {
            Self::Upstream(message) => message.to_lowercase(),
            Self::Http(e) => {
                return e.status().is_some_and(|x| x.as_u16() == 401 || x.as_u16() == 403);
            }
            _ => return false,
        };

        ["adult", "unauthorized", "login", "성인", "인증"]
            .iter()
            .any(|x| message.contains(x))
    }
}
