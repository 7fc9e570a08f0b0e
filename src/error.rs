use thiserror::Error;

pub type Result<T> = std::result::Result<T, CompositionError>;

/// Errors surfaced by the composition engine.
///
/// The display strings of the fetch and parse variants are part of the
/// gateway's user-visible error surface and are matched by tests.
#[derive(Debug, Error)]
pub enum CompositionError {
    /// Upstream answered with a non-2xx status.
    #[error("(http {status}) on loading url {url}")]
    HttpStatus { status: u16, url: String },

    /// Transport-level failure, including per-request timeouts.
    #[error("error loading url {url}: {message}")]
    Fetch { url: String, message: String },

    /// Malformed composition markup or meta JSON.
    #[error("parse error: {0}")]
    Parse(String),

    /// Template expansion failure while streaming a fragment.
    #[error("{0}")]
    Render(String),

    /// Broken fetch graph: include recursion ran away or a definition
    /// cannot be turned into a request.
    #[error("dependency error: {0}")]
    Dependency(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CompositionError {
    pub fn fetch(url: impl Into<String>, err: impl std::fmt::Display) -> Self {
        CompositionError::Fetch {
            url: url.into(),
            message: err.to_string(),
        }
    }
}
