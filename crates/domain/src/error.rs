/// Shared error type used across all Suroo crates.
#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("IO: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Transport-level failure against the upstream model endpoint.
    /// Fatal to the request, unlike per-call tool failures.
    #[error("upstream: {0}")]
    Upstream(String),

    #[error("timeout: {0}")]
    Timeout(String),

    /// A single embedded directive did not match the call grammar.
    #[error("directive: {0}")]
    Directive(String),

    /// A single tool invocation failed (not found, RPC failure, timeout).
    #[error("tool: {0}")]
    Tool(String),

    #[error("config: {0}")]
    Config(String),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, Error>;
