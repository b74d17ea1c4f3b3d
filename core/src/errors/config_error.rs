use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum ConfigError {
    #[error("invalid engine config: {0}")]
    #[diagnostic(help("expected a JSON object such as {{\"dispatch\": \"microtask\"}}"))]
    Parse(#[from] serde_json::Error),

    #[error("unknown dispatch mode '{0}'")]
    #[diagnostic(help("use one of: synchronous, microtask, tokio"))]
    UnknownDispatch(String),

    #[error("tokio dispatch requires a running tokio runtime")]
    NoRuntime(#[from] tokio::runtime::TryCurrentError),
}
