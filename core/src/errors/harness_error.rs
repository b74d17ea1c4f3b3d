use miette::Diagnostic;
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
pub enum HarnessError {
    #[error("no outstanding deferred to settle")]
    #[diagnostic(help("request a promise from the queue before settling it"))]
    Empty,
}
