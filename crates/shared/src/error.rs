use thiserror::Error;

/// Conditions that end a run without producing a newsletter
#[derive(Debug, Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error("aborted: no content")]
    NoContent,

    #[error("aborted: nothing selected (every section is empty)")]
    NothingSelected,
}
