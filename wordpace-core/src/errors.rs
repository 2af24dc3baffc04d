use thiserror::Error;

/// Shared error taxonomy for the card store and its callers. The scheduling
/// math itself never fails; these surface from storage and boundary parsing.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("not found: {0}")]
    NotFound(&'static str),
    #[error("invalid input: {0}")]
    Invalid(&'static str),
    #[error("conflict: {0}")]
    Conflict(&'static str),
    #[error("storage error: {0}")]
    Storage(&'static str),
}
