use thiserror::Error;

/// Failures an action can report back to the user. Each one aborts the action
/// without side effects and is shown in a blocking dialog.
#[derive(Debug, Error)]
pub enum ActionError {
    #[error("{field} must be a valid number.")]
    InvalidNumber { field: &'static str },

    #[error("No record found for ID {id}.")]
    NotFound { id: i64 },

    /// Anything raised by SQLite. The message is forwarded as-is.
    #[error("{}", surface_error(.0))]
    Persistence(#[from] anyhow::Error),
}

pub type ActionResult<T> = Result<T, ActionError>;

/// Extract the most relevant error message from a chained error.
pub fn surface_error(err: &anyhow::Error) -> String {
    err.chain()
        .last()
        .map(|cause| cause.to_string())
        .unwrap_or_else(|| err.to_string())
}
