use thiserror::Error;

/// Structured failures the host framework needs to tell apart.
///
/// Transport and service errors from the SDK stay as plain `anyhow` chains;
/// only the conditions with a defined contract get a variant here.
#[derive(Debug, Error)]
pub enum ConnectorError {
    /// The credential-profile environment variable is unset. Fatal: no
    /// client can be constructed without it.
    #[error("environment variable {var} is not set; it must name an AWS credential profile")]
    MissingProfile { var: &'static str },

    /// The remote execution reached FAILED or CANCELLED.
    #[error("query execution {execution_id} ended in state {state}: {reason}")]
    ExecutionFailed {
        execution_id: String,
        state: String,
        reason: String,
    },

    /// The configured poll bound was exhausted before a terminal state.
    #[error("query execution {execution_id} still pending after {attempts} status checks")]
    PollTimeout { execution_id: String, attempts: u32 },

    /// A DATE-typed column held a value that does not parse as a date and
    /// strict date handling is configured.
    #[error("column {column} holds {value:?}, which is not a recognized date or timestamp")]
    InvalidDate { column: String, value: String },
}
