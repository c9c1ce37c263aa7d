//! Query submission and completion polling.

use anyhow::Result;
use std::fmt;
use tokio::time::sleep;

use crate::client::AthenaApi;
use crate::config::POLL_INTERVAL;
use crate::error::ConnectorError;
use crate::options::ConnectorOptions;

/// Opaque handle identifying one asynchronous execution on the Athena side.
/// Lives only for the duration of a single query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryExecutionId(String);

impl QueryExecutionId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for QueryExecutionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Execution states as reported by Athena. The connector only distinguishes
/// succeeded vs failed/cancelled vs still pending.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionStatus {
    Queued,
    Running,
    Succeeded,
    Failed { reason: String },
    Cancelled { reason: String },
}

/// Start an asynchronous execution and return its identifier.
///
/// SQL text is passed through uninterpreted; Athena is authoritative on
/// syntax and semantics. Service errors propagate to the caller untouched.
pub async fn submit_query(
    api: &dyn AthenaApi,
    sql: &str,
    options: &ConnectorOptions,
) -> Result<QueryExecutionId> {
    let id = api.start_query(sql, options).await?;
    tracing::info!(execution_id = %id, database = %options.database, "started query execution");
    Ok(id)
}

/// Poll execution status on a fixed interval until Athena reports a
/// terminal state.
///
/// With `max_attempts = None` (the default) the loop is unbounded; a stuck
/// remote execution keeps the caller polling indefinitely. Passing a bound
/// turns exhaustion into a `PollTimeout` error.
pub async fn poll_until_complete(
    api: &dyn AthenaApi,
    id: &QueryExecutionId,
    max_attempts: Option<u32>,
) -> Result<()> {
    let mut attempts: u32 = 0;
    loop {
        match api.query_status(id).await? {
            ExecutionStatus::Succeeded => {
                tracing::debug!(execution_id = %id, "query execution succeeded");
                return Ok(());
            }
            ExecutionStatus::Failed { reason } => {
                return Err(execution_failed(id, "FAILED", reason));
            }
            ExecutionStatus::Cancelled { reason } => {
                return Err(execution_failed(id, "CANCELLED", reason));
            }
            ExecutionStatus::Queued | ExecutionStatus::Running => {
                attempts += 1;
                if let Some(max) = max_attempts {
                    if attempts >= max {
                        return Err(ConnectorError::PollTimeout {
                            execution_id: id.to_string(),
                            attempts,
                        }
                        .into());
                    }
                }
                sleep(POLL_INTERVAL).await;
            }
        }
    }
}

fn execution_failed(id: &QueryExecutionId, state: &str, reason: String) -> anyhow::Error {
    ConnectorError::ExecutionFailed {
        execution_id: id.to_string(),
        state: state.to_string(),
        reason,
    }
    .into()
}
