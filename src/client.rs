//! Athena client construction and the thin seam over the AWS SDK.

use anyhow::{Context, Result};
use async_trait::async_trait;
use aws_config::{BehaviorVersion, Region};
use aws_sdk_athena::Client;
use aws_sdk_athena::types::{QueryExecutionContext, QueryExecutionState, ResultConfiguration};

use crate::config::{DEFAULT_REGION, PROFILE_ENV_VAR};
use crate::error::ConnectorError;
use crate::execution::{ExecutionStatus, QueryExecutionId};
use crate::options::ConnectorOptions;
use crate::results::{RawColumn, ResultsPage};

/// The three Athena operations the connector consumes. Kept as a trait so
/// tests can substitute an in-memory implementation for the real service.
#[async_trait]
pub trait AthenaApi: Send + Sync {
    /// Begin an asynchronous execution of `sql` and return its identifier.
    async fn start_query(
        &self,
        sql: &str,
        options: &ConnectorOptions,
    ) -> Result<QueryExecutionId>;

    /// Fetch the current execution status.
    async fn query_status(&self, id: &QueryExecutionId) -> Result<ExecutionStatus>;

    /// Fetch one page of results, continuing from `next_token` when given.
    async fn results_page(
        &self,
        id: &QueryExecutionId,
        next_token: Option<String>,
    ) -> Result<ResultsPage>;
}

/// Athena client bound to a fixed region, with credentials lazily resolved
/// from a named profile. Holds no per-query state and is safe to share
/// across concurrent query invocations.
#[derive(Debug, Clone)]
pub struct SdkAthena {
    client: Client,
}

impl SdkAthena {
    /// Build a client from the credential profile named by the
    /// `ATHENA_PROFILE` environment variable. A missing variable is a fatal
    /// configuration error: no client is constructed.
    pub async fn from_env() -> Result<Self> {
        let profile = std::env::var(PROFILE_ENV_VAR).map_err(|_| {
            ConnectorError::MissingProfile {
                var: PROFILE_ENV_VAR,
            }
        })?;
        Ok(Self::for_profile(&profile).await)
    }

    /// Build a client for an explicit profile name.
    pub async fn for_profile(profile: &str) -> Self {
        let credentials = aws_config::profile::ProfileFileCredentialsProvider::builder()
            .profile_name(profile)
            .build();
        let sdk_config = aws_config::defaults(BehaviorVersion::latest())
            .credentials_provider(credentials)
            .region(Region::new(DEFAULT_REGION))
            .load()
            .await;

        tracing::info!(profile, region = DEFAULT_REGION, "built Athena client");
        Self {
            client: Client::new(&sdk_config),
        }
    }
}

#[async_trait]
impl AthenaApi for SdkAthena {
    async fn start_query(
        &self,
        sql: &str,
        options: &ConnectorOptions,
    ) -> Result<QueryExecutionId> {
        let context = QueryExecutionContext::builder()
            .database(&options.database)
            .catalog(&options.catalog)
            .build();
        let result_configuration = ResultConfiguration::builder()
            .output_location(options.output_location.as_uri())
            .build();

        let started = self
            .client
            .start_query_execution()
            .query_string(sql)
            .query_execution_context(context)
            .result_configuration(result_configuration)
            .send()
            .await
            .context("Failed to start Athena query execution")?;

        let id = started
            .query_execution_id()
            .context("Athena returned no query execution id")?;
        Ok(QueryExecutionId::new(id))
    }

    async fn query_status(&self, id: &QueryExecutionId) -> Result<ExecutionStatus> {
        let output = self
            .client
            .get_query_execution()
            .query_execution_id(id.as_str())
            .send()
            .await
            .with_context(|| format!("Failed to fetch status for query execution {}", id))?;

        let status = output
            .query_execution()
            .and_then(|execution| execution.status())
            .context("Athena returned an execution without a status")?;
        let state = status
            .state()
            .context("Athena returned a status without a state")?;
        let reason = status
            .state_change_reason()
            .unwrap_or("no reason reported")
            .to_string();

        Ok(match state {
            QueryExecutionState::Queued => ExecutionStatus::Queued,
            QueryExecutionState::Running => ExecutionStatus::Running,
            QueryExecutionState::Succeeded => ExecutionStatus::Succeeded,
            QueryExecutionState::Failed => ExecutionStatus::Failed { reason },
            QueryExecutionState::Cancelled => ExecutionStatus::Cancelled { reason },
            other => ExecutionStatus::Failed {
                reason: format!("unrecognized execution state {:?}", other),
            },
        })
    }

    async fn results_page(
        &self,
        id: &QueryExecutionId,
        next_token: Option<String>,
    ) -> Result<ResultsPage> {
        let output = self
            .client
            .get_query_results()
            .query_execution_id(id.as_str())
            .set_next_token(next_token)
            .send()
            .await
            .with_context(|| format!("Failed to fetch results for query execution {}", id))?;

        let result_set = output
            .result_set()
            .context("Athena returned no result set")?;

        let columns = result_set.result_set_metadata().map(|metadata| {
            metadata
                .column_info()
                .iter()
                .map(|info| RawColumn {
                    name: info.name().to_string(),
                    native_type: info.r#type().to_string(),
                })
                .collect()
        });

        let rows = result_set
            .rows()
            .iter()
            .map(|row| {
                row.data()
                    .iter()
                    .map(|datum| datum.var_char_value().map(str::to_string))
                    .collect()
            })
            .collect();

        Ok(ResultsPage {
            rows,
            columns,
            next_token: output.next_token().map(str::to_string),
        })
    }
}

#[cfg(test)]
pub(crate) mod stub {
    //! In-memory stand-in for the Athena service, scripted per test.

    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use anyhow::anyhow;

    use super::*;

    pub(crate) struct StubAthena {
        statuses: Mutex<VecDeque<ExecutionStatus>>,
        pages: Mutex<VecDeque<ResultsPage>>,
        tokens: Mutex<Vec<Option<String>>>,
        checks: AtomicUsize,
        submitted_sql: Mutex<Vec<String>>,
        start_error: Option<String>,
    }

    impl StubAthena {
        pub(crate) fn scripted(statuses: Vec<ExecutionStatus>, pages: Vec<ResultsPage>) -> Self {
            Self {
                statuses: Mutex::new(statuses.into()),
                pages: Mutex::new(pages.into()),
                tokens: Mutex::new(Vec::new()),
                checks: AtomicUsize::new(0),
                submitted_sql: Mutex::new(Vec::new()),
                start_error: None,
            }
        }

        pub(crate) fn with_statuses(statuses: Vec<ExecutionStatus>) -> Self {
            Self::scripted(statuses, Vec::new())
        }

        /// Execution succeeds on the first status check; only result
        /// pagination is scripted.
        pub(crate) fn with_pages(pages: Vec<ResultsPage>) -> Self {
            Self::scripted(vec![ExecutionStatus::Succeeded], pages)
        }

        pub(crate) fn failing_start(message: &str) -> Self {
            let mut stub = Self::scripted(Vec::new(), Vec::new());
            stub.start_error = Some(message.to_string());
            stub
        }

        pub(crate) fn status_checks(&self) -> usize {
            self.checks.load(Ordering::SeqCst)
        }

        pub(crate) fn seen_tokens(&self) -> Vec<Option<String>> {
            self.tokens.lock().unwrap().clone()
        }

        pub(crate) fn submitted_sql(&self) -> Vec<String> {
            self.submitted_sql.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AthenaApi for StubAthena {
        async fn start_query(
            &self,
            sql: &str,
            _options: &ConnectorOptions,
        ) -> Result<QueryExecutionId> {
            if let Some(message) = &self.start_error {
                return Err(anyhow!("{}", message));
            }
            self.submitted_sql.lock().unwrap().push(sql.to_string());
            Ok(QueryExecutionId::new("stub-execution"))
        }

        async fn query_status(&self, _id: &QueryExecutionId) -> Result<ExecutionStatus> {
            self.checks.fetch_add(1, Ordering::SeqCst);
            self.statuses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| anyhow!("stub has no scripted status left"))
        }

        async fn results_page(
            &self,
            _id: &QueryExecutionId,
            next_token: Option<String>,
        ) -> Result<ResultsPage> {
            self.tokens.lock().unwrap().push(next_token);
            self.pages
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| anyhow!("stub has no scripted page left"))
        }
    }
}
