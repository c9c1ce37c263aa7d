//! High-level connector API for the Athena data source.
//!
//! This module provides the surface the host framework binds to: a query
//! runner that takes SQL text and returns typed rows, and a connection
//! tester. It is the primary API for external users and for the CLI.

use anyhow::Result;
use std::sync::Arc;

use crate::execution::{poll_until_complete, submit_query};
use crate::results::{fetch_all_pages, format_results};

pub use crate::client::{AthenaApi, SdkAthena};
pub use crate::error::ConnectorError;
pub use crate::options::{ConnectorOptions, ConnectorOptionsBuilder, DateHandling, OutputLocation};
pub use crate::results::{CellValue, MappedOutput};
pub use crate::types::{ColumnType, EvidenceType, TypeFidelity, map_athena_type_to_evidence_type};

/// One connector instance: an injected Athena client plus the immutable
/// per-connection options. The client is shared and stateless, so a single
/// runner may serve concurrent query invocations.
///
/// # Example
///
/// ```no_run
/// use athena_connector::runner::{
///     ConnectorOptionsBuilder, OutputLocation, QueryRunner, SdkAthena,
/// };
/// use std::sync::Arc;
///
/// # async fn example() -> anyhow::Result<()> {
/// let options = ConnectorOptionsBuilder::default()
///     .database("reporting")
///     .output_location(OutputLocation::parse("s3://spill-bucket/athena")?)
///     .build()?;
///
/// let client = SdkAthena::from_env().await?;
/// let runner = QueryRunner::new(Arc::new(client), options);
///
/// let output = runner.run_query("SELECT * FROM orders", None).await?;
/// println!("{} rows", output.expected_row_count);
/// # Ok(())
/// # }
/// ```
pub struct QueryRunner {
    api: Arc<dyn AthenaApi>,
    options: ConnectorOptions,
}

impl QueryRunner {
    pub fn new(api: Arc<dyn AthenaApi>, options: ConnectorOptions) -> Self {
        Self { api, options }
    }

    /// Run one SQL query end to end: submit, poll to completion, fetch all
    /// result pages, and map them into the host's typed row format.
    ///
    /// `query_path` identifies the query file for logging when the host
    /// invokes the connector per file; it does not affect execution.
    ///
    /// Errors from any stage surface to the caller rather than being
    /// logged and swallowed, so the host can distinguish an empty result
    /// from a failed query.
    pub async fn run_query(&self, sql: &str, query_path: Option<&str>) -> Result<MappedOutput> {
        tracing::info!(
            query_path = query_path.unwrap_or("<inline>"),
            "running query"
        );

        let id = submit_query(self.api.as_ref(), sql, &self.options).await?;
        poll_until_complete(self.api.as_ref(), &id, self.options.max_poll_attempts).await?;
        let raw = fetch_all_pages(self.api.as_ref(), &id).await?;
        let output = format_results(raw, self.options.date_handling)?;

        tracing::info!(
            execution_id = %id,
            rows = output.expected_row_count,
            "query complete"
        );
        Ok(output)
    }

    /// Report whether the configured connection is usable.
    ///
    /// By default this reports success without touching Athena, matching
    /// the contract the host framework has always seen from this
    /// connector. Setting `probe_on_test` (together with
    /// `test_table_name`) runs a real one-row probe query instead.
    pub async fn test_connection(&self) -> Result<bool> {
        if !self.options.probe_on_test {
            return Ok(true);
        }

        let Some(table) = self.options.test_table_name.as_deref() else {
            tracing::warn!("probe_on_test is set but no test table is configured; reporting success");
            return Ok(true);
        };

        let sql = format!("SELECT 1 FROM {} LIMIT 1", table);
        match self.run_query(&sql, None).await {
            Ok(_) => Ok(true),
            Err(error) => {
                tracing::warn!(error = %error, table, "connectivity probe failed");
                Ok(false)
            }
        }
    }
}
