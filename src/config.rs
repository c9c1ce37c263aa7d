//! Configuration constants for the Athena connector
//!
//! This module centralizes all tunable parameters and constants used throughout
//! the connector.

use std::time::Duration;

// ============================================================================
// Credentials & Region
// ============================================================================

/// Environment variable naming the AWS credential profile the connector
/// authenticates with. The connector refuses to build a client when it is
/// unset: no partial operation is meaningful without credentials.
pub const PROFILE_ENV_VAR: &str = "ATHENA_PROFILE";

/// Region the Athena client is bound to.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Catalog queries resolve against when none is configured.
pub const DEFAULT_CATALOG: &str = "AWSDataCatalog";

// ============================================================================
// Polling
// ============================================================================

/// Delay between execution status checks.
///
/// Athena executions routinely spend several seconds queued before they run,
/// so a 5 second interval keeps status traffic low without adding noticeable
/// latency to typical report queries.
pub const POLL_INTERVAL: Duration = Duration::from_secs(5);
