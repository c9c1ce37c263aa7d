//! Per-connection configuration supplied by the host framework.

use anyhow::{Context, Result, anyhow};
use derive_builder::Builder;
use serde::{Deserialize, Deserializer};
use url::Url;

use crate::config::DEFAULT_CATALOG;

/// What to do with a value in a DATE-typed column that does not parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateHandling {
    /// Keep the original string value and log a warning.
    #[default]
    Lenient,
    /// Fail the whole query.
    Strict,
}

/// S3 location Athena spills query results to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLocation {
    bucket: String,
    prefix: String,
}

impl OutputLocation {
    /// Parse an `s3://bucket/prefix` URI. A bare bucket name (no scheme)
    /// is accepted and treated as the bucket root.
    pub fn parse(uri: &str) -> Result<Self> {
        match Url::parse(uri) {
            Ok(url) => {
                if url.scheme() != "s3" {
                    return Err(anyhow!(
                        "Output location must be an s3:// URI or bucket name: {}",
                        uri
                    ));
                }
                let bucket = url
                    .host_str()
                    .ok_or_else(|| anyhow!("Output location missing bucket: {}", uri))?
                    .to_string();
                let prefix = url.path().trim_start_matches('/').to_string();
                Ok(Self { bucket, prefix })
            }
            Err(url::ParseError::RelativeUrlWithoutBase) => {
                let bucket = uri.trim().trim_matches('/');
                if bucket.is_empty() {
                    return Err(anyhow!("Output location is empty"));
                }
                Ok(Self {
                    bucket: bucket.to_string(),
                    prefix: String::new(),
                })
            }
            Err(e) => Err(e).with_context(|| format!("Invalid output location: {}", uri)),
        }
    }

    /// Render back to the URI form Athena's result configuration expects.
    pub fn as_uri(&self) -> String {
        if self.prefix.is_empty() {
            format!("s3://{}/", self.bucket)
        } else {
            format!("s3://{}/{}", self.bucket, self.prefix)
        }
    }
}

impl<'de> Deserialize<'de> for OutputLocation {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        OutputLocation::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Connection options as configured by the user in the host framework.
/// Immutable for the lifetime of a connector instance.
#[derive(Debug, Clone, Deserialize, Builder)]
#[serde(rename_all = "camelCase")]
pub struct ConnectorOptions {
    /// Database inside the catalog that unqualified table names resolve to.
    #[builder(setter(into))]
    pub database: String,

    /// Data catalog queries run against.
    #[serde(default = "default_catalog")]
    #[builder(setter(into), default = "DEFAULT_CATALOG.to_string()")]
    pub catalog: String,

    /// Where Athena writes spilled result data.
    #[serde(rename = "outputBucket")]
    pub output_location: OutputLocation,

    /// Table used only by the connectivity probe.
    #[serde(default)]
    #[builder(setter(into, strip_option), default)]
    pub test_table_name: Option<String>,

    /// Bound on status checks per query. The default is no bound: the
    /// poller waits as long as the remote execution stays pending.
    #[serde(default)]
    #[builder(default)]
    pub max_poll_attempts: Option<u32>,

    /// When set, `test_connection` runs a real probe query against
    /// `test_table_name` instead of unconditionally reporting success.
    #[serde(default)]
    #[builder(default)]
    pub probe_on_test: bool,

    /// Malformed-date policy for DATE-typed columns.
    #[serde(default)]
    #[builder(default)]
    pub date_handling: DateHandling,
}

fn default_catalog() -> String {
    DEFAULT_CATALOG.to_string()
}
