use serde::Deserialize;

use crate::error::{CredstashError, Result};
use crate::types::DEFAULT_TABLE;

/// Environment variable naming the default credential table.
pub const TABLE_ENV: &str = "CREDSTASH_TABLE";

/// Client settings. Connection and credential settings belong to the
/// store and KMS clients, not here.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Table used when a request does not name one.
    pub table: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            table: DEFAULT_TABLE.to_string(),
        }
    }
}

impl ClientConfig {
    pub fn with_table(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
        }
    }

    /// Defaults overridden by `CREDSTASH_TABLE` when it is set and non-empty.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        match lookup(TABLE_ENV) {
            Some(table) if !table.is_empty() => Self::with_table(table),
            _ => Self::default(),
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.table.trim().is_empty() {
            return Err(CredstashError::InvalidConfig(
                "table name must not be empty".to_string(),
            ));
        }
        Ok(())
    }

    /// Resolve the table for a request: empty selects the configured default.
    pub fn resolve_table<'a>(&'a self, requested: &'a str) -> &'a str {
        if requested.is_empty() {
            &self.table
        } else {
            requested
        }
    }
}
