//! Record lookup against the credential table.
//!
//! The store itself (DynamoDB or otherwise) is supplied by the caller through
//! [`RecordStore`]. This module only decides which read to issue and turns
//! empty results into not-found errors. Returned records are raw; decoding
//! happens in [`crate::record`].

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::error::{CredstashError, Result, StoreError};
use crate::record::{StoredRecord, NAME_FIELD, VERSION_FIELD};

// ============================================================================
// RecordStore — caller-provided table access
// ============================================================================

/// Read access to a credstash table.
///
/// Both reads must be strongly consistent. Implementations own their
/// transport, timeouts and retries.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Point read of the item keyed by (`name`, `version`).
    ///
    /// `Ok(None)` when no such item exists.
    async fn get_item(
        &self,
        table: &str,
        name: &str,
        version: &str,
    ) -> std::result::Result<Option<StoredRecord>, StoreError>;

    /// Query on partition key `name`, sort key descending, limit 1.
    ///
    /// `Ok(None)` when the query returns no items.
    async fn query_latest(
        &self,
        table: &str,
        name: &str,
    ) -> std::result::Result<Option<StoredRecord>, StoreError>;
}

#[async_trait]
impl<T: RecordStore + ?Sized> RecordStore for Arc<T> {
    async fn get_item(
        &self,
        table: &str,
        name: &str,
        version: &str,
    ) -> std::result::Result<Option<StoredRecord>, StoreError> {
        (**self).get_item(table, name, version).await
    }

    async fn query_latest(
        &self,
        table: &str,
        name: &str,
    ) -> std::result::Result<Option<StoredRecord>, StoreError> {
        (**self).query_latest(table, name).await
    }
}

/// Fetch the raw record for `name`.
///
/// An empty `version` selects the latest version via a descending query;
/// anything else is a point read of exactly that version.
///
/// # Errors
/// * `NotFound` if the name has no versions
/// * `VersionNotFound` if the requested version does not exist
/// * `Store` for failures reported by the store
pub async fn locate_record<S>(
    store: &S,
    table: &str,
    name: &str,
    version: &str,
) -> Result<StoredRecord>
where
    S: RecordStore + ?Sized,
{
    if version.is_empty() {
        tracing::debug!(table, name, "querying latest secret version");
        return store
            .query_latest(table, name)
            .await?
            .ok_or_else(|| CredstashError::NotFound {
                name: name.to_string(),
            });
    }

    tracing::debug!(table, name, version, "reading secret version");
    let record = store
        .get_item(table, name, version)
        .await?
        .ok_or_else(|| CredstashError::VersionNotFound {
            name: name.to_string(),
            version: version.to_string(),
        })?;

    // The table key guarantees the match; a store that disagrees is only reported.
    if let Some(stored) = record.get(VERSION_FIELD).and_then(|v| v.as_s()) {
        if stored != version {
            tracing::warn!(
                table,
                name,
                requested = version,
                returned = stored,
                "store returned a different version than requested"
            );
        }
    }

    Ok(record)
}

// ============================================================================
// MemoryStore
// ============================================================================

/// table → name → version → record
type Tables = HashMap<String, HashMap<String, BTreeMap<String, StoredRecord>>>;

/// In-process [`RecordStore`].
///
/// Versions are ordered lexicographically, like a DynamoDB string sort key,
/// so `"10"` sorts before `"9"` unless versions are zero-padded.
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a record. The record must carry string `name` and
    /// `version` attributes, which form its key.
    pub fn put(&self, table: &str, record: StoredRecord) -> Result<()> {
        let name = key_attribute(&record, NAME_FIELD)?;
        let version = key_attribute(&record, VERSION_FIELD)?;
        self.tables
            .lock()
            .entry(table.to_string())
            .or_default()
            .entry(name)
            .or_default()
            .insert(version, record);
        Ok(())
    }

    /// Number of stored versions of `name` in `table`.
    pub fn version_count(&self, table: &str, name: &str) -> usize {
        self.tables
            .lock()
            .get(table)
            .and_then(|names| names.get(name))
            .map_or(0, BTreeMap::len)
    }
}

fn key_attribute(record: &StoredRecord, field: &'static str) -> Result<String> {
    record
        .get(field)
        .ok_or(CredstashError::MissingField { field })?
        .as_s()
        .map(str::to_string)
        .ok_or(CredstashError::UnexpectedType {
            field,
            expected: "string",
        })
}

#[async_trait]
impl RecordStore for MemoryStore {
    async fn get_item(
        &self,
        table: &str,
        name: &str,
        version: &str,
    ) -> std::result::Result<Option<StoredRecord>, StoreError> {
        Ok(self
            .tables
            .lock()
            .get(table)
            .and_then(|names| names.get(name))
            .and_then(|versions| versions.get(version))
            .cloned())
    }

    async fn query_latest(
        &self,
        table: &str,
        name: &str,
    ) -> std::result::Result<Option<StoredRecord>, StoreError> {
        Ok(self
            .tables
            .lock()
            .get(table)
            .and_then(|names| names.get(name))
            .and_then(|versions| versions.values().next_back())
            .cloned())
    }
}
