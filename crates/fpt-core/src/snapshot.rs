//! Snapshot documents: the body written to `backup.json` and the summary
//! written to `metadata.json`.
//!
//! ```text
//! backup-2026-10-18T08-00-00-000Z/
//!   backup.json    {metadata: {timestamp, version, tables}, data: {table: rows | {error}}}
//!   metadata.json  {timestamp, version, tables, recordCounts, size, checksum}
//! ```

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::checksum::compute_checksum;
use crate::errors::CoreError;
use crate::row::Row;

/// Snapshot format version written into every body and metadata file.
pub const SNAPSHOT_VERSION: &str = "1.0.0";

/// Directory name prefix shared by all snapshots.
pub const SNAPSHOT_PREFIX: &str = "backup-";

const ID_TIME_FORMAT: &str = "%Y-%m-%dT%H-%M-%S-%3fZ";

// ---------------------------------------------------------------------------
// SnapshotId
// ---------------------------------------------------------------------------

/// Identifier of a snapshot, derived from its creation time.
///
/// The encoding is zero-padded and big-endian in time, so lexical order is
/// creation order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SnapshotId(String);

impl SnapshotId {
    #[must_use]
    pub fn from_timestamp(at: DateTime<Utc>) -> Self {
        Self(format!("{SNAPSHOT_PREFIX}{}", at.format(ID_TIME_FORMAT)))
    }

    /// Parse a snapshot directory name.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::InvalidSnapshotId`] when the name lacks the
    /// `backup-` prefix or contains a path separator.
    pub fn parse(raw: &str) -> Result<Self, CoreError> {
        let trimmed = raw.trim().trim_end_matches('/');
        if !trimmed.starts_with(SNAPSHOT_PREFIX)
            || trimmed.len() == SNAPSHOT_PREFIX.len()
            || trimmed.contains(['/', '\\'])
        {
            return Err(CoreError::InvalidSnapshotId(raw.to_string()));
        }
        Ok(Self(trimmed.to_string()))
    }

    /// Creation time encoded in the id, when it follows the standard encoding.
    #[must_use]
    pub fn created_at(&self) -> Option<DateTime<Utc>> {
        let encoded = self.0.strip_prefix(SNAPSHOT_PREFIX)?;
        NaiveDateTime::parse_from_str(encoded, ID_TIME_FORMAT)
            .ok()
            .map(|naive| naive.and_utc())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SnapshotId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ---------------------------------------------------------------------------
// TableData / TableSet
// ---------------------------------------------------------------------------

/// Rows captured for one table, or the reason the capture failed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TableData {
    Rows(Vec<Row>),
    Failed { error: String },
}

impl TableData {
    /// Number of captured rows; a failed table counts as zero.
    #[must_use]
    pub fn record_count(&self) -> u64 {
        match self {
            Self::Rows(rows) => rows.len() as u64,
            Self::Failed { .. } => 0,
        }
    }

    #[must_use]
    pub fn error(&self) -> Option<&str> {
        match self {
            Self::Rows(_) => None,
            Self::Failed { error } => Some(error),
        }
    }
}

/// Table name → captured data, in capture order.
///
/// Serialized as a JSON object whose key order follows the order tables were
/// backed up, which is also the order a full restore replays them in.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TableSet(Vec<(String, TableData)>);

impl TableSet {
    #[must_use]
    pub const fn new() -> Self {
        Self(Vec::new())
    }

    /// Insert or replace a table's data, keeping its original position.
    pub fn insert(&mut self, table: impl Into<String>, data: TableData) {
        let table = table.into();
        if let Some(slot) = self.0.iter_mut().find(|(name, _)| *name == table) {
            slot.1 = data;
        } else {
            self.0.push((table, data));
        }
    }

    #[must_use]
    pub fn get(&self, table: &str) -> Option<&TableData> {
        self.0
            .iter()
            .find_map(|(name, data)| (name == table).then_some(data))
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &TableData)> {
        self.0.iter().map(|(name, data)| (name.as_str(), data))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for TableSet {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.0.len()))?;
        for (name, data) in &self.0 {
            map.serialize_entry(name, data)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for TableSet {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct TableSetVisitor;

        impl<'de> Visitor<'de> for TableSetVisitor {
            type Value = TableSet;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a map of table name to rows or {error}")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<TableSet, A::Error> {
                let mut set = TableSet::new();
                while let Some((name, data)) = access.next_entry::<String, TableData>()? {
                    set.insert(name, data);
                }
                Ok(set)
            }
        }

        deserializer.deserialize_map(TableSetVisitor)
    }
}

// ---------------------------------------------------------------------------
// SnapshotBody / SnapshotMetadata
// ---------------------------------------------------------------------------

/// Header embedded at the top of `backup.json`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SnapshotHeader {
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub tables: Vec<String>,
}

/// The full `backup.json` document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SnapshotBody {
    pub metadata: SnapshotHeader,
    pub data: TableSet,
}

impl SnapshotBody {
    #[must_use]
    pub fn new(timestamp: DateTime<Utc>, tables: Vec<String>, data: TableSet) -> Self {
        Self {
            metadata: SnapshotHeader {
                timestamp,
                version: SNAPSHOT_VERSION.to_string(),
                tables,
            },
            data,
        }
    }

    /// Per-table record counts. Failed tables count as zero.
    #[must_use]
    pub fn record_counts(&self) -> BTreeMap<String, u64> {
        self.data
            .iter()
            .map(|(name, data)| (name.to_string(), data.record_count()))
            .collect()
    }

    /// Tables whose capture failed, with the recorded error.
    #[must_use]
    pub fn failed_tables(&self) -> Vec<(&str, &str)> {
        self.data
            .iter()
            .filter_map(|(name, data)| data.error().map(|error| (name, error)))
            .collect()
    }

    /// Serialize the body exactly as it is persisted.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Serialization`] if encoding fails.
    pub fn to_bytes(&self) -> Result<Vec<u8>, CoreError> {
        Ok(serde_json::to_vec_pretty(self)?)
    }

    /// Parse a persisted body.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::Serialization`] if the bytes are not a snapshot body.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, CoreError> {
        Ok(serde_json::from_slice(bytes)?)
    }
}

/// The `metadata.json` document describing a persisted body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMetadata {
    pub timestamp: DateTime<Utc>,
    pub version: String,
    pub tables: Vec<String>,
    pub record_counts: BTreeMap<String, u64>,
    /// Byte length of the serialized body.
    pub size: u64,
    pub checksum: String,
}

impl SnapshotMetadata {
    /// Project a body and its serialized bytes into metadata.
    #[must_use]
    pub fn build(body: &SnapshotBody, serialized: &[u8]) -> Self {
        Self {
            timestamp: body.metadata.timestamp,
            version: body.metadata.version.clone(),
            tables: body.metadata.tables.clone(),
            record_counts: body.record_counts(),
            size: serialized.len() as u64,
            checksum: compute_checksum(serialized),
        }
    }

    #[must_use]
    pub fn total_records(&self) -> u64 {
        self.record_counts.values().sum()
    }
}
