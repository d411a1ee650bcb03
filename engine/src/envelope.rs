//! Versioned wrapper persisted around every snapshot.
//!
//! The same envelope shape is written to the primary key, to every backup
//! slot, to exported files and to the remote document.

use crate::clock::format_timestamp;
use crate::normalize::{is_snapshot_shaped, normalize};
use crate::{error::Result, Error, SchemaVersion, Snapshot};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Schema version stamped on every envelope this crate writes.
///
/// Version 2 was the previous dashboard's export format (`version`,
/// `exportedAt`, Portuguese keys).
pub const SCHEMA_VERSION: SchemaVersion = 3;

/// Well-known provenance labels.
pub mod labels {
    pub const MANUAL_EXPORT: &str = "manual_export";
    pub const IMPORT: &str = "import";
    pub const WIPE: &str = "wipe";
    pub const RESTORE: &str = "restore";
    pub const HISTORY_CLEARED: &str = "history_cleared";
    pub const CLOUD_PULL: &str = "cloud_pull";
    pub const CLOUD_BOOTSTRAP: &str = "cloud_bootstrap";

    /// Label given to the previous primary value when `label` overwrites it.
    pub fn before(label: &str) -> String {
        format!("before_{label}")
    }
}

/// A snapshot with provenance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Envelope {
    pub schema_version: SchemaVersion,
    /// Free-form provenance tag such as `"manual_export"` or `"before_import"`
    pub label: String,
    /// ISO-8601 timestamp of the write
    pub saved_at: String,
    pub data: Snapshot,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<String>,
}

impl Envelope {
    /// Wrap a snapshot at the current schema version.
    pub fn new(data: Snapshot, label: impl Into<String>, saved_at: DateTime<Utc>) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            label: label.into(),
            saved_at: format_timestamp(saved_at),
            data,
            updated_by: None,
        }
    }

    /// Tag the writer, as carried on the remote document.
    pub fn with_updated_by(mut self, writer: impl Into<String>) -> Self {
        self.updated_by = Some(writer.into());
        self
    }

    /// Backup ring dedup key.
    pub fn key(&self) -> (&str, &str) {
        (&self.saved_at, &self.label)
    }

    /// Read an envelope from loosely shaped JSON.
    ///
    /// Requires an object with a `data` member; everything else falls back
    /// to defaults and `data` is normalized. Accepts the previous export
    /// format's `version` and `exportedAt` keys.
    pub fn from_value(raw: &Value) -> Option<Self> {
        let obj = raw.as_object()?;
        let data = obj.get("data").filter(|d| d.is_object())?;

        let schema_version = obj
            .get("schemaVersion")
            .or_else(|| obj.get("version"))
            .and_then(Value::as_u64)
            .and_then(|v| SchemaVersion::try_from(v).ok())
            .unwrap_or(0);

        if schema_version > SCHEMA_VERSION {
            tracing::warn!(
                schema_version,
                supported = SCHEMA_VERSION,
                "reading envelope from a newer schema"
            );
        }

        let string = |key: &str| obj.get(key).and_then(Value::as_str).map(str::to_string);

        Some(Self {
            schema_version,
            label: string("label").unwrap_or_default(),
            saved_at: string("savedAt")
                .or_else(|| string("exportedAt"))
                .unwrap_or_default(),
            data: normalize(data),
            updated_by: string("updatedBy"),
        })
    }

    /// Parse from JSON text. See [`Envelope::from_value`].
    pub fn from_json(json: &str) -> Option<Self> {
        let value: Value = serde_json::from_str(json).ok()?;
        Self::from_value(&value)
    }

    /// Serialize to compact JSON.
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string(self).map_err(Error::from)
    }

    /// Serialize to pretty JSON, as offered for download.
    pub fn to_json_pretty(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(Error::from)
    }

    /// Serialize into a JSON value, as written to the remote document.
    pub fn to_value(&self) -> Result<Value> {
        serde_json::to_value(self).map_err(Error::from)
    }
}

/// Read a stored or imported document that is either an envelope or a bare
/// snapshot. Anything else is [`Error::InvalidFormat`].
pub fn parse_document(text: &str) -> Result<Snapshot> {
    let value: Value =
        serde_json::from_str(text).map_err(|e| Error::InvalidFormat(e.to_string()))?;
    snapshot_from_document(&value)
}

/// Same as [`parse_document`] for an already parsed value.
pub fn snapshot_from_document(value: &Value) -> Result<Snapshot> {
    if let Some(envelope) = Envelope::from_value(value) {
        return Ok(envelope.data);
    }
    if is_snapshot_shaped(value) {
        return Ok(normalize(value));
    }
    Err(Error::InvalidFormat(
        "expected a snapshot or an envelope with a data object".into(),
    ))
}

/// Build the export document for `snapshot`.
pub fn export(snapshot: &Snapshot, at: DateTime<Utc>) -> Result<String> {
    Envelope::new(snapshot.clone(), labels::MANUAL_EXPORT, at).to_json_pretty()
}
