//! Remote mirror configuration.
//!
//! The mirror only runs when a structurally complete configuration is
//! supplied and none of its values is template text copied from a setup
//! guide. The check is purely local; no network call is made.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::env;

/// Default document collection.
pub const DEFAULT_COLLECTION: &str = "podcast_dashboard";

/// Default document id.
pub const DEFAULT_DOCUMENT: &str = "main";

/// Default writer tag stamped as `updatedBy`.
pub const DEFAULT_WRITER: &str = "podvault";

/// Values that mean "not filled in yet".
const PLACEHOLDERS: &[&str] = &[
    "seu_app_id",
    "sua_api_key",
    "seu_projeto",
    "seu_project_id",
    "your-api-key",
    "your-project-id",
    "your-app-id",
    "your_api_key",
    "your_project_id",
    "your_app_id",
    "changeme",
    "xxx",
];

/// Why a configuration cannot enable the mirror.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigIssue {
    #[error("missing remote setting: {0}")]
    Missing(&'static str),

    #[error("remote setting '{key}' still holds placeholder '{value}'")]
    Placeholder { key: &'static str, value: String },
}

/// Connection settings for the remote document store.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct MirrorConfig {
    pub api_key: String,
    pub project_id: String,
    pub app_id: String,
    /// Base URL of the document server
    pub endpoint: String,
    pub collection: String,
    pub document: String,
    /// Tag written as `updatedBy`
    pub writer: String,
}

impl MirrorConfig {
    /// Load from `PODVAULT_*` environment variables.
    ///
    /// Missing variables are left empty; [`MirrorConfig::validate`] decides.
    pub fn from_env() -> Self {
        let var = |name: &str| env::var(name).unwrap_or_default();
        Self {
            api_key: var("PODVAULT_API_KEY"),
            project_id: var("PODVAULT_PROJECT_ID"),
            app_id: var("PODVAULT_APP_ID"),
            endpoint: var("PODVAULT_ENDPOINT"),
            collection: var("PODVAULT_COLLECTION"),
            document: var("PODVAULT_DOCUMENT"),
            writer: var("PODVAULT_WRITER"),
        }
    }

    /// Read an externally supplied configuration object.
    ///
    /// Non-string values are treated as missing.
    pub fn from_value(raw: &Value) -> Self {
        let field = |key: &str| {
            raw.get(key)
                .and_then(Value::as_str)
                .map(str::to_string)
                .unwrap_or_default()
        };
        Self {
            api_key: field("apiKey"),
            project_id: field("projectId"),
            app_id: field("appId"),
            endpoint: field("endpoint"),
            collection: field("collection"),
            document: field("document"),
            writer: field("writer"),
        }
    }

    /// Required keys, in the order they are checked.
    fn required(&self) -> [(&'static str, &str); 4] {
        [
            ("apiKey", &self.api_key),
            ("projectId", &self.project_id),
            ("appId", &self.app_id),
            ("endpoint", &self.endpoint),
        ]
    }

    /// Sanity-check the configuration and fill optional defaults.
    pub fn validate(mut self) -> Result<Self, ConfigIssue> {
        for (key, value) in self.required() {
            if value.trim().is_empty() {
                return Err(ConfigIssue::Missing(key));
            }
        }

        let optional = [
            ("collection", self.collection.as_str()),
            ("document", self.document.as_str()),
            ("writer", self.writer.as_str()),
        ];
        for (key, value) in self.required().into_iter().chain(optional) {
            if is_placeholder(value) {
                return Err(ConfigIssue::Placeholder {
                    key,
                    value: value.to_string(),
                });
            }
        }

        if self.collection.trim().is_empty() {
            self.collection = DEFAULT_COLLECTION.to_string();
        }
        if self.document.trim().is_empty() {
            self.document = DEFAULT_DOCUMENT.to_string();
        }
        if self.writer.trim().is_empty() {
            self.writer = DEFAULT_WRITER.to_string();
        }
        self.endpoint = self.endpoint.trim_end_matches('/').to_string();
        Ok(self)
    }
}

fn is_placeholder(value: &str) -> bool {
    let value = value.trim().to_ascii_lowercase();
    PLACEHOLDERS.contains(&value.as_str())
        || (value.starts_with('<') && value.ends_with('>'))
        || value.contains("your_")
        || value.starts_with("seu_")
        || value.starts_with("sua_")
}
