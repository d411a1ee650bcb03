//! Storage for merge-written JSON documents.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use podvault_engine::mirror::merge_fields;
use serde_json::{Map, Value};
use sqlx::{PgPool, Row};
use std::sync::Arc;

/// Address of one document.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DocumentKey {
    pub project: String,
    pub collection: String,
    pub id: String,
}

impl DocumentKey {
    pub fn new(
        project: impl Into<String>,
        collection: impl Into<String>,
        id: impl Into<String>,
    ) -> Self {
        Self {
            project: project.into(),
            collection: collection.into(),
            id: id.into(),
        }
    }
}

/// A stored document with its last write time.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredDocument {
    pub body: Value,
    pub updated_at: DateTime<Utc>,
}

impl<'r> sqlx::FromRow<'r, sqlx::postgres::PgRow> for StoredDocument {
    fn from_row(row: &'r sqlx::postgres::PgRow) -> Result<Self, sqlx::Error> {
        Ok(StoredDocument {
            body: row.try_get("body")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}

/// Where documents live.
#[derive(Debug, Clone)]
pub enum DocumentStore {
    Postgres(PgPool),
    /// Lost on restart; for development and tests
    Memory(Arc<DashMap<DocumentKey, StoredDocument>>),
}

impl DocumentStore {
    /// An empty in-process store.
    pub fn memory() -> Self {
        DocumentStore::Memory(Arc::new(DashMap::new()))
    }

    /// Backend name reported by the health check.
    pub fn backend(&self) -> &'static str {
        match self {
            DocumentStore::Postgres(_) => "postgres",
            DocumentStore::Memory(_) => "memory",
        }
    }

    /// Fetch a document.
    pub async fn get(&self, key: &DocumentKey) -> Result<Option<StoredDocument>, sqlx::Error> {
        match self {
            DocumentStore::Postgres(pool) => get_document(pool, key).await,
            DocumentStore::Memory(map) => Ok(map.get(key).map(|doc| doc.value().clone())),
        }
    }

    /// Merge top-level `fields` into a document, creating it when absent.
    /// Returns the merged document.
    pub async fn merge(
        &self,
        key: &DocumentKey,
        fields: Map<String, Value>,
    ) -> Result<StoredDocument, sqlx::Error> {
        match self {
            DocumentStore::Postgres(pool) => merge_document(pool, key, fields).await,
            DocumentStore::Memory(map) => {
                let mut entry = map.entry(key.clone()).or_insert_with(|| StoredDocument {
                    body: Value::Object(Map::new()),
                    updated_at: Utc::now(),
                });
                merge_fields(&mut entry.body, Value::Object(fields));
                entry.updated_at = Utc::now();
                Ok(entry.value().clone())
            }
        }
    }
}

/// Get a document by key.
pub async fn get_document(
    pool: &PgPool,
    key: &DocumentKey,
) -> Result<Option<StoredDocument>, sqlx::Error> {
    sqlx::query_as::<_, StoredDocument>(
        r#"
        SELECT body, updated_at
        FROM documents
        WHERE project = $1 AND collection = $2 AND document_id = $3
        "#,
    )
    .bind(&key.project)
    .bind(&key.collection)
    .bind(&key.id)
    .fetch_optional(pool)
    .await
}

/// Upsert a document, merging top-level fields into an existing body.
pub async fn merge_document(
    pool: &PgPool,
    key: &DocumentKey,
    fields: Map<String, Value>,
) -> Result<StoredDocument, sqlx::Error> {
    sqlx::query_as::<_, StoredDocument>(
        r#"
        INSERT INTO documents (project, collection, document_id, body)
        VALUES ($1, $2, $3, $4)
        ON CONFLICT (project, collection, document_id) DO UPDATE SET
            body = documents.body || EXCLUDED.body,
            updated_at = NOW()
        RETURNING body, updated_at
        "#,
    )
    .bind(&key.project)
    .bind(&key.collection)
    .bind(&key.id)
    .bind(Value::Object(fields))
    .fetch_one(pool)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn fields(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected an object"),
        }
    }

    #[tokio::test]
    async fn memory_get_missing() {
        let store = DocumentStore::memory();
        let key = DocumentKey::new("p", "c", "d");
        assert!(store.get(&key).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn memory_merge_creates_then_merges() {
        let store = DocumentStore::memory();
        let key = DocumentKey::new("p", "podcast_dashboard", "main");

        store
            .merge(&key, fields(json!({"label": "a", "data": {"x": 1}})))
            .await
            .unwrap();
        let merged = store
            .merge(&key, fields(json!({"label": "b", "updatedBy": "desk"})))
            .await
            .unwrap();

        assert_eq!(
            merged.body,
            json!({"label": "b", "data": {"x": 1}, "updatedBy": "desk"})
        );
        assert_eq!(store.get(&key).await.unwrap().unwrap().body, merged.body);
    }

    #[tokio::test]
    async fn memory_documents_are_isolated() {
        let store = DocumentStore::memory();
        store
            .merge(&DocumentKey::new("p1", "c", "d"), fields(json!({"v": 1})))
            .await
            .unwrap();

        assert!(store
            .get(&DocumentKey::new("p2", "c", "d"))
            .await
            .unwrap()
            .is_none());
        assert_eq!(store.backend(), "memory");
    }
}
