//! Document endpoints.
//!
//! One JSON document per `(project, collection, id)`. `PATCH` merges the
//! top-level fields of the body into the stored document, creating it when
//! absent, and answers with the merged result.

use axum::{
    extract::{Path, State},
    http::{header::HeaderName, HeaderValue},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::Value;

use crate::auth::ApiClient;
use crate::db::{DocumentKey, StoredDocument};
use crate::error::{AppError, Result};
use crate::AppState;

/// Response header carrying the document's last write time.
pub const UPDATED_AT_HEADER: &str = "x-updated-at";

const MAX_SEGMENT_LEN: usize = 128;

/// Create document routes.
pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/v1/projects/{project}/documents/{collection}/{id}",
        get(get_document).patch(patch_document),
    )
}

/// GET - the document, or 404.
async fn get_document(
    State(state): State<AppState>,
    client: ApiClient,
    Path((project, collection, id)): Path<(String, String, String)>,
) -> Result<Response> {
    let key = document_key(project, collection, id)?;

    match state.store.get(&key).await? {
        Some(document) => {
            tracing::debug!(?key, app_id = ?client.app_id, "document read");
            Ok(document_response(document))
        }
        None => Err(AppError::NotFound(format!(
            "document {}/{} does not exist",
            key.collection, key.id
        ))),
    }
}

/// PATCH - merge top-level fields.
async fn patch_document(
    State(state): State<AppState>,
    client: ApiClient,
    Path((project, collection, id)): Path<(String, String, String)>,
    Json(body): Json<Value>,
) -> Result<Response> {
    let key = document_key(project, collection, id)?;
    let Value::Object(fields) = body else {
        return Err(AppError::BadRequest(
            "document body must be a JSON object".to_string(),
        ));
    };

    let field_count = fields.len();
    let document = state.store.merge(&key, fields).await?;
    tracing::debug!(?key, app_id = ?client.app_id, fields = field_count, "document merged");

    Ok(document_response(document))
}

fn document_key(project: String, collection: String, id: String) -> Result<DocumentKey> {
    for (name, value) in [("project", &project), ("collection", &collection), ("id", &id)] {
        if value.trim().is_empty() || value.len() > MAX_SEGMENT_LEN {
            return Err(AppError::BadRequest(format!("invalid {name}")));
        }
    }
    Ok(DocumentKey::new(project, collection, id))
}

fn document_response(document: StoredDocument) -> Response {
    let updated_at = document.updated_at.to_rfc3339();
    let mut response = Json(document.body).into_response();
    if let Ok(value) = HeaderValue::from_str(&updated_at) {
        response
            .headers_mut()
            .insert(HeaderName::from_static(UPDATED_AT_HEADER), value);
    }
    response
}
