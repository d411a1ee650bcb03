//! HTTP client for the podvault document server.

use super::remote::{RemoteDocumentStore, RemoteError};
use crate::config::MirrorConfig;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde_json::Value;

/// Remote document reached over HTTP.
///
/// `GET` reads the document (404 means absent); `PATCH` merges top-level
/// fields.
#[derive(Debug, Clone)]
pub struct HttpRemote {
    client: Client,
    url: String,
    api_key: String,
    app_id: String,
}

impl HttpRemote {
    pub fn new(config: &MirrorConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    /// Use a preconfigured client (timeouts, proxies).
    pub fn with_client(client: Client, config: &MirrorConfig) -> Self {
        Self {
            client,
            url: document_url(config),
            api_key: config.api_key.clone(),
            app_id: config.app_id.clone(),
        }
    }

    /// Address of the mirrored document.
    pub fn url(&self) -> &str {
        &self.url
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("x-api-key", &self.api_key)
            .header("x-app-id", &self.app_id)
    }
}

fn document_url(config: &MirrorConfig) -> String {
    format!(
        "{}/v1/projects/{}/documents/{}/{}",
        config.endpoint.trim_end_matches('/'),
        config.project_id,
        config.collection,
        config.document
    )
}

fn transport(err: reqwest::Error) -> RemoteError {
    RemoteError::Transport(err.to_string())
}

async fn ensure_success(response: Response) -> Result<Response, RemoteError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(RemoteError::Status {
        code: status.as_u16(),
        body,
    })
}

impl RemoteDocumentStore for HttpRemote {
    async fn read(&self) -> Result<Option<Value>, RemoteError> {
        let response = self
            .authorize(self.client.get(&self.url))
            .send()
            .await
            .map_err(transport)?;

        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }

        let document = ensure_success(response)
            .await?
            .json::<Value>()
            .await
            .map_err(|e| RemoteError::Decode(e.to_string()))?;
        Ok(Some(document))
    }

    async fn write_merge(&self, fields: Value) -> Result<(), RemoteError> {
        let response = self
            .authorize(self.client.patch(&self.url))
            .json(&fields)
            .send()
            .await
            .map_err(transport)?;

        ensure_success(response).await?;
        Ok(())
    }
}
