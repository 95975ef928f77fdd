//! HTTP client for the dashboard REST API.
//!
//! This module provides a typed client for the dashboard backend: source
//! management, schema browsing, stats, export, and the copilot endpoints.

use futures::StreamExt;
use reqwest::{Client, StatusCode};

use datadict_copilot::{BackendError, ChunkStream};

use crate::config::ClientConfig;
use crate::error::ClientError;
use crate::types::{
    ApiErrorResponse, CreateSourceRequest, DashboardStats, DatabaseSource, DbType, QueryRequest,
    QueryResponse, SchemaTable,
};

/// Client for the dashboard REST API.
#[derive(Debug, Clone)]
pub struct DashboardClient {
    /// Client for bounded request/response calls.
    client: Client,
    /// Client for streamed answers; no overall timeout.
    stream_client: Client,
    config: ClientConfig,
}

impl DashboardClient {
    /// Create a new dashboard client.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .connect_timeout(config.connect_timeout())
            .build()?;
        let stream_client = Client::builder()
            .connect_timeout(config.connect_timeout())
            .build()?;
        Ok(Self::with_clients(client, stream_client, config))
    }

    /// Create a client using one pre-built HTTP client for every call.
    #[must_use]
    pub fn with_client(client: Client, config: ClientConfig) -> Self {
        Self::with_clients(client.clone(), client, config)
    }

    fn with_clients(client: Client, stream_client: Client, mut config: ClientConfig) -> Self {
        config.base_url = config.base_url.trim_end_matches('/').to_string();
        Self {
            client,
            stream_client,
            config,
        }
    }

    /// Base URL of the backend.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.config.base_url
    }

    /// Build the full URL for an API path.
    fn url(&self, path: &str) -> String {
        format!("{}{}{}", self.config.base_url, self.config.api_prefix, path)
    }

    /// Handle API error responses.
    async fn handle_error(response: reqwest::Response) -> ClientError {
        let status = response.status().as_u16();
        let message = match response.json::<ApiErrorResponse>().await {
            Ok(err) => err.message(),
            Err(_) => "Unknown error".to_string(),
        };
        ClientError::Api { status, message }
    }

    // =========================================================================
    // Copilot Operations
    // =========================================================================

    /// Generate SQL for a natural-language query.
    ///
    /// # Errors
    ///
    /// Returns an error on transport failure, a non-success status, or a
    /// body without a `response` field.
    pub async fn generate_sql(&self, query: &str) -> Result<String, ClientError> {
        self.post_query(&self.config.structured_path, query).await
    }

    async fn post_query(&self, path: &str, query: &str) -> Result<String, ClientError> {
        let url = self.url(path);

        let request = QueryRequest {
            query: query.to_string(),
        };

        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            return Err(Self::handle_error(response).await);
        }

        let body: QueryResponse = response
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))?;

        Ok(body.response)
    }

    /// Ask a question and stream the answer as raw byte chunks.
    ///
    /// Returns `None` if the backend accepted the request but sent an empty
    /// body.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the backend answers with a
    /// non-success status. Failures after the body starts arrive as `Err`
    /// items of the stream.
    pub async fn stream_chat(&self, query: &str) -> Result<Option<ChunkStream>, ClientError> {
        let url = self.url(&self.config.conversational_path);

        let request = QueryRequest {
            query: query.to_string(),
        };

        let response = self.stream_client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            return Err(Self::handle_error(response).await);
        }

        if response.status() == StatusCode::NO_CONTENT || response.content_length() == Some(0) {
            tracing::debug!(url = %url, "Stream response has no body");
            return Ok(None);
        }

        let stream = response
            .bytes_stream()
            .map(|item| {
                item.map(|bytes| bytes.to_vec())
                    .map_err(|e| BackendError::Stream(e.to_string()))
            })
            .boxed();

        Ok(Some(stream))
    }

    // =========================================================================
    // Source Operations
    // =========================================================================

    /// List all registered sources.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body cannot be parsed.
    pub async fn list_sources(&self) -> Result<Vec<DatabaseSource>, ClientError> {
        let url = self.url("/sources");

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(Self::handle_error(response).await);
        }

        let sources: Vec<DatabaseSource> = response
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))?;

        Ok(sources)
    }

    /// Register a new source. The backend starts extraction immediately.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the backend rejects the source
    /// (duplicate name, bad URL), or the body cannot be parsed.
    pub async fn create_source(
        &self,
        name: &str,
        db_type: DbType,
        connection_url: &str,
    ) -> Result<DatabaseSource, ClientError> {
        let url = self.url("/sources");

        let request = CreateSourceRequest {
            name: name.to_string(),
            db_type,
            connection_url: connection_url.to_string(),
        };

        let response = self.client.post(&url).json(&request).send().await?;

        if !response.status().is_success() {
            return Err(Self::handle_error(response).await);
        }

        let source: DatabaseSource = response
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))?;

        Ok(source)
    }

    /// Delete a source and its extracted metadata.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the source does not exist.
    pub async fn delete_source(&self, source_id: i64) -> Result<(), ClientError> {
        let url = self.url(&format!("/sources/{source_id}"));

        let response = self.client.delete(&url).send().await?;

        if response.status() != StatusCode::NO_CONTENT && !response.status().is_success() {
            return Err(Self::handle_error(response).await);
        }

        Ok(())
    }

    /// Trigger re-extraction of one source.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the source does not exist.
    pub async fn sync_source(&self, source_id: i64) -> Result<(), ClientError> {
        let url = self.url(&format!("/sync/{source_id}"));
        self.trigger(&url).await
    }

    /// Trigger re-extraction of every source.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails.
    pub async fn sync_all(&self) -> Result<(), ClientError> {
        let url = self.url("/sync-all");
        self.trigger(&url).await
    }

    async fn trigger(&self, url: &str) -> Result<(), ClientError> {
        let response = self.client.post(url).send().await?;

        if !response.status().is_success() {
            return Err(Self::handle_error(response).await);
        }

        Ok(())
    }

    // =========================================================================
    // Schema Operations
    // =========================================================================

    /// Get the extracted tables of a source.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body cannot be parsed.
    pub async fn get_schema(&self, source_id: i64) -> Result<Vec<SchemaTable>, ClientError> {
        let url = self.url(&format!("/schema/{source_id}"));

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(Self::handle_error(response).await);
        }

        let tables: Vec<SchemaTable> = response
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))?;

        Ok(tables)
    }

    /// Get the dashboard counters.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the body cannot be parsed.
    pub async fn get_stats(&self) -> Result<DashboardStats, ClientError> {
        let url = self.url("/stats");

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(Self::handle_error(response).await);
        }

        let stats: DashboardStats = response
            .json()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))?;

        Ok(stats)
    }

    /// Download the markdown data dictionary of a source.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails or the source does not exist.
    pub async fn export_markdown(&self, source_id: i64) -> Result<String, ClientError> {
        let url = self.url(&format!("/export/{source_id}/markdown"));

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(Self::handle_error(response).await);
        }

        let text = response
            .text()
            .await
            .map_err(|e| ClientError::Parse(e.to_string()))?;

        Ok(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn url_joins_base_prefix_and_path() {
        let client = DashboardClient::new(ClientConfig::with_base_url("http://dash:8000/")).unwrap();
        assert_eq!(client.base_url(), "http://dash:8000");
        assert_eq!(client.url("/sources"), "http://dash:8000/api/v1/sources");
        assert_eq!(
            client.url(&format!("/export/{}/markdown", 7)),
            "http://dash:8000/api/v1/export/7/markdown"
        );
    }
}
