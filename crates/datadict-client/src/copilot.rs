//! Copilot backend over the dashboard API.

use async_trait::async_trait;

use datadict_copilot::{ChunkStream, CopilotBackend, Result};

use crate::client::DashboardClient;

#[async_trait]
impl CopilotBackend for DashboardClient {
    async fn structured_query(&self, query: &str) -> Result<String> {
        self.generate_sql(query).await.map_err(|e| {
            tracing::debug!(error = %e, "Structured query failed");
            e.into()
        })
    }

    async fn conversational_query(&self, query: &str) -> Result<Option<ChunkStream>> {
        self.stream_chat(query).await.map_err(|e| {
            tracing::debug!(error = %e, "Conversational query failed");
            e.into()
        })
    }
}
