//! HTTP client for the DataDict dashboard API.
//!
//! Wraps the dashboard REST endpoints (sources, schema, stats, export) and
//! implements [`CopilotBackend`](datadict_copilot::CopilotBackend) on top of
//! the copilot endpoints, so a [`DashboardClient`] can drive a
//! [`SessionController`](datadict_copilot::SessionController) directly.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use datadict_client::{ClientConfig, DashboardClient};
//! use datadict_copilot::SessionController;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let client = Arc::new(DashboardClient::new(ClientConfig::default())?);
//!
//! for source in client.list_sources().await? {
//!     println!("{} ({})", source.name, source.db_type);
//! }
//!
//! let session = SessionController::with_defaults(client);
//! session.submit_and_wait("which tables hold customer emails?").await;
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

pub mod client;
pub mod config;
mod copilot;
pub mod error;
pub mod types;

pub use client::DashboardClient;
pub use config::ClientConfig;
pub use error::ClientError;
pub use types::{
    ApiErrorResponse, ColumnInfo, CreateSourceRequest, DashboardStats, DatabaseSource, DbType,
    ParseDbTypeError, QueryRequest, QueryResponse, SchemaTable,
};
