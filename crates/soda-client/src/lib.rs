//! Socrata Open Data (SODA) client.
//!
//! A fluent, immutable SoQL query builder and an async HTTP client that
//! classifies each response into rows or a typed error.
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use soda_client::{ClientConfig, DatasetClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let client = DatasetClient::new(
//!         ClientConfig::builder("data.sfgov.org", "your_app_token").build()?,
//!     )?;
//!
//!     // Film locations in San Francisco, sorted by title
//!     let rows = client
//!         .query_dataset("wwmu-gmzc")
//!         .order_ascending("title")
//!         .limit(20)
//!         .fetch()
//!         .await?;
//!
//!     for row in rows {
//!         println!("{:?} at {:?}", row.get_str("title"), row.get_str("locations"));
//!     }
//!     Ok(())
//! }
//! ```
//!
//! # Callbacks and completion contexts
//!
//! `get`, `each`, `get_dataset` and `get_row` return immediately and invoke
//! their callback exactly once (for `each`, once per row or once with the
//! error) after the response arrives. Where the callback runs is decided by
//! the client's [`Dispatcher`]:
//!
//! ```rust,ignore
//! let (dispatcher, mut queue) = soda_client::completion_queue();
//! let client = client.with_dispatcher(Arc::new(dispatcher));
//!
//! client.query_dataset("wwmu-gmzc").each(|row| println!("{:?}", row));
//!
//! // Callbacks run here, on the queue owner's context
//! queue.run_next().await;
//! ```
//!
//! # Error Handling
//!
//! Failed fetches produce a [`SodaError`], grouped by [`ErrorDomain`]:
//!
//! - `Network`: no response was received
//! - `Decode`: the body is not JSON, or not an object / array of objects
//! - `Api`: the server returned an `error` + `message` payload, or a row
//!   lookup came back empty
//!
//! Nothing is retried.

pub mod classify;
pub mod client;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod params;
pub mod query;
pub mod transport;
pub mod types;

// Re-exports for convenience
pub use client::DatasetClient;
pub use config::{ClientConfig, ClientConfigBuilder, DEFAULT_LIMIT};
pub use dispatch::{
    completion_queue, CompletionQueue, Dispatcher, InlineDispatcher, QueueDispatcher,
};
pub use error::{ErrorDomain, Result, SodaError};
pub use params::Parameters;
pub use query::QueryBuilder;
pub use transport::{DatasetRequest, HttpTransport, Transport, TransportResponse};
pub use types::{DatasetResult, Page, Row, RowResult};
