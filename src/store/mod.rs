//! Index sinks: where finished documents go and where queries are answered.
//!
//! The pipeline only depends on the [`IndexSink`] trait. Two
//! implementations ship with the crate:
//!
//! | Sink | Backing | Used by |
//! |------|---------|---------|
//! | [`SqliteSink`] | SQLite FTS5 via sqlx | the `fidx` CLI and HTTP server |
//! | [`MemorySink`] | in-process map | tests and embedders |

mod memory;
mod sqlite;

pub use memory::MemorySink;
pub use sqlite::SqliteSink;

use async_trait::async_trait;

use crate::error::SinkError;
use crate::models::{Document, QueryRequest, QueryResponse};

/// Receives finished documents and answers ranked queries.
///
/// `put` is keyed by [`Document::path`]: putting the same path again
/// replaces the earlier document.
#[async_trait]
pub trait IndexSink: Send + Sync {
    async fn put(&self, doc: &Document) -> Result<(), SinkError>;

    async fn query(&self, request: &QueryRequest) -> Result<QueryResponse, SinkError>;

    /// Flush and release resources. Later `put` calls fail with
    /// [`SinkError::Closed`].
    async fn close(&self) -> Result<(), SinkError>;
}
