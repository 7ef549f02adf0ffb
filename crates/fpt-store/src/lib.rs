//! # fpt-store
//!
//! Access to the hosted relational store that holds the project tables.
//!
//! - [`RemoteStore`]: the capability every backup, restore and notification
//!   component is written against
//! - [`RestStore`]: PostgREST over HTTP (`/rest/v1/...`)
//! - [`MemoryStore`]: in-memory tables with failure injection, used by tests
//!   and dry rehearsals
//! - [`fetch_all`]: paginated full-table read

mod error;
mod fetch;
mod http;
mod memory;
pub mod query;
mod rest;

pub use error::StoreError;
pub use fetch::fetch_all;
pub use memory::{Faults, MemoryStore};
pub use query::{Filter, Order, Query};
pub use rest::RestStore;

use async_trait::async_trait;
use fpt_core::row::Row;
use serde_json::Value;

/// Request/response contract with the remote store.
///
/// Implementations must be usable from one task at a time; no method is
/// called concurrently by the components in this workspace.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Read `limit` rows starting at `offset`, in the store's default order.
    async fn fetch_page(&self, table: &str, offset: usize, limit: usize)
    -> Result<Vec<Row>, StoreError>;

    /// Filtered read.
    async fn select(&self, query: &Query) -> Result<Vec<Row>, StoreError>;

    /// Insert rows, merging into existing rows that share `conflict_column`.
    /// Running the same upsert twice leaves the table unchanged.
    async fn upsert(&self, table: &str, rows: &[Row], conflict_column: &str)
    -> Result<(), StoreError>;

    /// Delete every row of `table`.
    async fn delete_all(&self, table: &str) -> Result<(), StoreError>;

    /// Exact number of rows matching `query`'s filters.
    async fn count_where(&self, query: &Query) -> Result<u64, StoreError>;

    /// Call a remote procedure with named arguments.
    async fn rpc(&self, function: &str, args: Value) -> Result<Value, StoreError>;

    /// Exact live row count of `table`.
    async fn count(&self, table: &str) -> Result<u64, StoreError> {
        self.count_where(&Query::table(table)).await
    }
}
