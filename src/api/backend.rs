//! The seams between the services and the hosted backend.
//!
//! [`crate::api::client::BackendClient`] implements all three over HTTP and
//! the realtime websocket; tests substitute in-process fakes.

use crate::api::events::ChangeFilter;
use crate::api::query::Query;
use crate::api::realtime::Subscription;
use crate::error::ApiError;
use serde_json::Value;
use std::future::Future;

pub trait RowStore: Send + Sync + 'static {
    fn select(
        &self,
        table: &str,
        query: &Query,
    ) -> impl Future<Output = Result<Vec<Value>, ApiError>> + Send;

    /// Number of rows matching `query`, counted by the backend.
    fn count(&self, table: &str, query: &Query)
    -> impl Future<Output = Result<u64, ApiError>> + Send;

    /// Inserts one row and returns it as stored.
    fn insert(&self, table: &str, row: Value)
    -> impl Future<Output = Result<Value, ApiError>> + Send;

    /// Applies `patch` to every matching row and returns the updated rows.
    fn update(
        &self,
        table: &str,
        query: &Query,
        patch: Value,
    ) -> impl Future<Output = Result<Vec<Value>, ApiError>> + Send;

    fn delete(&self, table: &str, query: &Query)
    -> impl Future<Output = Result<(), ApiError>> + Send;
}

pub trait BlobStore: Send + Sync + 'static {
    fn upload(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> impl Future<Output = Result<(), ApiError>> + Send;

    fn remove(&self, bucket: &str, keys: &[String])
    -> impl Future<Output = Result<(), ApiError>> + Send;

    fn public_url(&self, bucket: &str, key: &str) -> String;
}

pub trait ChangeFeed: Send + Sync + 'static {
    /// Opens a channel named `name` for the given row changes. Returns
    /// immediately; notices start flowing once the backend accepts the join.
    fn subscribe(&self, name: &str, changes: Vec<ChangeFilter>) -> Subscription;
}
