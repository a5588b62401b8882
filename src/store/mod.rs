use async_trait::async_trait;
use futures_util::Stream;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc::UnboundedReceiver;

use crate::error::{AppError, AppResult};

pub mod memory;

/// Raw field map of one stored record.
pub type Fields = serde_json::Map<String, Value>;

/// A stored record together with its store-assigned id.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Fields,
}

impl Document {
    /// Decodes the document into a typed model, exposing the store-assigned
    /// id under the `id` field.
    pub fn decode<T: DeserializeOwned>(&self) -> AppResult<T> {
        let mut fields = self.fields.clone();
        fields.insert("id".to_string(), Value::String(self.id.clone()));
        serde_json::from_value(Value::Object(fields)).map_err(AppError::from)
    }
}

/// Serializes a model into a field map, dropping the `id` field (ids are
/// carried by the store, not inside the record).
pub fn to_fields<T: Serialize>(value: &T) -> AppResult<Fields> {
    match serde_json::to_value(value)? {
        Value::Object(mut fields) => {
            fields.remove("id");
            Ok(fields)
        }
        other => Err(AppError::Serialization(format!(
            "expected an object, got {other}"
        ))),
    }
}

/// A single field mutation inside a merge update.
#[derive(Debug, Clone)]
pub enum FieldOp {
    Set(Value),
    /// Atomic counter bump; a missing field counts as zero.
    Increment(i64),
}

/// Equality filter on one field.
#[derive(Debug, Clone)]
pub struct Filter {
    pub field: String,
    pub equals: Value,
}

impl Filter {
    pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            equals: value.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrderBy {
    pub field: String,
    pub descending: bool,
}

impl OrderBy {
    pub fn asc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: false,
        }
    }

    pub fn desc(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            descending: true,
        }
    }
}

/// Live query handle. Each emission is the complete current result set, not a
/// delta. Dropping the handle cancels the subscription; no buffered emissions
/// are delivered afterwards.
pub struct StoreSubscription {
    rx: UnboundedReceiver<Vec<Document>>,
}

impl StoreSubscription {
    pub fn new(rx: UnboundedReceiver<Vec<Document>>) -> Self {
        Self { rx }
    }

    pub async fn next_snapshot(&mut self) -> Option<Vec<Document>> {
        self.rx.recv().await
    }
}

impl Stream for StoreSubscription {
    type Item = Vec<Document>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        self.rx.poll_recv(cx)
    }
}

/// The document-store collaborator. Everything the messaging core persists
/// goes through this seam; the backing implementation is injected at the
/// composition root.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Stores a new record and returns its store-assigned id.
    async fn create(&self, collection: &str, fields: Fields) -> AppResult<String>;

    async fn get(&self, collection: &str, id: &str) -> AppResult<Option<Document>>;

    /// Merge update: listed fields are written, everything else is preserved.
    /// A record that does not exist yet is implicitly created (upsert).
    async fn update(&self, collection: &str, id: &str, ops: Vec<(String, FieldOp)>)
        -> AppResult<()>;

    async fn delete(&self, collection: &str, id: &str) -> AppResult<()>;

    /// Point-in-time query.
    async fn query(
        &self,
        collection: &str,
        filters: &[Filter],
        order: Option<OrderBy>,
    ) -> AppResult<Vec<Document>>;

    /// Live query: emits the current result set immediately, then again on
    /// every change to the collection, until the handle is dropped.
    async fn subscribe(
        &self,
        collection: &str,
        filters: &[Filter],
        order: Option<OrderBy>,
    ) -> AppResult<StoreSubscription>;
}
