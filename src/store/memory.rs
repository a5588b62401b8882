//! In-process `DocumentStore` used by tests and local composition.
//!
//! Push notification works like the websocket `ConnectionRegistry`: every
//! subscriber holds the receiving half of an unbounded channel, and senders
//! whose receiver has gone away are pruned on the next broadcast.

use async_trait::async_trait;
use serde_json::Value;
use std::cmp::Ordering;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedSender};
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::store::{Document, DocumentStore, FieldOp, Fields, Filter, OrderBy, StoreSubscription};

struct StoredDoc {
    /// Insertion order, the tie-breaker for equal order-by keys.
    seq: u64,
    fields: Fields,
}

struct Watcher {
    filters: Vec<Filter>,
    order: Option<OrderBy>,
    sender: UnboundedSender<Vec<Document>>,
}

#[derive(Default)]
struct Inner {
    collections: HashMap<String, HashMap<String, StoredDoc>>,
    watchers: HashMap<String, Vec<Watcher>>,
    failing: HashSet<String>,
    next_seq: u64,
}

#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every write to `collection` fail with `AppError::Store` until
    /// turned off again. Reads are unaffected.
    pub async fn fail_writes(&self, collection: &str, failing: bool) {
        let mut inner = self.inner.write().await;
        if failing {
            inner.failing.insert(collection.to_string());
        } else {
            inner.failing.remove(collection);
        }
    }

    fn check_writable(inner: &Inner, collection: &str) -> AppResult<()> {
        if inner.failing.contains(collection) {
            return Err(AppError::Store(format!("write to {collection} refused")));
        }
        Ok(())
    }

    fn evaluate(
        inner: &Inner,
        collection: &str,
        filters: &[Filter],
        order: &Option<OrderBy>,
    ) -> Vec<Document> {
        let Some(docs) = inner.collections.get(collection) else {
            return Vec::new();
        };
        let mut matched: Vec<(u64, Document)> = docs
            .iter()
            .filter(|(_, doc)| {
                filters
                    .iter()
                    .all(|f| doc.fields.get(&f.field) == Some(&f.equals))
            })
            .map(|(id, doc)| {
                (
                    doc.seq,
                    Document {
                        id: id.clone(),
                        fields: doc.fields.clone(),
                    },
                )
            })
            .collect();
        matched.sort_by(|(seq_a, a), (seq_b, b)| {
            let by_field = match order {
                Some(order) => {
                    let ord = cmp_values(a.fields.get(&order.field), b.fields.get(&order.field));
                    if order.descending {
                        ord.reverse()
                    } else {
                        ord
                    }
                }
                None => Ordering::Equal,
            };
            by_field.then(seq_a.cmp(seq_b))
        });
        matched.into_iter().map(|(_, doc)| doc).collect()
    }

    fn notify(inner: &mut Inner, collection: &str) {
        let Some(watchers) = inner.watchers.remove(collection) else {
            return;
        };
        let kept: Vec<Watcher> = watchers
            .into_iter()
            .filter(|w| {
                let snapshot = Self::evaluate(inner, collection, &w.filters, &w.order);
                w.sender.send(snapshot).is_ok()
            })
            .collect();
        if !kept.is_empty() {
            inner.watchers.insert(collection.to_string(), kept);
        }
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn create(&self, collection: &str, fields: Fields) -> AppResult<String> {
        let mut inner = self.inner.write().await;
        Self::check_writable(&inner, collection)?;
        let id = Uuid::new_v4().to_string();
        let seq = inner.next_seq;
        inner.next_seq += 1;
        inner
            .collections
            .entry(collection.to_string())
            .or_default()
            .insert(id.clone(), StoredDoc { seq, fields });
        Self::notify(&mut inner, collection);
        Ok(id)
    }

    async fn get(&self, collection: &str, id: &str) -> AppResult<Option<Document>> {
        let inner = self.inner.read().await;
        Ok(inner
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|doc| Document {
                id: id.to_string(),
                fields: doc.fields.clone(),
            }))
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        ops: Vec<(String, FieldOp)>,
    ) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        Self::check_writable(&inner, collection)?;
        let seq = inner.next_seq;
        inner.next_seq += 1;
        let doc = inner
            .collections
            .entry(collection.to_string())
            .or_default()
            .entry(id.to_string())
            .or_insert_with(|| StoredDoc {
                seq,
                fields: Fields::new(),
            });
        for (field, op) in ops {
            match op {
                FieldOp::Set(value) => {
                    doc.fields.insert(field, value);
                }
                FieldOp::Increment(delta) => {
                    let current = doc
                        .fields
                        .get(&field)
                        .and_then(Value::as_i64)
                        .unwrap_or(0);
                    doc.fields.insert(field, Value::from(current + delta));
                }
            }
        }
        Self::notify(&mut inner, collection);
        Ok(())
    }

    async fn delete(&self, collection: &str, id: &str) -> AppResult<()> {
        let mut inner = self.inner.write().await;
        Self::check_writable(&inner, collection)?;
        if let Some(docs) = inner.collections.get_mut(collection) {
            docs.remove(id);
        }
        Self::notify(&mut inner, collection);
        Ok(())
    }

    async fn query(
        &self,
        collection: &str,
        filters: &[Filter],
        order: Option<OrderBy>,
    ) -> AppResult<Vec<Document>> {
        let inner = self.inner.read().await;
        Ok(Self::evaluate(&inner, collection, filters, &order))
    }

    async fn subscribe(
        &self,
        collection: &str,
        filters: &[Filter],
        order: Option<OrderBy>,
    ) -> AppResult<StoreSubscription> {
        let mut inner = self.inner.write().await;
        let (tx, rx) = unbounded_channel();
        let watcher = Watcher {
            filters: filters.to_vec(),
            order,
            sender: tx,
        };
        let snapshot = Self::evaluate(&inner, collection, &watcher.filters, &watcher.order);
        let _ = watcher.sender.send(snapshot);
        inner
            .watchers
            .entry(collection.to_string())
            .or_default()
            .push(watcher);
        Ok(StoreSubscription::new(rx))
    }
}

/// Field comparison for order-by. Null and missing sort first; mixed types
/// compare equal and fall back to insertion order.
fn cmp_values(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    let a = a.filter(|v| !v.is_null());
    let b = b.filter(|v| !v.is_null());
    match (a, b) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Less,
        (Some(_), None) => Ordering::Greater,
        (Some(Value::String(x)), Some(Value::String(y))) => x.cmp(y),
        (Some(Value::Number(x)), Some(Value::Number(y))) => x
            .as_f64()
            .unwrap_or(0.0)
            .partial_cmp(&y.as_f64().unwrap_or(0.0))
            .unwrap_or(Ordering::Equal),
        (Some(Value::Bool(x)), Some(Value::Bool(y))) => x.cmp(y),
        _ => Ordering::Equal,
    }
}
