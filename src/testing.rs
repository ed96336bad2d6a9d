//! In-process stand-in for the hosted backend, used by unit tests.

use crate::api::backend::{BlobStore, ChangeFeed, RowStore};
use crate::api::events::{ChangeFilter, ChangeKind, ChangeNotice};
use crate::api::query::Query;
use crate::api::realtime::{Subscription, SubscriptionSink};
use crate::error::ApiError;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

#[derive(Debug, Clone, PartialEq)]
pub struct Call {
    pub op: &'static str,
    pub target: String,
    pub params: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl Call {
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

#[derive(Default)]
pub struct FakeBackend {
    calls: Mutex<Vec<Call>>,
    rows: Mutex<HashMap<String, Vec<Value>>>,
    count: Mutex<Option<u64>>,
    sinks: Mutex<Vec<SubscriptionSink>>,
    pub fail_uploads: AtomicBool,
    pub fail_removes: AtomicBool,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_rows(self, table: &str, rows: Vec<Value>) -> Self {
        self.rows.lock().unwrap().insert(table.to_string(), rows);
        self
    }

    pub fn with_count(self, count: u64) -> Self {
        *self.count.lock().unwrap() = Some(count);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_for(&self, op: &str) -> Vec<Call> {
        self.calls().into_iter().filter(|c| c.op == op).collect()
    }

    /// Pushes a change notice into every open subscription.
    pub fn emit(&self, table: &str) -> usize {
        let sinks = self.sinks.lock().unwrap();
        sinks
            .iter()
            .filter(|s| {
                s.notify(ChangeNotice {
                    table: table.to_string(),
                    kind: ChangeKind::Insert,
                })
            })
            .count()
    }

    fn record(&self, op: &'static str, target: &str, params: Vec<(String, String)>, body: Option<Value>) {
        self.calls.lock().unwrap().push(Call {
            op,
            target: target.to_string(),
            params,
            body,
        });
    }
}

fn merge(mut base: Value, patch: &Value) -> Value {
    if let (Some(dst), Some(src)) = (base.as_object_mut(), patch.as_object()) {
        for (k, v) in src {
            dst.insert(k.clone(), v.clone());
        }
    }
    base
}

impl RowStore for FakeBackend {
    async fn select(&self, table: &str, query: &Query) -> Result<Vec<Value>, ApiError> {
        self.record("select", table, query.to_params(), None);
        Ok(self.rows.lock().unwrap().get(table).cloned().unwrap_or_default())
    }

    async fn count(&self, table: &str, query: &Query) -> Result<u64, ApiError> {
        self.record("count", table, query.to_params(), None);
        self.count.lock().unwrap().ok_or(ApiError::Status {
            status: 503,
            body: "unavailable".into(),
        })
    }

    async fn insert(&self, table: &str, row: Value) -> Result<Value, ApiError> {
        self.record("insert", table, Vec::new(), Some(row.clone()));
        let stored = json!({ "id": "new-1", "created_at": "2025-01-31T09:00:00Z" });
        Ok(merge(stored, &row))
    }

    async fn update(&self, table: &str, query: &Query, patch: Value) -> Result<Vec<Value>, ApiError> {
        self.record("update", table, query.filters().to_vec(), Some(patch.clone()));
        let rows = self.rows.lock().unwrap().get(table).cloned().unwrap_or_default();
        Ok(rows.into_iter().map(|r| merge(r, &patch)).collect())
    }

    async fn delete(&self, table: &str, query: &Query) -> Result<(), ApiError> {
        self.record("delete", table, query.filters().to_vec(), None);
        Ok(())
    }
}

impl BlobStore for FakeBackend {
    async fn upload(&self, bucket: &str, key: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), ApiError> {
        self.record(
            "upload",
            bucket,
            vec![
                ("key".into(), key.into()),
                ("content_type".into(), content_type.into()),
                ("len".into(), bytes.len().to_string()),
            ],
            None,
        );
        if self.fail_uploads.load(Ordering::SeqCst) {
            return Err(ApiError::Status {
                status: 413,
                body: "Payload too large".into(),
            });
        }
        Ok(())
    }

    async fn remove(&self, bucket: &str, keys: &[String]) -> Result<(), ApiError> {
        self.record(
            "remove",
            bucket,
            keys.iter().map(|k| ("key".to_string(), k.clone())).collect(),
            None,
        );
        if self.fail_removes.load(Ordering::SeqCst) {
            return Err(ApiError::Status {
                status: 500,
                body: "boom".into(),
            });
        }
        Ok(())
    }

    fn public_url(&self, bucket: &str, key: &str) -> String {
        format!("https://fake.local/storage/v1/object/public/{bucket}/{key}")
    }
}

impl ChangeFeed for FakeBackend {
    fn subscribe(&self, name: &str, changes: Vec<ChangeFilter>) -> Subscription {
        self.record(
            "subscribe",
            name,
            Vec::new(),
            Some(serde_json::to_value(&changes).unwrap()),
        );
        let (sub, sink) = Subscription::channel(format!("realtime:{name}"));
        self.sinks.lock().unwrap().push(sink);
        sub
    }
}

pub fn conversation_row(id: &str, coach: &str, client: &str) -> Value {
    json!({
        "id": id,
        "coach_id": coach,
        "client_id": client,
        "last_message_at": null,
        "created_at": "2025-01-01T00:00:00Z"
    })
}

pub fn message_row(id: &str, conversation: &str, sender: &str, read: bool) -> Value {
    json!({
        "id": id,
        "conversation_id": conversation,
        "sender_id": sender,
        "sender_type": "client",
        "message_type": "text",
        "content": format!("message {id}"),
        "is_read": read,
        "created_at": "2025-01-31T08:00:00Z"
    })
}
