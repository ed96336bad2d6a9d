use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

pub const HEARTBEAT_TOPIC: &str = "phoenix";

/// One frame on the realtime websocket.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RealtimeFrame {
    pub topic: String,
    pub event: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(rename = "ref", default)]
    pub reference: Option<String>,
}

/// Which row changes a channel listens to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ChangeFilter {
    pub event: String,
    pub schema: String,
    pub table: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filter: Option<String>,
}

impl ChangeFilter {
    /// Every insert, update and delete on `table`.
    pub fn all(table: &str) -> Self {
        Self {
            event: "*".to_string(),
            schema: "public".to_string(),
            table: table.to_string(),
            filter: None,
        }
    }

    pub fn with_filter(mut self, filter: String) -> Self {
        self.filter = Some(filter);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Insert,
    Update,
    Delete,
    Other,
}

/// A row changed somewhere in the subscribed scope.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeNotice {
    pub table: String,
    pub kind: ChangeKind,
}

impl RealtimeFrame {
    pub fn join(
        topic: &str,
        changes: &[ChangeFilter],
        access_token: Option<&str>,
        reference: u64,
    ) -> Self {
        let mut payload = json!({
            "config": {
                "broadcast": { "self": false },
                "presence": { "key": "" },
                "postgres_changes": changes,
            }
        });
        if let Some(token) = access_token {
            payload["access_token"] = Value::String(token.to_string());
        }
        Self {
            topic: topic.to_string(),
            event: "phx_join".to_string(),
            payload,
            reference: Some(reference.to_string()),
        }
    }

    pub fn heartbeat(reference: u64) -> Self {
        Self {
            topic: HEARTBEAT_TOPIC.to_string(),
            event: "heartbeat".to_string(),
            payload: json!({}),
            reference: Some(reference.to_string()),
        }
    }

    pub fn leave(topic: &str, reference: u64) -> Self {
        Self {
            topic: topic.to_string(),
            event: "phx_leave".to_string(),
            payload: json!({}),
            reference: Some(reference.to_string()),
        }
    }

    pub fn change_notice(&self) -> Option<ChangeNotice> {
        if self.event != "postgres_changes" {
            return None;
        }
        let data = self.payload.get("data")?;
        let table = data.get("table").and_then(Value::as_str).unwrap_or_default();
        let kind = match data.get("type").and_then(Value::as_str) {
            Some("INSERT") => ChangeKind::Insert,
            Some("UPDATE") => ChangeKind::Update,
            Some("DELETE") => ChangeKind::Delete,
            _ => ChangeKind::Other,
        };
        Some(ChangeNotice {
            table: table.to_string(),
            kind,
        })
    }

    /// Reason text when the server refuses or ends the channel.
    pub fn channel_error(&self) -> Option<String> {
        match self.event.as_str() {
            "phx_reply" => {
                let status = self.payload.get("status").and_then(Value::as_str);
                if status == Some("error") {
                    let reason = self
                        .payload
                        .pointer("/response/reason")
                        .and_then(Value::as_str)
                        .unwrap_or("join refused");
                    Some(reason.to_string())
                } else {
                    None
                }
            }
            "phx_error" => Some("channel errored".to_string()),
            "phx_close" => Some("channel closed by server".to_string()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_frame_carries_changes_and_token() {
        let frame = RealtimeFrame::join(
            "realtime:unread:u1",
            &[ChangeFilter::all("messages")],
            Some("jwt"),
            1,
        );
        let wire = serde_json::to_value(&frame).unwrap();
        assert_eq!(wire["event"], "phx_join");
        assert_eq!(wire["ref"], "1");
        assert_eq!(wire["payload"]["access_token"], "jwt");
        assert_eq!(
            wire["payload"]["config"]["postgres_changes"][0],
            json!({ "event": "*", "schema": "public", "table": "messages" })
        );
    }

    #[test]
    fn postgres_change_becomes_notice() {
        let frame: RealtimeFrame = serde_json::from_str(
            r#"{"topic":"realtime:unread:u1","event":"postgres_changes","ref":null,
                "payload":{"data":{"type":"UPDATE","table":"messages","schema":"public"},"ids":[7]}}"#,
        )
        .unwrap();
        assert_eq!(
            frame.change_notice(),
            Some(ChangeNotice {
                table: "messages".into(),
                kind: ChangeKind::Update,
            })
        );
        assert_eq!(frame.channel_error(), None);
    }

    #[test]
    fn error_reply_is_reported() {
        let frame: RealtimeFrame = serde_json::from_value(json!({
            "topic": "realtime:x",
            "event": "phx_reply",
            "ref": "1",
            "payload": { "status": "error", "response": { "reason": "unauthorized" } }
        }))
        .unwrap();
        assert_eq!(frame.channel_error().as_deref(), Some("unauthorized"));

        let ok: RealtimeFrame = serde_json::from_value(json!({
            "topic": "realtime:x",
            "event": "phx_reply",
            "payload": { "status": "ok", "response": {} }
        }))
        .unwrap();
        assert_eq!(ok.channel_error(), None);
        assert_eq!(ok.change_notice(), None);
    }
}
