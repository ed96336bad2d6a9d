use crate::api::backend::{ChangeFeed, RowStore};
use crate::api::events::ChangeFilter;
use crate::api::models::{
    CONVERSATIONS, ChatMessage, Conversation, MESSAGES, MessageType, NewMessage, SenderType,
};
use crate::api::query::{Order, Query};
use crate::api::realtime::{Subscription, SubscriptionHandle};
use crate::cache::ConversationCache;
use crate::error::ApiError;
use crate::unread::UnreadFeed;
use chrono::Utc;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;

const CONVERSATION_LIMIT: usize = 500;

pub(crate) fn decode_rows<T: DeserializeOwned>(rows: Vec<Value>) -> Result<Vec<T>, ApiError> {
    rows.into_iter()
        .map(|row| serde_json::from_value(row).map_err(ApiError::from))
        .collect()
}

/// Conversations and messages for coaches and their clients.
pub struct MessageService<B> {
    backend: Arc<B>,
    cache: Option<Arc<ConversationCache>>,
}

impl<B> Clone for MessageService<B> {
    fn clone(&self) -> Self {
        Self {
            backend: Arc::clone(&self.backend),
            cache: self.cache.clone(),
        }
    }
}

impl<B: RowStore + ChangeFeed> MessageService<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self {
            backend,
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: Arc<ConversationCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    fn participant_query(user_id: &str) -> Query {
        Query::new().any_eq(&[("coach_id", user_id), ("client_id", user_id)])
    }

    /// Every conversation `user_id` takes part in, newest activity first.
    /// Successful fetches refresh the local cache.
    pub async fn get_conversations(&self, user_id: &str) -> Result<Vec<Conversation>, ApiError> {
        let query = Self::participant_query(user_id)
            .order("last_message_at", Order::Desc)
            .limit(CONVERSATION_LIMIT);
        let mut conversations: Vec<Conversation> =
            decode_rows(self.backend.select(CONVERSATIONS, &query).await?)?;
        conversations.sort_by(|a, b| b.last_activity().cmp(&a.last_activity()));

        if let Some(cache) = &self.cache {
            match cache.upsert(&conversations) {
                Ok(written) => log::debug!("Cached {written} changed conversations"),
                Err(err) => log::warn!("Could not cache conversations: {err}"),
            }
        }
        Ok(conversations)
    }

    pub fn cached_conversations(&self, user_id: &str, limit: usize) -> Vec<Conversation> {
        let Some(cache) = &self.cache else {
            return Vec::new();
        };
        cache.conversations_for(user_id, limit).unwrap_or_else(|err| {
            log::warn!("Could not read conversation cache: {err}");
            Vec::new()
        })
    }

    pub async fn get_or_create_conversation(
        &self,
        coach_id: &str,
        client_id: &str,
    ) -> Result<Conversation, ApiError> {
        let query = Query::new().eq("coach_id", coach_id).eq("client_id", client_id).limit(1);
        let existing: Vec<Conversation> =
            decode_rows(self.backend.select(CONVERSATIONS, &query).await?)?;
        if let Some(conv) = existing.into_iter().next() {
            return Ok(conv);
        }
        let row = self
            .backend
            .insert(CONVERSATIONS, json!({ "coach_id": coach_id, "client_id": client_id }))
            .await?;
        Ok(serde_json::from_value(row)?)
    }

    /// Messages of one conversation, oldest first.
    pub async fn get_messages(&self, conversation_id: &str) -> Result<Vec<ChatMessage>, ApiError> {
        let query = Query::new()
            .eq("conversation_id", conversation_id)
            .order("created_at", Order::Asc);
        decode_rows(self.backend.select(MESSAGES, &query).await?)
    }

    pub async fn send_message(
        &self,
        conversation_id: &str,
        sender_id: &str,
        sender_type: SenderType,
        content: &str,
        message_type: MessageType,
    ) -> Result<ChatMessage, ApiError> {
        let new = NewMessage {
            conversation_id: conversation_id.to_string(),
            sender_id: sender_id.to_string(),
            sender_type,
            message_type,
            content: content.to_string(),
        };
        let row = self.backend.insert(MESSAGES, serde_json::to_value(&new)?).await?;
        let message: ChatMessage = serde_json::from_value(row)?;

        let touch = Query::new().eq("id", conversation_id);
        let stamp = json!({ "last_message_at": message.created_at });
        if let Err(err) = self.backend.update(CONVERSATIONS, &touch, stamp).await {
            log::warn!("Could not bump activity of conversation {conversation_id}: {err}");
        }
        Ok(message)
    }

    /// Marks the other party's unread messages as read; returns how many
    /// rows the backend updated.
    pub async fn mark_as_read(&self, conversation_id: &str, reader_id: &str) -> Result<usize, ApiError> {
        let query = Query::new()
            .eq("conversation_id", conversation_id)
            .neq("sender_id", reader_id)
            .eq("is_read", false);
        let updated = self
            .backend
            .update(MESSAGES, &query, json!({ "is_read": true, "read_at": Utc::now() }))
            .await?;
        Ok(updated.len())
    }

    pub async fn get_unread_count(&self, conversation_id: &str, user_id: &str) -> Result<u64, ApiError> {
        let query = Query::new()
            .select("id")
            .eq("conversation_id", conversation_id)
            .neq("sender_id", user_id)
            .eq("is_read", false);
        self.backend.count(MESSAGES, &query).await
    }

    /// Unread messages sent to `user_id` across all of their conversations.
    pub async fn get_total_unread_count(&self, user_id: &str) -> Result<u64, ApiError> {
        let query = Self::participant_query(user_id).select("id");
        let ids: Vec<String> = self
            .backend
            .select(CONVERSATIONS, &query)
            .await?
            .iter()
            .filter_map(|row| row.get("id").and_then(Value::as_str).map(str::to_string))
            .collect();
        if ids.is_empty() {
            return Ok(0);
        }
        let query = Query::new()
            .select("id")
            .in_list("conversation_id", &ids)
            .neq("sender_id", user_id)
            .eq("is_read", false);
        self.backend.count(MESSAGES, &query).await
    }

    /// Notifies on any message or conversation change visible to `user_id`.
    ///
    /// Message changes carry no column filter: the set of conversations grows
    /// while the channel is open, and the backend's row-level security only
    /// delivers message rows from conversations the signed-in user belongs to.
    pub fn subscribe_to_all_conversations(&self, user_id: &str) -> Subscription {
        let changes = vec![
            ChangeFilter::all(MESSAGES),
            ChangeFilter::all(CONVERSATIONS).with_filter(format!("coach_id=eq.{user_id}")),
            ChangeFilter::all(CONVERSATIONS).with_filter(format!("client_id=eq.{user_id}")),
        ];
        let sub = self.backend.subscribe(&format!("unread:{user_id}"), changes);
        log::debug!("Subscribed {}", sub.topic());
        sub
    }

    pub fn subscribe_to_conversation(&self, conversation_id: &str) -> Subscription {
        let changes = vec![
            ChangeFilter::all(MESSAGES).with_filter(format!("conversation_id=eq.{conversation_id}")),
        ];
        self.backend.subscribe(&format!("conversation:{conversation_id}"), changes)
    }

    /// Safe to call on an already closed handle.
    pub fn unsubscribe(&self, handle: &SubscriptionHandle) {
        if handle.close() {
            log::debug!("Unsubscribed {}", handle.topic());
        }
    }
}

impl<B: RowStore + ChangeFeed> UnreadFeed for MessageService<B> {
    async fn total_unread_count(&self, user_id: &str) -> Result<u64, ApiError> {
        self.get_total_unread_count(user_id).await
    }

    fn subscribe_all(&self, user_id: &str) -> Subscription {
        self.subscribe_to_all_conversations(user_id)
    }

    fn unsubscribe(&self, handle: &SubscriptionHandle) {
        MessageService::unsubscribe(self, handle);
    }
}
