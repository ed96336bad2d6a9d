//! Selection state of the messages page: a conversation list beside a chat
//! pane, collapsing to one pane at a time on narrow layouts.

use crate::api::models::Conversation;
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessagesPage {
    selected: Option<String>,
    chat_visible: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaneLayout {
    pub show_list: bool,
    pub show_chat: bool,
}

impl MessagesPage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn selected(&self) -> Option<&str> {
        self.selected.as_deref()
    }

    pub fn is_chat_visible(&self) -> bool {
        self.chat_visible
    }

    /// Selecting always reveals the chat pane.
    pub fn select(&mut self, conversation_id: &str) {
        self.selected = Some(conversation_id.to_string());
        self.chat_visible = true;
    }

    /// Hides the chat pane; the selection stays.
    pub fn back(&mut self) {
        self.chat_visible = false;
    }

    pub fn layout(&self, narrow: bool) -> PaneLayout {
        if !narrow {
            return PaneLayout {
                show_list: true,
                show_chat: true,
            };
        }
        let chat = self.chat_visible && self.selected.is_some();
        PaneLayout {
            show_list: !chat,
            show_chat: chat,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversationRow {
    pub id: String,
    pub label: String,
    pub last_activity: DateTime<Utc>,
    pub selected: bool,
}

/// Rows for the conversation list as seen by `viewer_id`.
pub fn conversation_rows(conversations: &[Conversation], viewer_id: &str, page: &MessagesPage) -> Vec<ConversationRow> {
    conversations
        .iter()
        .map(|c| ConversationRow {
            id: c.id.clone(),
            label: c.display_name(viewer_id),
            last_activity: c.last_activity(),
            selected: page.selected() == Some(c.id.as_str()),
        })
        .collect()
}
