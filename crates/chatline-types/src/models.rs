use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The message document clients send and receive.
/// Known fields are typed; anything else the client attached is kept verbatim.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub content: String,
    pub timestamp: Value,
    #[serde(default)]
    pub read: bool,
    #[serde(default)]
    pub reactions: Vec<Value>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A message as persisted: the conversation key, the document, and its
/// creation time (the only ordering key within a chat).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredMessage {
    pub chat_id: String,
    pub message: ChatMessage,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    pub name: String,
    pub members: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,
}

/// Everything a user owns, as produced by `exportData` and consumed by `importData`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportBundle {
    #[serde(default)]
    pub messages: Vec<StoredMessage>,
    #[serde(default)]
    pub groups: Vec<Group>,
}

/// One row of the chat list.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatSummary {
    pub chat_id: String,
    pub is_group: bool,
    /// Group name, or the other participant's handle for direct chats.
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub online: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message: Option<ChatMessage>,
}
