use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::models::{ChatMessage, ChatSummary, ExportBundle};

/// Presence check run after a request body has been deserialized.
/// Empty strings count as absent.
pub trait Required {
    fn has_required(&self) -> bool;
}

fn present(s: &str) -> bool {
    !s.is_empty()
}

// -- Envelope --

/// Every successful response: `{ "success": true, ...body }`.
#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(flatten)]
    pub body: T,
}

impl<T: Serialize> Envelope<T> {
    pub fn ok(body: T) -> Self {
        Self { success: true, body }
    }
}

/// Body of an envelope that carries nothing but `success`.
#[derive(Debug, Serialize)]
pub struct Ack {}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub success: bool,
    pub error: String,
}

// -- Auth & profile --

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub handle: String,
    pub password: String,
}

impl Required for LoginRequest {
    fn has_required(&self) -> bool {
        present(&self.handle) && present(&self.password)
    }
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub created: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateStatusRequest {
    pub handle: String,
    #[serde(default)]
    pub online: Option<bool>,
    #[serde(default)]
    pub last_seen: Option<String>,
}

impl Required for UpdateStatusRequest {
    fn has_required(&self) -> bool {
        present(&self.handle)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileRequest {
    pub old_handle: String,
    #[serde(default)]
    pub new_handle: Option<String>,
    #[serde(default)]
    pub new_password: Option<String>,
}

impl UpdateProfileRequest {
    pub fn new_handle(&self) -> Option<&str> {
        self.new_handle.as_deref().filter(|h| present(h))
    }

    pub fn new_password(&self) -> Option<&str> {
        self.new_password.as_deref().filter(|p| present(p))
    }
}

impl Required for UpdateProfileRequest {
    fn has_required(&self) -> bool {
        present(&self.old_handle) && (self.new_handle().is_some() || self.new_password().is_some())
    }
}

// -- Search --

#[derive(Debug, Deserialize)]
pub struct SearchRequest {
    pub query: String,
}

impl Required for SearchRequest {
    fn has_required(&self) -> bool {
        present(&self.query)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchResponse {
    pub is_group: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_seen: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub online: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub members: Option<Vec<String>>,
}

// -- Messages --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendMessageRequest {
    pub chat_id: String,
    pub message: ChatMessage,
}

impl Required for SendMessageRequest {
    fn has_required(&self) -> bool {
        present(&self.chat_id)
    }
}

/// Only the timestamp of the referenced message matters; other fields are ignored.
#[derive(Debug, Deserialize)]
pub struct MessageRef {
    pub timestamp: Value,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkAsReadRequest {
    pub chat_id: String,
    pub message: MessageRef,
}

impl Required for MarkAsReadRequest {
    fn has_required(&self) -> bool {
        present(&self.chat_id) && !self.message.timestamp.is_null()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditMessageRequest {
    pub chat_id: String,
    pub index: u64,
    pub content: String,
}

impl Required for EditMessageRequest {
    fn has_required(&self) -> bool {
        present(&self.chat_id) && present(&self.content)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteMessageRequest {
    pub chat_id: String,
    pub index: u64,
}

impl Required for DeleteMessageRequest {
    fn has_required(&self) -> bool {
        present(&self.chat_id)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddReactionRequest {
    pub chat_id: String,
    pub index: u64,
    pub reaction: Value,
}

impl Required for AddReactionRequest {
    fn has_required(&self) -> bool {
        present(&self.chat_id) && !self.reaction.is_null()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClearChatRequest {
    pub chat_id: String,
}

impl Required for ClearChatRequest {
    fn has_required(&self) -> bool {
        present(&self.chat_id)
    }
}

// -- Groups & chats --

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateGroupRequest {
    pub group_name: String,
    pub members: Vec<String>,
}

impl Required for CreateGroupRequest {
    fn has_required(&self) -> bool {
        present(&self.group_name)
    }
}

#[derive(Debug, Serialize)]
pub struct CreateGroupResponse {
    pub members: Vec<String>,
}

/// Body of the actions scoped to one user: `getChats` and `exportData`.
#[derive(Debug, Deserialize)]
pub struct UserRequest {
    pub user: String,
}

impl Required for UserRequest {
    fn has_required(&self) -> bool {
        present(&self.user)
    }
}

#[derive(Debug, Serialize)]
pub struct ChatsResponse {
    pub chats: Vec<ChatSummary>,
}

// -- Export / import --

#[derive(Debug, Serialize)]
pub struct ExportResponse {
    pub data: ExportBundle,
}

#[derive(Debug, Deserialize)]
pub struct ImportDataRequest {
    pub user: String,
    pub data: ExportBundle,
}

impl Required for ImportDataRequest {
    fn has_required(&self) -> bool {
        present(&self.user)
    }
}

/// Counts of what `importData` wrote.
#[derive(Debug, Serialize)]
pub struct ImportResponse {
    pub messages: usize,
    pub groups: usize,
}

// -- Real-time service key --

#[derive(Debug, Serialize)]
pub struct RealtimeKeyResponse {
    pub key: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn envelope_flattens_body() {
        let v = serde_json::to_value(Envelope::ok(LoginResponse { created: true })).unwrap();
        assert_eq!(v, json!({ "success": true, "created": true }));

        let v = serde_json::to_value(Envelope::ok(Ack {})).unwrap();
        assert_eq!(v, json!({ "success": true }));
    }

    #[test]
    fn empty_strings_are_missing() {
        let req: LoginRequest =
            serde_json::from_value(json!({ "handle": "", "password": "x" })).unwrap();
        assert!(!req.has_required());
    }

    #[test]
    fn profile_update_needs_something_to_change() {
        let req: UpdateProfileRequest =
            serde_json::from_value(json!({ "oldHandle": "alice", "newHandle": "" })).unwrap();
        assert!(!req.has_required());

        let req: UpdateProfileRequest =
            serde_json::from_value(json!({ "oldHandle": "alice", "newPassword": "pw" })).unwrap();
        assert!(req.has_required());
        assert_eq!(req.new_handle(), None);
    }

    #[test]
    fn index_zero_is_a_valid_index() {
        let req: DeleteMessageRequest =
            serde_json::from_value(json!({ "action": "deleteMessage", "chatId": "a-b", "index": 0 }))
                .unwrap();
        assert!(req.has_required());
        assert_eq!(req.index, 0);
    }

    #[test]
    fn negative_index_does_not_deserialize() {
        let res = serde_json::from_value::<DeleteMessageRequest>(json!({ "chatId": "a-b", "index": -1 }));
        assert!(res.is_err());
    }
}
