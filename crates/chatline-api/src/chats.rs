use axum::Json;

use chatline_db::models::UserRow;
use chatline_types::api::{ChatsResponse, Envelope, UserRequest};
use chatline_types::chat::direct_peer;
use chatline_types::models::{ChatSummary, Group, StoredMessage};

use crate::error::ApiError;
use crate::state::{AppState, spawn_db};

/// `getChats`: every conversation `user` takes part in, most recently active
/// first, followed by member groups that have no messages yet.
pub async fn get_chats(
    state: &AppState,
    req: UserRequest,
) -> Result<Json<Envelope<ChatsResponse>>, ApiError> {
    let user = req.user.clone();
    let (groups, latest, peers) = spawn_db(state, move |db| {
        let groups = db.groups_for_member(&user)?;
        let group_names: Vec<String> = groups.iter().map(|g| g.name.clone()).collect();
        let latest = db.latest_messages_for(&user)?;

        let peer_handles: Vec<String> = latest
            .iter()
            .filter(|m| !group_names.contains(&m.chat_id))
            .filter_map(|m| direct_peer(&m.chat_id, &user).map(str::to_string))
            .collect();
        let peers = db.get_users(&peer_handles)?;

        Ok((groups, latest, peers))
    })
    .await?;

    let chats = summarize(&req.user, groups, latest, &peers);
    Ok(Json(Envelope::ok(ChatsResponse { chats })))
}

/// Join the newest message of each chat with group membership or peer presence.
fn summarize(
    user: &str,
    groups: Vec<Group>,
    latest: Vec<StoredMessage>,
    peers: &[UserRow],
) -> Vec<ChatSummary> {
    let mut chats = Vec::with_capacity(latest.len() + groups.len());

    for stored in latest {
        let summary = if let Some(group) = groups.iter().find(|g| g.name == stored.chat_id) {
            ChatSummary {
                chat_id: stored.chat_id.clone(),
                is_group: true,
                name: group.name.clone(),
                members: Some(group.members.clone()),
                online: None,
                last_seen: None,
                last_message: Some(stored.message),
            }
        } else {
            let peer = direct_peer(&stored.chat_id, user)
                .unwrap_or(stored.chat_id.as_str())
                .to_string();
            let presence = peers.iter().find(|p| p.handle == peer);
            ChatSummary {
                chat_id: stored.chat_id.clone(),
                is_group: false,
                online: presence.map(|p| p.online),
                last_seen: presence.map(|p| p.last_seen.clone()),
                name: peer,
                members: None,
                last_message: Some(stored.message),
            }
        };
        chats.push(summary);
    }

    for group in groups {
        if chats.iter().any(|c| c.is_group && c.chat_id == group.name) {
            continue;
        }
        chats.push(ChatSummary {
            chat_id: group.name.clone(),
            is_group: true,
            name: group.name,
            members: Some(group.members),
            online: None,
            last_seen: None,
            last_message: None,
        });
    }

    chats
}
