//! Message actions. Edit, delete and react address a message by its position
//! in the chat's creation order, so they can miss or hit a neighbour when the
//! same chat is being written concurrently.

use axum::Json;
use tracing::debug;

use chatline_types::api::{
    Ack, AddReactionRequest, ClearChatRequest, DeleteMessageRequest, EditMessageRequest,
    Envelope, MarkAsReadRequest, SendMessageRequest,
};

use crate::error::ApiError;
use crate::state::{AppState, spawn_db};

fn message_not_found() -> ApiError {
    ApiError::NotFound("Message not found".into())
}

/// `sendMessage`: stored as given; the chat id is not checked against anything.
pub async fn send_message(
    state: &AppState,
    req: SendMessageRequest,
) -> Result<Json<Envelope<Ack>>, ApiError> {
    spawn_db(state, move |db| db.insert_message(&req.chat_id, &req.message)).await?;
    Ok(Json(Envelope::ok(Ack {})))
}

pub async fn mark_as_read(
    state: &AppState,
    req: MarkAsReadRequest,
) -> Result<Json<Envelope<Ack>>, ApiError> {
    let chat_id = req.chat_id.clone();
    let touched =
        spawn_db(state, move |db| db.mark_read(&chat_id, &req.message.timestamp)).await?;
    debug!("Marked {} message(s) read in {}", touched, req.chat_id);
    Ok(Json(Envelope::ok(Ack {})))
}

pub async fn edit_message(
    state: &AppState,
    req: EditMessageRequest,
) -> Result<Json<Envelope<Ack>>, ApiError> {
    let updated = spawn_db(state, move |db| {
        db.update_message_at(&req.chat_id, req.index, |message| message.content = req.content)
    })
    .await?;

    if !updated {
        return Err(message_not_found());
    }
    Ok(Json(Envelope::ok(Ack {})))
}

pub async fn delete_message(
    state: &AppState,
    req: DeleteMessageRequest,
) -> Result<Json<Envelope<Ack>>, ApiError> {
    let deleted = spawn_db(state, move |db| db.delete_message_at(&req.chat_id, req.index)).await?;

    if !deleted {
        return Err(message_not_found());
    }
    Ok(Json(Envelope::ok(Ack {})))
}

/// `addReaction`: appends; the same reaction twice is stored twice.
pub async fn add_reaction(
    state: &AppState,
    req: AddReactionRequest,
) -> Result<Json<Envelope<Ack>>, ApiError> {
    let updated = spawn_db(state, move |db| {
        db.update_message_at(&req.chat_id, req.index, |message| {
            message.reactions.push(req.reaction)
        })
    })
    .await?;

    if !updated {
        return Err(message_not_found());
    }
    Ok(Json(Envelope::ok(Ack {})))
}

pub async fn clear_chat(
    state: &AppState,
    req: ClearChatRequest,
) -> Result<Json<Envelope<Ack>>, ApiError> {
    spawn_db(state, move |db| db.clear_chat(&req.chat_id)).await?;
    Ok(Json(Envelope::ok(Ack {})))
}
