use axum::Json;
use tracing::{info, warn};

use chatline_db::models::ImportOutcome;
use chatline_types::api::{
    Envelope, ExportResponse, ImportDataRequest, ImportResponse, UserRequest,
};

use crate::error::ApiError;
use crate::state::{AppState, spawn_db};

/// `exportData`: the user's messages and groups, in a shape `importData` accepts.
pub async fn export_data(
    state: &AppState,
    req: UserRequest,
) -> Result<Json<Envelope<ExportResponse>>, ApiError> {
    let data = spawn_db(state, move |db| db.export_for(&req.user)).await?;
    Ok(Json(Envelope::ok(ExportResponse { data })))
}

/// `importData`: destructive. Everything the user currently has is deleted
/// before the bundle is written. A bundle that reaches into groups or chats
/// the user is not part of is rejected whole.
pub async fn import_data(
    state: &AppState,
    req: ImportDataRequest,
) -> Result<Json<Envelope<ImportResponse>>, ApiError> {
    warn!(
        "Replacing all data for {} ({} messages, {} groups incoming)",
        req.user,
        req.data.messages.len(),
        req.data.groups.len()
    );

    let user = req.user.clone();
    let outcome = spawn_db(state, move |db| db.replace_for(&req.user, &req.data)).await?;

    match outcome {
        ImportOutcome::Imported { messages, groups } => {
            Ok(Json(Envelope::ok(ImportResponse { messages, groups })))
        }
        ImportOutcome::GroupNamesTaken(names) => {
            info!("Import for {} rejected, group names in use: {:?}", user, names);
            Err(ApiError::BadRequest(format!(
                "Group name already exists: {}",
                names.join(", ")
            )))
        }
        ImportOutcome::ForeignChats(chat_ids) => {
            info!("Import for {} rejected, foreign chats: {:?}", user, chat_ids);
            Err(ApiError::BadRequest(format!(
                "Chats not owned by user: {}",
                chat_ids.join(", ")
            )))
        }
    }
}
