use std::sync::Arc;

use anyhow::anyhow;
use tracing::{error, info};

use chatline_db::Database;

use crate::action::ActionTable;
use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub actions: ActionTable,
    /// Key for the external real-time messaging service, handed to clients verbatim.
    pub realtime_api_key: Option<String>,
}

/// Build the shared state. Fails if the action table does not validate.
pub fn new_state(db: Database, realtime_api_key: Option<String>) -> anyhow::Result<AppState> {
    let actions = ActionTable::build()?;
    info!("Action table ready ({} actions)", actions.len());

    Ok(Arc::new(AppStateInner {
        db,
        actions,
        realtime_api_key: realtime_api_key.filter(|k| !k.is_empty()),
    }))
}

/// Run blocking store work off the async runtime.
pub(crate) async fn spawn_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = state.clone();
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Internal(anyhow!("blocking task failed: {}", e))
        })?
        .map_err(ApiError::from)
}
