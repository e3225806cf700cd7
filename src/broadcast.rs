use crate::state::AppState;
use crate::types::GameId;
use std::sync::Arc;

/// Spawn a background task that releases an ended room once the grace period
/// has passed. Until then the final snapshot and results stay readable.
pub fn spawn_room_reaper(state: Arc<AppState>, game_id: GameId) {
    let grace = state.config.room_grace;
    tracing::debug!("Room {} will be released in {:?}", game_id, grace);

    tokio::spawn(async move {
        tokio::time::sleep(grace).await;

        let Ok(room) = state.get_room(&game_id).await else {
            return;
        };
        if room.is_ended().await {
            state.remove_game(&game_id).await;
        } else {
            tracing::warn!("Room {} is not ended, keeping it", game_id);
        }
    });
}
