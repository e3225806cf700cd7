//! Host-only command handlers
//!
//! All handlers in this module require the host of the room.
//! Authorization is checked in the main dispatch layer before calling these.
//!
//! Successful commands reply with nothing: the resulting snapshot reaches the
//! host through the room broadcast like everyone else.

use crate::broadcast::spawn_room_reaper;
use crate::protocol::ServerMessage;
use crate::state::{AppState, Room};
use crate::types::ProblemId;
use std::sync::Arc;

pub async fn handle_start_game(room: &Arc<Room>, me: &str) -> Option<ServerMessage> {
    tracing::info!("Host starting game {}", room.id);
    room.start(me).await.err().map(Into::into)
}

pub async fn handle_add_problem(room: &Arc<Room>, me: &str, label: String) -> Option<ServerMessage> {
    room.add_problem(me, &label).await.err().map(Into::into)
}

pub async fn handle_select_problem(
    room: &Arc<Room>,
    me: &str,
    problem: ProblemId,
) -> Option<ServerMessage> {
    room.select_problem(me, &problem).await.err().map(Into::into)
}

pub async fn handle_reveal(
    room: &Arc<Room>,
    me: &str,
    problem: ProblemId,
    round: Option<u32>,
) -> Option<ServerMessage> {
    room.reveal(me, &problem, round).await.err().map(Into::into)
}

/// End the game and schedule the room's release after the grace period
pub async fn handle_end_game(
    state: &Arc<AppState>,
    room: &Arc<Room>,
    me: &str,
) -> Option<ServerMessage> {
    match room.end(me).await {
        Ok(_) => {
            spawn_room_reaper(state.clone(), room.id.clone());
            None
        }
        Err(e) => Some(e.into()),
    }
}

pub async fn handle_upload_backlog(
    room: &Arc<Room>,
    me: &str,
    backlog: serde_json::Value,
    replace: bool,
) -> Option<ServerMessage> {
    match room.upload_backlog(me, &backlog, replace).await {
        Ok((added, skipped)) => Some(ServerMessage::BacklogUploaded { added, skipped }),
        Err(e) => Some(e.into()),
    }
}
