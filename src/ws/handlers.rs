//! WebSocket message dispatch
//!
//! This module provides the main entry point for handling client messages.
//! Room membership and host authorization are checked here, then the message
//! is dispatched to the host or player handler modules.

use crate::error::RoomError;
use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::{AppState, Room};
use crate::types::{GameSettings, Pseudo};
use std::sync::Arc;

use super::{host, player, Session};

/// Resolve the room and the session's pseudo, or return the error to the client
macro_rules! member_of {
    ($session:expr, $state:expr, $game_id:expr) => {
        match resolve($session, $state, &$game_id).await {
            Ok(found) => found,
            Err(e) => return Some(e.into()),
        }
    };
}

/// Check host authorization and return early if unauthorized
macro_rules! check_host {
    ($room:expr, $pseudo:expr, $action:expr) => {
        if !$room.is_host(&$pseudo) {
            tracing::warn!("{} tried to {} in game {}", $pseudo, $action, $room.id);
            return Some(RoomError::host_only($action).into());
        }
    };
}

/// Look up the room for a game-scoped intent.
///
/// Ended rooms reject everything with GAME_ENDED, before membership is
/// considered, so late or stale clients get a clear answer.
async fn resolve(
    session: &Session,
    state: &Arc<AppState>,
    game_id: &str,
) -> Result<(Arc<Room>, Pseudo), RoomError> {
    let room = state.get_room(game_id).await?;
    if room.is_ended().await {
        return Err(RoomError::GameEnded(room.id.clone()));
    }
    match session.membership() {
        Some(m) if m.game_id == game_id => Ok((room, m.pseudo.clone())),
        _ => Err(RoomError::NotJoined),
    }
}

/// Handle client messages and return optional response
///
/// Responses go to the sending connection only. Room-wide updates reach every
/// member, the sender included, through the room broadcast.
pub async fn handle_message(
    msg: ClientMessage,
    session: &mut Session,
    state: &Arc<AppState>,
) -> Option<ServerMessage> {
    tracing::debug!("Handling {}", msg.kind());

    match msg {
        // Connection messages
        ClientMessage::CreateGame {
            pseudo,
            mode,
            max_players,
            unanimous_first_round,
        } => {
            let settings = GameSettings {
                mode,
                max_players,
                unanimous_first_round,
            };
            player::handle_create_game(state, pseudo, settings).await
        }

        ClientMessage::JoinRoom { game_id, pseudo } => {
            player::handle_join(session, state, game_id, pseudo).await
        }

        ClientMessage::LeaveRoom { game_id } => player::handle_leave(session, &game_id).await,

        // Any member
        ClientMessage::CastVote {
            game_id,
            problem,
            vote,
            pseudo,
        } => {
            let (room, me) = member_of!(session, state, game_id);
            player::handle_cast_vote(&room, &me, pseudo, problem, vote).await
        }

        ClientMessage::SaveResults { game_id } => {
            let (_room, me) = member_of!(session, state, game_id);
            player::handle_save_results(state, &game_id, &me).await
        }

        // Host-only commands (authorization checked before dispatch)
        ClientMessage::StartGame { game_id } => {
            let (room, me) = member_of!(session, state, game_id);
            check_host!(room, me, "start the game");
            host::handle_start_game(&room, &me).await
        }

        ClientMessage::AddProblem { game_id, problem } => {
            let (room, me) = member_of!(session, state, game_id);
            check_host!(room, me, "add problems");
            host::handle_add_problem(&room, &me, problem).await
        }

        ClientMessage::SelectProblem { game_id, problem } => {
            let (room, me) = member_of!(session, state, game_id);
            check_host!(room, me, "select problems");
            host::handle_select_problem(&room, &me, problem).await
        }

        ClientMessage::RevealVote {
            game_id,
            problem,
            round,
        } => {
            let (room, me) = member_of!(session, state, game_id);
            check_host!(room, me, "reveal votes");
            host::handle_reveal(&room, &me, problem, round).await
        }

        ClientMessage::EndGame { game_id } => {
            let (room, me) = member_of!(session, state, game_id);
            check_host!(room, me, "end the game");
            host::handle_end_game(state, &room, &me).await
        }

        ClientMessage::UploadBacklog {
            game_id,
            backlog,
            replace,
        } => {
            let (room, me) = member_of!(session, state, game_id);
            check_host!(room, me, "upload a backlog");
            host::handle_upload_backlog(&room, &me, backlog, replace).await
        }
    }
}

/// Release the session's room membership when its socket closes
pub async fn handle_disconnect(session: &mut Session) {
    if let Some(membership) = session.unbind() {
        membership.room.leave(&membership.pseudo).await;
    }
}
