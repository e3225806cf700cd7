//! Participant message handlers
//!
//! Handlers for messages any participant may send: creating and joining
//! rooms, voting, and saving results.

use crate::error::RoomError;
use crate::protocol::ServerMessage;
use crate::state::{AppState, CastOutcome, Room};
use crate::types::{GameId, GameSettings, ProblemId, Pseudo, VoteValue};
use std::sync::Arc;

use super::session::Membership;
use super::Session;

pub async fn handle_create_game(
    state: &Arc<AppState>,
    pseudo: Pseudo,
    settings: GameSettings,
) -> Option<ServerMessage> {
    match state.create_game(&pseudo, settings).await {
        Ok(game_id) => Some(ServerMessage::GameCreated { game_id }),
        Err(e) => Some(e.into()),
    }
}

/// Join a room, leaving whatever room this connection was in before.
pub async fn handle_join(
    session: &mut Session,
    state: &Arc<AppState>,
    game_id: GameId,
    pseudo: Pseudo,
) -> Option<ServerMessage> {
    let pseudo = pseudo.trim().to_string();

    // Repeated join on the same connection: just resend the snapshot
    if let Some(current) = session.membership() {
        if current.game_id == game_id && current.pseudo == pseudo {
            return Some(ServerMessage::GameState(current.room.snapshot().await));
        }
    }

    let room = match state.get_room(&game_id).await {
        Ok(room) => room,
        Err(e) => return Some(e.into()),
    };
    let (snapshot, rx) = match room.join(&pseudo).await {
        Ok(joined) => joined,
        Err(e) => {
            tracing::warn!("{:?} could not join game {}: {}", pseudo, game_id, e);
            return Some(e.into());
        }
    };

    if let Some(previous) = session.unbind() {
        previous.room.leave(&previous.pseudo).await;
    }
    session.bind(
        Membership {
            game_id,
            pseudo,
            room,
        },
        rx,
    );

    Some(ServerMessage::GameState(snapshot))
}

pub async fn handle_leave(session: &mut Session, game_id: &str) -> Option<ServerMessage> {
    if !session.is_member_of(game_id) {
        tracing::debug!("Ignoring leave for game {} the session is not in", game_id);
        return None;
    }
    if let Some(membership) = session.unbind() {
        membership.room.leave(&membership.pseudo).await;
    }
    None
}

pub async fn handle_cast_vote(
    room: &Arc<Room>,
    me: &str,
    pseudo: Pseudo,
    problem: ProblemId,
    vote: VoteValue,
) -> Option<ServerMessage> {
    if pseudo.trim() != me {
        tracing::warn!("{} tried to vote as {} in game {}", me, pseudo, room.id);
        return Some(RoomError::Unauthorized("You can only vote as yourself".to_string()).into());
    }

    match room.cast_vote(me, &problem, vote).await {
        // Progress and snapshot reach the voter through the room broadcast
        Ok(CastOutcome::Recorded { .. }) => None,
        Ok(CastOutcome::Ignored { reason }) => Some(ServerMessage::VoteIgnored { problem, reason }),
        Err(e) => Some(e.into()),
    }
}

pub async fn handle_save_results(
    state: &Arc<AppState>,
    game_id: &str,
    me: &str,
) -> Option<ServerMessage> {
    match state.save_results(game_id, me).await {
        Ok((document, file)) => Some(ServerMessage::ResultsSaved { document, file }),
        Err(e) => Some(e.into()),
    }
}
