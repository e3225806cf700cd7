//! Per-connection state: which room this socket joined, as whom, and the
//! room's broadcast subscription.

use crate::protocol::ServerMessage;
use crate::state::Room;
use crate::types::{GameId, Pseudo};
use std::sync::Arc;
use tokio::sync::broadcast;

pub struct Membership {
    pub game_id: GameId,
    pub pseudo: Pseudo,
    pub room: Arc<Room>,
}

#[derive(Default)]
pub struct Session {
    membership: Option<Membership>,
    rx: Option<broadcast::Receiver<ServerMessage>>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn membership(&self) -> Option<&Membership> {
        self.membership.as_ref()
    }

    pub fn is_member_of(&self, game_id: &str) -> bool {
        self.membership.as_ref().is_some_and(|m| m.game_id == game_id)
    }

    /// Room broadcasts for this connection, once joined
    pub fn receiver_mut(&mut self) -> Option<&mut broadcast::Receiver<ServerMessage>> {
        self.rx.as_mut()
    }

    pub(crate) fn bind(
        &mut self,
        membership: Membership,
        rx: broadcast::Receiver<ServerMessage>,
    ) {
        self.membership = Some(membership);
        self.rx = Some(rx);
    }

    pub(crate) fn unbind(&mut self) -> Option<Membership> {
        self.rx = None;
        self.membership.take()
    }

    /// Stop listening without leaving (the room's channel is gone)
    pub(crate) fn unsubscribe(&mut self) {
        self.rx = None;
    }
}
