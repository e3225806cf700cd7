pub mod aggregate;
pub mod backlog;
pub mod export;
mod game;
mod problem;
mod vote;

pub use vote::{CastOutcome, Reveal};

use crate::config::ServerConfig;
use crate::error::RoomError;
use crate::protocol::{GameSnapshot, ServerMessage};
use crate::types::*;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex, MutexGuard, RwLock};

/// One live game. All mutations go through the mutex, and broadcasts are sent
/// while it is held so subscribers observe events in mutation order.
pub struct Room {
    pub id: GameId,
    /// Fixed at creation
    pub host: Pseudo,
    game: Mutex<Game>,
    tx: broadcast::Sender<ServerMessage>,
}

impl Room {
    fn new(game: Game, capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity);
        Self {
            id: game.id.clone(),
            host: game.host.clone(),
            game: Mutex::new(game),
            tx,
        }
    }

    pub fn is_host(&self, pseudo: &str) -> bool {
        self.host == pseudo
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ServerMessage> {
        self.tx.subscribe()
    }

    /// Clone of the full (unmasked) game record
    pub async fn game(&self) -> Game {
        self.game.lock().await.clone()
    }

    pub async fn snapshot(&self) -> GameSnapshot {
        GameSnapshot::from(&*self.game.lock().await)
    }

    pub async fn is_ended(&self) -> bool {
        self.game.lock().await.status == GameStatus::Ended
    }

    async fn lock(&self) -> MutexGuard<'_, Game> {
        self.game.lock().await
    }

    fn broadcast(&self, msg: ServerMessage) {
        // No subscribers is fine
        let _ = self.tx.send(msg);
    }

    fn broadcast_snapshot(&self, game: &Game) -> GameSnapshot {
        let snapshot = GameSnapshot::from(game);
        self.broadcast(ServerMessage::GameState(snapshot.clone()));
        snapshot
    }
}

/// Process-wide registry of rooms keyed by game id
#[derive(Clone)]
pub struct AppState {
    pub games: Arc<RwLock<HashMap<GameId, Arc<Room>>>>,
    pub config: Arc<ServerConfig>,
}

impl AppState {
    pub fn new() -> Self {
        Self::with_config(ServerConfig::default())
    }

    pub fn with_config(config: ServerConfig) -> Self {
        Self {
            games: Arc::new(RwLock::new(HashMap::new())),
            config: Arc::new(config),
        }
    }

    pub async fn get_room(&self, game_id: &str) -> Result<Arc<Room>, RoomError> {
        self.games
            .read()
            .await
            .get(game_id)
            .cloned()
            .ok_or_else(|| RoomError::GameNotFound(game_id.to_string()))
    }

    pub async fn game_count(&self) -> usize {
        self.games.read().await.len()
    }

    /// Drop a room from the registry. Returns false if it was already gone.
    pub async fn remove_game(&self, game_id: &str) -> bool {
        let removed = self.games.write().await.remove(game_id).is_some();
        if removed {
            tracing::info!("Room {} released", game_id);
        }
        removed
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
