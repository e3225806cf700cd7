use super::{AppState, Room};
use crate::error::RoomError;
use crate::protocol::{GameSnapshot, ServerMessage};
use crate::types::*;
use rand::Rng;
use std::sync::Arc;
use tokio::sync::broadcast;

/// Safe character set for game codes (excludes 0/O, 1/I/L to avoid confusion)
const CODE_CHARS: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";
const CODE_LENGTH: usize = 5;

fn generate_game_code() -> String {
    let mut rng = rand::rng();
    (0..CODE_LENGTH)
        .map(|_| CODE_CHARS[rng.random_range(0..CODE_CHARS.len())] as char)
        .collect()
}

fn validate_pseudo(pseudo: &str) -> Result<Pseudo, RoomError> {
    let pseudo = pseudo.trim();
    if pseudo.is_empty() {
        return Err(RoomError::Validation("Pseudo must not be empty".to_string()));
    }
    Ok(pseudo.to_string())
}

fn now() -> String {
    chrono::Utc::now().to_rfc3339()
}

impl Game {
    pub fn new(id: GameId, host: Pseudo, settings: GameSettings) -> Self {
        let created_at = now();
        Self {
            id,
            version: 1,
            status: GameStatus::Waiting,
            settings,
            participants: vec![Participant {
                pseudo: host.clone(),
                role: Role::Host,
                connected: false,
                connections: 0,
                joined_at: created_at.clone(),
            }],
            host,
            problems: Vec::new(),
            current_problem: None,
            votes: Default::default(),
            concluded: Default::default(),
            rounds: Default::default(),
            next_cast_seq: 0,
            created_at,
            ended_at: None,
        }
    }

    pub fn is_host(&self, pseudo: &str) -> bool {
        self.host == pseudo
    }

    pub fn participant(&self, pseudo: &str) -> Option<&Participant> {
        self.participants.iter().find(|p| p.pseudo == pseudo)
    }

    /// Non-host participants currently in the roster
    pub fn player_count(&self) -> usize {
        self.participants
            .iter()
            .filter(|p| p.role == Role::Player)
            .count()
    }

    pub(super) fn touch(&mut self) {
        self.version += 1;
    }

    pub(super) fn ensure_open(&self) -> Result<(), RoomError> {
        if self.status == GameStatus::Ended {
            return Err(RoomError::GameEnded(self.id.clone()));
        }
        Ok(())
    }

    pub(super) fn ensure_participant(&self, pseudo: &str) -> Result<(), RoomError> {
        if self.participant(pseudo).is_none() {
            return Err(RoomError::NotJoined);
        }
        Ok(())
    }

    pub(super) fn ensure_host(&self, pseudo: &str, action: &str) -> Result<(), RoomError> {
        if !self.is_host(pseudo) {
            tracing::warn!("{} tried to {} in game {} without being host", pseudo, action, self.id);
            return Err(RoomError::host_only(action));
        }
        Ok(())
    }

    pub(super) fn ensure_active(&self, action: &str) -> Result<(), RoomError> {
        if self.status != GameStatus::Active {
            return Err(RoomError::Precondition(format!(
                "The game must be started to {}",
                action
            )));
        }
        Ok(())
    }

    /// Register a connection for `pseudo`. Returns whether the visible roster changed.
    pub fn join(&mut self, pseudo: &str) -> Result<bool, RoomError> {
        let pseudo = validate_pseudo(pseudo)?;

        // Late joiners of an ended game only get the final snapshot
        if self.status == GameStatus::Ended {
            return Ok(false);
        }

        if let Some(existing) = self.participants.iter_mut().find(|p| p.pseudo == pseudo) {
            existing.connections += 1;
            let was_connected = existing.connected;
            existing.connected = true;
            if !was_connected {
                self.touch();
            }
            return Ok(!was_connected);
        }

        if let Some(max) = self.settings.max_players {
            if self.player_count() >= max as usize {
                return Err(RoomError::GameFull { max });
            }
        }

        self.participants.push(Participant {
            pseudo,
            role: Role::Player,
            connected: true,
            connections: 1,
            joined_at: now(),
        });
        self.touch();
        Ok(true)
    }

    /// Drop one connection for `pseudo`. Players leave the roster with their
    /// last connection; the host stays, marked disconnected.
    pub fn leave(&mut self, pseudo: &str) -> bool {
        if self.status == GameStatus::Ended {
            return false;
        }
        let Some(index) = self.participants.iter().position(|p| p.pseudo == pseudo) else {
            return false;
        };

        let participant = &mut self.participants[index];
        participant.connections = participant.connections.saturating_sub(1);
        if participant.connections > 0 {
            return false;
        }

        if participant.role == Role::Host {
            participant.connected = false;
        } else {
            self.participants.remove(index);
        }
        self.touch();
        true
    }

    pub fn start(&mut self, pseudo: &str) -> Result<(), RoomError> {
        self.ensure_open()?;
        self.ensure_host(pseudo, "start the game")?;
        if self.status != GameStatus::Waiting {
            return Err(RoomError::Unauthorized(
                "The game has already started".to_string(),
            ));
        }
        self.status = GameStatus::Active;
        self.touch();
        Ok(())
    }

    pub fn end(&mut self, pseudo: &str) -> Result<(), RoomError> {
        self.ensure_open()?;
        self.ensure_host(pseudo, "end the game")?;
        self.status = GameStatus::Ended;
        self.ended_at = Some(now());
        self.touch();
        Ok(())
    }
}

impl AppState {
    /// Open a new room with `host` as its owner. The host is in the roster but
    /// not connected until they join.
    pub async fn create_game(
        &self,
        host: &str,
        mut settings: GameSettings,
    ) -> Result<GameId, RoomError> {
        let host = validate_pseudo(host)?;
        if settings.max_players == Some(0) {
            return Err(RoomError::Validation(
                "max_players must be at least 1".to_string(),
            ));
        }
        if settings.max_players.is_none() {
            settings.max_players = self.config.default_max_players;
        }

        let mut games = self.games.write().await;
        let game_id = loop {
            let code = generate_game_code();
            if !games.contains_key(&code) {
                break code;
            }
        };

        tracing::info!(
            "Creating game {} for host {} (mode: {:?}, max players: {:?})",
            game_id,
            host,
            settings.mode,
            settings.max_players
        );

        let game = Game::new(game_id.clone(), host, settings);
        games.insert(
            game_id.clone(),
            Arc::new(Room::new(game, self.config.broadcast_capacity)),
        );
        Ok(game_id)
    }
}

impl Room {
    /// Join (or reconnect) and subscribe to the room's broadcasts.
    ///
    /// The subscription is taken after the join broadcast so the joiner sees
    /// that snapshot once, as the direct reply, and misses nothing after it.
    pub async fn join(
        &self,
        pseudo: &str,
    ) -> Result<(GameSnapshot, broadcast::Receiver<ServerMessage>), RoomError> {
        let mut game = self.lock().await;
        let changed = game.join(pseudo)?;
        let snapshot = if changed {
            self.broadcast_snapshot(&game)
        } else {
            GameSnapshot::from(&*game)
        };
        let rx = self.subscribe();
        tracing::info!("{} joined game {}", pseudo.trim(), self.id);
        Ok((snapshot, rx))
    }

    pub async fn leave(&self, pseudo: &str) {
        let mut game = self.lock().await;
        if game.leave(pseudo) {
            tracing::info!("{} left game {}", pseudo, self.id);
            self.broadcast_snapshot(&game);
        }
    }

    pub async fn start(&self, pseudo: &str) -> Result<GameSnapshot, RoomError> {
        let mut game = self.lock().await;
        game.start(pseudo)?;
        tracing::info!("Game {} started", self.id);
        Ok(self.broadcast_snapshot(&game))
    }

    pub async fn end(&self, pseudo: &str) -> Result<GameSnapshot, RoomError> {
        let mut game = self.lock().await;
        game.end(pseudo)?;
        tracing::info!("Game {} ended by {}", self.id, pseudo);
        self.broadcast(ServerMessage::GameEnded {
            game_id: self.id.clone(),
            message: "The host has ended the game".to_string(),
        });
        Ok(self.broadcast_snapshot(&game))
    }
}
