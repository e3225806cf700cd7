//! Client session controller.
//!
//! A transport-free mirror of one participant's view of a room. It turns user
//! intents into `ClientMessage`s after checking local preconditions, and folds
//! every `ServerMessage` back into its state. The server stays authoritative:
//! local echoes (selected problem, round counter, own vote) are overwritten by
//! each applied snapshot.

use crate::protocol::{ClientMessage, GameSnapshot, ServerMessage};
use crate::state::export::ResultsDocument;
use crate::types::*;
use std::time::{Duration, Instant};

/// How long an intent may go unanswered before the session reports itself stale
pub const DEFAULT_ACK_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Disconnected,
    /// In the room, no problem selected
    Joined,
    /// A problem is selected and this participant has not voted yet
    Voting,
    AwaitingReveal,
    Revealed,
    Ended,
}

/// Precondition failures caught before anything is sent
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum LocalNotice {
    #[error("Pseudo must not be empty")]
    EmptyPseudo,
    #[error("Game id must not be empty")]
    EmptyGameId,
    #[error("Join a game first")]
    NotJoined,
    #[error("Only the host can {0}")]
    HostOnly(&'static str),
    #[error("The game has not started yet")]
    NotStarted,
    #[error("The game has already started")]
    AlreadyStarted,
    #[error("The game has ended")]
    GameEnded,
    #[error("Select a problem first")]
    NoProblemSelected,
    #[error("Unknown problem {0}")]
    UnknownProblem(ProblemId),
    #[error("Problem label must not be empty")]
    EmptyLabel,
    #[error("Vote must not be empty")]
    EmptyVote,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServerNotice {
    pub code: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct LastReveal {
    pub problem: ProblemId,
    pub round: u32,
    pub display: String,
}

/// Server message that settles an emitted intent
#[derive(Debug, Clone, PartialEq)]
enum Awaits {
    Created,
    Snapshot,
    Started,
    ProblemAdded { known: usize },
    Selected(ProblemId),
    Vote(ProblemId),
    Reveal(ProblemId),
    Ended,
    Backlog,
    Results,
}

#[derive(Debug, Clone)]
struct Pending {
    kind: &'static str,
    awaits: Awaits,
    sent_at: Instant,
}

impl Pending {
    /// Errors are only ever sent to the originating connection, so any error
    /// settles the intent. Broadcasts only count when they reflect it.
    fn answered_by(&self, msg: &ServerMessage, me: Option<&str>, game_id: Option<&str>) -> bool {
        if let ServerMessage::GameState(snapshot) = msg {
            if game_id != Some(snapshot.game_id.as_str()) {
                return false;
            }
        }

        match (&self.awaits, msg) {
            (_, ServerMessage::Error { .. }) | (_, ServerMessage::GameEnded { .. }) => true,
            (Awaits::Created, ServerMessage::GameCreated { .. }) => true,
            (Awaits::Snapshot, ServerMessage::GameState(_)) => true,
            (Awaits::Started, ServerMessage::GameState(s)) => s.status != GameStatus::Waiting,
            (Awaits::ProblemAdded { known }, ServerMessage::GameState(s)) => {
                s.problems.len() > *known
            }
            (Awaits::Selected(p), ServerMessage::GameState(s)) => {
                s.current_problem.as_ref() == Some(p)
            }
            (Awaits::Vote(p), ServerMessage::VoteProgress { problem, voted, .. }) => {
                problem == p && me.is_some_and(|me| voted.iter().any(|v| v == me))
            }
            (Awaits::Vote(p), ServerMessage::VoteIgnored { problem, .. }) => problem == p,
            (Awaits::Reveal(p), ServerMessage::VotesRevealed { problem, .. }) => problem == p,
            (Awaits::Ended, ServerMessage::GameState(s)) => s.status == GameStatus::Ended,
            (Awaits::Backlog, ServerMessage::BacklogUploaded { .. }) => true,
            (Awaits::Results, ServerMessage::ResultsSaved { .. }) => true,
            _ => false,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ClientSession {
    game_id: Option<GameId>,
    pseudo: Option<Pseudo>,
    snapshot: Option<GameSnapshot>,
    /// Local echo of the selected problem
    current_problem: Option<ProblemId>,
    /// Local reveal round counter for the selected problem
    round: u32,
    my_vote: Option<(ProblemId, VoteValue)>,
    ended: bool,
    pending: Option<Pending>,
    ack_timeout: Duration,
    created_game: Option<GameId>,
    last_error: Option<ServerNotice>,
    last_reveal: Option<LastReveal>,
    last_results: Option<ResultsDocument>,
}

impl Default for ClientSession {
    fn default() -> Self {
        Self::new(DEFAULT_ACK_TIMEOUT)
    }
}

impl ClientSession {
    pub fn new(ack_timeout: Duration) -> Self {
        Self {
            game_id: None,
            pseudo: None,
            snapshot: None,
            current_problem: None,
            round: 1,
            my_vote: None,
            ended: false,
            pending: None,
            ack_timeout,
            created_game: None,
            last_error: None,
            last_reveal: None,
            last_results: None,
        }
    }

    pub fn snapshot(&self) -> Option<&GameSnapshot> {
        self.snapshot.as_ref()
    }

    pub fn game_id(&self) -> Option<&str> {
        self.game_id.as_deref()
    }

    pub fn pseudo(&self) -> Option<&str> {
        self.pseudo.as_deref()
    }

    pub fn current_problem(&self) -> Option<&str> {
        self.current_problem.as_deref()
    }

    pub fn round(&self) -> u32 {
        self.round
    }

    pub fn my_vote(&self) -> Option<&VoteValue> {
        self.my_vote.as_ref().map(|(_, v)| v)
    }

    pub fn created_game(&self) -> Option<&str> {
        self.created_game.as_deref()
    }

    pub fn last_error(&self) -> Option<&ServerNotice> {
        self.last_error.as_ref()
    }

    pub fn last_reveal(&self) -> Option<&LastReveal> {
        self.last_reveal.as_ref()
    }

    pub fn last_results(&self) -> Option<&ResultsDocument> {
        self.last_results.as_ref()
    }

    pub fn is_host(&self) -> bool {
        match (&self.snapshot, &self.pseudo) {
            (Some(s), Some(me)) => s.host == *me,
            _ => false,
        }
    }

    pub fn phase(&self) -> Phase {
        if self.ended {
            return Phase::Ended;
        }
        let Some(snapshot) = &self.snapshot else {
            return Phase::Disconnected;
        };
        let Some(problem) = &self.current_problem else {
            return Phase::Joined;
        };
        if snapshot.round_of(problem).revealed {
            Phase::Revealed
        } else if self
            .pseudo
            .as_deref()
            .is_some_and(|me| snapshot.has_voted(problem, me))
        {
            Phase::AwaitingReveal
        } else {
            Phase::Voting
        }
    }

    /// True when an emitted intent has waited longer than the ack timeout
    pub fn is_stale(&self, now: Instant) -> bool {
        self.pending
            .as_ref()
            .is_some_and(|p| now.saturating_duration_since(p.sent_at) > self.ack_timeout)
    }

    pub fn pending_intent(&self) -> Option<&'static str> {
        self.pending.as_ref().map(|p| p.kind)
    }

    fn emit(&mut self, msg: ClientMessage) -> ClientMessage {
        let awaits = match &msg {
            ClientMessage::CreateGame { .. } => Awaits::Created,
            ClientMessage::JoinRoom { .. } => Awaits::Snapshot,
            ClientMessage::LeaveRoom { .. } => return msg,
            ClientMessage::StartGame { .. } => Awaits::Started,
            ClientMessage::AddProblem { .. } => Awaits::ProblemAdded {
                known: self.snapshot.as_ref().map_or(0, |s| s.problems.len()),
            },
            ClientMessage::SelectProblem { problem, .. } => Awaits::Selected(problem.clone()),
            ClientMessage::CastVote { problem, .. } => Awaits::Vote(problem.clone()),
            ClientMessage::RevealVote { problem, .. } => Awaits::Reveal(problem.clone()),
            ClientMessage::EndGame { .. } => Awaits::Ended,
            ClientMessage::UploadBacklog { .. } => Awaits::Backlog,
            ClientMessage::SaveResults { .. } => Awaits::Results,
        };
        self.pending = Some(Pending {
            kind: msg.kind(),
            awaits,
            sent_at: Instant::now(),
        });
        msg
    }

    fn joined(&self) -> Result<(&GameId, &Pseudo, &GameSnapshot), LocalNotice> {
        if self.ended {
            return Err(LocalNotice::GameEnded);
        }
        match (&self.game_id, &self.pseudo, &self.snapshot) {
            (Some(game_id), Some(pseudo), Some(snapshot)) => Ok((game_id, pseudo, snapshot)),
            _ => Err(LocalNotice::NotJoined),
        }
    }

    fn joined_as_host(&self, action: &'static str) -> Result<GameId, LocalNotice> {
        let (game_id, pseudo, snapshot) = self.joined()?;
        if snapshot.host != *pseudo {
            return Err(LocalNotice::HostOnly(action));
        }
        Ok(game_id.clone())
    }

    fn ensure_started(&self) -> Result<(), LocalNotice> {
        match self.snapshot.as_ref().map(|s| s.status) {
            Some(GameStatus::Active) => Ok(()),
            Some(GameStatus::Ended) => Err(LocalNotice::GameEnded),
            _ => Err(LocalNotice::NotStarted),
        }
    }

    fn selected_problem(&self) -> Result<ProblemId, LocalNotice> {
        self.current_problem
            .clone()
            .ok_or(LocalNotice::NoProblemSelected)
    }

    pub fn request_create_game(
        &mut self,
        pseudo: &str,
        settings: GameSettings,
    ) -> Result<ClientMessage, LocalNotice> {
        let pseudo = pseudo.trim();
        if pseudo.is_empty() {
            return Err(LocalNotice::EmptyPseudo);
        }
        Ok(self.emit(ClientMessage::CreateGame {
            pseudo: pseudo.to_string(),
            mode: settings.mode,
            max_players: settings.max_players,
            unanimous_first_round: settings.unanimous_first_round,
        }))
    }

    /// Join a room. The session counts as joined once the first snapshot of
    /// that room arrives.
    pub fn request_join(&mut self, game_id: &str, pseudo: &str) -> Result<ClientMessage, LocalNotice> {
        let game_id = game_id.trim();
        let pseudo = pseudo.trim();
        if game_id.is_empty() {
            return Err(LocalNotice::EmptyGameId);
        }
        if pseudo.is_empty() {
            return Err(LocalNotice::EmptyPseudo);
        }

        if self.game_id.as_deref() != Some(game_id) {
            self.reset_room();
        }
        self.game_id = Some(game_id.to_string());
        self.pseudo = Some(pseudo.to_string());

        Ok(self.emit(ClientMessage::JoinRoom {
            game_id: game_id.to_string(),
            pseudo: pseudo.to_string(),
        }))
    }

    /// Leave the room. No answer is expected, so nothing is left pending.
    pub fn request_leave(&mut self) -> Result<ClientMessage, LocalNotice> {
        let game_id = self.game_id.clone().ok_or(LocalNotice::NotJoined)?;
        self.reset_room();
        self.game_id = None;
        self.pseudo = None;
        Ok(ClientMessage::LeaveRoom { game_id })
    }

    pub fn request_start_game(&mut self) -> Result<ClientMessage, LocalNotice> {
        let game_id = self.joined_as_host("start the game")?;
        if self
            .snapshot
            .as_ref()
            .is_some_and(|s| s.status != GameStatus::Waiting)
        {
            return Err(LocalNotice::AlreadyStarted);
        }
        Ok(self.emit(ClientMessage::StartGame { game_id }))
    }

    pub fn request_add_problem(&mut self, label: &str) -> Result<ClientMessage, LocalNotice> {
        let game_id = self.joined_as_host("add problems")?;
        let label = label.trim();
        if label.is_empty() {
            return Err(LocalNotice::EmptyLabel);
        }
        Ok(self.emit(ClientMessage::AddProblem {
            game_id,
            problem: label.to_string(),
        }))
    }

    pub fn request_select_problem(&mut self, problem: &str) -> Result<ClientMessage, LocalNotice> {
        let game_id = self.joined_as_host("select problems")?;
        self.ensure_started()?;
        let known = self
            .snapshot
            .as_ref()
            .is_some_and(|s| s.problems.iter().any(|p| p.id == problem));
        if !known {
            return Err(LocalNotice::UnknownProblem(problem.to_string()));
        }

        // Optimistic echo; the next snapshot confirms or corrects it
        self.current_problem = Some(problem.to_string());
        Ok(self.emit(ClientMessage::SelectProblem {
            game_id,
            problem: problem.to_string(),
        }))
    }

    pub fn request_cast_vote(&mut self, vote: VoteValue) -> Result<ClientMessage, LocalNotice> {
        let (game_id, pseudo, _) = self.joined()?;
        let (game_id, pseudo) = (game_id.clone(), pseudo.clone());
        self.ensure_started()?;
        let problem = self.selected_problem()?;
        if vote.is_blank() {
            return Err(LocalNotice::EmptyVote);
        }

        self.my_vote = Some((problem.clone(), vote.clone()));
        Ok(self.emit(ClientMessage::CastVote {
            game_id,
            problem,
            vote,
            pseudo,
        }))
    }

    pub fn request_reveal(&mut self) -> Result<ClientMessage, LocalNotice> {
        let game_id = self.joined_as_host("reveal votes")?;
        self.ensure_started()?;
        let problem = self.selected_problem()?;
        Ok(self.emit(ClientMessage::RevealVote {
            game_id,
            problem,
            round: Some(self.round),
        }))
    }

    pub fn request_end_game(&mut self) -> Result<ClientMessage, LocalNotice> {
        let game_id = self.joined_as_host("end the game")?;
        Ok(self.emit(ClientMessage::EndGame { game_id }))
    }

    pub fn request_upload_backlog(
        &mut self,
        backlog: serde_json::Value,
        replace: bool,
    ) -> Result<ClientMessage, LocalNotice> {
        let game_id = self.joined_as_host("upload a backlog")?;
        Ok(self.emit(ClientMessage::UploadBacklog {
            game_id,
            backlog,
            replace,
        }))
    }

    pub fn request_save_results(&mut self) -> Result<ClientMessage, LocalNotice> {
        let (game_id, _, _) = self.joined()?;
        let game_id = game_id.clone();
        Ok(self.emit(ClientMessage::SaveResults { game_id }))
    }

    fn reset_room(&mut self) {
        self.snapshot = None;
        self.current_problem = None;
        self.round = 1;
        self.my_vote = None;
        self.ended = false;
        self.last_reveal = None;
    }

    /// Fold one server message into the session
    pub fn apply(&mut self, msg: ServerMessage) {
        let settled = self.pending.as_ref().is_some_and(|p| {
            p.answered_by(&msg, self.pseudo.as_deref(), self.game_id.as_deref())
        });
        let answered = if settled { self.pending.take() } else { None };

        match msg {
            ServerMessage::GameState(snapshot) => {
                self.apply_snapshot(snapshot);
            }
            ServerMessage::GameCreated { game_id } => {
                self.created_game = Some(game_id);
            }
            ServerMessage::VoteProgress { .. } => {}
            ServerMessage::VoteIgnored { problem, reason } => {
                tracing::debug!("Vote on {} ignored: {}", problem, reason);
                if self.my_vote.as_ref().is_some_and(|(p, _)| *p == problem) {
                    self.my_vote = None;
                }
            }
            ServerMessage::VotesRevealed {
                problem,
                round,
                display,
                ..
            } => {
                if self.current_problem.as_deref() == Some(problem.as_str()) {
                    self.round = self.round.max(round + 1);
                }
                self.last_reveal = Some(LastReveal {
                    problem,
                    round,
                    display,
                });
            }
            ServerMessage::GameEnded { .. } => {
                self.ended = true;
            }
            ServerMessage::BacklogUploaded { added, skipped } => {
                tracing::debug!("Backlog uploaded: {} added, {} skipped", added, skipped);
            }
            ServerMessage::ResultsSaved { document, .. } => {
                self.last_results = Some(document);
            }
            ServerMessage::Error { code, message } => {
                if code == "GAME_ENDED" {
                    self.ended = true;
                }
                // A failed join leaves the session outside any room
                if answered.is_some_and(|p| p.kind == "join_room") && self.snapshot.is_none() {
                    self.game_id = None;
                    self.pseudo = None;
                }
                self.last_error = Some(ServerNotice { code, message });
            }
        }
    }

    /// Replace the mirror with a newer snapshot of the joined room.
    ///
    /// Returns false (and changes nothing) for snapshots of another room or
    /// older than the one already applied.
    pub fn apply_snapshot(&mut self, snapshot: GameSnapshot) -> bool {
        if self.game_id.as_deref() != Some(snapshot.game_id.as_str()) {
            return false;
        }
        if let Some(current) = &self.snapshot {
            if snapshot.version <= current.version {
                tracing::debug!(
                    "Dropping snapshot v{} (have v{})",
                    snapshot.version,
                    current.version
                );
                return false;
            }
        }

        self.current_problem = snapshot.current_problem.clone();
        self.round = self
            .current_problem
            .as_deref()
            .map(|p| snapshot.round_of(p).round)
            .unwrap_or(1);

        if let (Some((problem, _)), Some(me)) = (&self.my_vote, &self.pseudo) {
            if !snapshot.has_voted(problem, me) {
                self.my_vote = None;
            }
        }
        if snapshot.status == GameStatus::Ended {
            self.ended = true;
        }

        self.snapshot = Some(snapshot);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixture {
        game: Game,
        problem: ProblemId,
    }

    fn fixture() -> Fixture {
        let mut game = Game::new("G1".to_string(), "host".to_string(), GameSettings::default());
        game.join("host").unwrap();
        game.join("alice").unwrap();
        game.start("host").unwrap();
        let problem = game.add_problem("host", "Login").unwrap().id;
        Fixture { game, problem }
    }

    fn joined(pseudo: &str, game: &Game) -> ClientSession {
        let mut session = ClientSession::default();
        session.request_join(&game.id, pseudo).unwrap();
        session.apply(ServerMessage::GameState(GameSnapshot::from(game)));
        session
    }

    #[test]
    fn test_join_flow() {
        let f = fixture();
        let mut session = ClientSession::default();
        assert_eq!(session.phase(), Phase::Disconnected);
        assert_eq!(session.request_join("G1", "  "), Err(LocalNotice::EmptyPseudo));

        let msg = session.request_join("G1", "alice").unwrap();
        assert!(matches!(msg, ClientMessage::JoinRoom { .. }));
        assert_eq!(session.pending_intent(), Some("join_room"));

        session.apply(ServerMessage::GameState(GameSnapshot::from(&f.game)));
        assert_eq!(session.phase(), Phase::Joined);
        assert_eq!(session.pending_intent(), None);
    }

    #[test]
    fn test_failed_join_resets_session() {
        let mut session = ClientSession::default();
        session.request_join("NOPE1", "alice").unwrap();
        session.apply(ServerMessage::Error {
            code: "GAME_NOT_FOUND".to_string(),
            message: "Game NOPE1 does not exist".to_string(),
        });
        assert_eq!(session.game_id(), None);
        assert_eq!(session.last_error().unwrap().code, "GAME_NOT_FOUND");
    }

    #[test]
    fn test_local_preconditions_send_nothing() {
        let f = fixture();
        let mut alice = joined("alice", &f.game);

        assert_eq!(
            alice.request_add_problem("Extra"),
            Err(LocalNotice::HostOnly("add problems"))
        );
        assert_eq!(
            alice.request_cast_vote(VoteValue::Number(3.0)),
            Err(LocalNotice::NoProblemSelected)
        );
        assert_eq!(alice.pending_intent(), None);

        let mut host = joined("host", &f.game);
        assert_eq!(host.request_reveal(), Err(LocalNotice::NoProblemSelected));
        assert_eq!(host.request_add_problem("   "), Err(LocalNotice::EmptyLabel));
        assert_eq!(
            host.request_select_problem("missing"),
            Err(LocalNotice::UnknownProblem("missing".to_string()))
        );
        assert!(host.request_select_problem(&f.problem).is_ok());
    }

    #[test]
    fn test_start_only_once() {
        let f = fixture();
        let mut host = joined("host", &f.game);
        assert_eq!(host.request_start_game(), Err(LocalNotice::AlreadyStarted));

        let waiting = Game::new("G2".to_string(), "host".to_string(), GameSettings::default());
        let mut host = joined("host", &waiting);
        assert!(matches!(
            host.request_start_game(),
            Ok(ClientMessage::StartGame { .. })
        ));
    }

    #[test]
    fn test_requests_before_join() {
        let mut session = ClientSession::default();
        assert_eq!(session.request_end_game(), Err(LocalNotice::NotJoined));
        assert_eq!(session.request_save_results(), Err(LocalNotice::NotJoined));
    }

    #[test]
    fn test_phases_follow_snapshots() {
        let mut f = fixture();
        let mut alice = joined("alice", &f.game);

        f.game.select_problem("host", &f.problem).unwrap();
        alice.apply(ServerMessage::GameState(GameSnapshot::from(&f.game)));
        assert_eq!(alice.phase(), Phase::Voting);

        let msg = alice.request_cast_vote(VoteValue::Number(5.0)).unwrap();
        match msg {
            ClientMessage::CastVote { pseudo, problem, .. } => {
                assert_eq!(pseudo, "alice");
                assert_eq!(problem, f.problem);
            }
            other => panic!("Expected CastVote, got {:?}", other),
        }
        f.game
            .cast_vote("alice", &f.problem, VoteValue::Number(5.0))
            .unwrap();
        alice.apply(ServerMessage::GameState(GameSnapshot::from(&f.game)));
        assert_eq!(alice.phase(), Phase::AwaitingReveal);
        assert_eq!(alice.my_vote(), Some(&VoteValue::Number(5.0)));

        f.game.reveal("host", &f.problem, None).unwrap();
        alice.apply(ServerMessage::GameState(GameSnapshot::from(&f.game)));
        assert_eq!(alice.phase(), Phase::Revealed);
        assert_eq!(alice.round(), 2);

        f.game.end("host").unwrap();
        alice.apply(ServerMessage::GameEnded {
            game_id: "G1".to_string(),
            message: "bye".to_string(),
        });
        assert_eq!(alice.phase(), Phase::Ended);
        assert_eq!(
            alice.request_cast_vote(VoteValue::Number(1.0)),
            Err(LocalNotice::GameEnded)
        );
    }

    #[test]
    fn test_out_of_order_snapshots_converge() {
        let mut f = fixture();
        let mut alice = joined("alice", &f.game);

        f.game.select_problem("host", &f.problem).unwrap();
        let older = GameSnapshot::from(&f.game);
        f.game.add_problem("host", "Second").unwrap();
        let newer = GameSnapshot::from(&f.game);

        assert!(alice.apply_snapshot(newer.clone()));
        assert!(!alice.apply_snapshot(older));
        assert_eq!(alice.snapshot(), Some(&newer));
        assert_eq!(alice.current_problem(), Some(f.problem.as_str()));
    }

    #[test]
    fn test_snapshot_overrides_local_echo() {
        let mut f = fixture();
        let second = f.game.add_problem("host", "Second").unwrap().id;
        let mut host = joined("host", &f.game);

        host.request_select_problem(&second).unwrap();
        assert_eq!(host.current_problem(), Some(second.as_str()));

        // Server settled on the first problem instead
        f.game.select_problem("host", &f.problem).unwrap();
        host.apply(ServerMessage::GameState(GameSnapshot::from(&f.game)));
        assert_eq!(host.current_problem(), Some(f.problem.as_str()));
    }

    #[test]
    fn test_reveal_sends_local_round() {
        let mut f = fixture();
        f.game.select_problem("host", &f.problem).unwrap();
        f.game.reveal("host", &f.problem, None).unwrap();
        let mut host = joined("host", &f.game);

        match host.request_reveal().unwrap() {
            ClientMessage::RevealVote { round, problem, .. } => {
                assert_eq!(round, Some(2));
                assert_eq!(problem, f.problem);
            }
            other => panic!("Expected RevealVote, got {:?}", other),
        }
    }

    #[test]
    fn test_stale_indicator() {
        let f = fixture();
        let mut host = ClientSession::new(Duration::from_millis(100));
        host.request_join("G1", "host").unwrap();
        assert!(!host.is_stale(Instant::now()));
        assert!(host.is_stale(Instant::now() + Duration::from_secs(1)));

        host.apply(ServerMessage::GameState(GameSnapshot::from(&f.game)));
        assert!(!host.is_stale(Instant::now() + Duration::from_secs(1)));
    }

    #[test]
    fn test_unrelated_broadcasts_keep_intent_pending() {
        let mut f = fixture();
        f.game.join("bob").unwrap();
        f.game.select_problem("host", &f.problem).unwrap();
        let mut host = joined("host", &f.game);
        host.ack_timeout = Duration::from_millis(100);

        host.request_reveal().unwrap();
        f.game
            .cast_vote("bob", &f.problem, VoteValue::Number(3.0))
            .unwrap();
        host.apply(ServerMessage::VoteProgress {
            problem: f.problem.clone(),
            voted: vec!["bob".to_string()],
            total_players: 3,
        });
        host.apply(ServerMessage::GameState(GameSnapshot::from(&f.game)));
        assert_eq!(host.pending_intent(), Some("devoiler_vote"));
        assert!(host.is_stale(Instant::now() + Duration::from_secs(1)));

        let reveal = f.game.reveal("host", &f.problem, None).unwrap();
        host.apply(reveal.into_message());
        assert_eq!(host.pending_intent(), None);
        assert!(!host.is_stale(Instant::now() + Duration::from_secs(1)));
    }

    #[test]
    fn test_own_vote_progress_settles_vote() {
        let mut f = fixture();
        f.game.join("bob").unwrap();
        f.game.select_problem("host", &f.problem).unwrap();
        let mut alice = joined("alice", &f.game);

        alice.request_cast_vote(VoteValue::Number(5.0)).unwrap();
        alice.apply(ServerMessage::VoteProgress {
            problem: f.problem.clone(),
            voted: vec!["bob".to_string()],
            total_players: 3,
        });
        assert_eq!(alice.pending_intent(), Some("cast_vote"));

        alice.apply(ServerMessage::VoteProgress {
            problem: f.problem.clone(),
            voted: vec!["alice".to_string(), "bob".to_string()],
            total_players: 3,
        });
        assert_eq!(alice.pending_intent(), None);
    }

    #[test]
    fn test_snapshot_of_other_room_ignored() {
        let f = fixture();
        let mut session = ClientSession::default();
        session.request_join("OTHER", "alice").unwrap();
        assert!(!session.apply_snapshot(GameSnapshot::from(&f.game)));
        assert_eq!(session.phase(), Phase::Disconnected);
    }
}
