use crate::state::export::ResultsDocument;
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Open a new room; the sender becomes its host
    CreateGame {
        pseudo: Pseudo,
        #[serde(default)]
        mode: AggregationMode,
        #[serde(default)]
        max_players: Option<u32>,
        #[serde(default)]
        unanimous_first_round: bool,
    },
    JoinRoom {
        game_id: GameId,
        pseudo: Pseudo,
    },
    LeaveRoom {
        game_id: GameId,
    },
    // Host-only messages
    StartGame {
        game_id: GameId,
    },
    AddProblem {
        game_id: GameId,
        /// Display label of the new problem
        problem: String,
    },
    SelectProblem {
        game_id: GameId,
        problem: ProblemId,
    },
    CastVote {
        game_id: GameId,
        problem: ProblemId,
        vote: VoteValue,
        pseudo: Pseudo,
    },
    #[serde(rename = "devoiler_vote", alias = "reveal_vote")]
    RevealVote {
        game_id: GameId,
        problem: ProblemId,
        /// Client's idea of the current round; advisory only
        #[serde(default, rename = "compteur")]
        round: Option<u32>,
    },
    EndGame {
        game_id: GameId,
    },
    UploadBacklog {
        game_id: GameId,
        /// A list of labels, a list of entries, or a results document
        backlog: serde_json::Value,
        #[serde(default)]
        replace: bool,
    },
    #[serde(rename = "save_resultats", alias = "save_results")]
    SaveResults {
        game_id: GameId,
    },
}

impl ClientMessage {
    /// Wire name of the message kind, for logs
    pub fn kind(&self) -> &'static str {
        match self {
            ClientMessage::CreateGame { .. } => "create_game",
            ClientMessage::JoinRoom { .. } => "join_room",
            ClientMessage::LeaveRoom { .. } => "leave_room",
            ClientMessage::StartGame { .. } => "start_game",
            ClientMessage::AddProblem { .. } => "add_problem",
            ClientMessage::SelectProblem { .. } => "select_problem",
            ClientMessage::CastVote { .. } => "cast_vote",
            ClientMessage::RevealVote { .. } => "devoiler_vote",
            ClientMessage::EndGame { .. } => "end_game",
            ClientMessage::UploadBacklog { .. } => "upload_backlog",
            ClientMessage::SaveResults { .. } => "save_resultats",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum ServerMessage {
    GameCreated {
        game_id: GameId,
    },
    /// Full authoritative snapshot; clients replace their mirror with it
    GameState(GameSnapshot),
    /// Who has voted on a problem. Never carries values.
    VoteProgress {
        problem: ProblemId,
        voted: Vec<Pseudo>,
        total_players: usize,
    },
    /// Sent to the voter when a vote targeted a problem that is no longer current
    VoteIgnored {
        problem: ProblemId,
        reason: String,
    },
    VotesRevealed {
        problem: ProblemId,
        /// Round that was just revealed
        round: u32,
        result: ConcludedResult,
        display: String,
        votes: BTreeMap<Pseudo, VoteValue>,
    },
    GameEnded {
        game_id: GameId,
        message: String,
    },
    BacklogUploaded {
        added: usize,
        skipped: usize,
    },
    ResultsSaved {
        document: ResultsDocument,
        #[serde(skip_serializing_if = "Option::is_none")]
        file: Option<String>,
    },
    Error {
        code: String,
        message: String,
    },
}

/// Public participant info (no connection bookkeeping)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ParticipantInfo {
    pub pseudo: Pseudo,
    pub role: Role,
    pub connected: bool,
}

impl From<&Participant> for ParticipantInfo {
    fn from(p: &Participant) -> Self {
        Self {
            pseudo: p.pseudo.clone(),
            role: p.role,
            connected: p.connected,
        }
    }
}

/// Room state as seen by clients. Vote values are `None` until the problem's
/// current round has been revealed.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GameSnapshot {
    pub game_id: GameId,
    pub version: u64,
    pub status: GameStatus,
    pub mode: AggregationMode,
    pub host: Pseudo,
    pub players: Vec<ParticipantInfo>,
    pub current_problem: Option<ProblemId>,
    pub problems: Vec<Problem>,
    pub votes: HashMap<ProblemId, BTreeMap<Pseudo, Option<VoteValue>>>,
    pub concluded_votes: HashMap<ProblemId, ConcludedResult>,
    pub rounds: HashMap<ProblemId, ProblemRound>,
}

impl GameSnapshot {
    pub fn round_of(&self, problem: &str) -> ProblemRound {
        self.rounds.get(problem).copied().unwrap_or_default()
    }

    pub fn has_voted(&self, problem: &str, pseudo: &str) -> bool {
        self.votes
            .get(problem)
            .is_some_and(|votes| votes.contains_key(pseudo))
    }
}

impl From<&Game> for GameSnapshot {
    fn from(game: &Game) -> Self {
        let votes = game
            .votes
            .iter()
            .map(|(problem_id, votes)| {
                let revealed = game
                    .rounds
                    .get(problem_id)
                    .is_some_and(|r| r.revealed);
                let masked = votes
                    .iter()
                    .map(|(pseudo, vote)| {
                        let value = revealed.then(|| vote.value.clone());
                        (pseudo.clone(), value)
                    })
                    .collect();
                (problem_id.clone(), masked)
            })
            .collect();

        Self {
            game_id: game.id.clone(),
            version: game.version,
            status: game.status,
            mode: game.settings.mode,
            host: game.host.clone(),
            players: game.participants.iter().map(ParticipantInfo::from).collect(),
            current_problem: game.current_problem.clone(),
            problems: game.problems.clone(),
            votes,
            concluded_votes: game.concluded.clone(),
            rounds: game.rounds.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reveal_accepts_both_wire_names() {
        let json = r#"{"t":"devoiler_vote","game_id":"ABCDE","problem":"p1","compteur":2}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        match msg {
            ClientMessage::RevealVote {
                game_id,
                problem,
                round,
            } => {
                assert_eq!(game_id, "ABCDE");
                assert_eq!(problem, "p1");
                assert_eq!(round, Some(2));
            }
            other => panic!("Expected RevealVote, got {:?}", other),
        }

        let json = r#"{"t":"reveal_vote","game_id":"ABCDE","problem":"p1"}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        assert!(matches!(msg, ClientMessage::RevealVote { round: None, .. }));
    }

    #[test]
    fn test_cast_vote_accepts_numbers_and_tokens() {
        let json = r#"{"t":"cast_vote","game_id":"G","problem":"p","vote":5,"pseudo":"alice"}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        assert!(matches!(
            msg,
            ClientMessage::CastVote { vote: VoteValue::Number(n), .. } if n == 5.0
        ));

        let json = r#"{"t":"cast_vote","game_id":"G","problem":"p","vote":"pass","pseudo":"alice"}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        assert!(matches!(
            msg,
            ClientMessage::CastVote { vote: VoteValue::Token(ref t), .. } if t == "pass"
        ));
    }

    #[test]
    fn test_create_game_accepts_legacy_mode_names() {
        let json = r#"{"t":"create_game","pseudo":"host","mode":"majorite_relative"}"#;
        let msg: ClientMessage = serde_json::from_str(json).unwrap();
        match msg {
            ClientMessage::CreateGame { mode, max_players, .. } => {
                assert_eq!(mode, AggregationMode::RelativeMajority);
                assert_eq!(max_players, None);
            }
            other => panic!("Expected CreateGame, got {:?}", other),
        }
    }

    #[test]
    fn test_game_state_is_tagged() {
        let snapshot = GameSnapshot {
            game_id: "G".to_string(),
            version: 3,
            status: GameStatus::Waiting,
            mode: AggregationMode::Average,
            host: "host".to_string(),
            players: vec![],
            current_problem: None,
            problems: vec![],
            votes: HashMap::new(),
            concluded_votes: HashMap::new(),
            rounds: HashMap::new(),
        };
        let json = serde_json::to_value(ServerMessage::GameState(snapshot)).unwrap();
        assert_eq!(json["t"], "game_state");
        assert_eq!(json["status"], "waiting");
        assert_eq!(json["version"], 3);
    }
}
