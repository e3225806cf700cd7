use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use std::fmt;

/// Opaque ID types for type safety
pub type GameId = String;
pub type ProblemId = String;
pub type Pseudo = String;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum GameStatus {
    Waiting,
    Active,
    Ended,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Host,
    Player,
}

/// How a set of votes is reduced to one concluded result.
///
/// The French aliases are the mode names used by older exported result files.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AggregationMode {
    #[default]
    #[serde(alias = "strict")]
    Unanimous,
    #[serde(alias = "moyenne")]
    Average,
    #[serde(alias = "mediane")]
    Median,
    #[serde(alias = "majorite_absolue")]
    AbsoluteMajority,
    #[serde(alias = "majorite_relative")]
    RelativeMajority,
}

impl AggregationMode {
    pub fn label(&self) -> &'static str {
        match self {
            AggregationMode::Unanimous => "Unanimous",
            AggregationMode::Average => "Average",
            AggregationMode::Median => "Median",
            AggregationMode::AbsoluteMajority => "Absolute majority",
            AggregationMode::RelativeMajority => "Relative majority",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GameSettings {
    #[serde(default)]
    pub mode: AggregationMode,
    /// Cap on non-host participants (None = unlimited)
    #[serde(default)]
    pub max_players: Option<u32>,
    /// Require unanimity on the first reveal of every problem, whatever the mode
    #[serde(default)]
    pub unanimous_first_round: bool,
}

impl Default for GameSettings {
    fn default() -> Self {
        Self {
            mode: AggregationMode::default(),
            max_players: None,
            unanimous_first_round: false,
        }
    }
}

/// A single estimate. Either a JSON number or a free token such as "pass" or "?".
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum VoteValue {
    Number(f64),
    Token(String),
}

impl VoteValue {
    /// Numeric reading of the vote. Tokens that parse as a finite number count.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            VoteValue::Number(n) => Some(*n).filter(|n| n.is_finite()),
            VoteValue::Token(t) => t.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        }
    }

    /// Key used to decide whether two votes are "the same value".
    pub fn canonical(&self) -> String {
        match (self.as_number(), self) {
            // -0 and 0 are the same estimate
            (Some(n), _) if n == 0.0 => "0".to_string(),
            (Some(n), _) => n.to_string(),
            (None, VoteValue::Token(t)) => t.trim().to_string(),
            (None, VoteValue::Number(n)) => n.to_string(),
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, VoteValue::Token(t) if t.trim().is_empty())
    }
}

impl fmt::Display for VoteValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.canonical())
    }
}

impl From<f64> for VoteValue {
    fn from(n: f64) -> Self {
        VoteValue::Number(n)
    }
}

impl From<&str> for VoteValue {
    fn from(t: &str) -> Self {
        VoteValue::Token(t.to_string())
    }
}

/// Outcome of a reveal for one problem.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ConcludedResult {
    /// A concluded value. `excluded` counts non-numeric votes left out of
    /// average/median computations.
    Value {
        value: VoteValue,
        #[serde(default)]
        excluded: usize,
    },
    NoConsensus,
    NoMajority,
    NoNumericVotes {
        excluded: usize,
    },
    NoVotes,
}

impl ConcludedResult {
    pub fn value(&self) -> Option<&VoteValue> {
        match self {
            ConcludedResult::Value { value, .. } => Some(value),
            _ => None,
        }
    }
}

impl fmt::Display for ConcludedResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConcludedResult::Value { value, .. } => write!(f, "{}", value),
            ConcludedResult::NoConsensus => f.write_str("no consensus"),
            ConcludedResult::NoMajority => f.write_str("no majority"),
            ConcludedResult::NoNumericVotes { .. } => f.write_str("no numeric votes"),
            ConcludedResult::NoVotes => f.write_str("no votes"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Problem {
    pub id: ProblemId,
    pub label: String,
}

impl Problem {
    pub fn new(label: impl Into<String>) -> Self {
        Self {
            id: ulid::Ulid::new().to_string(),
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Participant {
    pub pseudo: Pseudo,
    pub role: Role,
    pub connected: bool,
    /// Live WebSocket connections bound to this pseudo
    #[serde(skip)]
    pub connections: u32,
    pub joined_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Vote {
    pub value: VoteValue,
    /// Game-wide cast order, used for first-seen tie breaking
    pub cast_seq: u64,
    pub cast_at: String,
}

/// Per-problem reveal round tracking
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProblemRound {
    /// Round currently collecting votes (starts at 1, +1 per reveal)
    pub round: u32,
    /// True between a reveal and the next vote cast on the problem
    pub revealed: bool,
}

impl Default for ProblemRound {
    fn default() -> Self {
        Self {
            round: 1,
            revealed: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Game {
    pub id: GameId,
    /// Bumped on every mutation; snapshots carry it so clients can order them
    pub version: u64,
    pub status: GameStatus,
    pub settings: GameSettings,
    pub host: Pseudo,
    /// Roster in join order
    pub participants: Vec<Participant>,
    pub problems: Vec<Problem>,
    pub current_problem: Option<ProblemId>,
    pub votes: HashMap<ProblemId, BTreeMap<Pseudo, Vote>>,
    pub concluded: HashMap<ProblemId, ConcludedResult>,
    pub rounds: HashMap<ProblemId, ProblemRound>,
    pub next_cast_seq: u64,
    pub created_at: String,
    pub ended_at: Option<String>,
}
