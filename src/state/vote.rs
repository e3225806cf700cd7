use super::aggregate::aggregate;
use super::Room;
use crate::error::RoomError;
use crate::protocol::ServerMessage;
use crate::types::*;
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq)]
pub enum CastOutcome {
    /// Vote stored; `voted` lists everyone who has voted on the problem
    Recorded { voted: Vec<Pseudo> },
    /// Vote targeted a problem that is not current; nothing changed
    Ignored { reason: String },
}

/// Result of one reveal, with the individual values now public
#[derive(Debug, Clone, PartialEq)]
pub struct Reveal {
    pub problem: ProblemId,
    /// Round that was just revealed
    pub round: u32,
    pub result: ConcludedResult,
    pub votes: BTreeMap<Pseudo, VoteValue>,
}

impl Reveal {
    pub fn into_message(self) -> ServerMessage {
        ServerMessage::VotesRevealed {
            display: self.result.to_string(),
            problem: self.problem,
            round: self.round,
            result: self.result,
            votes: self.votes,
        }
    }
}

impl Game {
    pub fn round_of(&self, problem_id: &str) -> ProblemRound {
        self.rounds.get(problem_id).copied().unwrap_or_default()
    }

    pub fn cast_vote(
        &mut self,
        pseudo: &str,
        problem_id: &str,
        value: VoteValue,
    ) -> Result<CastOutcome, RoomError> {
        self.ensure_open()?;
        self.ensure_participant(pseudo)?;
        self.ensure_active("vote")?;

        if value.is_blank() {
            return Err(RoomError::Validation("Vote must not be empty".to_string()));
        }

        let Some(current) = self.current_problem.as_deref() else {
            return Err(RoomError::Precondition(
                "No problem is currently selected".to_string(),
            ));
        };
        if current != problem_id {
            tracing::debug!(
                "Ignoring stale vote from {} on {} (current: {})",
                pseudo,
                problem_id,
                current
            );
            return Ok(CastOutcome::Ignored {
                reason: "This problem is no longer being estimated".to_string(),
            });
        }

        let problem_id = problem_id.to_string();
        let round = self.rounds.entry(problem_id.clone()).or_default();
        let votes = self.votes.entry(problem_id).or_default();
        if round.revealed {
            // First vote after a reveal starts a fresh round
            round.revealed = false;
            votes.clear();
        }

        // Re-sending the same value keeps its place in cast order
        let cast_seq = match votes.get(pseudo) {
            Some(previous) if previous.value.canonical() == value.canonical() => previous.cast_seq,
            _ => {
                self.next_cast_seq += 1;
                self.next_cast_seq - 1
            }
        };
        votes.insert(
            pseudo.to_string(),
            Vote {
                value,
                cast_seq,
                cast_at: chrono::Utc::now().to_rfc3339(),
            },
        );
        let voted = votes.keys().cloned().collect();
        self.touch();
        Ok(CastOutcome::Recorded { voted })
    }

    /// Aggregate the current problem's votes. `advisory_round` is the
    /// client's counter and only logged when it disagrees.
    pub fn reveal(
        &mut self,
        pseudo: &str,
        problem_id: &str,
        advisory_round: Option<u32>,
    ) -> Result<Reveal, RoomError> {
        self.ensure_open()?;
        self.ensure_host(pseudo, "reveal votes")?;
        self.ensure_active("reveal votes")?;

        match self.current_problem.as_deref() {
            None => {
                return Err(RoomError::Precondition(
                    "No problem is currently selected".to_string(),
                ))
            }
            Some(current) if current != problem_id => {
                return Err(RoomError::Precondition(format!(
                    "Problem {} is not the current problem",
                    problem_id
                )))
            }
            Some(_) => {}
        }

        let round = self.round_of(problem_id);
        if let Some(client_round) = advisory_round {
            if client_round != round.round {
                tracing::warn!(
                    "Reveal round mismatch in game {}: client sent {}, server is at {}",
                    self.id,
                    client_round,
                    round.round
                );
            }
        }

        let mode = if self.settings.unanimous_first_round && round.round == 1 {
            AggregationMode::Unanimous
        } else {
            self.settings.mode
        };

        let mut cast: Vec<(&Pseudo, &Vote)> = self
            .votes
            .get(problem_id)
            .map(|votes| votes.iter().collect())
            .unwrap_or_default();
        cast.sort_by_key(|(_, vote)| vote.cast_seq);
        let values: Vec<VoteValue> = cast.iter().map(|(_, v)| v.value.clone()).collect();
        let result = aggregate(mode, &values);

        let votes = cast
            .into_iter()
            .map(|(pseudo, vote)| (pseudo.clone(), vote.value.clone()))
            .collect();

        self.concluded.insert(problem_id.to_string(), result.clone());
        self.rounds.insert(
            problem_id.to_string(),
            ProblemRound {
                round: round.round + 1,
                revealed: true,
            },
        );
        self.touch();

        Ok(Reveal {
            problem: problem_id.to_string(),
            round: round.round,
            result,
            votes,
        })
    }
}

impl Room {
    pub async fn cast_vote(
        &self,
        pseudo: &str,
        problem_id: &str,
        value: VoteValue,
    ) -> Result<CastOutcome, RoomError> {
        let mut game = self.lock().await;
        let outcome = game.cast_vote(pseudo, problem_id, value)?;
        if let CastOutcome::Recorded { voted } = &outcome {
            tracing::info!("{} voted on {} in game {}", pseudo, problem_id, self.id);
            self.broadcast(ServerMessage::VoteProgress {
                problem: problem_id.to_string(),
                voted: voted.clone(),
                total_players: game.participants.iter().filter(|p| p.connected).count(),
            });
            self.broadcast_snapshot(&game);
        }
        Ok(outcome)
    }

    pub async fn reveal(
        &self,
        pseudo: &str,
        problem_id: &str,
        advisory_round: Option<u32>,
    ) -> Result<Reveal, RoomError> {
        let mut game = self.lock().await;
        let reveal = game.reveal(pseudo, problem_id, advisory_round)?;
        tracing::info!(
            "Revealed round {} of {} in game {}: {}",
            reveal.round,
            problem_id,
            self.id,
            reveal.result
        );
        self.broadcast(reveal.clone().into_message());
        self.broadcast_snapshot(&game);
        Ok(reveal)
    }
}
