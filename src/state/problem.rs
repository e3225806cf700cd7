use super::backlog::parse_backlog;
use super::Room;
use crate::error::RoomError;
use crate::protocol::GameSnapshot;
use crate::types::*;

impl Game {
    pub fn find_problem(&self, problem_id: &str) -> Option<&Problem> {
        self.problems.iter().find(|p| p.id == problem_id)
    }

    /// Append a problem. Empty labels are rejected and nothing is appended.
    pub fn add_problem(&mut self, pseudo: &str, label: &str) -> Result<Problem, RoomError> {
        self.ensure_open()?;
        self.ensure_host(pseudo, "add problems")?;

        let label = label.trim();
        if label.is_empty() {
            return Err(RoomError::Validation(
                "Problem label must not be empty".to_string(),
            ));
        }

        let problem = Problem::new(label);
        self.problems.push(problem.clone());
        self.touch();
        Ok(problem)
    }

    /// Make a problem current. Votes already cast on it are kept so a
    /// partially voted problem can be resumed.
    pub fn select_problem(&mut self, pseudo: &str, problem_id: &str) -> Result<(), RoomError> {
        self.ensure_open()?;
        self.ensure_host(pseudo, "select problems")?;
        self.ensure_active("select a problem")?;

        if self.find_problem(problem_id).is_none() {
            return Err(RoomError::Validation(format!(
                "Unknown problem {}",
                problem_id
            )));
        }

        self.current_problem = Some(problem_id.to_string());
        self.touch();
        Ok(())
    }

    /// Bulk add from an uploaded backlog. Returns (added, skipped).
    ///
    /// With `replace`, the problem list and everything keyed by it is reset
    /// first; a replacing upload with no usable entry is refused.
    pub fn upload_backlog(
        &mut self,
        pseudo: &str,
        backlog: &serde_json::Value,
        replace: bool,
    ) -> Result<(usize, usize), RoomError> {
        self.ensure_open()?;
        self.ensure_host(pseudo, "upload a backlog")?;

        let parsed = parse_backlog(backlog)?;
        if replace && parsed.entries.is_empty() {
            return Err(RoomError::Validation(
                "Backlog contains no valid problems".to_string(),
            ));
        }

        if replace {
            self.problems.clear();
            self.votes.clear();
            self.concluded.clear();
            self.rounds.clear();
            self.current_problem = None;
        }

        let added = parsed.entries.len();
        for entry in parsed.entries {
            let problem = Problem::new(entry.label);
            if let Some(result) = entry.result {
                self.concluded.insert(problem.id.clone(), result);
            }
            self.problems.push(problem);
        }

        if added > 0 || replace {
            self.touch();
        }
        Ok((added, parsed.skipped))
    }
}

impl Room {
    pub async fn add_problem(&self, pseudo: &str, label: &str) -> Result<Problem, RoomError> {
        let mut game = self.lock().await;
        let problem = game.add_problem(pseudo, label)?;
        tracing::info!("Problem added to game {}: {}", self.id, problem.label);
        self.broadcast_snapshot(&game);
        Ok(problem)
    }

    pub async fn select_problem(
        &self,
        pseudo: &str,
        problem_id: &str,
    ) -> Result<GameSnapshot, RoomError> {
        let mut game = self.lock().await;
        game.select_problem(pseudo, problem_id)?;
        tracing::info!("Game {} now voting on problem {}", self.id, problem_id);
        Ok(self.broadcast_snapshot(&game))
    }

    pub async fn upload_backlog(
        &self,
        pseudo: &str,
        backlog: &serde_json::Value,
        replace: bool,
    ) -> Result<(usize, usize), RoomError> {
        let mut game = self.lock().await;
        let (added, skipped) = game.upload_backlog(pseudo, backlog, replace)?;
        tracing::info!(
            "Backlog uploaded to game {}: {} added, {} skipped (replace: {})",
            self.id,
            added,
            skipped,
            replace
        );
        if added > 0 || replace {
            self.broadcast_snapshot(&game);
        }
        Ok((added, skipped))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn active_game() -> Game {
        let mut game = Game::new("G1".to_string(), "host".to_string(), GameSettings::default());
        game.join("host").unwrap();
        game.join("alice").unwrap();
        game.start("host").unwrap();
        game
    }

    #[test]
    fn test_add_problem_preserves_order_and_skips_empty() {
        let mut game = active_game();
        for label in ["First", "", "Second", "   ", "Third"] {
            let _ = game.add_problem("host", label);
        }
        let labels: Vec<_> = game.problems.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["First", "Second", "Third"]);
    }

    #[test]
    fn test_add_problem_allowed_before_start() {
        let mut game = Game::new("G1".to_string(), "host".to_string(), GameSettings::default());
        assert!(game.add_problem("host", "Backlog item").is_ok());
    }

    #[test]
    fn test_duplicate_labels_get_distinct_ids() {
        let mut game = active_game();
        let a = game.add_problem("host", "Same").unwrap();
        let b = game.add_problem("host", "Same").unwrap();
        assert_ne!(a.id, b.id);
        assert_eq!(game.problems.len(), 2);
    }

    #[test]
    fn test_add_problem_host_only() {
        let mut game = active_game();
        assert!(matches!(
            game.add_problem("alice", "Sneaky"),
            Err(RoomError::Unauthorized(_))
        ));
        assert!(game.problems.is_empty());
    }

    #[test]
    fn test_select_problem() {
        let mut game = active_game();
        let problem = game.add_problem("host", "Login").unwrap();

        assert!(matches!(
            game.select_problem("alice", &problem.id),
            Err(RoomError::Unauthorized(_))
        ));
        assert!(matches!(
            game.select_problem("host", "missing"),
            Err(RoomError::Validation(_))
        ));

        game.select_problem("host", &problem.id).unwrap();
        assert_eq!(game.current_problem.as_deref(), Some(problem.id.as_str()));
    }

    #[test]
    fn test_select_problem_requires_started_game() {
        let mut game = Game::new("G1".to_string(), "host".to_string(), GameSettings::default());
        let problem = game.add_problem("host", "Login").unwrap();
        assert!(matches!(
            game.select_problem("host", &problem.id),
            Err(RoomError::Precondition(_))
        ));
    }

    #[test]
    fn test_reselect_keeps_votes() {
        let mut game = active_game();
        let first = game.add_problem("host", "First").unwrap();
        let second = game.add_problem("host", "Second").unwrap();

        game.select_problem("host", &first.id).unwrap();
        game.cast_vote("alice", &first.id, VoteValue::Number(3.0)).unwrap();
        game.select_problem("host", &second.id).unwrap();
        game.select_problem("host", &first.id).unwrap();

        assert_eq!(game.votes[&first.id].len(), 1);
    }

    #[test]
    fn test_upload_backlog_appends_and_counts_skips() {
        let mut game = active_game();
        game.add_problem("host", "Existing").unwrap();

        let (added, skipped) = game
            .upload_backlog("host", &json!(["A", "", {"problem": "B", "result": 5}, 7]), false)
            .unwrap();
        assert_eq!((added, skipped), (2, 2));

        let labels: Vec<_> = game.problems.iter().map(|p| p.label.as_str()).collect();
        assert_eq!(labels, vec!["Existing", "A", "B"]);
        let b = &game.problems[2];
        assert!(game.concluded.contains_key(&b.id));
    }

    #[test]
    fn test_upload_backlog_replace() {
        let mut game = active_game();
        let old = game.add_problem("host", "Old").unwrap();
        game.select_problem("host", &old.id).unwrap();
        game.cast_vote("alice", &old.id, VoteValue::Number(1.0)).unwrap();

        game.upload_backlog("host", &json!(["New"]), true).unwrap();
        assert_eq!(game.problems.len(), 1);
        assert_eq!(game.problems[0].label, "New");
        assert!(game.current_problem.is_none());
        assert!(game.votes.is_empty());

        // Replacing with nothing usable is refused and leaves state alone
        let result = game.upload_backlog("host", &json!(["", null]), true);
        assert!(matches!(result, Err(RoomError::Validation(_))));
        assert_eq!(game.problems.len(), 1);
    }

    #[test]
    fn test_upload_backlog_host_only() {
        let mut game = active_game();
        assert!(matches!(
            game.upload_backlog("alice", &json!(["A"]), false),
            Err(RoomError::Unauthorized(_))
        ));
    }
}
