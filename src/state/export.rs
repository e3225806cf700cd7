//! Results export.
//!
//! A `ResultsDocument` lists every problem of a game with its concluded
//! result. It is what `save_resultats` returns, what the HTTP results
//! endpoint serves, and what `upload_backlog` accepts back to resume a session.

use super::{AppState, Room};
use crate::error::RoomError;
use crate::types::*;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Schema version for export format compatibility
pub const RESULTS_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultsDocument {
    pub schema_version: u32,
    pub game_id: GameId,
    pub mode: AggregationMode,
    pub max_players: Option<u32>,
    /// Export timestamp (RFC 3339)
    pub exported_at: String,
    #[serde(default)]
    pub ended_at: Option<String>,
    pub results: Vec<ResultEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ResultEntry {
    pub problem_id: ProblemId,
    /// Problem label
    pub problem: String,
    /// None when the problem was never revealed
    pub result: Option<ConcludedResult>,
    pub display: Option<String>,
    #[serde(default)]
    pub reveals: u32,
}

impl Game {
    pub fn results_document(&self) -> ResultsDocument {
        let results = self
            .problems
            .iter()
            .map(|problem| {
                let result = self.concluded.get(&problem.id).cloned();
                ResultEntry {
                    problem_id: problem.id.clone(),
                    problem: problem.label.clone(),
                    display: result.as_ref().map(ToString::to_string),
                    result,
                    reveals: self.round_of(&problem.id).round - 1,
                }
            })
            .collect();

        ResultsDocument {
            schema_version: RESULTS_SCHEMA_VERSION,
            game_id: self.id.clone(),
            mode: self.settings.mode,
            max_players: self.settings.max_players,
            exported_at: chrono::Utc::now().to_rfc3339(),
            ended_at: self.ended_at.clone(),
            results,
        }
    }
}

impl Room {
    pub async fn results_document(&self) -> ResultsDocument {
        self.lock().await.results_document()
    }
}

impl AppState {
    /// Build the results document for a joined participant and, when a
    /// results directory is configured, write it to disk.
    ///
    /// Returns the document and the path it was written to.
    pub async fn save_results(
        &self,
        game_id: &str,
        pseudo: &str,
    ) -> Result<(ResultsDocument, Option<String>), RoomError> {
        let room = self.get_room(game_id).await?;
        let document = {
            let game = room.lock().await;
            game.ensure_open()?;
            game.ensure_participant(pseudo)?;
            game.results_document()
        };

        let file = match &self.config.results_dir {
            Some(dir) => Some(write_document(dir.clone(), &document).await?),
            None => None,
        };

        tracing::info!(
            "Results of game {} saved by {} ({} problems)",
            game_id,
            pseudo,
            document.results.len()
        );
        Ok((document, file))
    }

    /// Results for the HTTP endpoint. Works on ended games until the room is
    /// released.
    pub async fn export_results(&self, game_id: &str) -> Result<ResultsDocument, RoomError> {
        let room = self.get_room(game_id).await?;
        Ok(room.results_document().await)
    }
}

async fn write_document(dir: PathBuf, document: &ResultsDocument) -> Result<String, RoomError> {
    let json = serde_json::to_vec_pretty(document).map_err(|e| RoomError::Export(e.to_string()))?;

    tokio::fs::create_dir_all(&dir).await.map_err(|e| {
        tracing::error!("Failed to create results directory {}: {}", dir.display(), e);
        RoomError::Export(e.to_string())
    })?;

    let path = dir.join(format!("{}_results.json", document.game_id));
    tokio::fs::write(&path, json).await.map_err(|e| {
        tracing::error!("Failed to write {}: {}", path.display(), e);
        RoomError::Export(e.to_string())
    })?;

    Ok(path.display().to_string())
}
