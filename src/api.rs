//! HTTP API endpoints.
//!
//! Used by the lobby page to open rooms, and by anyone holding a game id to
//! read the current snapshot or download results (also after the game ended,
//! until the room is released).

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::RoomError;
use crate::protocol::GameSnapshot;
use crate::state::export::ResultsDocument;
use crate::state::AppState;
use crate::types::{GameId, GameSettings, Pseudo};

#[derive(Debug, Clone, Deserialize)]
pub struct CreateGameRequest {
    pub pseudo: Pseudo,
    #[serde(flatten)]
    pub settings: GameSettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateGameResponse {
    pub game_id: GameId,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
}

impl RoomError {
    pub fn status(&self) -> StatusCode {
        match self {
            RoomError::GameNotFound(_) => StatusCode::NOT_FOUND,
            RoomError::Unauthorized(_) | RoomError::NotJoined => StatusCode::FORBIDDEN,
            RoomError::Precondition(_) | RoomError::GameEnded(_) | RoomError::GameFull { .. } => {
                StatusCode::CONFLICT
            }
            RoomError::Validation(_) => StatusCode::UNPROCESSABLE_ENTITY,
            RoomError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for RoomError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            code: self.code().to_string(),
            message: self.to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}

/// Open a new room.
///
/// POST /api/games
pub async fn create_game(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CreateGameRequest>,
) -> Result<(StatusCode, Json<CreateGameResponse>), RoomError> {
    let game_id = state.create_game(&request.pseudo, request.settings).await?;
    Ok((StatusCode::CREATED, Json(CreateGameResponse { game_id })))
}

/// Current room snapshot, vote values masked as on the WebSocket.
///
/// GET /api/games/{id}
pub async fn get_game(
    State(state): State<Arc<AppState>>,
    Path(game_id): Path<GameId>,
) -> Result<Json<GameSnapshot>, RoomError> {
    let room = state.get_room(&game_id).await?;
    Ok(Json(room.snapshot().await))
}

/// GET /api/games/{id}/results
pub async fn export_results(
    State(state): State<Arc<AppState>>,
    Path(game_id): Path<GameId>,
) -> Result<Json<ResultsDocument>, RoomError> {
    let document = state.export_results(&game_id).await?;
    Ok(Json(document))
}
