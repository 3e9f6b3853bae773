use std::collections::BTreeMap;

use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::http::header::SET_COOKIE;
use axum::response::{IntoResponse, Json, Response};
use serde::{Deserialize, Serialize};

use arena_core::Game;
use arena_core::intake::{BatchOutcome, BatchSubmission, EliminationSubmission, HeadToHeadSubmission};
use arena_core::leaderboard::{Counts, LeaderboardRow};
use arena_core::registration::TeamRegistration;
use arena_core::result::MatchResult;
use arena_core::standings::StandingsUpdate;
use arena_core::team::Team;

use crate::auth::session_tag;
use crate::error::AppError;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct GameQuery {
    pub game: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub match_id: String,
    pub game: String,
}

#[derive(Debug, Serialize)]
pub struct Registered {
    pub ok: bool,
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginBody {
    pub token: String,
}

fn parse_game(raw: Option<&str>) -> Result<Option<Game>, AppError> {
    match raw.map(str::trim).filter(|s| !s.is_empty()) {
        None => Ok(None),
        Some(s) => s
            .parse()
            .map(Some)
            .map_err(|e: arena_core::game::UnknownGame| AppError::BadRequest(e.to_string())),
    }
}

/// GET /api/v1/teams
pub async fn list_teams(State(state): State<AppState>) -> Result<Json<Vec<Team>>, AppError> {
    Ok(Json(state.tournament.teams().await?))
}

/// POST /api/v1/teams
pub async fn register_team(
    State(state): State<AppState>,
    Json(reg): Json<TeamRegistration>,
) -> Result<(StatusCode, Json<Registered>), AppError> {
    let team = state.tournament.register_team(reg).await?;
    Ok((
        StatusCode::CREATED,
        Json(Registered {
            ok: true,
            id: team.id,
        }),
    ))
}

/// GET /api/v1/teams/names
pub async fn team_names(
    State(state): State<AppState>,
) -> Result<Json<BTreeMap<Game, Vec<String>>>, AppError> {
    Ok(Json(state.tournament.team_names_by_game().await?))
}

/// GET /api/v1/leaderboard?game=
pub async fn leaderboard(
    State(state): State<AppState>,
    Query(query): Query<GameQuery>,
) -> Result<Json<Vec<LeaderboardRow>>, AppError> {
    let game = parse_game(query.game.as_deref())?.unwrap_or(Game::Bgmi);
    Ok(Json(state.tournament.leaderboard(game).await?))
}

/// GET /api/v1/stats
pub async fn stats(State(state): State<AppState>) -> Result<Json<Counts>, AppError> {
    Ok(Json(state.tournament.counts().await?))
}

/// GET /api/v1/winners
pub async fn winners(
    State(state): State<AppState>,
) -> Result<Json<BTreeMap<Game, Team>>, AppError> {
    Ok(Json(state.tournament.winners().await?))
}

/// POST /api/v1/results/elimination
pub async fn submit_elimination(
    State(state): State<AppState>,
    Json(sub): Json<EliminationSubmission>,
) -> Result<(StatusCode, Json<MatchResult>), AppError> {
    let result = state.tournament.submit_elimination_result(sub).await?;
    Ok((StatusCode::CREATED, Json(result)))
}

/// POST /api/v1/results/elimination/batch
pub async fn submit_batch(
    State(state): State<AppState>,
    Json(sub): Json<BatchSubmission>,
) -> Result<Json<BatchOutcome>, AppError> {
    Ok(Json(state.tournament.submit_elimination_batch(sub).await?))
}

/// POST /api/v1/results/elimination/upload?match_id=&game= with a CSV/TSV body.
pub async fn upload_batch(
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    body: String,
) -> Result<Json<BatchOutcome>, AppError> {
    let game = parse_game(Some(query.game.as_str()))?
        .ok_or_else(|| AppError::BadRequest("game is required".to_string()))?;
    let outcome = state
        .tournament
        .submit_batch_text(query.match_id, game, &body)
        .await?;
    Ok(Json(outcome))
}

/// POST /api/v1/results/head-to-head
pub async fn submit_head_to_head(
    State(state): State<AppState>,
    Json(sub): Json<HeadToHeadSubmission>,
) -> Result<(StatusCode, Json<[MatchResult; 2]>), AppError> {
    let rows = state.tournament.submit_head_to_head(sub).await?;
    Ok((StatusCode::CREATED, Json(rows)))
}

/// POST /api/v1/standings/recompute?game=  (no game = all games)
pub async fn recompute(
    State(state): State<AppState>,
    Query(query): Query<GameQuery>,
) -> Result<Json<StandingsUpdate>, AppError> {
    let filter = parse_game(query.game.as_deref())?;
    Ok(Json(state.tournament.recompute_standings(filter).await?))
}

/// POST /api/v1/admin/login
pub async fn login(State(state): State<AppState>, Json(body): Json<LoginBody>) -> Response {
    let tag = state
        .auth
        .expected_token()
        .filter(|_| state.auth.accepts_token(&body.token))
        .and_then(session_tag);
    let Some(tag) = tag else {
        tracing::info!("admin login rejected");
        return (
            StatusCode::UNAUTHORIZED,
            Json(serde_json::json!({ "ok": false, "error": "invalid admin token" })),
        )
            .into_response();
    };
    tracing::info!("admin login");
    (
        [(SET_COOKIE, state.auth.session_cookie(&tag))],
        Json(serde_json::json!({ "ok": true })),
    )
        .into_response()
}

/// POST /api/v1/admin/logout
pub async fn logout(State(state): State<AppState>) -> Response {
    (
        [(SET_COOKIE, state.auth.clear_cookie())],
        Json(serde_json::json!({ "ok": true })),
    )
        .into_response()
}
