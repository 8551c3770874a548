//! HTTP route definitions

use std::time::Duration;

use axum::{
    extract::{Extension, Path, State},
    http::{header, Method, StatusCode},
    middleware,
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use tower_http::{
    compression::CompressionLayer,
    cors::{Any, CorsLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::error;
use uuid::Uuid;

use crate::app::AppState;
use crate::game::{Difficulty, GameError, GameMode, MatchStatus, MoveDirection};
use crate::http::middleware::{require_auth, AuthenticatedPlayer};
use crate::service::{MatchError, PlacedShip, ShipPlacement, TurnResult};
use crate::store::StoreError;
use crate::util::time::uptime_secs;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Build the application router
pub fn build_router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.client_origin);

    // Public routes (no auth required)
    let public_routes = Router::new().route("/health", get(health_handler));

    // Protected routes (auth required)
    let protected_routes = Router::new()
        .route("/match", post(start_match_handler))
        .route("/match/setup", post(setup_fleet_handler))
        .route("/match/shot", post(shot_handler))
        .route("/match/move", post(move_ship_handler))
        .route("/match/:id/cancel", post(cancel_match_handler))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(cors)
        .with_state(state)
}

/// CORS from configuration - comma-separated origins, permissive on "*".
fn cors_layer(client_origin: &str) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE]);

    if client_origin.trim() == "*" {
        return layer.allow_origin(Any);
    }

    let allowed_origins: Vec<header::HeaderValue> = client_origin
        .split(',')
        .filter_map(|s| s.trim().parse::<header::HeaderValue>().ok())
        .collect();

    layer.allow_origin(allowed_origins).allow_credentials(true)
}

fn check_rate(state: &AppState, player: Uuid) -> Result<(), ApiError> {
    if state.limiter.allow(player) {
        Ok(())
    } else {
        Err(ApiError::rate_limited())
    }
}

// ============================================================================
// Health endpoint
// ============================================================================

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    uptime_secs: u64,
}

async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        uptime_secs: uptime_secs(),
    })
}

// ============================================================================
// Match endpoints
// ============================================================================

#[derive(Deserialize)]
struct StartMatchRequest {
    mode: GameMode,
    #[serde(default)]
    opponent_id: Option<Uuid>,
    #[serde(default)]
    difficulty: Option<Difficulty>,
}

#[derive(Serialize)]
struct StartMatchResponse {
    match_id: Uuid,
    status: MatchStatus,
}

async fn start_match_handler(
    State(state): State<AppState>,
    Extension(player): Extension<AuthenticatedPlayer>,
    Json(req): Json<StartMatchRequest>,
) -> Result<(StatusCode, Json<StartMatchResponse>), ApiError> {
    check_rate(&state, player.id)?;

    let game = state
        .matches
        .start_match(player.id, req.mode, req.opponent_id, req.difficulty)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(StartMatchResponse {
            match_id: game.id(),
            status: game.status(),
        }),
    ))
}

#[derive(Deserialize)]
struct SetupFleetRequest {
    match_id: Uuid,
    ships: Vec<ShipPlacement>,
}

#[derive(Serialize)]
struct SetupFleetResponse {
    status: MatchStatus,
    ships: Vec<PlacedShip>,
}

async fn setup_fleet_handler(
    State(state): State<AppState>,
    Extension(player): Extension<AuthenticatedPlayer>,
    Json(req): Json<SetupFleetRequest>,
) -> Result<Json<SetupFleetResponse>, ApiError> {
    check_rate(&state, player.id)?;

    let placement = state
        .matches
        .setup_fleet(player.id, req.match_id, &req.ships)
        .await?;

    Ok(Json(SetupFleetResponse {
        status: placement.match_status,
        ships: placement.ships,
    }))
}

#[derive(Deserialize)]
struct ShotRequest {
    match_id: Uuid,
    x: u8,
    y: u8,
}

async fn shot_handler(
    State(state): State<AppState>,
    Extension(player): Extension<AuthenticatedPlayer>,
    Json(req): Json<ShotRequest>,
) -> Result<Json<TurnResult>, ApiError> {
    check_rate(&state, player.id)?;

    let result = state
        .matches
        .execute_shot(player.id, req.match_id, req.x, req.y)
        .await?;

    Ok(Json(result))
}

#[derive(Deserialize)]
struct MoveShipRequest {
    match_id: Uuid,
    ship_id: Uuid,
    direction: MoveDirection,
}

#[derive(Serialize)]
struct MoveShipResponse {
    message: &'static str,
}

async fn move_ship_handler(
    State(state): State<AppState>,
    Extension(player): Extension<AuthenticatedPlayer>,
    Json(req): Json<MoveShipRequest>,
) -> Result<Json<MoveShipResponse>, ApiError> {
    check_rate(&state, player.id)?;

    state
        .matches
        .execute_ship_movement(player.id, req.match_id, req.ship_id, req.direction)
        .await?;

    Ok(Json(MoveShipResponse {
        message: "ship repositioned",
    }))
}

async fn cancel_match_handler(
    State(state): State<AppState>,
    Extension(player): Extension<AuthenticatedPlayer>,
    Path(match_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    check_rate(&state, player.id)?;

    state.matches.cancel_match(player.id, match_id).await?;

    Ok(StatusCode::NO_CONTENT)
}

// ============================================================================
// Error handling
// ============================================================================

/// HTTP-facing error: a status, a safe message, and for active-match
/// conflicts the id of the match standing in the way.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
    conflict_id: Option<Uuid>,
}

impl ApiError {
    fn new(status: StatusCode, message: String) -> Self {
        Self {
            status,
            message,
            conflict_id: None,
        }
    }

    fn rate_limited() -> Self {
        Self::new(
            StatusCode::TOO_MANY_REQUESTS,
            "too many actions, slow down".to_string(),
        )
    }

    /// Details are logged here and never put on the wire.
    fn internal(detail: &str) -> Self {
        error!(error = %detail, "Internal error");
        Self::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            "internal server error".to_string(),
        )
    }
}

impl From<MatchError> for ApiError {
    fn from(err: MatchError) -> Self {
        let message = err.to_string();
        match err {
            MatchError::PlayerNotFound(_)
            | MatchError::OpponentNotFound(_)
            | MatchError::MatchNotFound(_) => Self::new(StatusCode::NOT_FOUND, message),
            MatchError::OpponentAndDifficulty | MatchError::SelfPlay => {
                Self::new(StatusCode::BAD_REQUEST, message)
            }
            MatchError::ActiveMatch(id) => Self {
                status: StatusCode::CONFLICT,
                message,
                conflict_id: Some(id),
            },
            MatchError::OpponentBusy(_) => Self::new(StatusCode::CONFLICT, message),
            MatchError::NotParticipant => Self::new(StatusCode::FORBIDDEN, message),
            MatchError::MissingDifficulty | MatchError::NoTarget => Self::internal(&message),
            MatchError::Game(game) => game.into(),
            MatchError::Store(store) => store.into(),
        }
    }
}

impl From<GameError> for ApiError {
    fn from(err: GameError) -> Self {
        let status = match err {
            GameError::CoordinateOutOfRange { .. }
            | GameError::ShipOutOfBounds { .. }
            | GameError::MoveOutOfBounds
            | GameError::InvalidFleet
            | GameError::MovementNotAllowed => StatusCode::BAD_REQUEST,
            GameError::ShipNotFound(_) => StatusCode::NOT_FOUND,
            GameError::CellOccupied { .. }
            | GameError::NotInSetup
            | GameError::NotInProgress
            | GameError::AlreadyFinished
            | GameError::NotYourTurn => StatusCode::CONFLICT,
            GameError::TurnTimeout => StatusCode::REQUEST_TIMEOUT,
            GameError::UnknownSide => StatusCode::FORBIDDEN,
            GameError::PlacementExhausted { .. } => return Self::internal(&err.to_string()),
        };
        Self::new(status, err.to_string())
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::VersionConflict(_) => Self::new(
                StatusCode::CONFLICT,
                "the match changed underneath this request, retry".to_string(),
            ),
            other => Self::internal(&other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        let mut body = serde_json::json!({ "error": self.message });
        if let Some(id) = self.conflict_id {
            body["active_match_id"] = serde_json::json!(id);
        }
        (self.status, Json(body)).into_response()
    }
}
