//! Read-only progression API.
//!
//! Every derived field (level, progress, title, color) is computed from the
//! stored XP on each request. The cached `level` column is returned alongside
//! as `cached_level` but never trusted.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use hearth_core::leveling::{LevelCurve, LevelingError, UserProgress, xp_from_stored};
use hearth_core::store::{StoreError, StoredProgression};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::task::JoinError;
use tracing::{error, warn};

use crate::schema::RunStatus;
use crate::state::AppState;

/// Leaderboard size when `limit` is omitted.
pub const DEFAULT_LEADERBOARD_LIMIT: u32 = 10;

/// Largest accepted leaderboard `limit`; larger values are clamped.
pub const MAX_LEADERBOARD_LIMIT: u32 = 100;

/// Builds the API router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/users/{id}/progress", get(user_progress))
        .route("/leaderboard", get(leaderboard))
        .with_state(state)
}

/// Request failures, mapped onto HTTP statuses.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No user with this id.
    #[error("user {id} not found")]
    UserNotFound {
        /// Requested id.
        id: i64,
    },

    /// The stored progression cannot be interpreted.
    #[error("user {id} has invalid progression data: {source}")]
    InvalidProgression {
        /// Affected user.
        id: i64,
        /// Conversion failure.
        #[source]
        source: LevelingError,
    },

    /// Storage failure.
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The blocking query task panicked or was cancelled.
    #[error("query task failed: {0}")]
    Task(#[from] JoinError),
}

impl ApiError {
    /// Status code for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::UserNotFound { .. } => StatusCode::NOT_FOUND,
            Self::InvalidProgression { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Store(_) | Self::Task(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// JSON error body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Numeric status.
    pub code: u16,
    /// Human-readable message.
    pub message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = if status.is_server_error() {
            error!(error = %self, "request failed");
            "internal error".to_string()
        } else {
            self.to_string()
        };
        let body = ErrorBody {
            code: status.as_u16(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

/// A user with freshly derived progression.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserView {
    /// User id.
    pub id: i64,
    /// Display name.
    pub username: String,
    /// The stored `level` column, possibly stale.
    pub cached_level: i64,
    /// Derived from `experience_points`.
    #[serde(flatten)]
    pub progress: UserProgress,
}

impl UserView {
    fn derive(curve: &LevelCurve, row: StoredProgression) -> Result<Self, ApiError> {
        let xp = xp_from_stored(row.experience_points).map_err(|source| {
            ApiError::InvalidProgression { id: row.id, source }
        })?;
        Ok(Self {
            id: row.id,
            username: row.username,
            cached_level: row.level,
            progress: UserProgress::from_xp(curve, xp),
        })
    }
}

/// `GET /health` body.
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// `ok`, or `degraded` when schema reconciliation was not clean.
    pub status: String,
    /// Reconciliation summary.
    pub schema: SchemaHealth,
}

/// Reconciliation summary for `/health`.
#[derive(Debug, Serialize, Deserialize)]
pub struct SchemaHealth {
    /// `completed`, `aborted` or `timed_out`.
    pub run: String,
    /// Checks whose statement ran.
    pub applied: usize,
    /// Checks already satisfied.
    pub already_present: usize,
    /// Ids of failed checks.
    pub failed: Vec<String>,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    let report = state.reconciler.reconcile().await;
    let run = match report.status {
        RunStatus::Completed => "completed",
        RunStatus::Aborted { .. } => "aborted",
        RunStatus::TimedOut { .. } => "timed_out",
    };
    Json(HealthResponse {
        status: if report.is_clean() { "ok" } else { "degraded" }.to_string(),
        schema: SchemaHealth {
            run: run.to_string(),
            applied: report.applied(),
            already_present: report.already_present(),
            failed: report.failures().map(|c| c.id.clone()).collect(),
        },
    })
}

async fn user_progress(
    State(state): State<AppState>,
    Path(id): Path<i64>,
) -> Result<Json<UserView>, ApiError> {
    let store = state.store.clone();
    let row = tokio::task::spawn_blocking(move || store.find(id))
        .await??
        .ok_or(ApiError::UserNotFound { id })?;
    Ok(Json(UserView::derive(&state.curve, row)?))
}

/// `GET /leaderboard` query.
#[derive(Debug, Default, Deserialize)]
pub struct LeaderboardQuery {
    /// Entries to return, clamped to `1..=100`.
    pub limit: Option<u32>,
}

impl LeaderboardQuery {
    /// The effective limit.
    #[must_use]
    pub fn effective_limit(&self) -> u32 {
        self.limit
            .unwrap_or(DEFAULT_LEADERBOARD_LIMIT)
            .clamp(1, MAX_LEADERBOARD_LIMIT)
    }
}

/// One leaderboard row.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LeaderboardEntry {
    /// 1-based position.
    pub rank: usize,
    /// The user.
    #[serde(flatten)]
    pub user: UserView,
}

async fn leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> Result<Json<Vec<LeaderboardEntry>>, ApiError> {
    let limit = query.effective_limit();
    let store = state.store.clone();
    let rows = tokio::task::spawn_blocking(move || store.top_by_xp(limit)).await??;

    let entries = rows
        .into_iter()
        .filter_map(|row| match UserView::derive(&state.curve, row) {
            Ok(user) => Some(user),
            Err(e) => {
                warn!(error = %e, "omitting user from leaderboard");
                None
            },
        })
        .enumerate()
        .map(|(i, user)| LeaderboardEntry { rank: i + 1, user })
        .collect();
    Ok(Json(entries))
}
