use axum::{
    async_trait,
    extract::{FromRequestParts, Path, State},
    http::{request::Parts, StatusCode},
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;
use uuid::Uuid;

use super::dto::{UserRequest, UserResponse};
use crate::{auth::jwt::Caller, error::AppError, state::AppState};

/// `:id` path segment. Anything that is not a UUID cannot name a live user,
/// so it is rejected as `NotFound` rather than a malformed request.
#[derive(Debug, Clone, Copy)]
pub struct UserId(pub Uuid);

#[async_trait]
impl<S> FromRequestParts<S> for UserId
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| AppError::NotFound)?;
        Uuid::parse_str(&raw).map(UserId).map_err(|_| AppError::NotFound)
    }
}

pub fn users_routes() -> Router<AppState> {
    Router::new()
        .route("/users/registration", post(register))
        .route("/users", get(list_users))
        .route("/users/", get(list_users))
        .route(
            "/users/:id",
            get(get_user).put(replace_user).delete(delete_user),
        )
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<UserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    let user = state.users.register(payload).await?;
    Ok(Json(user))
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    caller: Caller,
) -> Result<Json<Vec<UserResponse>>, AppError> {
    Ok(Json(state.users.list_all(caller.role).await?))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    caller: Caller,
    UserId(id): UserId,
) -> Result<Json<UserResponse>, AppError> {
    Ok(Json(state.users.get_by_id(caller.role, id).await?))
}

#[instrument(skip(state, payload))]
pub async fn replace_user(
    State(state): State<AppState>,
    caller: Caller,
    UserId(id): UserId,
    Json(payload): Json<UserRequest>,
) -> Result<Json<UserResponse>, AppError> {
    Ok(Json(state.users.replace(caller.role, id, payload).await?))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    caller: Caller,
    UserId(id): UserId,
) -> Result<StatusCode, AppError> {
    state.users.delete(caller.role, id).await?;
    Ok(StatusCode::OK)
}
