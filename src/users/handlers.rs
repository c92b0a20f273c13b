use axum::{
    extract::State,
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::instrument;

use crate::{
    error::{UserError, UserResult},
    state::AppState,
    users::{
        dto::{CreateUserRequest, Pagination, PublicUser, UpdateUserRequest, VerifyPasswordRequest},
        extractors::{JsonBody, QueryParams, UserId},
    },
};

pub fn user_routes() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route("/users/verify", post(verify_password))
        .route(
            "/users/:id",
            get(get_user).put(update_user).delete(delete_user),
        )
}

#[instrument(skip(state, payload))]
pub async fn create_user(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<CreateUserRequest>,
) -> UserResult<(StatusCode, Json<PublicUser>)> {
    let user = state.users.create_user(payload).await?;
    Ok((StatusCode::CREATED, Json(user.into())))
}

#[instrument(skip(state))]
pub async fn get_user(
    State(state): State<AppState>,
    UserId(id): UserId,
) -> UserResult<Json<PublicUser>> {
    let user = state.users.get_user(id).await?;
    Ok(Json(user.into()))
}

#[instrument(skip(state, payload))]
pub async fn update_user(
    State(state): State<AppState>,
    UserId(id): UserId,
    JsonBody(payload): JsonBody<UpdateUserRequest>,
) -> UserResult<Json<PublicUser>> {
    let user = state.users.update_user(id, payload).await?;
    Ok(Json(user.into()))
}

#[instrument(skip(state))]
pub async fn delete_user(
    State(state): State<AppState>,
    UserId(id): UserId,
) -> UserResult<StatusCode> {
    state.users.delete_user(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    QueryParams(params): QueryParams<Pagination>,
) -> UserResult<Json<Vec<PublicUser>>> {
    let page = params.page.unwrap_or(1);
    let limit = params
        .limit
        .unwrap_or(state.config.api.default_page_size);
    let users = state.users.list_users(page, limit).await?;
    Ok(Json(users.into_iter().map(PublicUser::from).collect()))
}

#[instrument(skip(state, payload))]
pub async fn verify_password(
    State(state): State<AppState>,
    JsonBody(payload): JsonBody<VerifyPasswordRequest>,
) -> UserResult<Json<PublicUser>> {
    // unknown email answers like a wrong password
    let user = state
        .users
        .verify_password(&payload.email, &payload.password)
        .await
        .map_err(|e| match e {
            UserError::NotFound(_) => UserError::Unauthorized,
            other => other,
        })?;
    Ok(Json(user.into()))
}
