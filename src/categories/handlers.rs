use axum::{
    extract::{Query, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use tracing::{error, instrument};

use crate::{auth::jwt::AuthUser, state::AppState};

use super::dto::{
    CategoriesQuery, CategoriesResponse, ToggleInterestRequest, ToggleInterestResponse,
};
use super::repo;

pub fn catalogue_routes() -> Router<AppState> {
    Router::new().route("/categories", get(list_categories))
}

pub fn interest_routes() -> Router<AppState> {
    Router::new()
        .route("/me/categories", get(my_categories))
        .route("/me/categories", post(toggle_interest))
}

/// Ceiling division; an empty catalogue has zero pages.
pub(crate) fn total_pages(total: i64, page_size: i64) -> i64 {
    if total == 0 {
        0
    } else {
        (total + page_size - 1) / page_size
    }
}

#[instrument(skip(state))]
pub async fn list_categories(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Query(q): Query<CategoriesQuery>,
) -> Result<Json<CategoriesResponse>, (StatusCode, String)> {
    if q.page < 1 {
        return Err((StatusCode::BAD_REQUEST, "page must be >= 1".into()));
    }
    if !(1..=100).contains(&q.page_size) {
        return Err((
            StatusCode::BAD_REQUEST,
            "page_size must be between 1 and 100".into(),
        ));
    }

    // Pages far past the end saturate; the query just comes back empty.
    let offset = (q.page - 1).saturating_mul(q.page_size);
    let categories = repo::page(&state.db, q.page_size, offset)
        .await
        .map_err(internal)?;
    let total = repo::count(&state.db).await.map_err(internal)?;

    Ok(Json(CategoriesResponse {
        categories,
        total_pages: total_pages(total, q.page_size),
    }))
}

#[instrument(skip(state))]
pub async fn my_categories(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
) -> Result<Json<Vec<i32>>, (StatusCode, String)> {
    let ids = repo::interested_ids(&state.db, user_id)
        .await
        .map_err(internal)?;
    Ok(Json(ids))
}

#[instrument(skip(state, payload))]
pub async fn toggle_interest(
    State(state): State<AppState>,
    AuthUser(user_id): AuthUser,
    Json(payload): Json<ToggleInterestRequest>,
) -> Result<Json<ToggleInterestResponse>, (StatusCode, String)> {
    repo::upsert_interest(&state.db, user_id, payload.category_id, payload.is_interested)
        .await
        .map_err(internal)?;
    Ok(Json(ToggleInterestResponse { success: true }))
}

fn internal<E: std::fmt::Display>(e: E) -> (StatusCode, String) {
    error!(error = %e, "internal error");
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        "Internal server error".into(),
    )
}
