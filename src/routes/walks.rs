use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};

use crate::{
    error::{AppResult, OptionExt},
    middleware::{validation::sanitize_for_logging, Caller, Role, Validate},
    routes::parse_id,
    state::AppState,
    types::{AddWalkRequest, UpdateWalkRequest, WalkDto, WalkListParams},
};

/// `GET /api/walks?filterOn=&filterQuery=&sortBy=&isAscending=&pageNumber=&pageSize=`
pub async fn list_walks(
    State(state): State<AppState>,
    caller: Caller,
    Query(params): Query<WalkListParams>,
) -> AppResult<Json<Vec<WalkDto>>> {
    caller.require(Role::Reader)?;

    let pagination = &state.config.pagination;
    let query = params.into_query(pagination.default_page_size, pagination.max_page_size);
    tracing::debug!(
        filter_on = ?query.filter_on.as_deref().map(sanitize_for_logging),
        sort_by = ?query.sort_by.as_deref().map(sanitize_for_logging),
        page = query.page,
        page_size = query.page_size,
        "Listing walks"
    );

    let walks = state.walks.list(&query).await?;
    state.metrics.inc_walk_list_queries();
    tracing::info!(count = walks.len(), "Listed walks");
    Ok(Json(walks.into_iter().map(WalkDto::from).collect()))
}

pub async fn get_walk(State(state): State<AppState>, caller: Caller, Path(id): Path<String>) -> AppResult<Json<WalkDto>> {
    caller.require(Role::Reader)?;
    let id = parse_id(&id)?;
    let walk = state.walks.get_by_id(id).await?.ok_or_not_found("Walk")?;
    Ok(Json(walk.into()))
}

pub async fn create_walk(
    State(state): State<AppState>,
    caller: Caller,
    Json(req): Json<AddWalkRequest>,
) -> AppResult<impl IntoResponse> {
    caller.require(Role::Writer)?;
    req.validate()?;

    let walk = state.walks.create(req.into()).await?;
    state.metrics.inc_walks_created();
    tracing::info!(id = %walk.id, region = %walk.region.code, "Walk created");

    let location = format!("/api/walks/{}", walk.id);
    Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(WalkDto::from(walk))))
}

pub async fn update_walk(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
    Json(req): Json<UpdateWalkRequest>,
) -> AppResult<Json<WalkDto>> {
    caller.require(Role::Writer)?;
    let id = parse_id(&id)?;
    req.validate()?;

    let walk = state.walks.update(id, req.into()).await?.ok_or_not_found("Walk")?;
    state.metrics.inc_walks_updated();
    tracing::info!(%id, "Walk updated");
    Ok(Json(walk.into()))
}

pub async fn delete_walk(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> AppResult<Json<WalkDto>> {
    caller.require(Role::Writer)?;
    let id = parse_id(&id)?;

    let walk = state.walks.delete(id).await?.ok_or_not_found("Walk")?;
    state.metrics.inc_walks_deleted();
    tracing::info!(%id, "Walk deleted");
    Ok(Json(walk.into()))
}
