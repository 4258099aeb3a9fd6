use axum::{
    extract::{Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};

use crate::{
    error::{AppResult, OptionExt},
    middleware::{Caller, Role, Validate},
    routes::parse_id,
    state::AppState,
    types::{AddRegionRequest, RegionDto, UpdateRegionRequest},
};

pub async fn list_regions(State(state): State<AppState>, caller: Caller) -> AppResult<Json<Vec<RegionDto>>> {
    caller.require(Role::Reader)?;
    let regions = state.regions.get_all().await?;
    tracing::info!(count = regions.len(), "Listed regions");
    Ok(Json(regions.into_iter().map(RegionDto::from).collect()))
}

pub async fn get_region(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> AppResult<Json<RegionDto>> {
    caller.require(Role::Reader)?;
    let id = parse_id(&id)?;
    let region = state.regions.get_by_id(id).await?.ok_or_not_found("Region")?;
    Ok(Json(region.into()))
}

pub async fn create_region(
    State(state): State<AppState>,
    caller: Caller,
    Json(req): Json<AddRegionRequest>,
) -> AppResult<impl IntoResponse> {
    caller.require(Role::Writer)?;
    req.validate()?;

    let region = state.regions.create(req.into()).await?;
    state.metrics.inc_regions_created();
    tracing::info!(id = %region.id, code = %region.code, "Region created");

    let location = format!("/api/regions/{}", region.id);
    Ok((StatusCode::CREATED, [(header::LOCATION, location)], Json(RegionDto::from(region))))
}

pub async fn update_region(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
    Json(req): Json<UpdateRegionRequest>,
) -> AppResult<Json<RegionDto>> {
    caller.require(Role::Writer)?;
    let id = parse_id(&id)?;
    req.validate()?;

    let region = state.regions.update(id, req.into()).await?.ok_or_not_found("Region")?;
    state.metrics.inc_regions_updated();
    tracing::info!(%id, "Region updated");
    Ok(Json(region.into()))
}

pub async fn delete_region(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> AppResult<Json<RegionDto>> {
    caller.require(Role::Writer)?;
    let id = parse_id(&id)?;

    let region = state.regions.delete(id).await?.ok_or_not_found("Region")?;
    state.metrics.inc_regions_deleted();
    tracing::info!(%id, "Region deleted");
    Ok(Json(region.into()))
}
