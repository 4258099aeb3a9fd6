use axum::{
    extract::{Path, State},
    Json,
};

use crate::{
    error::{AppResult, OptionExt},
    middleware::{Caller, Role},
    routes::parse_id,
    state::AppState,
    types::DifficultyDto,
};

pub async fn list_difficulties(State(state): State<AppState>, caller: Caller) -> AppResult<Json<Vec<DifficultyDto>>> {
    caller.require(Role::Reader)?;
    let difficulties = state.difficulties.get_all().await?;
    Ok(Json(difficulties.into_iter().map(DifficultyDto::from).collect()))
}

pub async fn get_difficulty(
    State(state): State<AppState>,
    caller: Caller,
    Path(id): Path<String>,
) -> AppResult<Json<DifficultyDto>> {
    caller.require(Role::Reader)?;
    let id = parse_id(&id)?;
    let difficulty = state.difficulties.get_by_id(id).await?.ok_or_not_found("Difficulty")?;
    Ok(Json(difficulty.into()))
}
