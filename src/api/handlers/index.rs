use crate::{
    AppState,
    types::{RebuildResponse, Result},
};
use axum::{Json, extract::State};
use serde::Serialize;
use subot_vector::IndexStats;

#[derive(Debug, Serialize)]
pub struct IndexStatsResponse {
    #[serde(flatten)]
    pub index: IndexStats,
    pub embedding_model: String,
    pub active_sessions: usize,
}

/// Rebuild the index from the corpus directory. Queries keep being
/// served from the previous index until the swap.
pub async fn rebuild(State(state): State<AppState>) -> Result<Json<RebuildResponse>> {
    let report = state.index_manager.rebuild().await?;
    Ok(Json(report))
}

pub async fn stats(State(state): State<AppState>) -> Json<IndexStatsResponse> {
    Json(IndexStatsResponse {
        index: state.index_manager.stats(),
        embedding_model: state.index_manager.embedder().model_name().to_string(),
        active_sessions: state.assistant.sessions().len(),
    })
}
