//! Recommendation and chat endpoints under `/api`

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use crate::Result;
use crate::models::{AiRecommendation, AirQualityReading, Coordinates, PackagingOption};
use crate::recommendation::{Evaluation, LabeledTurn, filter_history};
use crate::state::SharedState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendRequest {
    #[serde(default)]
    pub description: String,
    pub air_quality: Option<AirQualityReading>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatContext {
    #[serde(default)]
    pub previous_messages: Vec<LabeledTurn>,
}

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub context: ChatContext,
}

#[derive(Debug, Serialize)]
pub struct ChatResponse {
    pub response: String,
}

#[derive(Debug, Deserialize)]
pub struct AirQualityQuery {
    pub lat: f64,
    pub lon: f64,
    pub label: Option<String>,
}

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/recommend", post(recommend))
        .route("/chat", post(chat))
        .route("/air-quality", get(air_quality))
        .route("/recommendations", post(recommendations))
        .route("/packaging", get(packaging))
}

async fn recommend(
    State(state): State<SharedState>,
    payload: std::result::Result<Json<RecommendRequest>, JsonRejection>,
) -> Result<Json<AiRecommendation>> {
    let Json(request) = payload?;
    let recommendation = state
        .proxy
        .recommend(&request.description, request.air_quality.as_ref())
        .await?;
    Ok(Json(recommendation))
}

async fn chat(
    State(state): State<SharedState>,
    payload: std::result::Result<Json<ChatRequest>, JsonRejection>,
) -> Result<Json<ChatResponse>> {
    let Json(request) = payload?;
    let history = filter_history(request.context.previous_messages);
    let response = state.proxy.chat(&request.message, &history).await?;
    Ok(Json(ChatResponse { response }))
}

async fn air_quality(
    State(state): State<SharedState>,
    query: std::result::Result<Query<AirQualityQuery>, QueryRejection>,
) -> Result<Json<AirQualityReading>> {
    let Query(query) = query?;
    let coordinates = Coordinates::new(query.lat, query.lon)?;
    let reading = state
        .air_quality
        .current(coordinates, query.label.as_deref())
        .await?;
    Ok(Json(reading))
}

async fn recommendations(
    State(state): State<SharedState>,
    payload: std::result::Result<Json<AirQualityReading>, JsonRejection>,
) -> Result<Json<Evaluation>> {
    let Json(reading) = payload?;
    Ok(Json(state.selector.evaluate(&reading)))
}

async fn packaging(State(state): State<SharedState>) -> Json<Vec<PackagingOption>> {
    Json(state.selector.table().options().to_vec())
}
