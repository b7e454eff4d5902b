//! Product listing endpoints under `/products`

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Deserialize;

use super::MessageResponse;
use crate::Result;
use crate::marketplace::{ProductChanges, ProductDraft, ProductView};
use crate::state::SharedState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateProductRequest {
    pub name: String,
    pub description: String,
    pub image_url: String,
    pub category: String,
    pub price: f64,
    #[serde(default)]
    pub quantity: u32,
    pub seller: String,
}

/// Partial update; `seller` is the acting supplier and must own the product
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProductRequest {
    pub seller: String,
    pub name: Option<String>,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub category: Option<String>,
    pub price: Option<f64>,
    pub quantity: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct DeleteProductRequest {
    pub seller: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct ProductFilter {
    pub category: Option<String>,
}

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(list_products).post(create_product))
        .route("/seller/{seller_id}", get(seller_products))
        .route(
            "/{id}",
            get(get_product).put(update_product).delete(delete_product),
        )
}

async fn list_products(
    State(state): State<SharedState>,
    filter: std::result::Result<Query<ProductFilter>, QueryRejection>,
) -> Result<Json<Vec<ProductView>>> {
    let Query(filter) = filter?;
    let products = state.catalog.by_category(filter.category.as_deref()).await?;
    Ok(Json(state.catalog.view(products).await?))
}

async fn seller_products(
    State(state): State<SharedState>,
    Path(seller_id): Path<String>,
) -> Result<Json<Vec<ProductView>>> {
    let products = state.catalog.by_seller(&seller_id).await?;
    Ok(Json(state.catalog.view(products).await?))
}

async fn get_product(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<ProductView>> {
    let product = state.catalog.get(&id).await?;
    Ok(Json(state.catalog.view_one(product).await?))
}

async fn create_product(
    State(state): State<SharedState>,
    payload: std::result::Result<Json<CreateProductRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ProductView>)> {
    let Json(request) = payload?;
    let draft = ProductDraft {
        name: request.name,
        description: request.description,
        image_url: request.image_url,
        category: request.category,
        price: request.price,
        quantity: request.quantity,
    };
    let product = state.catalog.create(&request.seller, draft).await?;
    Ok((StatusCode::CREATED, Json(state.catalog.view_one(product).await?)))
}

async fn update_product(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    payload: std::result::Result<Json<UpdateProductRequest>, JsonRejection>,
) -> Result<Json<ProductView>> {
    let Json(request) = payload?;
    let changes = ProductChanges {
        name: request.name,
        description: request.description,
        image_url: request.image_url,
        category: request.category,
        price: request.price,
        quantity: request.quantity,
    };
    let product = state.catalog.update(&id, &request.seller, changes).await?;
    Ok(Json(state.catalog.view_one(product).await?))
}

async fn delete_product(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    payload: std::result::Result<Json<DeleteProductRequest>, JsonRejection>,
) -> Result<Json<MessageResponse>> {
    let Json(request) = payload?;
    state.catalog.delete(&id, &request.seller).await?;
    Ok(Json(MessageResponse {
        message: "Product deleted successfully",
    }))
}
