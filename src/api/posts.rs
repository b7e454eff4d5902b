//! Community blog endpoints under `/posts`

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};

use super::MessageResponse;
use crate::Result;
use crate::marketplace::{PostChanges, PostDraft, PostView};
use crate::state::SharedState;

#[derive(Debug, Deserialize)]
pub struct CreatePostRequest {
    pub title: String,
    pub content: String,
    pub author: String,
    #[serde(default)]
    pub tags: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct UpdatePostRequest {
    pub title: Option<String>,
    pub content: Option<String>,
    pub tags: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
pub struct CommentRequest {
    pub author: String,
    pub content: String,
}

#[derive(Debug, Serialize)]
pub struct PostResponse {
    pub message: &'static str,
    pub post: PostView,
}

#[derive(Debug, Serialize)]
pub struct LikeResponse {
    pub message: &'static str,
    pub likes: u64,
}

pub fn router() -> Router<SharedState> {
    Router::new()
        .route("/", get(list_posts).post(create_post))
        .route("/{id}", get(get_post).put(update_post).delete(delete_post))
        .route("/{id}/comments", post(add_comment))
        .route("/{id}/like", post(like_post))
}

async fn list_posts(State(state): State<SharedState>) -> Result<Json<Vec<PostView>>> {
    let posts = state.blog.list().await?;
    Ok(Json(state.blog.view(posts).await?))
}

async fn get_post(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<PostView>> {
    let post = state.blog.get(&id).await?;
    Ok(Json(state.blog.view_one(post).await?))
}

async fn create_post(
    State(state): State<SharedState>,
    payload: std::result::Result<Json<CreatePostRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PostResponse>)> {
    let Json(request) = payload?;
    let post = state
        .blog
        .create(PostDraft {
            title: request.title,
            content: request.content,
            author: request.author,
            tags: request.tags,
        })
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(PostResponse {
            message: "Post created successfully",
            post: state.blog.view_one(post).await?,
        }),
    ))
}

async fn update_post(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    payload: std::result::Result<Json<UpdatePostRequest>, JsonRejection>,
) -> Result<Json<PostResponse>> {
    let Json(request) = payload?;
    let post = state
        .blog
        .update(
            &id,
            PostChanges {
                title: request.title,
                content: request.content,
                tags: request.tags,
            },
        )
        .await?;
    Ok(Json(PostResponse {
        message: "Post updated successfully",
        post: state.blog.view_one(post).await?,
    }))
}

async fn delete_post(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<MessageResponse>> {
    state.blog.delete(&id).await?;
    Ok(Json(MessageResponse {
        message: "Post deleted successfully",
    }))
}

async fn add_comment(
    State(state): State<SharedState>,
    Path(id): Path<String>,
    payload: std::result::Result<Json<CommentRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<PostResponse>)> {
    let Json(request) = payload?;
    let post = state
        .blog
        .comment(&id, &request.author, &request.content)
        .await?;
    Ok((
        StatusCode::CREATED,
        Json(PostResponse {
            message: "Comment added successfully",
            post: state.blog.view_one(post).await?,
        }),
    ))
}

async fn like_post(
    State(state): State<SharedState>,
    Path(id): Path<String>,
) -> Result<Json<LikeResponse>> {
    let likes = state.blog.like(&id).await?;
    Ok(Json(LikeResponse {
        message: "Post liked successfully",
        likes,
    }))
}
