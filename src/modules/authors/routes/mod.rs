use axum::{
    extract::{rejection::JsonRejection, rejection::PathRejection, Path, State},
    http::{header, StatusCode},
    response::IntoResponse,
    routing::get,
    Json, Router,
};
use libris_http::{
    pagination::{PageMeta, Paginated},
    AppError,
};
use serde_json::Value;

use super::models::AuthorPayload;
use super::service::AuthorService;
use crate::serialization::{render, Entity, Group, RenderContext};
use crate::state::{AppState, Caller, Page, RequestedVersion};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(list_authors).post(create_author))
        .route(
            "/{id}",
            get(get_author).put(update_author).delete(delete_author),
        )
        .with_state(state)
}

async fn list_authors(
    State(state): State<AppState>,
    Caller(principal): Caller,
    RequestedVersion(version): RequestedVersion,
    Page(request): Page,
) -> Result<Json<Paginated<Value>>, AppError> {
    let page = AuthorService::new(&state).list(request).await?;

    let ctx = RenderContext {
        version,
        principal: &principal,
    };
    let items = page
        .items
        .iter()
        .map(|item| render(item.clone(), Entity::Author, &ctx))
        .collect();

    let meta = PageMeta::compute(request, page.total);
    Ok(Json(Paginated::new(items, meta, Entity::Author.base_path())))
}

async fn get_author(
    State(state): State<AppState>,
    Caller(principal): Caller,
    RequestedVersion(version): RequestedVersion,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Value>, AppError> {
    let Path(id) = id?;
    let author = AuthorService::new(&state).get(id).await?;

    let ctx = RenderContext {
        version,
        principal: &principal,
    };
    Ok(Json(render(
        author.project(Group::Authors),
        Entity::Author,
        &ctx,
    )))
}

async fn create_author(
    State(state): State<AppState>,
    caller: Caller,
    RequestedVersion(version): RequestedVersion,
    payload: Result<Json<AuthorPayload>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    caller.require_admin("You do not have sufficient rights to create an author")?;
    let Json(payload) = payload?;

    let author = AuthorService::new(&state).create(payload).await?;

    let ctx = RenderContext {
        version,
        principal: &caller.0,
    };
    let location = state.location(Entity::Author, author.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(render(
            author.project(Group::Authors),
            Entity::Author,
            &ctx,
        )),
    ))
}

async fn update_author(
    State(state): State<AppState>,
    caller: Caller,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<AuthorPayload>, JsonRejection>,
) -> Result<StatusCode, AppError> {
    caller.require_admin("You do not have sufficient rights to update an author")?;
    let Path(id) = id?;
    let Json(payload) = payload?;

    AuthorService::new(&state).update(id, payload).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_author(
    State(state): State<AppState>,
    caller: Caller,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, AppError> {
    caller.require_admin("You do not have sufficient rights to delete an author")?;
    let Path(id) = id?;

    AuthorService::new(&state).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
