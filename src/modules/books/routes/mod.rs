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

use super::models::BookPayload;
use super::service::BookService;
use crate::serialization::{render, Entity, Group, RenderContext};
use crate::state::{AppState, Caller, Page, RequestedVersion};

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(list_books).post(create_book))
        .route("/search", get(search_without_term))
        .route("/search/{term}", get(search_books))
        .route(
            "/{id}",
            get(get_book).put(update_book).delete(delete_book),
        )
        .with_state(state)
}

async fn list_books(
    State(state): State<AppState>,
    Caller(principal): Caller,
    RequestedVersion(version): RequestedVersion,
    Page(request): Page,
) -> Result<Json<Paginated<Value>>, AppError> {
    let page = BookService::new(&state).list(request).await?;

    let ctx = RenderContext {
        version,
        principal: &principal,
    };
    let items = page
        .items
        .iter()
        .map(|item| render(item.clone(), Entity::Book, &ctx))
        .collect();

    let meta = PageMeta::compute(request, page.total);
    Ok(Json(Paginated::new(items, meta, Entity::Book.base_path())))
}

async fn get_book(
    State(state): State<AppState>,
    Caller(principal): Caller,
    RequestedVersion(version): RequestedVersion,
    id: Result<Path<i64>, PathRejection>,
) -> Result<Json<Value>, AppError> {
    let Path(id) = id?;
    let book = BookService::new(&state).get(id).await?;

    let ctx = RenderContext {
        version,
        principal: &principal,
    };
    Ok(Json(render(book.project(Group::Books), Entity::Book, &ctx)))
}

async fn search_books(
    State(state): State<AppState>,
    Caller(principal): Caller,
    RequestedVersion(version): RequestedVersion,
    term: Result<Path<String>, PathRejection>,
) -> Result<Json<Vec<Value>>, AppError> {
    let Path(term) = term?;
    let books = BookService::new(&state).search(&term).await?;

    let ctx = RenderContext {
        version,
        principal: &principal,
    };
    Ok(Json(
        books
            .iter()
            .map(|book| render(book.project(Group::Books), Entity::Book, &ctx))
            .collect(),
    ))
}

// Keeps `/search` from being read as a book id.
async fn search_without_term() -> AppError {
    AppError::not_found("A search term is required: /api/books/search/{term}")
}

async fn create_book(
    State(state): State<AppState>,
    caller: Caller,
    RequestedVersion(version): RequestedVersion,
    payload: Result<Json<BookPayload>, JsonRejection>,
) -> Result<impl IntoResponse, AppError> {
    caller.require_admin("You do not have sufficient rights to create a book")?;
    let Json(payload) = payload?;

    let book = BookService::new(&state).create(payload).await?;

    let ctx = RenderContext {
        version,
        principal: &caller.0,
    };
    let location = state.location(Entity::Book, book.id);
    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, location)],
        Json(render(book.project(Group::Books), Entity::Book, &ctx)),
    ))
}

async fn update_book(
    State(state): State<AppState>,
    caller: Caller,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<BookPayload>, JsonRejection>,
) -> Result<StatusCode, AppError> {
    caller.require_admin("You do not have sufficient rights to update a book")?;
    let Path(id) = id?;
    let Json(payload) = payload?;

    BookService::new(&state).update(id, payload).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn delete_book(
    State(state): State<AppState>,
    caller: Caller,
    id: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, AppError> {
    caller.require_admin("You do not have sufficient rights to delete a book")?;
    let Path(id) = id?;

    BookService::new(&state).delete(id).await?;
    Ok(StatusCode::NO_CONTENT)
}
