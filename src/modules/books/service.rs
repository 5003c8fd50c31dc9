use std::sync::Arc;

use anyhow::anyhow;
use libris_http::{pagination::PageRequest, AppError};

use super::models::{Book, BookPayload};
use super::repository::BookRepository;
use crate::modules::authors::repository::AuthorRepository;
use crate::serialization::Group;
use crate::state::{tags, AppState, ListCache, ListPage};

const LIST_OPERATION: &str = "getAllBooks";

/// Book use cases: cached listing, lookups, and writes that invalidate lists.
#[derive(Clone)]
pub struct BookService {
    books: BookRepository,
    authors: AuthorRepository,
    cache: Arc<ListCache>,
}

impl BookService {
    pub fn new(state: &AppState) -> Self {
        let pool = state.db.pool().clone();
        Self {
            books: BookRepository::new(pool.clone()),
            authors: AuthorRepository::new(pool),
            cache: state.cache.clone(),
        }
    }

    pub fn list_key(request: PageRequest) -> String {
        format!("{LIST_OPERATION}-{}-{}", request.page(), request.limit())
    }

    /// One page of books projected through the `getBooks` group.
    pub async fn list(&self, request: PageRequest) -> Result<Arc<ListPage>, AppError> {
        let key = Self::list_key(request);
        let repository = &self.books;
        let page = self
            .cache
            .get_or_insert_with(&key, &[tags::BOOKS], move || async move {
                let total = repository.count().await?;
                let books = repository.page(request.offset(), request.limit()).await?;
                Ok::<_, anyhow::Error>(Arc::new(ListPage {
                    items: books.iter().map(|book| book.project(Group::Books)).collect(),
                    total,
                }))
            })
            .await?;
        Ok(page)
    }

    pub async fn get(&self, id: i64) -> Result<Book, AppError> {
        self.books
            .find(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Book {id} not found")))
    }

    pub async fn search(&self, term: &str) -> Result<Vec<Book>, AppError> {
        Ok(self.books.search_by_title(term).await?)
    }

    pub async fn create(&self, payload: BookPayload) -> Result<Book, AppError> {
        let (draft, requested_author) = payload
            .validate()
            .map_err(|details| AppError::validation(details, "Book validation failed"))?;
        let author_id = self.resolve_author(requested_author).await?;

        let id = self.books.insert(&draft, author_id).await?;
        self.invalidate_lists();
        tracing::info!(book_id = id, "book created");

        self.books
            .find(id)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow!("book {id} vanished after insert")))
    }

    /// Overwrite title, cover text, comment, and author of an existing book.
    pub async fn update(&self, id: i64, payload: BookPayload) -> Result<(), AppError> {
        self.get(id).await?;

        let (draft, requested_author) = payload
            .validate()
            .map_err(|details| AppError::validation(details, "Book validation failed"))?;
        let author_id = self.resolve_author(requested_author).await?;

        if !self.books.update(id, &draft, author_id).await? {
            return Err(AppError::not_found(format!("Book {id} not found")));
        }
        self.invalidate_lists();
        tracing::info!(book_id = id, "book updated");
        Ok(())
    }

    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        if !self.books.delete(id).await? {
            return Err(AppError::not_found(format!("Book {id} not found")));
        }
        self.invalidate_lists();
        tracing::info!(book_id = id, "book deleted");
        Ok(())
    }

    /// Unknown author ids leave the book without an author.
    async fn resolve_author(&self, requested: Option<i64>) -> Result<Option<i64>, AppError> {
        let Some(id) = requested else {
            return Ok(None);
        };
        if self.authors.exists(id).await? {
            Ok(Some(id))
        } else {
            tracing::debug!(author_id = id, "unknown author id, storing book without author");
            Ok(None)
        }
    }

    // Author lists embed book ids, so both tags go.
    fn invalidate_lists(&self) {
        let evicted = self.cache.invalidate_tags(&[tags::BOOKS, tags::AUTHORS]);
        tracing::debug!(evicted, "book write invalidated cached lists");
    }
}
