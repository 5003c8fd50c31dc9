use std::sync::Arc;

use anyhow::anyhow;
use libris_http::{pagination::PageRequest, AppError};

use super::models::{Author, AuthorPayload};
use super::repository::AuthorRepository;
use crate::serialization::Group;
use crate::state::{tags, AppState, ListCache, ListPage};

const LIST_OPERATION: &str = "getAllAuthors";

#[derive(Clone)]
pub struct AuthorService {
    authors: AuthorRepository,
    cache: Arc<ListCache>,
}

impl AuthorService {
    pub fn new(state: &AppState) -> Self {
        Self {
            authors: AuthorRepository::new(state.db.pool().clone()),
            cache: state.cache.clone(),
        }
    }

    pub fn list_key(request: PageRequest) -> String {
        format!("{LIST_OPERATION}-{}-{}", request.page(), request.limit())
    }

    /// One page of authors projected through the `getAuthors` group.
    pub async fn list(&self, request: PageRequest) -> Result<Arc<ListPage>, AppError> {
        let key = Self::list_key(request);
        let repository = &self.authors;
        let page = self
            .cache
            .get_or_insert_with(&key, &[tags::AUTHORS], move || async move {
                let total = repository.count().await?;
                let authors = repository.page(request.offset(), request.limit()).await?;
                Ok::<_, anyhow::Error>(Arc::new(ListPage {
                    items: authors
                        .iter()
                        .map(|author| author.project(Group::Authors))
                        .collect(),
                    total,
                }))
            })
            .await?;
        Ok(page)
    }

    pub async fn get(&self, id: i64) -> Result<Author, AppError> {
        self.authors
            .find(id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("Author {id} not found")))
    }

    pub async fn create(&self, payload: AuthorPayload) -> Result<Author, AppError> {
        let draft = payload
            .validate()
            .map_err(|details| AppError::validation(details, "Author validation failed"))?;

        let id = self.authors.insert(&draft).await?;
        self.invalidate_lists();
        tracing::info!(author_id = id, "author created");

        self.authors
            .find(id)
            .await?
            .ok_or_else(|| AppError::Internal(anyhow!("author {id} vanished after insert")))
    }

    pub async fn update(&self, id: i64, payload: AuthorPayload) -> Result<(), AppError> {
        self.get(id).await?;

        let draft = payload
            .validate()
            .map_err(|details| AppError::validation(details, "Author validation failed"))?;

        if !self.authors.update(id, &draft).await? {
            return Err(AppError::not_found(format!("Author {id} not found")));
        }
        self.invalidate_lists();
        tracing::info!(author_id = id, "author updated");
        Ok(())
    }

    pub async fn delete(&self, id: i64) -> Result<(), AppError> {
        if !self.authors.delete(id).await? {
            return Err(AppError::not_found(format!("Author {id} not found")));
        }
        self.invalidate_lists();
        tracing::info!(author_id = id, "author deleted");
        Ok(())
    }

    // Book lists embed author names, so both tags go.
    fn invalidate_lists(&self) {
        let evicted = self.cache.invalidate_tags(&[tags::AUTHORS, tags::BOOKS]);
        tracing::debug!(evicted, "author write invalidated cached lists");
    }
}
