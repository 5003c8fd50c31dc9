use std::collections::HashMap;

use anyhow::Context;
use sqlx::{FromRow, SqlitePool};

use super::models::{Author, AuthorDraft};

#[derive(Debug, FromRow)]
struct AuthorRow {
    id: i64,
    first_name: String,
    last_name: String,
}

impl AuthorRow {
    fn into_author(self, book_ids: Vec<i64>) -> Author {
        Author {
            id: self.id,
            first_name: self.first_name,
            last_name: self.last_name,
            book_ids,
        }
    }
}

/// SQL access to the `authors` table.
#[derive(Clone)]
pub struct AuthorRepository {
    pool: SqlitePool,
}

impl AuthorRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn count(&self) -> anyhow::Result<u64> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM authors")
            .fetch_one(&self.pool)
            .await
            .context("failed to count authors")?;
        Ok(total.max(0) as u64)
    }

    /// Authors ordered by id, `limit` rows starting at `offset`, each with its book ids.
    pub async fn page(&self, offset: u64, limit: u32) -> anyhow::Result<Vec<Author>> {
        let limit = i64::from(limit);
        let offset = i64::try_from(offset).unwrap_or(i64::MAX);

        let rows: Vec<AuthorRow> = sqlx::query_as(
            "SELECT id, first_name, last_name FROM authors ORDER BY id LIMIT ? OFFSET ?",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .context("failed to load author page")?;

        let links: Vec<(i64, i64)> = sqlx::query_as(
            "SELECT author_id, id FROM books WHERE author_id IN \
             (SELECT id FROM authors ORDER BY id LIMIT ? OFFSET ?) ORDER BY id",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await
        .context("failed to load books of author page")?;

        let mut books_by_author: HashMap<i64, Vec<i64>> = HashMap::new();
        for (author_id, book_id) in links {
            books_by_author.entry(author_id).or_default().push(book_id);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let book_ids = books_by_author.remove(&row.id).unwrap_or_default();
                row.into_author(book_ids)
            })
            .collect())
    }

    pub async fn find(&self, id: i64) -> anyhow::Result<Option<Author>> {
        let Some(row) = sqlx::query_as::<_, AuthorRow>(
            "SELECT id, first_name, last_name FROM authors WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await
        .with_context(|| format!("failed to load author {id}"))?
        else {
            return Ok(None);
        };

        let book_ids: Vec<i64> =
            sqlx::query_scalar("SELECT id FROM books WHERE author_id = ? ORDER BY id")
                .bind(id)
                .fetch_all(&self.pool)
                .await
                .with_context(|| format!("failed to load books of author {id}"))?;

        Ok(Some(row.into_author(book_ids)))
    }

    pub async fn exists(&self, id: i64) -> anyhow::Result<bool> {
        let found: Option<i64> = sqlx::query_scalar("SELECT id FROM authors WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("failed to look up author {id}"))?;
        Ok(found.is_some())
    }

    pub async fn insert(&self, draft: &AuthorDraft) -> anyhow::Result<i64> {
        let result = sqlx::query("INSERT INTO authors (first_name, last_name) VALUES (?, ?)")
            .bind(&draft.first_name)
            .bind(&draft.last_name)
            .execute(&self.pool)
            .await
            .context("failed to insert author")?;
        Ok(result.last_insert_rowid())
    }

    /// Returns `false` when no row matched.
    pub async fn update(&self, id: i64, draft: &AuthorDraft) -> anyhow::Result<bool> {
        let result = sqlx::query("UPDATE authors SET first_name = ?, last_name = ? WHERE id = ?")
            .bind(&draft.first_name)
            .bind(&draft.last_name)
            .bind(id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to update author {id}"))?;
        Ok(result.rows_affected() > 0)
    }

    /// Books of the author are kept with their author reference cleared.
    pub async fn delete(&self, id: i64) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM authors WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to delete author {id}"))?;
        Ok(result.rows_affected() > 0)
    }
}
