use anyhow::Context;
use sqlx::{FromRow, SqlitePool};

use super::models::{Book, BookAuthor, BookDraft};
use crate::utils::like_pattern;

const SELECT_BOOKS: &str = "SELECT b.id, b.title, b.cover_text, b.comment, \
     a.id AS author_id, a.first_name AS author_first_name, a.last_name AS author_last_name \
     FROM books b LEFT JOIN authors a ON a.id = b.author_id";

#[derive(Debug, FromRow)]
struct BookRow {
    id: i64,
    title: String,
    cover_text: String,
    comment: Option<String>,
    author_id: Option<i64>,
    author_first_name: Option<String>,
    author_last_name: Option<String>,
}

impl From<BookRow> for Book {
    fn from(row: BookRow) -> Self {
        let author = match (row.author_id, row.author_first_name, row.author_last_name) {
            (Some(id), Some(first_name), Some(last_name)) => Some(BookAuthor {
                id,
                first_name,
                last_name,
            }),
            _ => None,
        };
        Book {
            id: row.id,
            title: row.title,
            cover_text: row.cover_text,
            comment: row.comment,
            author,
        }
    }
}

/// SQL access to the `books` table.
#[derive(Clone)]
pub struct BookRepository {
    pool: SqlitePool,
}

impl BookRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub async fn count(&self) -> anyhow::Result<u64> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM books")
            .fetch_one(&self.pool)
            .await
            .context("failed to count books")?;
        Ok(total.max(0) as u64)
    }

    /// Books ordered by id, `limit` rows starting at `offset`.
    pub async fn page(&self, offset: u64, limit: u32) -> anyhow::Result<Vec<Book>> {
        let rows: Vec<BookRow> =
            sqlx::query_as(&format!("{SELECT_BOOKS} ORDER BY b.id LIMIT ? OFFSET ?"))
                .bind(i64::from(limit))
                .bind(i64::try_from(offset).unwrap_or(i64::MAX))
                .fetch_all(&self.pool)
                .await
                .context("failed to load book page")?;
        Ok(rows.into_iter().map(Book::from).collect())
    }

    pub async fn find(&self, id: i64) -> anyhow::Result<Option<Book>> {
        let row: Option<BookRow> = sqlx::query_as(&format!("{SELECT_BOOKS} WHERE b.id = ?"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .with_context(|| format!("failed to load book {id}"))?;
        Ok(row.map(Book::from))
    }

    /// Case-insensitive substring match on the title, ordered by title.
    pub async fn search_by_title(&self, term: &str) -> anyhow::Result<Vec<Book>> {
        let rows: Vec<BookRow> = sqlx::query_as(&format!(
            "{SELECT_BOOKS} WHERE b.title LIKE ? ESCAPE '\\' ORDER BY b.title ASC, b.id ASC"
        ))
        .bind(like_pattern(term))
        .fetch_all(&self.pool)
        .await
        .context("failed to search books")?;
        Ok(rows.into_iter().map(Book::from).collect())
    }

    pub async fn insert(&self, draft: &BookDraft, author_id: Option<i64>) -> anyhow::Result<i64> {
        let result = sqlx::query(
            "INSERT INTO books (title, cover_text, comment, author_id) VALUES (?, ?, ?, ?)",
        )
        .bind(&draft.title)
        .bind(&draft.cover_text)
        .bind(&draft.comment)
        .bind(author_id)
        .execute(&self.pool)
        .await
        .context("failed to insert book")?;
        Ok(result.last_insert_rowid())
    }

    /// Overwrite every mutable column. Returns `false` when no row matched.
    pub async fn update(
        &self,
        id: i64,
        draft: &BookDraft,
        author_id: Option<i64>,
    ) -> anyhow::Result<bool> {
        let result = sqlx::query(
            "UPDATE books SET title = ?, cover_text = ?, comment = ?, author_id = ? WHERE id = ?",
        )
        .bind(&draft.title)
        .bind(&draft.cover_text)
        .bind(&draft.comment)
        .bind(author_id)
        .bind(id)
        .execute(&self.pool)
        .await
        .with_context(|| format!("failed to update book {id}"))?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn delete(&self, id: i64) -> anyhow::Result<bool> {
        let result = sqlx::query("DELETE FROM books WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await
            .with_context(|| format!("failed to delete book {id}"))?;
        Ok(result.rows_affected() > 0)
    }
}
