//! Note repository implementation.

use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use tracing::debug;
use uuid::Uuid;

use quill_core::{
    AttachmentRef, CreateNoteRequest, Error, Note, NoteRepository, Result, UpdateNoteRequest,
};

use crate::escape_like;

const NOTE_COLUMNS: &str = "id, owner_id, title, content, tags, is_pinned, summary, \
     is_summarizing, created_at, updated_at";

/// PostgreSQL implementation of NoteRepository.
pub struct PgNoteRepository {
    pool: PgPool,
}

impl PgNoteRepository {
    /// Create a new PgNoteRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    fn map_row(row: &PgRow, attachments: Vec<AttachmentRef>) -> Note {
        Note {
            id: row.get("id"),
            owner_id: row.get("owner_id"),
            title: row.get("title"),
            content: row.get("content"),
            tags: row.get("tags"),
            is_pinned: row.get("is_pinned"),
            attachments,
            summary: row.get("summary"),
            is_summarizing: row.get("is_summarizing"),
            created_at: row.get("created_at"),
            updated_at: row.get("updated_at"),
        }
    }

    /// Load attachment metadata for a batch of notes in one query.
    async fn attachment_refs(&self, note_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<AttachmentRef>>> {
        if note_ids.is_empty() {
            return Ok(HashMap::new());
        }

        let rows = sqlx::query(
            "SELECT id, note_id, name, file_type, size, legacy_path \
             FROM attachments WHERE note_id = ANY($1) ORDER BY created_at",
        )
        .bind(note_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        let mut by_note: HashMap<Uuid, Vec<AttachmentRef>> = HashMap::new();
        for row in rows {
            let note_id: Uuid = row.get("note_id");
            by_note.entry(note_id).or_default().push(AttachmentRef {
                id: row.get("id"),
                name: row.get("name"),
                file_type: row.get("file_type"),
                size: row.get("size"),
                legacy_path: row.get("legacy_path"),
            });
        }
        Ok(by_note)
    }

    /// Hydrate a batch of note rows with their attachment refs.
    async fn hydrate(&self, rows: Vec<PgRow>) -> Result<Vec<Note>> {
        let ids: Vec<Uuid> = rows.iter().map(|r| r.get("id")).collect();
        let mut refs = self.attachment_refs(&ids).await?;
        Ok(rows
            .iter()
            .map(|row| {
                let id: Uuid = row.get("id");
                Self::map_row(row, refs.remove(&id).unwrap_or_default())
            })
            .collect())
    }
}

#[async_trait]
impl NoteRepository for PgNoteRepository {
    async fn insert(&self, owner_id: Uuid, req: CreateNoteRequest) -> Result<Note> {
        let row = sqlx::query(&format!(
            "INSERT INTO notes (id, owner_id, title, content, tags) \
             VALUES ($1, $2, $3, $4, $5) RETURNING {NOTE_COLUMNS}"
        ))
        .bind(Uuid::now_v7())
        .bind(owner_id)
        .bind(&req.title)
        .bind(&req.content)
        .bind(&req.tags)
        .fetch_one(&self.pool)
        .await
        .map_err(Error::Database)?;

        debug!(subsystem = "db", op = "insert_note", owner_id = %owner_id, "Note created");
        Ok(Self::map_row(&row, Vec::new()))
    }

    async fn find_owned(&self, id: Uuid, owner_id: Uuid) -> Result<Option<Note>> {
        let row = sqlx::query(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes WHERE id = $1 AND owner_id = $2"
        ))
        .bind(id)
        .bind(owner_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        match row {
            Some(row) => {
                let refs = self.attachment_refs(&[id]).await?;
                Ok(Some(Self::map_row(
                    &row,
                    refs.into_values().next().unwrap_or_default(),
                )))
            }
            None => Ok(None),
        }
    }

    async fn list_for_owner(&self, owner_id: Uuid) -> Result<Vec<Note>> {
        let rows = sqlx::query(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes WHERE owner_id = $1 \
             ORDER BY is_pinned DESC, updated_at DESC"
        ))
        .bind(owner_id)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        self.hydrate(rows).await
    }

    async fn search(&self, owner_id: Uuid, query: &str) -> Result<Vec<Note>> {
        let pattern = format!("%{}%", escape_like(query));
        let rows = sqlx::query(&format!(
            "SELECT {NOTE_COLUMNS} FROM notes WHERE owner_id = $1 \
             AND (title ILIKE $2 ESCAPE '\\' OR content ILIKE $2 ESCAPE '\\') \
             ORDER BY is_pinned DESC, updated_at DESC"
        ))
        .bind(owner_id)
        .bind(&pattern)
        .fetch_all(&self.pool)
        .await
        .map_err(Error::Database)?;

        self.hydrate(rows).await
    }

    async fn update(&self, id: Uuid, owner_id: Uuid, req: UpdateNoteRequest) -> Result<Note> {
        let row = sqlx::query(&format!(
            "UPDATE notes SET \
                title = COALESCE($3, title), \
                content = COALESCE($4, content), \
                tags = COALESCE($5, tags), \
                is_pinned = COALESCE($6, is_pinned), \
                updated_at = now() \
             WHERE id = $1 AND owner_id = $2 RETURNING {NOTE_COLUMNS}"
        ))
        .bind(id)
        .bind(owner_id)
        .bind(req.title.as_deref())
        .bind(req.content.as_deref())
        .bind(req.tags.as_deref())
        .bind(req.is_pinned)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?
        .ok_or(Error::NoteNotFound(id))?;

        let refs = self.attachment_refs(&[id]).await?;
        Ok(Self::map_row(
            &row,
            refs.into_values().next().unwrap_or_default(),
        ))
    }

    async fn set_pinned(&self, id: Uuid, owner_id: Uuid, pinned: bool) -> Result<Note> {
        let row = sqlx::query(&format!(
            "UPDATE notes SET is_pinned = $3, updated_at = now() \
             WHERE id = $1 AND owner_id = $2 RETURNING {NOTE_COLUMNS}"
        ))
        .bind(id)
        .bind(owner_id)
        .bind(pinned)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?
        .ok_or(Error::NoteNotFound(id))?;

        let refs = self.attachment_refs(&[id]).await?;
        Ok(Self::map_row(
            &row,
            refs.into_values().next().unwrap_or_default(),
        ))
    }

    async fn delete(&self, id: Uuid, owner_id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM notes WHERE id = $1 AND owner_id = $2")
            .bind(id)
            .bind(owner_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NoteNotFound(id));
        }
        debug!(subsystem = "db", op = "delete_note", note_id = %id, "Note deleted");
        Ok(())
    }

    async fn begin_summarizing(&self, id: Uuid) -> Result<()> {
        // updated_at refresh resets the staleness clock for this attempt.
        let result =
            sqlx::query("UPDATE notes SET is_summarizing = TRUE, updated_at = now() WHERE id = $1")
                .bind(id)
                .execute(&self.pool)
                .await
                .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NoteNotFound(id));
        }
        Ok(())
    }

    async fn reset_summarizing(&self, id: Uuid) -> Result<()> {
        // Recovery path: idempotent, and a vanished note is not an error.
        sqlx::query("UPDATE notes SET is_summarizing = FALSE, updated_at = now() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;
        Ok(())
    }

    async fn store_summary(&self, id: Uuid, summary: &str) -> Result<()> {
        let result = sqlx::query(
            "UPDATE notes SET summary = $2, is_summarizing = FALSE, updated_at = now() \
             WHERE id = $1",
        )
        .bind(id)
        .bind(summary)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NoteNotFound(id));
        }
        Ok(())
    }
}
