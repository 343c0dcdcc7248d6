//! Attachment byte-store repository.
//!
//! Bytes are stored inline in the attachments table; rows migrated from the
//! old filesystem layout have no inline payload and carry a `legacy_path`
//! instead, which readers resolve against the local disk.

use async_trait::async_trait;
use sqlx::{PgPool, Row};
use tokio::fs;
use tracing::debug;
use uuid::Uuid;

use quill_core::{Attachment, AttachmentRef, AttachmentRepository, Error, Result};

/// Read a legacy attachment payload from disk. An absent file is `None`,
/// not an error: legacy rows may point at paths that were cleaned up.
pub async fn read_legacy_file(path: &str) -> Result<Option<Vec<u8>>> {
    match fs::read(path).await {
        Ok(bytes) => Ok(Some(bytes)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(Error::Io(e)),
    }
}

/// PostgreSQL implementation of AttachmentRepository.
pub struct PgAttachmentRepository {
    pool: PgPool,
}

impl PgAttachmentRepository {
    /// Create a new PgAttachmentRepository with the given connection pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AttachmentRepository for PgAttachmentRepository {
    async fn store(
        &self,
        note_id: Uuid,
        name: &str,
        file_type: &str,
        data: Vec<u8>,
    ) -> Result<AttachmentRef> {
        let id = Uuid::now_v7();
        let size = data.len() as i64;

        sqlx::query(
            "INSERT INTO attachments (id, note_id, name, file_type, size, data) \
             VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(id)
        .bind(note_id)
        .bind(name)
        .bind(file_type)
        .bind(size)
        .bind(&data)
        .execute(&self.pool)
        .await
        .map_err(Error::Database)?;

        debug!(
            subsystem = "db",
            op = "store_attachment",
            note_id = %note_id,
            attachment_id = %id,
            size,
            "Attachment stored"
        );

        Ok(AttachmentRef {
            id,
            name: name.to_string(),
            file_type: file_type.to_string(),
            size,
            legacy_path: None,
        })
    }

    async fn fetch(&self, id: Uuid, note_id: Uuid) -> Result<Option<Attachment>> {
        let row = sqlx::query(
            "SELECT id, note_id, name, file_type, size, data, legacy_path, created_at \
             FROM attachments WHERE id = $1 AND note_id = $2",
        )
        .bind(id)
        .bind(note_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(Error::Database)?;

        Ok(row.map(|row| Attachment {
            id: row.get("id"),
            note_id: row.get("note_id"),
            name: row.get("name"),
            file_type: row.get("file_type"),
            size: row.get("size"),
            data: row.get("data"),
            legacy_path: row.get("legacy_path"),
            created_at: row.get("created_at"),
        }))
    }

    async fn read_data(&self, id: Uuid) -> Result<Option<Vec<u8>>> {
        let row = sqlx::query("SELECT data FROM attachments WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(Error::Database)?;

        Ok(row.and_then(|row| row.get::<Option<Vec<u8>>, _>("data")))
    }

    async fn read_legacy_path(&self, path: &str) -> Result<Option<Vec<u8>>> {
        read_legacy_file(path).await
    }

    async fn delete(&self, id: Uuid, note_id: Uuid) -> Result<()> {
        let result = sqlx::query("DELETE FROM attachments WHERE id = $1 AND note_id = $2")
            .bind(id)
            .bind(note_id)
            .execute(&self.pool)
            .await
            .map_err(Error::Database)?;

        if result.rows_affected() == 0 {
            return Err(Error::NotFound(format!("Attachment {} not found", id)));
        }
        Ok(())
    }
}
