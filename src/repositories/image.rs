//! Image uploads: payload to a [`FileSink`] first, database record second.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use sqlx::SqlitePool;
use tokio::fs;
use tokio::io::{AsyncRead, AsyncWriteExt};
use uuid::Uuid;

use super::ImageRepository;
use crate::error::{RepositoryError, RepositoryResult};
use crate::models::{Image, ImageUpload, RequestOrigin};

/// Destination for uploaded bytes, keyed by the stored file name.
#[async_trait]
pub trait FileSink: Send + Sync {
    /// Writes `body` to completion under `name` and returns the byte count.
    /// A failed write must not leave a file under `name`.
    async fn write(&self, name: &str, body: &mut (dyn AsyncRead + Send + Unpin)) -> std::io::Result<u64>;
}

/// Writes into a directory on the local filesystem.
///
/// Bytes go to a hidden temporary sibling first and are renamed into place
/// once flushed, so readers never see a half-written image. An existing file
/// with the same name is replaced.
#[derive(Debug, Clone)]
pub struct LocalFileSink {
    root: PathBuf,
}

impl LocalFileSink {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Path `name` is stored at. Names with separators or parent references are rejected.
    pub fn path_for(&self, name: &str) -> std::io::Result<PathBuf> {
        let is_plain = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\', '\0'])
            && Path::new(name).file_name().map(|f| f == name).unwrap_or(false);
        if !is_plain {
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                format!("invalid stored file name: {:?}", name),
            ));
        }
        Ok(self.root.join(name))
    }
}

#[async_trait]
impl FileSink for LocalFileSink {
    async fn write(&self, name: &str, body: &mut (dyn AsyncRead + Send + Unpin)) -> std::io::Result<u64> {
        let dest = self.path_for(name)?;
        fs::create_dir_all(&self.root).await?;
        // Fixed-length temp name, so any `name` that fits the filesystem also fits here
        let tmp = self.root.join(format!(".{}.part", Uuid::new_v4().simple()));

        let written = async {
            let mut file = fs::File::create(&tmp).await?;
            let n = tokio::io::copy(body, &mut file).await?;
            file.flush().await?;
            file.sync_all().await?;
            Ok::<u64, std::io::Error>(n)
            // file is closed here, before the rename
        }
        .await;

        let result = match written {
            Ok(n) => fs::rename(&tmp, &dest).await.map(|_| n),
            Err(e) => Err(e),
        };
        if result.is_err() {
            if let Err(e) = fs::remove_file(&tmp).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!("Failed to remove partial upload {}: {}", tmp.display(), e);
                }
            }
        }
        result
    }
}

#[derive(Clone)]
pub struct SqlImageRepository {
    pool: SqlitePool,
    sink: Arc<dyn FileSink>,
}

impl SqlImageRepository {
    pub fn new(pool: SqlitePool, sink: Arc<dyn FileSink>) -> Self {
        Self { pool, sink }
    }
}

#[async_trait]
impl ImageRepository for SqlImageRepository {
    async fn upload(&self, image: ImageUpload, origin: &RequestOrigin) -> RepositoryResult<Image> {
        let stored_name = image.stored_name();
        let ImageUpload { file_name, file_extension, content_type, file_description, mut body } = image;

        // Write first: a failed write leaves no record behind.
        let size = self.sink.write(&stored_name, &mut *body).await.map_err(RepositoryError::from)?;
        let file_size_in_bytes = i64::try_from(size)
            .map_err(|_| RepositoryError::Io(format!("{} is too large to record ({} bytes)", stored_name, size)))?;

        let record = Image {
            id: Uuid::new_v4(),
            file_name,
            file_extension,
            content_type,
            file_description,
            file_size_in_bytes,
            file_path: origin.image_url(&stored_name),
        };

        let mut tx = self.pool.begin().await?;
        sqlx::query(
            r#"INSERT INTO images (id, file_name, file_extension, content_type, file_description, file_size_in_bytes, file_path)
               VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)"#,
        )
        .bind(record.id.to_string())
        .bind(&record.file_name)
        .bind(&record.file_extension)
        .bind(&record.content_type)
        .bind(&record.file_description)
        .bind(record.file_size_in_bytes)
        .bind(&record.file_path)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;

        tracing::info!(image_id = %record.id, file = %stored_name, bytes = size, "Image stored");
        Ok(record)
    }
}
