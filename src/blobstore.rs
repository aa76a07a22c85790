//! C2: blob store. Content-addressed file store owning the upload
//! staging area and the finalized blob directory.

use std::path::PathBuf;

use tokio::fs;
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::digest::sha256_digest;
use crate::errors::BlobError;
use crate::paths;

pub(crate) enum UploadStart {
    /// `mount_digest` already exists as a blob; no session was created.
    Mounted { digest: String },
    Created { upload_id: String },
}

pub(crate) struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    pub(crate) fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub(crate) fn root(&self) -> &std::path::Path {
        &self.root
    }

    pub(crate) fn exists(&self, digest: &str) -> bool {
        paths::blob_path(&self.root, digest).is_file()
    }

    pub(crate) fn metadata(&self, digest: &str) -> std::io::Result<std::fs::Metadata> {
        std::fs::metadata(paths::blob_path(&self.root, digest))
    }

    pub(crate) async fn read(&self, digest: &str) -> std::io::Result<Vec<u8>> {
        fs::read(paths::blob_path(&self.root, digest)).await
    }

    /// Open a finalized blob for streaming. Callers wrap this in a
    /// `ReaderStream` so large GETs don't buffer in memory (spec.md §5).
    pub(crate) async fn open(&self, digest: &str) -> std::io::Result<fs::File> {
        fs::File::open(paths::blob_path(&self.root, digest)).await
    }

    /// begin_upload: if `mount_digest` already exists, short-circuit
    /// without creating a session. Otherwise allocate a 256-bit upload id
    /// and create an empty staging file.
    pub(crate) async fn begin_upload(
        &self,
        mount_digest: Option<&str>,
    ) -> Result<UploadStart, BlobError> {
        if let Some(digest) = mount_digest {
            if self.exists(digest) {
                return Ok(UploadStart::Mounted {
                    digest: digest.to_string(),
                });
            }
        }

        let upload_id = generate_upload_id();
        fs::create_dir_all(paths::uploads_dir(&self.root)).await?;
        fs::File::create(paths::upload_path(&self.root, &upload_id)).await?;

        Ok(UploadStart::Created { upload_id })
    }

    /// append: extend the session file. `content_range`, if given, must
    /// start exactly at the current size (I5); its upper bound is
    /// informational only.
    pub(crate) async fn append(
        &self,
        upload_id: &str,
        bytes: &[u8],
        content_range: Option<(u64, u64)>,
    ) -> Result<u64, BlobError> {
        let path = paths::upload_path(&self.root, upload_id);
        let mut file = fs::OpenOptions::new()
            .append(true)
            .open(&path)
            .await
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => BlobError::UploadUnknown,
                _ => BlobError::Io(e),
            })?;

        let current_size = file.metadata().await?.len();
        if let Some((start, _end)) = content_range {
            if start != current_size {
                return Err(BlobError::InvalidRange);
            }
        }

        file.write_all(bytes).await?;
        file.flush().await?;

        Ok(current_size + bytes.len() as u64)
    }

    /// finalize: verify `declared_digest` against the session content,
    /// then atomically promote it to a blob (or discard it, deduping
    /// against an already-present blob). The session is destroyed on
    /// either success or digest mismatch — finalize is not retryable.
    pub(crate) async fn finalize(
        &self,
        upload_id: &str,
        declared_digest: &str,
    ) -> Result<String, BlobError> {
        let upload_path = paths::upload_path(&self.root, upload_id);
        let content = fs::read(&upload_path).await.map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => BlobError::UploadUnknown,
            _ => BlobError::Io(e),
        })?;

        let actual_digest = sha256_digest(&content);
        if actual_digest != declared_digest {
            log::warn!(
                "blobstore/finalize: digest mismatch for upload {}: declared {}, got {}",
                upload_id,
                declared_digest,
                actual_digest
            );
            let _ = fs::remove_file(&upload_path).await;
            return Err(BlobError::DigestInvalid);
        }

        let blob_path = paths::blob_path(&self.root, &actual_digest);
        fs::create_dir_all(paths::blobs_dir(&self.root)).await?;

        if self.exists(&actual_digest) {
            // Dedup: an identical blob is already present (I-a).
            fs::remove_file(&upload_path).await?;
        } else {
            fs::rename(&upload_path, &blob_path).await?;
        }

        log::info!("blobstore/finalize: upload {} finalized as {}", upload_id, actual_digest);
        Ok(actual_digest)
    }

    pub(crate) async fn delete_upload_session(&self, upload_id: &str) {
        let _ = fs::remove_file(paths::upload_path(&self.root, upload_id)).await;
    }

    pub(crate) fn delete_blob(&self, digest: &str) -> std::io::Result<()> {
        std::fs::remove_file(paths::blob_path(&self.root, digest))
    }
}

/// 256 bits of entropy, hex-encoded: two v4 UUIDs concatenated.
fn generate_upload_id() -> String {
    format!(
        "{}{}",
        Uuid::new_v4().simple(),
        Uuid::new_v4().simple()
    )
}
