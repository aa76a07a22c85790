//! C3: manifest store. JSON document store keyed by repository and by
//! either tag or digest. Maintains the tag<->digest link invariant (I2).

use std::path::PathBuf;

use crate::digest::sha256_digest;
use crate::errors::ManifestError;
use crate::gc::{self, Exclusion};
use crate::media_types::{self, DEFAULT_MANIFEST_MEDIA_TYPE};
use crate::paths;
use crate::walker::ManifestDocument;

pub(crate) struct PutOutcome {
    pub(crate) digest: String,
}

pub(crate) struct ManifestStore {
    root: PathBuf,
}

impl ManifestStore {
    pub(crate) fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub(crate) fn root(&self) -> &std::path::Path {
        &self.root
    }

    /// put: validate content type and body, write the manifest under
    /// `reference`, and — if `reference` is a tag — materialize the
    /// digest-address twin via hardlink, falling back to a byte copy.
    pub(crate) async fn put(
        &self,
        repo: &str,
        reference: &str,
        content_type: &str,
        body: &[u8],
    ) -> Result<PutOutcome, ManifestError> {
        if !media_types::content_type_supported(content_type) {
            return Err(ManifestError::Unsupported(format!(
                "unsupported manifest media type: {content_type}"
            )));
        }

        let doc = ManifestDocument::parse(body)
            .map_err(|e| ManifestError::InvalidJson(e.to_string()))?;
        if let Some(media_type) = &doc.media_type {
            if !media_types::is_supported(media_type) {
                return Err(ManifestError::Unsupported(format!(
                    "unsupported manifest media type in content: {media_type}"
                )));
            }
        }

        let digest = sha256_digest(body);

        let repo_dir = paths::repo_dir(&self.root, repo);
        tokio::fs::create_dir_all(&repo_dir).await?;
        let tag_path = paths::manifest_path(&self.root, repo, reference);
        tokio::fs::write(&tag_path, body).await?;

        if !paths::is_digest_reference(reference) {
            let digest_path = paths::manifest_path(&self.root, repo, &digest);
            if !digest_path.is_file() {
                if tokio::fs::hard_link(&tag_path, &digest_path).await.is_err() {
                    tokio::fs::write(&digest_path, body).await?;
                }
            }
        }

        Ok(PutOutcome { digest })
    }

    /// get: read the manifest, resolving by digest-fallback scan if the
    /// direct file is absent. Injects a `mediaType` when the stored
    /// document lacks one (spec.md §4.3, §9) and recomputes the digest
    /// over the bytes actually served.
    pub(crate) fn get(
        &self,
        repo: &str,
        reference: &str,
    ) -> Result<(Vec<u8>, String, String), ManifestError> {
        let bytes = self.read_raw(repo, reference)?;
        self.normalize(bytes)
    }

    fn normalize(&self, bytes: Vec<u8>) -> Result<(Vec<u8>, String, String), ManifestError> {
        let mut value: serde_json::Value =
            serde_json::from_slice(&bytes).map_err(|e| ManifestError::InvalidJson(e.to_string()))?;

        let content_type = match value.get("mediaType").and_then(|v| v.as_str()) {
            Some(mt) => mt.to_string(),
            None => {
                value["mediaType"] =
                    serde_json::Value::String(DEFAULT_MANIFEST_MEDIA_TYPE.to_string());
                DEFAULT_MANIFEST_MEDIA_TYPE.to_string()
            }
        };

        let served = serde_json::to_vec(&value).map_err(|e| ManifestError::InvalidJson(e.to_string()))?;
        let digest = sha256_digest(&served);
        Ok((served, content_type, digest))
    }

    fn read_raw(&self, repo: &str, reference: &str) -> Result<Vec<u8>, ManifestError> {
        let direct = paths::manifest_path(&self.root, repo, reference);
        if direct.is_file() {
            return Ok(std::fs::read(direct)?);
        }

        if paths::is_digest_reference(reference) {
            let want = paths::strip_digest_prefix(reference);
            if let Some(bytes) = self.scan_for_digest(repo, want)? {
                return Ok(bytes);
            }
        }

        Err(ManifestError::Unknown)
    }

    /// Digest-address fallback scan: tag files aren't always hardlinked
    /// to their digest twin (§9), so a digest lookup that misses the
    /// direct file falls back to hashing every candidate in the repo.
    fn scan_for_digest(&self, repo: &str, want_hex: &str) -> std::io::Result<Option<Vec<u8>>> {
        let dir = paths::repo_dir(&self.root, repo);
        if !dir.is_dir() {
            return Ok(None);
        }
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            if !entry.path().is_file() {
                continue;
            }
            let bytes = std::fs::read(entry.path())?;
            if sha256::digest(bytes.as_slice()) == want_hex {
                return Ok(Some(bytes));
            }
        }
        Ok(None)
    }

    /// delete: resolve the manifest, sweep candidate blobs via the
    /// reference walker + incremental GC, then unlink the manifest and
    /// its digest twin (or every co-hashing tag, if deleting by digest).
    pub(crate) fn delete(&self, repo: &str, reference: &str) -> Result<(), ManifestError> {
        let direct = paths::manifest_path(&self.root, repo, reference);
        let bytes = if direct.is_file() {
            std::fs::read(&direct)?
        } else if paths::is_digest_reference(reference) {
            self.scan_for_digest(repo, paths::strip_digest_prefix(reference))?
                .ok_or(ManifestError::Unknown)?
        } else {
            return Err(ManifestError::Unknown);
        };

        let manifest_digest_hex = sha256::digest(bytes.as_slice());
        let doc = ManifestDocument::parse(&bytes).map_err(|e| ManifestError::InvalidJson(e.to_string()))?;
        let candidates = doc.references();

        let is_digest_ref = paths::is_digest_reference(reference);
        let mut excluded_names = std::collections::HashSet::new();
        excluded_names.insert(manifest_digest_hex.clone());

        if is_digest_ref {
            // Deleting by digest: unlink every tag in the repo that hashes
            // (or hardlinks) to this same content.
            let dir = paths::repo_dir(&self.root, repo);
            if dir.is_dir() {
                for entry in std::fs::read_dir(&dir)? {
                    let entry = entry?;
                    if !entry.path().is_file() {
                        continue;
                    }
                    let name = entry.file_name().to_string_lossy().to_string();
                    if paths::is_hex_digest_filename(&name) {
                        continue;
                    }
                    let same = std::fs::read(entry.path())
                        .map(|c| sha256::digest(c.as_slice()) == manifest_digest_hex)
                        .unwrap_or(false);
                    if same {
                        excluded_names.insert(name.clone());
                        let _ = std::fs::remove_file(entry.path());
                    }
                }
            }
        } else {
            excluded_names.insert(reference.to_string());
        }

        let exclusion = Exclusion {
            repo: repo.to_string(),
            filenames: excluded_names,
        };
        gc::incremental_sweep(&self.root, &candidates, Some(&exclusion));

        let digest_path = paths::manifest_path(&self.root, repo, &manifest_digest_hex);
        if direct.is_file() {
            std::fs::remove_file(&direct)?;
        }
        if digest_path.is_file() && digest_path != direct {
            let _ = std::fs::remove_file(&digest_path);
        }

        Ok(())
    }

    pub(crate) fn list_repos(&self, n: Option<usize>, last: Option<&str>) -> std::io::Result<Vec<String>> {
        let dir = paths::manifests_dir(&self.root);
        if !dir.is_dir() {
            return Ok(Vec::new());
        }
        let mut repos: Vec<String> = std::fs::read_dir(dir)?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_dir())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect();
        repos.sort();
        Ok(paginate(repos, n, last))
    }

    pub(crate) fn list_tags(
        &self,
        repo: &str,
        n: Option<usize>,
        last: Option<&str>,
    ) -> Result<Vec<String>, ManifestError> {
        let dir = paths::repo_dir(&self.root, repo);
        if !dir.is_dir() {
            return Err(ManifestError::Unknown);
        }
        let mut tags: Vec<String> = std::fs::read_dir(&dir)?
            .filter_map(|e| e.ok())
            .filter(|e| e.path().is_file())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .filter(|name| !paths::is_hex_digest_filename(name))
            .collect();
        tags.sort();
        Ok(paginate(tags, n, last))
    }
}

/// Single-shot pagination: drop entries `<= last`, then truncate to `n`.
fn paginate(mut items: Vec<String>, n: Option<usize>, last: Option<&str>) -> Vec<String> {
    if let Some(last) = last {
        items.retain(|item| item.as_str() > last);
    }
    if let Some(n) = n {
        items.truncate(n);
    }
    items
}
