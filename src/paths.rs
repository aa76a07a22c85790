//! C1: path resolver. Pure string/path functions; no I/O.
//!
//! Translates (repository name, reference, digest, upload id) into
//! storage paths rooted at the registry's data directory, and
//! normalizes `sha256:`-prefixed digests to their bare hex form on disk.

use std::path::{Path, PathBuf};

/// Strip a leading `sha256:` prefix, if present.
pub(crate) fn strip_digest_prefix(s: &str) -> &str {
    s.strip_prefix("sha256:").unwrap_or(s)
}

/// A manifest filename is the digest-address form iff it is exactly 64
/// lowercase hex characters. This is the corrected filter from spec.md
/// §9 "Tag filter asymmetry": checking for a literal `sha256:` prefix on
/// disk never matches, since the prefix is stripped before the file is
/// written. Checking shape instead is what actually distinguishes a
/// digest address from a tag.
pub(crate) fn is_hex_digest_filename(name: &str) -> bool {
    name.len() == 64 && name.bytes().all(|b| b.is_ascii_hexdigit() && !b.is_ascii_uppercase())
}

/// Whether a manifest `reference` (as given on the wire) names a digest
/// rather than a tag.
pub(crate) fn is_digest_reference(reference: &str) -> bool {
    reference.starts_with("sha256:") || is_hex_digest_filename(reference)
}

pub(crate) fn blobs_dir(root: &Path) -> PathBuf {
    root.join("blobs")
}

pub(crate) fn uploads_dir(root: &Path) -> PathBuf {
    root.join("uploads")
}

pub(crate) fn manifests_dir(root: &Path) -> PathBuf {
    root.join("manifests")
}

pub(crate) fn blob_path(root: &Path, digest: &str) -> PathBuf {
    blobs_dir(root).join(strip_digest_prefix(digest))
}

pub(crate) fn upload_path(root: &Path, upload_id: &str) -> PathBuf {
    uploads_dir(root).join(upload_id)
}

pub(crate) fn repo_dir(root: &Path, repo: &str) -> PathBuf {
    manifests_dir(root).join(repo)
}

pub(crate) fn manifest_path(root: &Path, repo: &str, reference: &str) -> PathBuf {
    repo_dir(root, repo).join(strip_digest_prefix(reference))
}
