//! C5: garbage collector. (a) incremental sweep after a manifest delete,
//! (b) bulk sweep over the whole registry. Synchronous — callers run it
//! via `spawn_blocking` since it walks the full manifest tree.

use std::collections::HashSet;
use std::path::Path;

use serde::Serialize;

use crate::errors::GcError;
use crate::paths;
use crate::walker::ManifestDocument;

/// A single manifest file to skip while walking for references — both
/// the tag file and its digest twin, so a manifest being deleted never
/// "references itself" back into existence (spec.md §4.5).
pub(crate) struct Exclusion {
    pub(crate) repo: String,
    pub(crate) filenames: HashSet<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct GcReport {
    pub(crate) removed_blobs: Vec<String>,
}

/// Walk every manifest file in every repository, parsing each and
/// handing its reference set to `visit`. Parse failures and read errors
/// on individual files are logged and the file is skipped — one corrupt
/// manifest must not abort the walk (spec.md §7).
fn for_each_manifest_refs(
    root: &Path,
    exclusion: Option<&Exclusion>,
    mut visit: impl FnMut(HashSet<String>),
) -> std::io::Result<()> {
    let manifests_dir = paths::manifests_dir(root);
    if !manifests_dir.is_dir() {
        return Ok(());
    }

    for repo_entry in std::fs::read_dir(&manifests_dir)? {
        let repo_entry = repo_entry?;
        if !repo_entry.path().is_dir() {
            continue;
        }
        let repo = repo_entry.file_name().to_string_lossy().to_string();

        for file_entry in std::fs::read_dir(repo_entry.path())? {
            let file_entry = file_entry?;
            if !file_entry.path().is_file() {
                continue;
            }
            let filename = file_entry.file_name().to_string_lossy().to_string();

            if let Some(excl) = exclusion {
                if excl.repo == repo && excl.filenames.contains(&filename) {
                    continue;
                }
            }

            match std::fs::read(file_entry.path()) {
                Ok(bytes) => match ManifestDocument::parse(&bytes) {
                    Ok(doc) => visit(doc.references()),
                    Err(e) => {
                        log::error!(
                            "gc: skipping unparseable manifest {}/{}: {}",
                            repo,
                            filename,
                            e
                        );
                    }
                },
                Err(e) => {
                    log::error!("gc: failed to read manifest {}/{}: {}", repo, filename, e);
                }
            }
        }
    }

    Ok(())
}

/// Does any surviving manifest (outside `exclusion`) reference `digest`?
fn is_referenced(
    root: &Path,
    digest: &str,
    exclusion: Option<&Exclusion>,
) -> std::io::Result<bool> {
    let mut found = false;
    for_each_manifest_refs(root, exclusion, |refs| {
        if refs.contains(digest) {
            found = true;
        }
    })?;
    Ok(found)
}

/// Incremental sweep: for each candidate blob digest, delete it if no
/// surviving manifest still references it. Best-effort — individual
/// delete failures are logged and swallowed; I4 is restored by the next
/// bulk GC.
pub(crate) fn incremental_sweep(
    root: &Path,
    candidates: &HashSet<String>,
    exclusion: Option<&Exclusion>,
) {
    for digest in candidates {
        match is_referenced(root, digest, exclusion) {
            Ok(true) => continue,
            Ok(false) => {
                let blob_path = paths::blob_path(root, digest);
                if blob_path.is_file() {
                    if let Err(e) = std::fs::remove_file(&blob_path) {
                        log::error!("gc: failed to delete unreferenced blob {}: {}", digest, e);
                    } else {
                        log::info!("gc: deleted unreferenced blob {}", digest);
                    }
                }
            }
            Err(e) => {
                log::error!("gc: reference check failed for {}: {}", digest, e);
            }
        }
    }
}

/// Bulk sweep: build the live set from every surviving manifest, delete
/// every blob not in it, and reset the upload staging area.
pub(crate) fn bulk_gc(root: &Path) -> Result<GcReport, GcError> {
    let mut live = HashSet::new();
    for_each_manifest_refs(root, None, |refs| live.extend(refs))?;

    let mut removed_blobs = Vec::new();
    let blobs_dir = paths::blobs_dir(root);
    if blobs_dir.is_dir() {
        for entry in std::fs::read_dir(&blobs_dir)? {
            let entry = entry?;
            if !entry.path().is_file() {
                continue;
            }
            let digest = entry.file_name().to_string_lossy().to_string();
            if !live.contains(&digest) {
                std::fs::remove_file(entry.path())?;
                log::info!("gc: removed orphan blob {}", digest);
                removed_blobs.push(digest);
            }
        }
    }

    let uploads_dir = paths::uploads_dir(root);
    if uploads_dir.is_dir() {
        std::fs::remove_dir_all(&uploads_dir)?;
    }
    std::fs::create_dir_all(&uploads_dir)?;

    Ok(GcReport { removed_blobs })
}
