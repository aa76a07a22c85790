use std::path::PathBuf;

use crate::args::Args;
use crate::blobstore::BlobStore;
use crate::manifeststore::ManifestStore;

/// Shared application state: the registry root and the two component
/// stores built on top of it. No other state is shared between handlers
/// (spec.md §5) — there is no cache and no per-repository lock.
pub(crate) struct App {
    pub(crate) root: PathBuf,
    pub(crate) host: String,
    pub(crate) blobs: BlobStore,
    pub(crate) manifests: ManifestStore,
}

pub(crate) fn new_app(args: &Args) -> App {
    let root = PathBuf::from(&args.data_dir);
    App {
        blobs: BlobStore::new(root.clone()),
        manifests: ManifestStore::new(root.clone()),
        root,
        host: args.host.clone(),
    }
}
