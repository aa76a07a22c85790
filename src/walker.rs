//! C4: reference walker. Pure function over a parsed manifest document;
//! no I/O. Used by both the incremental deleter (C3/C5) and bulk GC (C5).

use std::collections::HashSet;

use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Descriptor {
    digest: String,
}

/// A manifest document, decoded just far enough to find what it
/// references. Fields absent from the document are simply `None` —
/// dynamic JSON navigation in the source maps to these explicit optional
/// fields, per spec.md §9.
#[derive(Debug, Deserialize)]
pub(crate) struct ManifestDocument {
    #[serde(rename = "mediaType")]
    pub(crate) media_type: Option<String>,
    config: Option<Descriptor>,
    layers: Option<Vec<Descriptor>>,
    manifests: Option<Vec<Descriptor>>,
}

impl ManifestDocument {
    pub(crate) fn parse(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }

    /// Every digest this manifest references: `config.digest`, every
    /// `layers[].digest`, every `manifests[].digest`. Digests are
    /// returned with the `sha256:` prefix stripped, matching the form
    /// blob filenames are stored under.
    ///
    /// The walk is intentionally one level deep (spec.md §4.4, §9):
    /// a manifest index's sub-manifests are "kept" as opaque digests,
    /// never recursed into.
    pub(crate) fn references(&self) -> HashSet<String> {
        let mut refs = HashSet::new();

        if let Some(config) = &self.config {
            refs.insert(crate::paths::strip_digest_prefix(&config.digest).to_string());
        }
        for layer in self.layers.iter().flatten() {
            refs.insert(crate::paths::strip_digest_prefix(&layer.digest).to_string());
        }
        for sub in self.manifests.iter().flatten() {
            refs.insert(crate::paths::strip_digest_prefix(&sub.digest).to_string());
        }

        refs
    }
}
