//! Supported manifest media types (spec.md §6). Out of scope as a design
//! concern — this is just the literal whitelist table the spec names.

pub(crate) const SUPPORTED_MANIFEST_TYPES: &[&str] = &[
    "application/vnd.docker.distribution.manifest.v1+json",
    "application/vnd.docker.distribution.manifest.v2+json",
    "application/vnd.docker.distribution.manifest.list.v2+json",
    "application/vnd.oci.image.manifest.v1+json",
    "application/vnd.oci.image.index.v1+json",
];

pub(crate) const DEFAULT_MANIFEST_MEDIA_TYPE: &str =
    "application/vnd.docker.distribution.manifest.v2+json";

pub(crate) fn is_supported(media_type: &str) -> bool {
    SUPPORTED_MANIFEST_TYPES.contains(&media_type)
}

pub(crate) fn content_type_supported(content_type: &str) -> bool {
    SUPPORTED_MANIFEST_TYPES
        .iter()
        .any(|t| content_type.starts_with(t))
}
