//! SHA-256 content addressing helpers shared by the blob and manifest stores.

/// Hash `bytes` and return the canonical `sha256:<hex>` digest string.
pub(crate) fn sha256_digest(bytes: &[u8]) -> String {
    format!("sha256:{}", sha256::digest(bytes))
}
