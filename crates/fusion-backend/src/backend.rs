//! The uniform backend adapter contract.

use async_trait::async_trait;
use fusion_core::stream::{PutStream, RangeSpec};
use fusion_core::types::{CompletePart, ListPartsInfo, ObjectInfo, ObjectOptions, PartInfo};
use fusion_core::Result;
use rand::distributions::Alphanumeric;
use rand::Rng;
use tokio::io::AsyncWrite;

/// One vendor adapter.
///
/// `p_bucket`/`p_object` address the blob at the vendor; `vbucket`/`object`
/// are the gateway-visible names, used only to label returned metadata and
/// error context. All calls inherit the caller's cancellation: dropping the
/// returned future aborts the request.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Stores an object, consuming the body in a single pass. The frontend's
    /// MD5 digest is forwarded as `Content-MD5` when present.
    async fn put_object(
        &self,
        p_bucket: &str,
        p_object: &str,
        vbucket: &str,
        object: &str,
        stream: PutStream,
        opts: &ObjectOptions,
    ) -> Result<ObjectInfo>;

    /// Streams an object (or a range of it) into `writer`. A non-empty
    /// `etag` is sent as an `If-Match` precondition where the backend
    /// supports it.
    async fn get_object(
        &self,
        p_bucket: &str,
        p_object: &str,
        vbucket: &str,
        object: &str,
        range: Option<&RangeSpec>,
        writer: &mut (dyn AsyncWrite + Send + Unpin),
        etag: &str,
        opts: &ObjectOptions,
    ) -> Result<()>;

    /// Deletes an object. Vendor deletes are idempotent.
    async fn delete_object(
        &self,
        p_bucket: &str,
        p_object: &str,
        vbucket: &str,
        object: &str,
        opts: &ObjectOptions,
    ) -> Result<ObjectInfo>;

    /// Initiates a multipart upload; returns the vendor-assigned upload id.
    async fn new_multipart_upload(
        &self,
        p_bucket: &str,
        p_object: &str,
        vbucket: &str,
        object: &str,
        opts: &ObjectOptions,
    ) -> Result<String>;

    /// Uploads one part, consuming the body in a single pass.
    #[allow(clippy::too_many_arguments)]
    async fn put_object_part(
        &self,
        p_bucket: &str,
        p_object: &str,
        vbucket: &str,
        object: &str,
        upload_id: &str,
        part_id: i32,
        stream: PutStream,
        opts: &ObjectOptions,
    ) -> Result<PartInfo>;

    /// Lists the parts of one upload, walking the vendor's pagination until
    /// `max_parts` is reached or the listing is exhausted. Names in the
    /// result are the physical ones; the store rewrites them.
    async fn list_object_parts(
        &self,
        p_bucket: &str,
        p_object: &str,
        upload_id: &str,
        part_number_marker: i32,
        max_parts: i32,
    ) -> Result<ListPartsInfo>;

    /// Aborts one upload at the vendor.
    async fn abort_multipart_upload(
        &self,
        p_bucket: &str,
        p_object: &str,
        upload_id: &str,
    ) -> Result<()>;

    /// Completes one upload, then re-stats the physical object and verifies
    /// the completion ETag against the stat ETag. A mismatch fails the
    /// request; the physical object is left for reconciliation.
    #[allow(clippy::too_many_arguments)]
    async fn complete_multipart_upload(
        &self,
        p_bucket: &str,
        p_object: &str,
        vbucket: &str,
        object: &str,
        upload_id: &str,
        parts: &[CompletePart],
    ) -> Result<ObjectInfo>;
}

/// Strips the surrounding quotes vendors put on ETag values. Records and
/// comparisons always use the unquoted form.
#[must_use]
pub fn trim_etag(etag: &str) -> String {
    etag.trim_matches('"').to_string()
}

/// A random bucket name used for the construction-time liveness probe.
///
/// The name is never created; the probe only proves the endpoint is
/// reachable with valid credentials. Forbidden/NotFound/AccessDenied
/// answers are therefore all acceptable.
#[must_use]
pub fn probe_bucket_name() -> String {
    let suffix: String = rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(42)
        .map(|c| (c as char).to_ascii_lowercase())
        .collect();
    format!("probe-bucket-sign-{suffix}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trim_etag() {
        assert_eq!(trim_etag("\"abc123\""), "abc123");
        assert_eq!(trim_etag("abc123"), "abc123");
        assert_eq!(trim_etag("\"multi-3\""), "multi-3");
    }

    #[test]
    fn test_probe_bucket_name_shape() {
        let name = probe_bucket_name();
        assert_eq!(name.len(), 60);
        assert!(name.starts_with("probe-bucket-sign-"));
        assert!(name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-'));
        // Two probes should practically never collide.
        assert_ne!(name, probe_bucket_name());
    }
}
