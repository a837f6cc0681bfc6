//! The object-layer contract consumed by the S3 frontend.

use async_trait::async_trait;
use fusion_core::stream::{PutStream, RangeSpec};
use fusion_core::types::{
    BucketInfo, CompletePart, DeletedObject, ListObjectsInfo, ListPartsInfo, MultipartInfo,
    ObjectInfo, ObjectOptions, PartInfo,
};
use fusion_core::Result;

use crate::pipe::GetObjectReader;

/// The S3 surface the gateway exposes to its frontend.
///
/// Deliberately unsupported operations return [`fusion_core::Error::NotImplemented`],
/// which the frontend answers with HTTP 501.
#[async_trait]
pub trait ObjectLayer: Send + Sync {
    /// Releases cluster resources on process shutdown.
    async fn shutdown(&self) -> Result<()>;

    /// Bucket creation is an MGS administrator action; always
    /// `NotImplemented`.
    async fn make_bucket(&self, bucket: &str, location: &str) -> Result<()>;

    /// Bucket metadata, reflecting registry state at the time of the call.
    async fn get_bucket_info(&self, bucket: &str) -> Result<BucketInfo>;

    /// All buckets.
    async fn list_buckets(&self) -> Result<Vec<BucketInfo>>;

    /// Bucket deletion is an MGS administrator action; always
    /// `NotImplemented`.
    async fn delete_bucket(&self, bucket: &str) -> Result<()>;

    /// Lists objects under a prefix. `max_keys` above 1000 is rejected
    /// before any RPC.
    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        marker: &str,
        delimiter: &str,
        max_keys: i32,
    ) -> Result<ListObjectsInfo>;

    /// V2 listing; always `NotImplemented`.
    async fn list_objects_v2(
        &self,
        bucket: &str,
        prefix: &str,
        continuation_token: &str,
        delimiter: &str,
        max_keys: i32,
        start_after: &str,
    ) -> Result<ListObjectsInfo>;

    /// Opens a streaming read. The returned reader carries the object
    /// metadata; dropping it cancels the backend transfer.
    async fn get_object_reader(
        &self,
        bucket: &str,
        object: &str,
        range: Option<RangeSpec>,
        opts: &ObjectOptions,
    ) -> Result<GetObjectReader>;

    /// Object metadata from the metadata service.
    async fn get_object_info(
        &self,
        bucket: &str,
        object: &str,
        opts: &ObjectOptions,
    ) -> Result<ObjectInfo>;

    /// Stores an object: backend write first, metadata record second.
    async fn put_object(
        &self,
        bucket: &str,
        object: &str,
        stream: PutStream,
        opts: &ObjectOptions,
    ) -> Result<ObjectInfo>;

    /// Server-side copy; always `NotImplemented`.
    async fn copy_object(
        &self,
        src_bucket: &str,
        src_object: &str,
        dst_bucket: &str,
        dst_object: &str,
        opts: &ObjectOptions,
    ) -> Result<ObjectInfo>;

    /// Deletes an object: backend delete first (authoritative), record
    /// second.
    async fn delete_object(
        &self,
        bucket: &str,
        object: &str,
        opts: &ObjectOptions,
    ) -> Result<ObjectInfo>;

    /// Deletes many objects; every entry succeeds or fails independently.
    async fn delete_objects(
        &self,
        bucket: &str,
        objects: &[String],
        opts: &ObjectOptions,
    ) -> Vec<Result<DeletedObject>>;

    /// Upload listing across keys; always `NotImplemented`.
    async fn list_multipart_uploads(
        &self,
        bucket: &str,
        prefix: &str,
        key_marker: &str,
        upload_id_marker: &str,
        delimiter: &str,
        max_uploads: i32,
    ) -> Result<()>;

    /// Starts a multipart upload; returns the gateway-visible upload id.
    async fn new_multipart_upload(
        &self,
        bucket: &str,
        object: &str,
        opts: &ObjectOptions,
    ) -> Result<String>;

    /// Uploads one part of an open upload.
    #[allow(clippy::too_many_arguments)]
    async fn put_object_part(
        &self,
        bucket: &str,
        object: &str,
        upload_id: &str,
        part_id: i32,
        stream: PutStream,
        opts: &ObjectOptions,
    ) -> Result<PartInfo>;

    /// Part copy; always `NotImplemented`.
    #[allow(clippy::too_many_arguments)]
    async fn copy_object_part(
        &self,
        src_bucket: &str,
        src_object: &str,
        dst_bucket: &str,
        dst_object: &str,
        upload_id: &str,
        part_id: i32,
        opts: &ObjectOptions,
    ) -> Result<PartInfo>;

    /// Identity of an upload, echoed back to the client.
    async fn get_multipart_info(
        &self,
        bucket: &str,
        object: &str,
        upload_id: &str,
        opts: &ObjectOptions,
    ) -> Result<MultipartInfo>;

    /// Lists the parts uploaded so far, under gateway-visible names.
    #[allow(clippy::too_many_arguments)]
    async fn list_object_parts(
        &self,
        bucket: &str,
        object: &str,
        upload_id: &str,
        part_number_marker: i32,
        max_parts: i32,
        opts: &ObjectOptions,
    ) -> Result<ListPartsInfo>;

    /// Aborts an upload at the backend and drops the gateway record.
    async fn abort_multipart_upload(
        &self,
        bucket: &str,
        object: &str,
        upload_id: &str,
        opts: &ObjectOptions,
    ) -> Result<()>;

    /// Completes an upload: backend complete, record delete, object record
    /// write, strictly in that order.
    async fn complete_multipart_upload(
        &self,
        bucket: &str,
        object: &str,
        upload_id: &str,
        parts: &[CompletePart],
        opts: &ObjectOptions,
    ) -> Result<ObjectInfo>;

    /// Bucket policies are evaluated outside the gateway; stub.
    async fn set_bucket_policy(&self, bucket: &str, policy: &str) -> Result<()>;

    /// Bucket policies are evaluated outside the gateway; stub.
    async fn get_bucket_policy(&self, bucket: &str) -> Result<Option<String>>;

    /// Bucket policies are evaluated outside the gateway; stub.
    async fn delete_bucket_policy(&self, bucket: &str) -> Result<()>;

    /// Object tag read; stub.
    async fn get_object_tags(
        &self,
        bucket: &str,
        object: &str,
        opts: &ObjectOptions,
    ) -> Result<Option<String>>;

    /// Object tag write; stub.
    async fn put_object_tags(
        &self,
        bucket: &str,
        object: &str,
        tags: &str,
        opts: &ObjectOptions,
    ) -> Result<ObjectInfo>;

    /// Object tag delete; stub.
    async fn delete_object_tags(
        &self,
        bucket: &str,
        object: &str,
        opts: &ObjectOptions,
    ) -> Result<ObjectInfo>;

    /// Whether the layer compresses payloads.
    fn is_compression_supported(&self) -> bool;

    /// Whether server-side encryption is handled for this layer.
    fn is_encryption_supported(&self) -> bool;

    /// Whether object tagging is supported.
    fn is_tagging_supported(&self) -> bool;
}
