// Copyright 2026 The FusionStore Authors
// SPDX-License-Identifier: Apache-2.0

//! The gateway store: S3 operations sequenced over metadata and data.

use std::sync::Arc;

use async_trait::async_trait;
use fusion_cluster::Cluster;
use fusion_core::error::{Error, Result};
use fusion_core::stream::{PutStream, RangeSpec};
use fusion_core::types::{
    is_valid_bucket_name, is_valid_object_prefix, physical_object_name, BucketInfo, CompletePart,
    DeletedObject, ListObjectsInfo, ListObjectsParams, ListPartsInfo, MultipartInfo, ObjectInfo,
    ObjectOptions, PartInfo, MAX_SCAN_LIMIT,
};
use tracing::warn;

use crate::layer::ObjectLayer;
use crate::pipe::{pipe, GetObjectReader, PIPE_CAPACITY};

/// The gateway's `ObjectLayer` implementation.
///
/// Holds the cluster and nothing else; all durable state lives in MGS, MDS
/// and the vendor backends.
pub struct FusionStore {
    cluster: Arc<Cluster>,
    encryption_supported: bool,
}

impl FusionStore {
    /// Connects to the metadata cluster and builds the store. Any failure
    /// here is fatal for gateway startup.
    pub async fn connect(mgs_addr: &str) -> Result<Self> {
        if mgs_addr.is_empty() {
            return Err(Error::InvalidArgument("mgs addr empty".to_string()));
        }
        let cluster = Cluster::connect(mgs_addr).await?;
        Ok(Self::new(Arc::new(cluster)))
    }

    /// Builds a store over an already-connected cluster.
    #[must_use]
    pub fn new(cluster: Arc<Cluster>) -> Self {
        Self { cluster, encryption_supported: false }
    }

    /// Sets the frontend-global encryption capability flag.
    #[must_use]
    pub fn with_encryption(mut self, supported: bool) -> Self {
        self.encryption_supported = supported;
        self
    }

    /// The underlying cluster.
    #[must_use]
    pub fn cluster(&self) -> &Arc<Cluster> {
        &self.cluster
    }
}

#[async_trait]
impl ObjectLayer for FusionStore {
    async fn shutdown(&self) -> Result<()> {
        self.cluster.shutdown();
        Ok(())
    }

    async fn make_bucket(&self, _bucket: &str, _location: &str) -> Result<()> {
        // VBuckets are created by the administrator through the MGS CLI.
        Err(Error::NotImplemented)
    }

    async fn get_bucket_info(&self, bucket: &str) -> Result<BucketInfo> {
        self.cluster
            .bucket_info(bucket)
            .await?
            .ok_or_else(|| Error::BucketNotFound(bucket.to_string()))
    }

    async fn list_buckets(&self) -> Result<Vec<BucketInfo>> {
        self.cluster.list_buckets().await
    }

    async fn delete_bucket(&self, _bucket: &str) -> Result<()> {
        // VBuckets are deleted by the administrator through the MGS CLI.
        Err(Error::NotImplemented)
    }

    async fn list_objects(
        &self,
        bucket: &str,
        prefix: &str,
        marker: &str,
        delimiter: &str,
        max_keys: i32,
    ) -> Result<ListObjectsInfo> {
        if !is_valid_bucket_name(bucket) {
            return Err(Error::InvalidBucketName(bucket.to_string()));
        }
        if !is_valid_object_prefix(prefix) {
            return Err(Error::InvalidArgument(format!("invalid prefix {prefix:?}")));
        }
        if max_keys > MAX_SCAN_LIMIT {
            return Err(Error::InvalidArgument(format!(
                "max keys must be at most {MAX_SCAN_LIMIT}"
            )));
        }
        let limit = if max_keys <= 0 { MAX_SCAN_LIMIT } else { max_keys };
        let params = ListObjectsParams {
            vbucket: bucket.to_string(),
            prefix: prefix.to_string(),
            marker: marker.to_string(),
            delimiter: delimiter.to_string(),
            limit,
        };
        self.cluster.list_objects(&params).await
    }

    async fn list_objects_v2(
        &self,
        _bucket: &str,
        _prefix: &str,
        _continuation_token: &str,
        _delimiter: &str,
        _max_keys: i32,
        _start_after: &str,
    ) -> Result<ListObjectsInfo> {
        Err(Error::NotImplemented)
    }

    async fn get_object_reader(
        &self,
        bucket: &str,
        object: &str,
        range: Option<RangeSpec>,
        opts: &ObjectOptions,
    ) -> Result<GetObjectReader> {
        let (backend, record) = self.cluster.resolve_get(bucket, object).await?;
        let info = record.to_object_info();
        if let Some(spec) = &range {
            // Fail malformed ranges here; the adapter still receives the
            // original spec so vendor-specific limits apply.
            spec.offset_length(info.size)?;
        }
        let p_bucket = record.bucket.clone();
        let p_object = physical_object_name(bucket, object);
        let (writer, reader) = pipe(PIPE_CAPACITY);

        let producer_info = info.clone();
        let bucket = bucket.to_string();
        let object = object.to_string();
        let opts = opts.clone();
        tokio::spawn(async move {
            let mut writer = writer;
            let result = backend
                .get_object(
                    &p_bucket,
                    &p_object,
                    &bucket,
                    &object,
                    range.as_ref(),
                    &mut writer,
                    &producer_info.etag,
                    &opts,
                )
                .await;
            writer.close_with_error(result.err());
        });
        Ok(GetObjectReader::new(info, reader))
    }

    async fn get_object_info(
        &self,
        bucket: &str,
        object: &str,
        _opts: &ObjectOptions,
    ) -> Result<ObjectInfo> {
        self.cluster
            .get_object_meta(bucket, object)
            .await?
            .ok_or_else(|| Error::ObjectNotFound {
                bucket: bucket.to_string(),
                object: object.to_string(),
            })
    }

    async fn put_object(
        &self,
        bucket: &str,
        object: &str,
        stream: PutStream,
        opts: &ObjectOptions,
    ) -> Result<ObjectInfo> {
        let target = self.cluster.resolve_put(bucket).await?;
        let p_object = physical_object_name(bucket, object);
        let info = target
            .backend
            .put_object(&target.physical_bucket, &p_object, bucket, object, stream, opts)
            .await?;
        // The backend write is durable at this point. If the record write
        // fails the blob is an orphan, invisible to GET/LIST, reclaimed
        // out-of-band.
        if let Err(err) = self
            .cluster
            .put_object_meta(&target.pool_id, &target.physical_bucket, &info)
            .await
        {
            warn!(
                bucket,
                object,
                pool = %target.pool_id,
                physical_bucket = %target.physical_bucket,
                %err,
                "metadata write failed after backend write; blob orphaned"
            );
            return Err(err);
        }
        Ok(info)
    }

    async fn copy_object(
        &self,
        _src_bucket: &str,
        _src_object: &str,
        _dst_bucket: &str,
        _dst_object: &str,
        _opts: &ObjectOptions,
    ) -> Result<ObjectInfo> {
        Err(Error::NotImplemented)
    }

    async fn delete_object(
        &self,
        bucket: &str,
        object: &str,
        opts: &ObjectOptions,
    ) -> Result<ObjectInfo> {
        let (backend, record) = self.cluster.resolve_get(bucket, object).await?;
        let p_object = physical_object_name(bucket, object);
        let info = backend
            .delete_object(&record.bucket, &p_object, bucket, object, opts)
            .await?;
        self.cluster.delete_object_meta(bucket, object).await?;
        Ok(info)
    }

    async fn delete_objects(
        &self,
        bucket: &str,
        objects: &[String],
        opts: &ObjectOptions,
    ) -> Vec<Result<DeletedObject>> {
        let mut results = Vec::with_capacity(objects.len());
        for object in objects {
            let result = self
                .delete_object(bucket, object, opts)
                .await
                .map(|_| DeletedObject { object_name: object.clone() });
            results.push(result);
        }
        results
    }

    async fn list_multipart_uploads(
        &self,
        _bucket: &str,
        _prefix: &str,
        _key_marker: &str,
        _upload_id_marker: &str,
        _delimiter: &str,
        _max_uploads: i32,
    ) -> Result<()> {
        Err(Error::NotImplemented)
    }

    async fn new_multipart_upload(
        &self,
        bucket: &str,
        object: &str,
        opts: &ObjectOptions,
    ) -> Result<String> {
        let target = self.cluster.resolve_put(bucket).await?;
        let p_object = physical_object_name(bucket, object);
        let physical_upload_id = target
            .backend
            .new_multipart_upload(&target.physical_bucket, &p_object, bucket, object, opts)
            .await?;
        self.cluster
            .create_multipart(&target.physical_bucket, bucket, object, &physical_upload_id)
            .await
    }

    async fn put_object_part(
        &self,
        bucket: &str,
        object: &str,
        upload_id: &str,
        part_id: i32,
        stream: PutStream,
        opts: &ObjectOptions,
    ) -> Result<PartInfo> {
        let target = self.cluster.multipart_common(bucket, upload_id).await?;
        let p_object = physical_object_name(bucket, object);
        target
            .backend
            .put_object_part(
                &target.record.physical_bucket,
                &p_object,
                bucket,
                object,
                &target.record.physical_upload_id,
                part_id,
                stream,
                opts,
            )
            .await
    }

    async fn copy_object_part(
        &self,
        _src_bucket: &str,
        _src_object: &str,
        _dst_bucket: &str,
        _dst_object: &str,
        _upload_id: &str,
        _part_id: i32,
        _opts: &ObjectOptions,
    ) -> Result<PartInfo> {
        Err(Error::NotImplemented)
    }

    async fn get_multipart_info(
        &self,
        bucket: &str,
        object: &str,
        upload_id: &str,
        _opts: &ObjectOptions,
    ) -> Result<MultipartInfo> {
        Ok(MultipartInfo {
            bucket: bucket.to_string(),
            object: object.to_string(),
            upload_id: upload_id.to_string(),
        })
    }

    async fn list_object_parts(
        &self,
        bucket: &str,
        object: &str,
        upload_id: &str,
        part_number_marker: i32,
        max_parts: i32,
        _opts: &ObjectOptions,
    ) -> Result<ListPartsInfo> {
        let target = self.cluster.multipart_common(bucket, upload_id).await?;
        let p_object = physical_object_name(bucket, object);
        let mut info = target
            .backend
            .list_object_parts(
                &target.record.physical_bucket,
                &p_object,
                &target.record.physical_upload_id,
                part_number_marker,
                max_parts,
            )
            .await?;
        // The adapter reports physical names; clients get the gateway ones.
        info.bucket = bucket.to_string();
        info.object = object.to_string();
        info.upload_id = upload_id.to_string();
        Ok(info)
    }

    async fn abort_multipart_upload(
        &self,
        bucket: &str,
        object: &str,
        upload_id: &str,
        _opts: &ObjectOptions,
    ) -> Result<()> {
        let target = self.cluster.multipart_common(bucket, upload_id).await?;
        let p_object = physical_object_name(bucket, object);
        target
            .backend
            .abort_multipart_upload(
                &target.record.physical_bucket,
                &p_object,
                &target.record.physical_upload_id,
            )
            .await?;
        // A failed record delete leaves a tombstone for administrative
        // cleanup; the vendor-side abort already succeeded.
        if let Err(err) = self.cluster.delete_multipart(bucket, upload_id).await {
            warn!(bucket, object, upload_id, %err, "multipart record left dangling after abort");
        }
        Ok(())
    }

    async fn complete_multipart_upload(
        &self,
        bucket: &str,
        object: &str,
        upload_id: &str,
        parts: &[CompletePart],
        _opts: &ObjectOptions,
    ) -> Result<ObjectInfo> {
        let target = self.cluster.multipart_common(bucket, upload_id).await?;
        let p_object = physical_object_name(bucket, object);
        let info = target
            .backend
            .complete_multipart_upload(
                &target.record.physical_bucket,
                &p_object,
                bucket,
                object,
                &target.record.physical_upload_id,
                parts,
            )
            .await?;
        self.cluster.delete_multipart(bucket, upload_id).await?;
        self.cluster
            .put_object_meta(&target.pool_id, &target.record.physical_bucket, &info)
            .await?;
        Ok(info)
    }

    async fn set_bucket_policy(&self, _bucket: &str, _policy: &str) -> Result<()> {
        Ok(())
    }

    async fn get_bucket_policy(&self, _bucket: &str) -> Result<Option<String>> {
        Ok(None)
    }

    async fn delete_bucket_policy(&self, _bucket: &str) -> Result<()> {
        Ok(())
    }

    async fn get_object_tags(
        &self,
        _bucket: &str,
        _object: &str,
        _opts: &ObjectOptions,
    ) -> Result<Option<String>> {
        Ok(None)
    }

    async fn put_object_tags(
        &self,
        _bucket: &str,
        _object: &str,
        _tags: &str,
        _opts: &ObjectOptions,
    ) -> Result<ObjectInfo> {
        Ok(ObjectInfo::default())
    }

    async fn delete_object_tags(
        &self,
        _bucket: &str,
        _object: &str,
        _opts: &ObjectOptions,
    ) -> Result<ObjectInfo> {
        Ok(ObjectInfo::default())
    }

    fn is_compression_supported(&self) -> bool {
        false
    }

    fn is_encryption_supported(&self) -> bool {
        self.encryption_supported
    }

    fn is_tagging_supported(&self) -> bool {
        true
    }
}
