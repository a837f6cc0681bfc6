// Copyright 2026 The FusionStore Authors
// SPDX-License-Identifier: Apache-2.0

//! The composition root: pools, vbuckets and adapters wired together.

use std::collections::HashMap;
use std::sync::Arc;

use fusion_backend::{shared_http_client, Backend, BosBackend, S3Backend};
use fusion_core::error::{Error, Result};
use fusion_core::types::{
    BucketInfo, ListObjectsInfo, ListObjectsParams, MultipartRecord, ObjectInfo, ObjectRecord,
    Vendor,
};
use fusion_meta::MgsClient;
use tracing::info;

use crate::pool::PoolManager;
use crate::vbucket::VBucketManager;

/// Everything a PUT needs: the adapter and the chosen placement.
pub struct PutTarget {
    /// The adapter of the owning pool.
    pub backend: Arc<dyn Backend>,
    /// The owning pool id, recorded as the object's placement.
    pub pool_id: String,
    /// The physical bucket selected round-robin for this write.
    pub physical_bucket: String,
}

/// Everything a multipart operation needs: the record, the adapter of the
/// owning pool, and the pool id for the final metadata write.
pub struct MultipartTarget {
    /// The multipart record held at the MDS.
    pub record: MultipartRecord,
    /// The adapter of the vbucket's pool.
    pub backend: Arc<dyn Backend>,
    /// The vbucket's pool id.
    pub pool_id: String,
}

/// The gateway's view of the whole storage cluster.
///
/// Owns the pool registry, the vbucket registry and one adapter per pool.
/// Built once at startup; any construction failure aborts the gateway.
pub struct Cluster {
    pool_mgr: PoolManager,
    vbucket_mgr: VBucketManager,
    backends: HashMap<String, Arc<dyn Backend>>,
}

impl Cluster {
    /// Dials MGS, loads pools and vbuckets, dials the MDS shards and
    /// constructs one adapter per pool.
    pub async fn connect(mgs_addr: &str) -> Result<Self> {
        let mgs = MgsClient::connect(mgs_addr).await?;
        let pool_mgr = PoolManager::load(&mgs).await?;
        let vbucket_mgr = VBucketManager::load(mgs).await?;
        let backends = init_backends(&pool_mgr).await?;
        info!(
            pools = pool_mgr.pool_map().len(),
            mds = vbucket_mgr.mds_manager().shard_map().len(),
            "cluster ready"
        );
        Ok(Self { pool_mgr, vbucket_mgr, backends })
    }

    /// Releases cluster resources. Connections close when the handles drop;
    /// this is the explicit point where that happens on shutdown.
    pub fn shutdown(&self) {
        info!("cluster shutting down");
    }

    /// The pool registry.
    #[must_use]
    pub fn pool_manager(&self) -> &PoolManager {
        &self.pool_mgr
    }

    /// The vbucket registry.
    #[must_use]
    pub fn vbucket_manager(&self) -> &VBucketManager {
        &self.vbucket_mgr
    }

    /// The adapter of one pool.
    #[must_use]
    pub fn backend(&self, pool_id: &str) -> Option<Arc<dyn Backend>> {
        self.backends.get(pool_id).cloned()
    }

    /// Resolves a read: object record first, then the adapter its recorded
    /// placement points at. A missing pool or adapter is an internal
    /// inconsistency, distinct from a missing object.
    pub async fn resolve_get(
        &self,
        vbucket: &str,
        object: &str,
    ) -> Result<(Arc<dyn Backend>, ObjectRecord)> {
        let record = self
            .vbucket_mgr
            .get_object_meta(vbucket, object)
            .await?
            .ok_or_else(|| Error::ObjectNotFound {
                bucket: vbucket.to_string(),
                object: object.to_string(),
            })?;
        let backend = self.backend_for_pool(&record.pool)?;
        Ok((backend, record))
    }

    /// Resolves a write: the vbucket's pool, a round-robin physical bucket
    /// and the pool's adapter.
    pub async fn resolve_put(&self, vbucket: &str) -> Result<PutTarget> {
        let vb = self
            .vbucket_mgr
            .get_vbucket(vbucket)
            .await?
            .ok_or_else(|| Error::BucketNotFound(vbucket.to_string()))?;
        let pool = self.pool_mgr.get_pool(&vb.pool).ok_or_else(|| {
            Error::PlacementUnresolved(format!(
                "pool {} of vbucket {} not loaded",
                vb.pool, vb.name
            ))
        })?;
        let physical_bucket = self.pool_mgr.alloc_bucket(&pool.id).ok_or_else(|| {
            Error::PlacementUnresolved(format!("pool {} has no active physical bucket", pool.id))
        })?;
        let backend = self.backend_for_pool(&pool.id)?;
        Ok(PutTarget { backend, pool_id: pool.id.clone(), physical_bucket })
    }

    /// Resolves a multipart operation: the record plus the adapter and pool
    /// of the owning vbucket.
    pub async fn multipart_common(&self, vbucket: &str, upload_id: &str) -> Result<MultipartTarget> {
        let record = self
            .vbucket_mgr
            .query_multipart(vbucket, upload_id)
            .await?
            .ok_or_else(|| Error::UploadNotFound(upload_id.to_string()))?;
        let vb = self
            .vbucket_mgr
            .get_vbucket(vbucket)
            .await?
            .ok_or_else(|| Error::BucketNotFound(vbucket.to_string()))?;
        let backend = self.backend_for_pool(&vb.pool)?;
        Ok(MultipartTarget { record, backend, pool_id: vb.pool })
    }

    fn backend_for_pool(&self, pool_id: &str) -> Result<Arc<dyn Backend>> {
        if self.pool_mgr.get_pool(pool_id).is_none() {
            return Err(Error::PlacementUnresolved(format!("pool {pool_id} not loaded")));
        }
        self.backend(pool_id).ok_or_else(|| {
            Error::PlacementUnresolved(format!("no adapter for pool {pool_id}"))
        })
    }

    /// Bucket metadata, reflecting MGS state at the time of the query.
    pub async fn bucket_info(&self, vbucket: &str) -> Result<Option<BucketInfo>> {
        let Some(vb) = self.vbucket_mgr.query_vbucket(vbucket).await? else {
            return Ok(None);
        };
        Ok(Some(BucketInfo { name: vb.name, created_at: vb.created_at }))
    }

    /// All buckets.
    pub async fn list_buckets(&self) -> Result<Vec<BucketInfo>> {
        let vbuckets = self.vbucket_mgr.list_vbuckets().await?;
        Ok(vbuckets
            .into_iter()
            .map(|vb| BucketInfo { name: vb.name, created_at: vb.created_at })
            .collect())
    }

    /// Prefix listing via the owning MDS shard. Truncation is signalled by
    /// a non-empty next marker.
    pub async fn list_objects(&self, params: &ListObjectsParams) -> Result<ListObjectsInfo> {
        let listing = self.vbucket_mgr.list_objects(params).await?;
        Ok(ListObjectsInfo {
            is_truncated: !listing.next_marker.is_empty(),
            next_marker: listing.next_marker,
            objects: listing.objects.iter().map(ObjectRecord::to_object_info).collect(),
            prefixes: listing.common_prefixes,
        })
    }

    /// Records an object's placement after a successful backend write.
    pub async fn put_object_meta(
        &self,
        pool_id: &str,
        physical_bucket: &str,
        info: &ObjectInfo,
    ) -> Result<()> {
        let record = info.to_record(pool_id, physical_bucket);
        self.vbucket_mgr.put_object_meta(&record).await
    }

    /// Reads an object's gateway-visible metadata.
    pub async fn get_object_meta(&self, vbucket: &str, object: &str) -> Result<Option<ObjectInfo>> {
        let record = self.vbucket_mgr.get_object_meta(vbucket, object).await?;
        Ok(record.map(|r| r.to_object_info()))
    }

    /// Deletes an object's record.
    pub async fn delete_object_meta(&self, vbucket: &str, object: &str) -> Result<()> {
        self.vbucket_mgr.delete_object_meta(vbucket, object).await
    }

    /// Creates a multipart record mapping the physical upload id; returns
    /// the gateway-visible upload id.
    pub async fn create_multipart(
        &self,
        p_bucket: &str,
        vbucket: &str,
        object: &str,
        physical_upload_id: &str,
    ) -> Result<String> {
        self.vbucket_mgr.create_multipart(p_bucket, vbucket, object, physical_upload_id).await
    }

    /// Deletes a multipart record.
    pub async fn delete_multipart(&self, vbucket: &str, upload_id: &str) -> Result<()> {
        self.vbucket_mgr.delete_multipart(vbucket, upload_id).await
    }

    /// Admin flow: creates a vbucket after checking the name is free.
    /// In-band allocation is disabled, so a pre-assigned pool and MDS pair
    /// would have to come from the administrator; without one this fails.
    pub async fn make_bucket(&self, vbucket: &str, location: &str) -> Result<()> {
        if self.vbucket_mgr.vbucket_exists(vbucket).await? {
            return Err(Error::Metadata(format!("bucket {vbucket:?} already exists")));
        }
        let pool = self.pool_mgr.allocate_pool(vbucket);
        let mds = self.vbucket_mgr.allocate_mds(vbucket);
        let (Some(pool), Some(mds)) = (pool, mds) else {
            return Err(Error::Metadata("couldn't allocate pool or mds".to_string()));
        };
        self.vbucket_mgr.create_vbucket(vbucket, location, &pool, &mds).await
    }
}

async fn init_backends(pool_mgr: &PoolManager) -> Result<HashMap<String, Arc<dyn Backend>>> {
    let http_client = shared_http_client();
    let mut backends: HashMap<String, Arc<dyn Backend>> = HashMap::new();
    for pool in pool_mgr.pool_map().values() {
        let backend: Arc<dyn Backend> = match pool.vendor {
            Vendor::S3 => {
                Arc::new(S3Backend::new(&pool.endpoint, &pool.creds, http_client.clone()).await?)
            }
            Vendor::Bos => Arc::new(BosBackend::new(&pool.endpoint, &pool.creds).await?),
        };
        backends.insert(pool.id.clone(), backend);
    }
    Ok(backends)
}
