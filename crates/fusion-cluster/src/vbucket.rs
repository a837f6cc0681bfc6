//! VBucket registry and MDS-routed metadata operations.

use std::collections::HashMap;

use chrono::Utc;
use fusion_core::error::{Error, Result};
use fusion_core::types::{ListObjectsParams, MultipartRecord, ObjectRecord, VBucket};
use fusion_meta::mds::ObjectListing;
use fusion_meta::{MdsClient, MgsClient};
use parking_lot::RwLock;

use crate::mds::MdsManager;

/// Authoritative registry of vbuckets, with a read-mostly name cache.
///
/// The cache is best-effort routing state; MGS stays authoritative.
/// `query_vbucket` and `vbucket_exists` always bypass the cache.
pub struct VBucketManager {
    mgs: MgsClient,
    mds: MdsManager,
    cache: RwLock<HashMap<String, VBucket>>,
}

impl VBucketManager {
    /// Loads all vbuckets into the cache and dials the active MDS shards.
    pub async fn load(mgs: MgsClient) -> Result<Self> {
        let vbuckets = mgs.list_vbuckets().await?;
        let cache = vbuckets.into_iter().map(|v| (v.name.clone(), v)).collect();
        let mds = MdsManager::load(&mgs).await?;
        Ok(Self { mgs, mds, cache: RwLock::new(cache) })
    }

    /// Whether a vbucket exists, straight from MGS.
    pub async fn vbucket_exists(&self, name: &str) -> Result<bool> {
        Ok(self.mgs.query_vbucket(name).await?.is_some())
    }

    /// Fast-path lookup for routing: cache hit, or MGS query populating the
    /// cache on miss.
    pub async fn get_vbucket(&self, name: &str) -> Result<Option<VBucket>> {
        if let Some(vb) = self.cache.read().get(name).cloned() {
            return Ok(Some(vb));
        }
        let Some(vb) = self.mgs.query_vbucket(name).await? else {
            return Ok(None);
        };
        self.cache.write().insert(vb.name.clone(), vb.clone());
        Ok(Some(vb))
    }

    /// Authoritative lookup, bypassing the cache.
    pub async fn query_vbucket(&self, name: &str) -> Result<Option<VBucket>> {
        self.mgs.query_vbucket(name).await
    }

    /// All vbucket records, from MGS.
    pub async fn list_vbuckets(&self) -> Result<Vec<VBucket>> {
        self.mgs.list_vbuckets().await
    }

    /// Creates a vbucket record with pre-assigned pool and MDS ids.
    pub async fn create_vbucket(
        &self,
        name: &str,
        location: &str,
        pool: &str,
        mds: &str,
    ) -> Result<()> {
        self.mgs.create_vbucket(name, location, pool, mds, "admin").await
    }

    /// Deletes a vbucket record and evicts it from the cache.
    pub async fn delete_vbucket(&self, name: &str) -> Result<()> {
        self.mgs.delete_vbucket(name).await?;
        self.cache.write().remove(name);
        Ok(())
    }

    /// Shard-for-vbucket assignment is an administrative act; see
    /// [`MdsManager::allocate_mds`].
    #[must_use]
    pub fn allocate_mds(&self, vbucket: &str) -> Option<String> {
        self.mds.allocate_mds(vbucket)
    }

    /// The dialed shard registry.
    #[must_use]
    pub fn mds_manager(&self) -> &MdsManager {
        &self.mds
    }

    /// Resolves a vbucket to the client of its owning MDS shard.
    async fn route(&self, vbucket: &str) -> Result<MdsClient> {
        let vb = self
            .get_vbucket(vbucket)
            .await?
            .ok_or_else(|| Error::BucketNotFound(vbucket.to_string()))?;
        self.mds.client(&vb.mds).ok_or_else(|| {
            Error::PlacementUnresolved(format!(
                "mds {} of vbucket {} not dialed",
                vb.mds, vb.name
            ))
        })
    }

    /// Writes one object record to the owning shard.
    pub async fn put_object_meta(&self, record: &ObjectRecord) -> Result<()> {
        self.route(&record.vbucket).await?.put_object(record).await
    }

    /// Reads one object record; `None` when the key does not exist.
    pub async fn get_object_meta(
        &self,
        vbucket: &str,
        object: &str,
    ) -> Result<Option<ObjectRecord>> {
        self.route(vbucket).await?.query_object(vbucket, object).await
    }

    /// Deletes one object record.
    pub async fn delete_object_meta(&self, vbucket: &str, object: &str) -> Result<()> {
        self.route(vbucket).await?.delete_object(vbucket, object).await
    }

    /// Scans object records by prefix.
    pub async fn list_objects(&self, params: &ListObjectsParams) -> Result<ObjectListing> {
        self.route(&params.vbucket).await?.list_objects(params).await
    }

    /// Creates a multipart record; returns the gateway-visible upload id.
    pub async fn create_multipart(
        &self,
        p_bucket: &str,
        vbucket: &str,
        object: &str,
        physical_upload_id: &str,
    ) -> Result<String> {
        let record = MultipartRecord {
            upload_id: String::new(),
            physical_upload_id: physical_upload_id.to_string(),
            vbucket: vbucket.to_string(),
            physical_bucket: p_bucket.to_string(),
            object: object.to_string(),
            created_at: Utc::now(),
        };
        self.route(vbucket).await?.create_multipart(&record).await
    }

    /// Reads one multipart record; `None` when the upload does not exist.
    pub async fn query_multipart(
        &self,
        vbucket: &str,
        upload_id: &str,
    ) -> Result<Option<MultipartRecord>> {
        self.route(vbucket).await?.query_multipart(vbucket, upload_id).await
    }

    /// Deletes one multipart record. Idempotent at the shard.
    pub async fn delete_multipart(&self, vbucket: &str, upload_id: &str) -> Result<()> {
        self.route(vbucket).await?.delete_multipart(vbucket, upload_id).await
    }

    /// Scans multipart records of one vbucket.
    pub async fn list_multiparts(
        &self,
        vbucket: &str,
        marker: &str,
        limit: i32,
    ) -> Result<(Vec<MultipartRecord>, String)> {
        self.route(vbucket).await?.list_multiparts(vbucket, marker, limit).await
    }
}
