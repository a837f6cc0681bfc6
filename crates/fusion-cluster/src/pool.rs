//! Pool registry and physical-bucket selection.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};

use fusion_core::types::{Credentials, PhysicalBucket, Pool, Status};
use fusion_core::Result;
use fusion_meta::convert::decode_vendor;
use fusion_meta::MgsClient;
use tracing::info;

/// Process-wide round-robin cursor over physical buckets. Rollover is
/// harmless; the counter is never persisted.
static BUCKET_INDEX: AtomicU64 = AtomicU64::new(0);

/// Registry of the active pools, loaded from MGS at startup and immutable
/// until process restart.
pub struct PoolManager {
    pools: HashMap<String, Pool>,
}

impl PoolManager {
    /// Fetches all pools from MGS, keeping the active ones together with
    /// their active physical buckets.
    ///
    /// # Errors
    ///
    /// Fails on any MGS error, and on an active pool carrying an unknown
    /// vendor tag.
    pub async fn load(mgs: &MgsClient) -> Result<Self> {
        let mut pools = HashMap::new();
        for wire in mgs.list_pools().await? {
            if !Status::from_wire(&wire.status).is_active() {
                continue;
            }
            let vendor = decode_vendor(&wire)?;
            let creds = wire.creds.unwrap_or_default();
            let mut pool = Pool {
                id: wire.id,
                name: wire.name,
                vendor,
                endpoint: wire.endpoint,
                status: Status::Active,
                creds: Credentials {
                    access_key: creds.access_key,
                    secret_key: creds.secret_key,
                },
                buckets: Vec::new(),
            };
            for bucket in mgs.list_buckets(&pool.id).await? {
                let status = Status::from_wire(&bucket.status);
                if !status.is_active() {
                    continue;
                }
                pool.buckets.push(PhysicalBucket {
                    id: bucket.id,
                    name: bucket.name,
                    pool_id: bucket.pool_id,
                    status,
                });
            }
            info!(
                pool = %pool.id,
                vendor = pool.vendor.as_str(),
                buckets = pool.buckets.len(),
                "loaded pool"
            );
            pools.insert(pool.id.clone(), pool);
        }
        Ok(Self { pools })
    }

    /// Builds a manager from already-decoded pools, keeping the active ones.
    /// Used by admin tooling and tests.
    #[must_use]
    pub fn from_pools(pools: Vec<Pool>) -> Self {
        let pools = pools
            .into_iter()
            .filter(|p| p.status.is_active())
            .map(|p| (p.id.clone(), p))
            .collect();
        Self { pools }
    }

    /// Looks up one pool by id.
    #[must_use]
    pub fn get_pool(&self, pool_id: &str) -> Option<&Pool> {
        self.pools.get(pool_id)
    }

    /// All loaded pools, keyed by id.
    #[must_use]
    pub fn pool_map(&self) -> &HashMap<String, Pool> {
        &self.pools
    }

    /// Selects a physical bucket of the pool round-robin. `None` when the
    /// pool is unknown or has no active buckets.
    #[must_use]
    pub fn alloc_bucket(&self, pool_id: &str) -> Option<String> {
        let pool = self.pools.get(pool_id)?;
        if pool.buckets.is_empty() {
            return None;
        }
        let counter = BUCKET_INDEX.fetch_add(1, Ordering::Relaxed);
        let index = (counter % pool.buckets.len() as u64) as usize;
        Some(pool.buckets[index].name.clone())
    }

    /// Pool-for-vbucket assignment is an administrative act performed
    /// through the MGS CLI; the gateway never allocates one.
    #[must_use]
    pub fn allocate_pool(&self, _vbucket: &str) -> Option<String> {
        None
    }
}
