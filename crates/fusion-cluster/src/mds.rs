//! Registry of dialed metadata shards.

use std::collections::HashMap;

use fusion_core::error::{Error, Result};
use fusion_core::types::MdsInfo;
use fusion_meta::convert::decode_mds;
use fusion_meta::{MdsClient, MgsClient};
use tracing::info;

/// Holds one long-lived client per active MDS shard, keyed by shard id.
pub struct MdsManager {
    shards: HashMap<String, MdsInfo>,
    clients: HashMap<String, MdsClient>,
}

impl MdsManager {
    /// Fetches the shard registry from MGS and dials every active shard.
    ///
    /// # Errors
    ///
    /// Fails on any MGS error, on an active shard without an address, and
    /// on any dial failure.
    pub async fn load(mgs: &MgsClient) -> Result<Self> {
        let mut shards = HashMap::new();
        let mut clients = HashMap::new();
        for wire in mgs.list_mds().await? {
            let shard = decode_mds(wire);
            if !shard.status.is_active() {
                continue;
            }
            let addr = shard.addrs.first().ok_or_else(|| {
                Error::metadata(format!("mds {} has no service address", shard.id))
            })?;
            let client = MdsClient::connect(addr).await?;
            info!(mds = %shard.id, addr, "dialed mds shard");
            clients.insert(shard.id.clone(), client);
            shards.insert(shard.id.clone(), shard);
        }
        Ok(Self { shards, clients })
    }

    /// The shard registry, keyed by id.
    #[must_use]
    pub fn shard_map(&self) -> &HashMap<String, MdsInfo> {
        &self.shards
    }

    /// A handle to one dialed shard.
    #[must_use]
    pub fn client(&self, mds_id: &str) -> Option<MdsClient> {
        self.clients.get(mds_id).cloned()
    }

    /// Shard-for-vbucket assignment is an administrative act performed
    /// through the MGS CLI; the gateway never allocates one.
    #[must_use]
    pub fn allocate_mds(&self, _vbucket: &str) -> Option<String> {
        None
    }
}
