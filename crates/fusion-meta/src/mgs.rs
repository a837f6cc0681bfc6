//! Client for the central management service.

use std::time::Duration;

use fusion_core::error::{Error, Result};
use fusion_core::types::VBucket;
use tonic::transport::{Channel, Endpoint};
use tracing::debug;

use crate::convert::{decode_vbucket, status_found, status_ok};
use crate::proto;
use crate::proto::mgs_service_client::MgsServiceClient;
use crate::RPC_TIMEOUT_SECS;

/// The management-service client.
///
/// One instance is dialed per gateway process at startup; the connection is
/// long-lived and the client is cloned wherever a handle is needed.
#[derive(Debug, Clone)]
pub struct MgsClient {
    inner: MgsServiceClient<Channel>,
}

impl MgsClient {
    /// Dials the management service, blocking until the connection is
    /// established. Every subsequent call carries a fixed deadline.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be parsed or the service is
    /// unreachable.
    pub async fn connect(addr: &str) -> Result<Self> {
        if addr.is_empty() {
            return Err(Error::InvalidArgument("mgs addr empty".to_string()));
        }
        let endpoint = Endpoint::from_shared(format!("http://{addr}"))
            .map_err(|e| Error::metadata(format!("invalid mgs addr {addr:?}: {e}")))?
            .timeout(Duration::from_secs(RPC_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(RPC_TIMEOUT_SECS));
        let channel = endpoint
            .connect()
            .await
            .map_err(|e| Error::metadata(format!("couldn't dial mgs {addr}: {e}")))?;
        debug!(addr, "connected to mgs");
        Ok(Self { inner: MgsServiceClient::new(channel) })
    }

    /// Lists all registered pools.
    pub async fn list_pools(&self) -> Result<Vec<proto::Pool>> {
        let resp = self
            .inner
            .clone()
            .list_pools(proto::ListPoolsRequest {})
            .await
            .map_err(rpc_err)?
            .into_inner();
        status_ok(resp.status.as_ref())?;
        Ok(resp.pools)
    }

    /// Lists the physical buckets registered under one pool.
    pub async fn list_buckets(&self, pool_id: &str) -> Result<Vec<proto::Bucket>> {
        let req = proto::ListBucketsRequest { pool_id: pool_id.to_string() };
        let resp = self.inner.clone().list_buckets(req).await.map_err(rpc_err)?.into_inner();
        status_ok(resp.status.as_ref())?;
        Ok(resp.buckets)
    }

    /// Lists all registered MDS shards.
    pub async fn list_mds(&self) -> Result<Vec<proto::Mds>> {
        let resp = self
            .inner
            .clone()
            .list_mds(proto::ListMdsRequest {})
            .await
            .map_err(rpc_err)?
            .into_inner();
        status_ok(resp.status.as_ref())?;
        Ok(resp.mds_list)
    }

    /// Creates a vbucket record with a pre-assigned pool and MDS shard.
    pub async fn create_vbucket(
        &self,
        name: &str,
        location: &str,
        pool: &str,
        mds: &str,
        owner: &str,
    ) -> Result<()> {
        let req = proto::CreateVbucketRequest {
            vbucket: Some(proto::VBucket {
                name: name.to_string(),
                pool: pool.to_string(),
                mds: mds.to_string(),
                location: location.to_string(),
                owner: owner.to_string(),
                ..Default::default()
            }),
        };
        let resp = self.inner.clone().create_vbucket(req).await.map_err(rpc_err)?.into_inner();
        status_ok(resp.status.as_ref())
    }

    /// Queries one vbucket record by name; `None` when it does not exist.
    pub async fn query_vbucket(&self, name: &str) -> Result<Option<VBucket>> {
        let req = proto::QueryVbucketRequest { name: name.to_string() };
        let resp = self.inner.clone().query_vbucket(req).await.map_err(rpc_err)?.into_inner();
        if !status_found(resp.status.as_ref())? {
            return Ok(None);
        }
        let vbucket = resp
            .vbucket
            .ok_or_else(|| Error::metadata(format!("vbucket {name:?} missing from response")))?;
        Ok(Some(decode_vbucket(vbucket)))
    }

    /// Deletes one vbucket record by name.
    pub async fn delete_vbucket(&self, name: &str) -> Result<()> {
        let req = proto::DeleteVbucketRequest { name: name.to_string() };
        let resp = self.inner.clone().delete_vbucket(req).await.map_err(rpc_err)?.into_inner();
        status_ok(resp.status.as_ref())
    }

    /// Lists all vbucket records.
    pub async fn list_vbuckets(&self) -> Result<Vec<VBucket>> {
        let resp = self
            .inner
            .clone()
            .list_vbuckets(proto::ListVbucketsRequest {})
            .await
            .map_err(rpc_err)?
            .into_inner();
        status_ok(resp.status.as_ref())?;
        Ok(resp.vbuckets.into_iter().map(decode_vbucket).collect())
    }
}

pub(crate) fn rpc_err(status: tonic::Status) -> Error {
    Error::metadata(format!("rpc failed: {status}"))
}
