//! Client for one metadata-service shard.

use std::time::Duration;

use fusion_core::error::{Error, Result};
use fusion_core::types::{ListObjectsParams, MultipartRecord, ObjectRecord, MAX_SCAN_LIMIT};
use tonic::transport::{Channel, Endpoint};
use tracing::debug;

use crate::convert::{
    decode_multipart, decode_object, encode_multipart, encode_object, status_found, status_ok,
};
use crate::mgs::rpc_err;
use crate::proto;
use crate::proto::mds_service_client::MdsServiceClient;
use crate::RPC_TIMEOUT_SECS;

/// A page of object records from a prefix scan.
#[derive(Debug, Clone, Default)]
pub struct ObjectListing {
    /// The records on this page.
    pub objects: Vec<ObjectRecord>,
    /// Common prefixes grouped by the delimiter.
    pub common_prefixes: Vec<String>,
    /// Marker to resume from; empty when the scan is exhausted.
    pub next_marker: String,
}

/// A metadata-shard client, dialed once per active shard at startup.
#[derive(Debug, Clone)]
pub struct MdsClient {
    inner: MdsServiceClient<Channel>,
}

impl MdsClient {
    /// Dials one MDS shard, blocking until connected.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be parsed or the shard is
    /// unreachable.
    pub async fn connect(addr: &str) -> Result<Self> {
        let endpoint = Endpoint::from_shared(format!("http://{addr}"))
            .map_err(|e| Error::metadata(format!("invalid mds addr {addr:?}: {e}")))?
            .timeout(Duration::from_secs(RPC_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(RPC_TIMEOUT_SECS));
        let channel = endpoint
            .connect()
            .await
            .map_err(|e| Error::metadata(format!("couldn't dial mds {addr}: {e}")))?;
        debug!(addr, "connected to mds shard");
        Ok(Self { inner: MdsServiceClient::new(channel) })
    }

    /// Writes (or overwrites) one object record.
    pub async fn put_object(&self, record: &ObjectRecord) -> Result<()> {
        let req = proto::PutObjectRequest { object: Some(encode_object(record)) };
        let resp = self.inner.clone().put_object(req).await.map_err(rpc_err)?.into_inner();
        status_ok(resp.status.as_ref())
    }

    /// Reads one object record; `None` when the key does not exist.
    pub async fn query_object(&self, vbucket: &str, object: &str) -> Result<Option<ObjectRecord>> {
        let req = proto::QueryObjectRequest {
            vbucket: vbucket.to_string(),
            object: object.to_string(),
        };
        let resp = self.inner.clone().query_object(req).await.map_err(rpc_err)?.into_inner();
        if !status_found(resp.status.as_ref())? {
            return Ok(None);
        }
        let record = resp.object.ok_or_else(|| {
            Error::metadata(format!("object {vbucket}/{object} missing from response"))
        })?;
        Ok(Some(decode_object(record)))
    }

    /// Deletes one object record.
    pub async fn delete_object(&self, vbucket: &str, object: &str) -> Result<()> {
        let req = proto::DeleteObjectRequest {
            vbucket: vbucket.to_string(),
            object: object.to_string(),
        };
        let resp = self.inner.clone().delete_object(req).await.map_err(rpc_err)?.into_inner();
        status_ok(resp.status.as_ref())
    }

    /// Scans object records by prefix.
    ///
    /// # Errors
    ///
    /// `params.limit` above 1000 is rejected before the RPC is issued.
    pub async fn list_objects(&self, params: &ListObjectsParams) -> Result<ObjectListing> {
        if params.limit > MAX_SCAN_LIMIT {
            return Err(Error::InvalidArgument(format!(
                "list limit must be at most {MAX_SCAN_LIMIT}"
            )));
        }
        let req = proto::ListObjectsRequest {
            vbucket: params.vbucket.clone(),
            prefix: params.prefix.clone(),
            marker: params.marker.clone(),
            delimiter: params.delimiter.clone(),
            limit: params.limit,
        };
        let resp = self.inner.clone().list_objects(req).await.map_err(rpc_err)?.into_inner();
        status_ok(resp.status.as_ref())?;
        Ok(ObjectListing {
            objects: resp.objects.into_iter().map(decode_object).collect(),
            common_prefixes: resp.common_prefixes,
            next_marker: resp.next_marker,
        })
    }

    /// Creates a multipart record; returns the gateway-visible upload id
    /// assigned by the shard.
    pub async fn create_multipart(&self, record: &MultipartRecord) -> Result<String> {
        let req = proto::CreateMultipartRequest { multipart: Some(encode_multipart(record)) };
        let resp = self.inner.clone().create_multipart(req).await.map_err(rpc_err)?.into_inner();
        status_ok(resp.status.as_ref())?;
        Ok(resp.upload_id)
    }

    /// Reads one multipart record; `None` when the upload does not exist.
    pub async fn query_multipart(
        &self,
        vbucket: &str,
        upload_id: &str,
    ) -> Result<Option<MultipartRecord>> {
        let req = proto::QueryMultipartRequest {
            vbucket: vbucket.to_string(),
            upload_id: upload_id.to_string(),
        };
        let resp = self.inner.clone().query_multipart(req).await.map_err(rpc_err)?.into_inner();
        if !status_found(resp.status.as_ref())? {
            return Ok(None);
        }
        let record = resp.multipart.ok_or_else(|| {
            Error::metadata(format!("multipart {upload_id:?} missing from response"))
        })?;
        Ok(Some(decode_multipart(record)))
    }

    /// Deletes one multipart record. Idempotent at the shard.
    pub async fn delete_multipart(&self, vbucket: &str, upload_id: &str) -> Result<()> {
        let req = proto::DeleteMultipartRequest {
            vbucket: vbucket.to_string(),
            upload_id: upload_id.to_string(),
        };
        let resp = self.inner.clone().delete_multipart(req).await.map_err(rpc_err)?.into_inner();
        status_ok(resp.status.as_ref())
    }

    /// Scans multipart records of one vbucket.
    ///
    /// # Errors
    ///
    /// `limit` above 1000 is rejected before the RPC is issued.
    pub async fn list_multiparts(
        &self,
        vbucket: &str,
        marker: &str,
        limit: i32,
    ) -> Result<(Vec<MultipartRecord>, String)> {
        if limit > MAX_SCAN_LIMIT {
            return Err(Error::InvalidArgument(format!(
                "multipart list limit must be at most {MAX_SCAN_LIMIT}"
            )));
        }
        let req = proto::ListMultipartsRequest {
            vbucket: vbucket.to_string(),
            prev: marker.to_string(),
            limit,
        };
        let resp = self.inner.clone().list_multiparts(req).await.map_err(rpc_err)?.into_inner();
        status_ok(resp.status.as_ref())?;
        let records = resp.multiparts.into_iter().map(decode_multipart).collect();
        Ok((records, resp.next))
    }
}
