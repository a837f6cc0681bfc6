//! Conversions between wire messages and domain types.

use chrono::{DateTime, Utc};
use fusion_core::error::{Error, Result};
use fusion_core::types::{MdsInfo, MultipartRecord, ObjectRecord, Status, VBucket, Vendor};

use crate::proto;

/// Checks the `Status` carried by a response; any non-OK code is an error.
pub fn status_ok(status: Option<&proto::Status>) -> Result<()> {
    let status = status.ok_or_else(|| Error::metadata("response missing status"))?;
    if status.code == proto::Code::Ok as i32 {
        return Ok(());
    }
    Err(Error::metadata(status.msg.clone()))
}

/// Checks the `Status` of a query response. `NOT_FOUND` is a null result,
/// not an error.
pub fn status_found(status: Option<&proto::Status>) -> Result<bool> {
    let status = status.ok_or_else(|| Error::metadata("response missing status"))?;
    if status.code == proto::Code::Ok as i32 {
        return Ok(true);
    }
    if status.code == proto::Code::NotFound as i32 {
        return Ok(false);
    }
    Err(Error::metadata(status.msg.clone()))
}

pub(crate) fn to_timestamp(dt: DateTime<Utc>) -> prost_types::Timestamp {
    prost_types::Timestamp {
        seconds: dt.timestamp(),
        nanos: dt.timestamp_subsec_nanos() as i32,
    }
}

pub(crate) fn from_timestamp(ts: Option<prost_types::Timestamp>) -> DateTime<Utc> {
    ts.and_then(|t| DateTime::from_timestamp(t.seconds, t.nanos.max(0) as u32))
        .unwrap_or(DateTime::<Utc>::UNIX_EPOCH)
}

/// Decodes an MDS shard registration.
#[must_use]
pub fn decode_mds(m: proto::Mds) -> MdsInfo {
    MdsInfo {
        id: m.id,
        name: m.name,
        status: Status::from_wire(&m.status),
        region: m.region,
        addrs: m.addrs,
    }
}

/// Decodes a vbucket record.
#[must_use]
pub fn decode_vbucket(v: proto::VBucket) -> VBucket {
    VBucket {
        id: v.id,
        name: v.name,
        status: v.status,
        owner: v.owner,
        pool: v.pool,
        mds: v.mds,
        location: v.location,
        created_at: from_timestamp(v.created_time),
        updated_at: from_timestamp(v.updated_time),
    }
}

/// Decodes the vendor tag of a pool; unknown tags are fatal for the caller.
pub fn decode_vendor(p: &proto::Pool) -> Result<Vendor> {
    Vendor::from_wire(&p.vendor)
        .map_err(|_| Error::metadata(format!("pool {:?} has unknown vendor type {:?}", p.id, p.vendor)))
}

/// Decodes an object record.
#[must_use]
pub fn decode_object(o: proto::Object) -> ObjectRecord {
    ObjectRecord {
        name: o.name,
        vbucket: o.vbucket,
        pool: o.pool,
        bucket: o.bucket,
        etag: o.etag,
        inner_etag: o.inner_etag,
        version_id: o.version_id,
        content_type: o.content_type,
        content_encoding: o.content_encoding,
        storage_class: o.storage_class,
        user_tags: o.user_tags,
        size: o.size,
        is_dir: o.is_dir,
        is_latest: o.is_latest,
        delete_marker: o.delete_marker,
        restore_ongoing: o.restore_ongoing,
        mod_time: from_timestamp(o.mod_time),
        acc_time: from_timestamp(o.acc_time),
        expires: from_timestamp(o.expires),
        restore_expires: from_timestamp(o.restore_expires),
    }
}

/// Encodes an object record for `PutObject`.
#[must_use]
pub fn encode_object(o: &ObjectRecord) -> proto::Object {
    proto::Object {
        id: String::new(),
        name: o.name.clone(),
        vbucket: o.vbucket.clone(),
        pool: o.pool.clone(),
        bucket: o.bucket.clone(),
        etag: o.etag.clone(),
        inner_etag: o.inner_etag.clone(),
        version_id: o.version_id.clone(),
        content_type: o.content_type.clone(),
        content_encoding: o.content_encoding.clone(),
        storage_class: o.storage_class.clone(),
        user_tags: o.user_tags.clone(),
        size: o.size,
        is_dir: o.is_dir,
        is_latest: o.is_latest,
        delete_marker: o.delete_marker,
        restore_ongoing: o.restore_ongoing,
        mod_time: Some(to_timestamp(o.mod_time)),
        acc_time: Some(to_timestamp(o.acc_time)),
        expires: Some(to_timestamp(o.expires)),
        restore_expires: Some(to_timestamp(o.restore_expires)),
    }
}

/// Decodes a multipart record.
#[must_use]
pub fn decode_multipart(m: proto::Multipart) -> MultipartRecord {
    MultipartRecord {
        upload_id: m.upload_id,
        physical_upload_id: m.physical_upload_id,
        vbucket: m.vbucket,
        physical_bucket: m.physical_bucket,
        object: m.object,
        created_at: from_timestamp(m.created_time),
    }
}

/// Encodes a multipart record for `CreateMultipart`.
#[must_use]
pub fn encode_multipart(m: &MultipartRecord) -> proto::Multipart {
    proto::Multipart {
        upload_id: m.upload_id.clone(),
        physical_upload_id: m.physical_upload_id.clone(),
        vbucket: m.vbucket.clone(),
        physical_bucket: m.physical_bucket.clone(),
        object: m.object.clone(),
        created_time: Some(to_timestamp(m.created_at)),
    }
}
