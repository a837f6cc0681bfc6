// Copyright 2026 The FusionStore Authors
// SPDX-License-Identifier: Apache-2.0

//! Data-model types shared across the gateway.
//!
//! The authoritative copies of these records live in the management service
//! (pools, physical buckets, MDS shards, vbuckets) and in the metadata
//! service (object and multipart records). The gateway holds no mutable
//! copy; everything here is a point-in-time decode of a wire message.

use std::collections::HashMap;

use chrono::{DateTime, Utc};

use crate::error::{Error, Result};

/// Builds the key used at the vendor backend for a gateway object.
///
/// Multiple vbuckets may share one physical bucket; prefixing every key with
/// the vbucket name keeps them isolated.
#[must_use]
pub fn physical_object_name(vbucket: &str, object: &str) -> String {
    format!("{vbucket}/{object}")
}

/// Backend vendor kind.
///
/// AWS S3 and Ceph RGW speak the same dialect and share one adapter, so the
/// wire strings `"s3"` and `"rgw"` both decode to [`Vendor::S3`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Vendor {
    /// S3-shaped vendors: AWS S3 and Ceph RGW.
    S3,
    /// Baidu Object Storage.
    Bos,
}

impl Vendor {
    /// Decodes a wire vendor tag. Unknown tags are a construction-time error
    /// for the caller; no pool with an unrecognized vendor may participate.
    pub fn from_wire(tag: &str) -> Result<Self> {
        match tag {
            "s3" | "rgw" => Ok(Self::S3),
            "bos" => Ok(Self::Bos),
            other => Err(Error::metadata(format!("unknown vendor type {other:?}"))),
        }
    }

    /// The canonical wire tag for this vendor.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::S3 => "s3",
            Self::Bos => "bos",
        }
    }
}

/// Lifecycle status of a pool, physical bucket or MDS shard.
///
/// Only `Active` entities participate in placement or are dialed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Status {
    /// Eligible for placement / dialing.
    Active,
    /// Known but not taking new placements.
    Standby,
    /// Anything the wire reported that we do not recognize.
    #[default]
    Unknown,
}

impl Status {
    /// Decodes a wire status string.
    #[must_use]
    pub fn from_wire(tag: &str) -> Self {
        match tag {
            "active" => Self::Active,
            "standby" => Self::Standby,
            _ => Self::Unknown,
        }
    }

    /// Whether this entity may take part in placement.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self, Self::Active)
    }
}

/// Static credentials for a vendor account.
#[derive(Clone, Default)]
pub struct Credentials {
    /// Access key id.
    pub access_key: String,
    /// Secret key.
    pub secret_key: String,
}

// Never log secrets.
impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

/// A physical bucket that actually exists at a vendor account.
#[derive(Debug, Clone)]
pub struct PhysicalBucket {
    /// Registry id.
    pub id: String,
    /// Bucket name at the vendor.
    pub name: String,
    /// Owning pool id.
    pub pool_id: String,
    /// Lifecycle status; only active buckets take new placements.
    pub status: Status,
}

/// A backend account: endpoint, credentials and its physical buckets.
///
/// Loaded once from MGS at startup and treated as immutable until restart.
#[derive(Debug, Clone)]
pub struct Pool {
    /// Registry id.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Vendor kind, decoded from the wire tag.
    pub vendor: Vendor,
    /// Endpoint URL of the vendor account.
    pub endpoint: String,
    /// Lifecycle status; only active pools participate in placement.
    pub status: Status,
    /// Account credentials, fetched from MGS.
    pub creds: Credentials,
    /// Active physical buckets, in registry order.
    pub buckets: Vec<PhysicalBucket>,
}

/// A metadata-service shard known to MGS.
#[derive(Debug, Clone)]
pub struct MdsInfo {
    /// Registry id; vbuckets reference shards by this id.
    pub id: String,
    /// Human-readable name.
    pub name: String,
    /// Lifecycle status; only active shards are dialed.
    pub status: Status,
    /// Deployment region.
    pub region: String,
    /// Dialable service addresses; the first one is used.
    pub addrs: Vec<String>,
}

/// The user-visible bucket.
///
/// Created and deleted out-of-band by the administrator through the MGS CLI;
/// the gateway only reads these records. `pool` and `mds` are fixed for the
/// lifetime of the vbucket.
#[derive(Debug, Clone)]
pub struct VBucket {
    /// Registry id.
    pub id: String,
    /// Unique user-visible name.
    pub name: String,
    /// Lifecycle status string as reported by MGS.
    pub status: String,
    /// Owner tag.
    pub owner: String,
    /// Owning pool id.
    pub pool: String,
    /// Owning MDS shard id.
    pub mds: String,
    /// Creation location.
    pub location: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last update time.
    pub updated_at: DateTime<Utc>,
}

/// The object record kept at the MDS, keyed by `(vbucket, name)`.
///
/// For any live key, `pool` + `bucket` identify exactly the location of the
/// backend blob whose key is [`physical_object_name`]`(vbucket, name)`.
#[derive(Debug, Clone, Default)]
pub struct ObjectRecord {
    /// Object key within the vbucket.
    pub name: String,
    /// Owning vbucket.
    pub vbucket: String,
    /// Placement: pool id.
    pub pool: String,
    /// Placement: physical bucket name.
    pub bucket: String,
    /// ETag as reported by the backend.
    pub etag: String,
    /// Inner ETag (pre-encryption), when the frontend computes one.
    pub inner_etag: String,
    /// Version id; versioning is not supported, carried for the record.
    pub version_id: String,
    /// Content-Type.
    pub content_type: String,
    /// Content-Encoding.
    pub content_encoding: String,
    /// Storage class at the backend.
    pub storage_class: String,
    /// Encoded user tags.
    pub user_tags: String,
    /// Object size in bytes.
    pub size: i64,
    /// Whether the key denotes a directory placeholder.
    pub is_dir: bool,
    /// Whether this is the latest version.
    pub is_latest: bool,
    /// Whether this record is a delete marker.
    pub delete_marker: bool,
    /// Whether a restore is in flight.
    pub restore_ongoing: bool,
    /// Last modification time.
    pub mod_time: DateTime<Utc>,
    /// Last access time.
    pub acc_time: DateTime<Utc>,
    /// Expiry time.
    pub expires: DateTime<Utc>,
    /// Restore expiry time.
    pub restore_expires: DateTime<Utc>,
}

impl ObjectRecord {
    /// The gateway-visible view of this record, with placement stripped.
    #[must_use]
    pub fn to_object_info(&self) -> ObjectInfo {
        ObjectInfo {
            bucket: self.vbucket.clone(),
            name: self.name.clone(),
            etag: self.etag.clone(),
            inner_etag: self.inner_etag.clone(),
            version_id: self.version_id.clone(),
            content_type: self.content_type.clone(),
            content_encoding: self.content_encoding.clone(),
            storage_class: self.storage_class.clone(),
            user_tags: self.user_tags.clone(),
            size: self.size,
            is_dir: self.is_dir,
            is_latest: self.is_latest,
            delete_marker: self.delete_marker,
            restore_ongoing: self.restore_ongoing,
            mod_time: self.mod_time,
            acc_time: self.acc_time,
            expires: self.expires,
            restore_expires: self.restore_expires,
        }
    }
}

/// The multipart record kept at the MDS, keyed by `(vbucket, upload_id)`.
///
/// `upload_id` is assigned by the MDS on create and is the only identifier
/// S3 clients ever see; `physical_upload_id` is the vendor-assigned one.
#[derive(Debug, Clone, Default)]
pub struct MultipartRecord {
    /// Gateway-visible upload id.
    pub upload_id: String,
    /// Vendor-assigned upload id.
    pub physical_upload_id: String,
    /// Owning vbucket.
    pub vbucket: String,
    /// Physical bucket chosen at initiation.
    pub physical_bucket: String,
    /// Object key within the vbucket.
    pub object: String,
    /// Initiation time.
    pub created_at: DateTime<Utc>,
}

/// Gateway-visible object metadata, as the frontend consumes it.
#[derive(Debug, Clone, Default)]
pub struct ObjectInfo {
    /// The vbucket name.
    pub bucket: String,
    /// The object key.
    pub name: String,
    /// ETag.
    pub etag: String,
    /// Inner ETag.
    pub inner_etag: String,
    /// Version id.
    pub version_id: String,
    /// Content-Type.
    pub content_type: String,
    /// Content-Encoding.
    pub content_encoding: String,
    /// Storage class.
    pub storage_class: String,
    /// Encoded user tags.
    pub user_tags: String,
    /// Size in bytes.
    pub size: i64,
    /// Directory placeholder flag.
    pub is_dir: bool,
    /// Latest-version flag.
    pub is_latest: bool,
    /// Delete-marker flag.
    pub delete_marker: bool,
    /// Restore-in-flight flag.
    pub restore_ongoing: bool,
    /// Last modification time.
    pub mod_time: DateTime<Utc>,
    /// Last access time.
    pub acc_time: DateTime<Utc>,
    /// Expiry time.
    pub expires: DateTime<Utc>,
    /// Restore expiry time.
    pub restore_expires: DateTime<Utc>,
}

impl ObjectInfo {
    /// Builds the MDS record for this object at the given placement.
    #[must_use]
    pub fn to_record(&self, pool: &str, physical_bucket: &str) -> ObjectRecord {
        let now = Utc::now();
        ObjectRecord {
            name: self.name.clone(),
            vbucket: self.bucket.clone(),
            pool: pool.to_string(),
            bucket: physical_bucket.to_string(),
            etag: self.etag.clone(),
            inner_etag: self.inner_etag.clone(),
            version_id: self.version_id.clone(),
            content_type: self.content_type.clone(),
            content_encoding: self.content_encoding.clone(),
            storage_class: self.storage_class.clone(),
            user_tags: self.user_tags.clone(),
            size: self.size,
            is_dir: self.is_dir,
            is_latest: self.is_latest,
            delete_marker: self.delete_marker,
            restore_ongoing: self.restore_ongoing,
            mod_time: now,
            acc_time: now,
            expires: self.expires,
            restore_expires: self.restore_expires,
        }
    }
}

/// Bucket metadata surfaced by `GetBucketInfo`/`ListBuckets`.
#[derive(Debug, Clone)]
pub struct BucketInfo {
    /// The vbucket name.
    pub name: String,
    /// Creation time.
    pub created_at: DateTime<Utc>,
}

/// One part of a multipart upload, as reported by the backend.
#[derive(Debug, Clone)]
pub struct PartInfo {
    /// Part number (1-10000).
    pub part_number: i32,
    /// Part ETag.
    pub etag: String,
    /// Part size in bytes.
    pub size: i64,
    /// Upload time of the part.
    pub last_modified: DateTime<Utc>,
}

/// Result of listing the parts of one multipart upload.
#[derive(Debug, Clone, Default)]
pub struct ListPartsInfo {
    /// Bucket the listing refers to.
    pub bucket: String,
    /// Object key the listing refers to.
    pub object: String,
    /// Upload id the listing refers to.
    pub upload_id: String,
    /// Storage class reported by the backend.
    pub storage_class: String,
    /// Marker this page started at.
    pub part_number_marker: i32,
    /// Marker for the next page, when truncated.
    pub next_part_number_marker: i32,
    /// Page size requested.
    pub max_parts: i32,
    /// Whether more parts remain.
    pub is_truncated: bool,
    /// The parts, ascending by part number.
    pub parts: Vec<PartInfo>,
}

/// One part reference in a complete-multipart request.
#[derive(Debug, Clone)]
pub struct CompletePart {
    /// Part number.
    pub part_number: i32,
    /// ETag the client observed for the part.
    pub etag: String,
}

/// Identity of a multipart upload, echoed by `GetMultipartInfo`.
#[derive(Debug, Clone, Default)]
pub struct MultipartInfo {
    /// The vbucket name.
    pub bucket: String,
    /// The object key.
    pub object: String,
    /// The gateway-visible upload id.
    pub upload_id: String,
}

/// Parameters for a prefix listing at the MDS.
#[derive(Debug, Clone, Default)]
pub struct ListObjectsParams {
    /// The vbucket to list.
    pub vbucket: String,
    /// Key prefix filter.
    pub prefix: String,
    /// Resume marker from a previous page.
    pub marker: String,
    /// Grouping delimiter.
    pub delimiter: String,
    /// Page size; the MDS caps this at 1000.
    pub limit: i32,
}

/// Result of a prefix listing.
#[derive(Debug, Clone, Default)]
pub struct ListObjectsInfo {
    /// Whether more results remain after this page.
    pub is_truncated: bool,
    /// Marker to resume from; empty when not truncated.
    pub next_marker: String,
    /// The objects on this page.
    pub objects: Vec<ObjectInfo>,
    /// Common prefixes grouped by the delimiter.
    pub prefixes: Vec<String>,
}

/// Outcome entry of a bulk delete.
#[derive(Debug, Clone, Default)]
pub struct DeletedObject {
    /// The key that was deleted.
    pub object_name: String,
}

/// Per-request options threaded from the frontend.
#[derive(Debug, Clone, Default)]
pub struct ObjectOptions {
    /// User-defined metadata headers.
    pub user_defined: HashMap<String, String>,
    /// Encoded object tags, when the request carried `x-amz-tagging`.
    pub tags: Option<String>,
    /// Content-Type of the body.
    pub content_type: Option<String>,
}

/// Maximum page size the MDS accepts for scans.
pub const MAX_SCAN_LIMIT: i32 = 1000;

/// Validates a bucket name against the S3 naming rules the gateway enforces.
#[must_use]
pub fn is_valid_bucket_name(name: &str) -> bool {
    if name.len() < 3 || name.len() > 63 {
        return false;
    }
    if name.starts_with('.') || name.ends_with('.') || name.contains("..") {
        return false;
    }
    let bytes = name.as_bytes();
    if !bytes[0].is_ascii_lowercase() && !bytes[0].is_ascii_digit() {
        return false;
    }
    if !bytes[name.len() - 1].is_ascii_lowercase() && !bytes[name.len() - 1].is_ascii_digit() {
        return false;
    }
    name.chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-' || c == '.')
}

/// Validates an object name or prefix: UTF-8, no NUL, within the S3 length
/// cap, and not starting with a slash.
#[must_use]
pub fn is_valid_object_prefix(prefix: &str) -> bool {
    if prefix.len() > 1024 {
        return false;
    }
    if prefix.starts_with('/') {
        return false;
    }
    !prefix.contains('\0')
}
