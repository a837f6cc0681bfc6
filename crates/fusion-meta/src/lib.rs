//! RPC clients for the FusionStore metadata cluster.
//!
//! This crate provides:
//! - the protobuf wire schema shared with MGS and MDS
//! - [`MgsClient`]: the central management-service client (pools, physical
//!   buckets, MDS registry, vbucket records)
//! - [`MdsClient`]: a per-shard metadata-service client (object and
//!   multipart records)
//!
//! Both clients are dialed once at startup with connect-blocking semantics
//! and enforce a fixed per-call deadline. They are cheap to clone and safe
//! for concurrent use.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

/// Generated gRPC client and server code.
///
/// The server side is generated too so test suites can stand up in-process
/// MGS/MDS instances.
#[allow(missing_docs)]
pub mod proto {
    tonic::include_proto!("fusion.meta.v1");
}

pub mod convert;
pub mod mds;
pub mod mgs;

pub use mds::{MdsClient, ObjectListing};
pub use mgs::MgsClient;

/// Per-call deadline applied to every MGS and MDS RPC.
pub const RPC_TIMEOUT_SECS: u64 = 10;
