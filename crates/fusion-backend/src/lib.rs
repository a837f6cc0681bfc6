//! Vendor backend adapters for the FusionStore gateway.
//!
//! This crate provides:
//! - the uniform [`Backend`] object/multipart contract
//! - [`S3Backend`] for S3-shaped vendors (AWS S3, Ceph RGW)
//! - [`BosBackend`] for Baidu Object Storage, speaking the native BCE REST
//!   protocol
//!
//! Adapters carry request bodies in a single pass and never buffer them in
//! the gateway.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod backend;
pub mod bos;
pub mod s3;
mod sign;

pub use backend::{probe_bucket_name, trim_etag, Backend};
pub use bos::BosBackend;
pub use s3::{shared_http_client, S3Backend};
