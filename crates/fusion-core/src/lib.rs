//! Core types and utilities for the FusionStore gateway.
//!
//! This crate provides the building blocks shared by all gateway components:
//! - Configuration management
//! - The gateway error taxonomy with S3-compatible error codes
//! - Data-model types (pools, vbuckets, object and multipart records)
//! - Streaming request bodies and range arithmetic

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod config;
pub mod error;
pub mod stream;
pub mod types;

pub use config::GatewayConfig;
pub use error::{Error, Result, S3ErrorCode};
pub use stream::{PutStream, RangeSpec};
pub use types::physical_object_name;
