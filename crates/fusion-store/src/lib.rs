//! The S3 object layer of the FusionStore gateway.
//!
//! This crate provides:
//! - the [`ObjectLayer`] contract the S3 frontend consumes
//! - [`FusionStore`], which sequences metadata and data operations across
//!   the cluster
//! - the bounded byte [`pipe`](pipe::pipe) that streams GET responses

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod layer;
pub mod pipe;
pub mod store;

pub use layer::ObjectLayer;
pub use pipe::GetObjectReader;
pub use store::FusionStore;
