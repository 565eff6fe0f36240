//! Core wire types for docwire.
//!
//! This crate provides the pieces shared by every connection kind in
//! `docwire-client`:
//!
//! - [`WireFormat`]: The JSON and MessagePack wire formats
//! - [`BodyBuilder`]: The request body encoder and its three variants
//! - [`merge_patch`]: Shallow merge-patch of a record with a map of overrides
//! - [`BodyError`] and [`ServerError`]: Body encoding errors and the server
//!   error envelope

mod body;
mod error;
mod format;
mod merge;
mod raw;

pub use body::*;
pub use error::*;
pub use format::*;
pub use merge::*;
