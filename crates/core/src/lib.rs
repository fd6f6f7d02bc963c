//! Core types for txharness
//!
//! This crate defines the vocabulary shared by every layer of the harness:
//! - Error taxonomy (directory, coordinator and participant failures)
//! - Transaction [`Status`] with its conventional integer codes
//! - [`Xid`]: opaque transaction token backed by a monotonic counter
//! - Participant capabilities: [`Resource`] and [`Synchronization`]

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod status;
pub mod traits;
pub mod xid;

pub use error::{Error, ResourceError, ResourceOperation, Result};
pub use status::Status;
pub use traits::{Resource, ResourceResult, Synchronization};
pub use xid::{Xid, XidGenerator};
