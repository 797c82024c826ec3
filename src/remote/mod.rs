//! Remote drive service client
//!
//! Reqwest-based access to the OAuth token endpoint and the drive-info
//! endpoint. Calls are single-attempt with an explicit timeout; callers
//! degrade to empty results rather than retrying.

pub mod client;
pub mod errors;
pub mod types;

pub use client::{DriveApi, DriveClient, DriveConfig};
pub use errors::RemoteError;
pub use types::{DriveData, DriveInfoResponse};
