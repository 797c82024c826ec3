//! Drive API response types
//!
//! The drive-info endpoint reports quota fields as numeric byte counts, but
//! some deployments return them as strings; the quota map keeps raw JSON
//! values so the resolver can normalize either form.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Envelope returned by the drive-info collaborator. Success iff `errno == 0`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DriveInfoResponse {
    pub errno: i64,
    #[serde(default)]
    pub data: DriveData,
}

/// Payload of a successful drive-info call.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DriveData {
    /// Quota fields keyed by name (`used`, `total`, `remaining`, `state`, …).
    #[serde(default)]
    pub quota: BTreeMap<String, Value>,
}

impl DriveInfoResponse {
    /// Success envelope carrying `quota`.
    pub fn ok(quota: BTreeMap<String, Value>) -> Self {
        Self {
            errno: 0,
            data: DriveData { quota },
        }
    }

    /// Failure envelope with no data.
    pub fn err(errno: i64) -> Self {
        Self {
            errno,
            data: DriveData::default(),
        }
    }
}

/// Raw body of the Graph `/me/drive` endpoint (only the fields we read).
#[derive(Debug, Deserialize)]
pub(crate) struct GraphDrive {
    #[serde(default)]
    pub quota: BTreeMap<String, Value>,
}
