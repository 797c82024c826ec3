//! drivemeta - cached metadata layer for linked OneDrive accounts
//!
//! Mediates access to a remote drive account's settings, linked accounts and
//! storage quota behind TTL caches, and gates outbound calls behind an
//! access-token freshness check. Values populate lazily on a cache miss,
//! writers invalidate, and every failure path degrades to an empty or
//! default value rather than propagating.

pub mod accounts;
pub mod auth;
pub mod cache;
pub mod quota;
pub mod remote;
pub mod service;
pub mod settings;
pub mod size;
pub mod store;

pub use accounts::{Account, AccountField, AccountRegistry};
pub use auth::{OauthApi, RefreshResponse, TokenGate};
pub use cache::TtlCache;
pub use quota::{QuotaMap, QuotaResolver};
pub use remote::{DriveApi, DriveClient, DriveConfig, DriveInfoResponse, RemoteError};
pub use service::MetaService;
pub use settings::SettingsStore;
pub use size::{BinarySize, SizeFormat};
pub use store::{AccountTable, JsonStore, MemoryStore, SettingRow, SettingsTable};
