//! TTL caching layer
//!
//! Generic get-or-compute caching with per-entry TTL, explicit invalidation
//! and eager overwrite. Backed by Moka.

pub mod ttl;

pub use ttl::TtlCache;
