//! Cache module for memoizing API responses
//!
//! This module provides a two-tier response cache: an in-memory map in front of
//! one JSON file per key on disk. Entries expire after a fixed TTL and are never
//! returned once stale. Disk faults are logged and treated as misses, since the
//! cache only saves work and is never required for correctness.

mod key;
mod manager;

pub use manager::{CacheRecord, ResponseCache, DEFAULT_TTL};
