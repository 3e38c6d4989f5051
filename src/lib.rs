//! riftload library
//!
//! Collects League of Legends match data from the Riot Games API under a
//! shared request budget, caches responses, and loads transformed matches
//! into a warehouse. The modules are exposed for the binary and for
//! integration tests.

pub mod cache;
pub mod cli;
pub mod config;
pub mod data;
pub mod pipeline;
pub mod query;
pub mod request;
pub mod warehouse;
pub mod webhook;
