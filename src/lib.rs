//! Help-center gateway: per-request batched loaders over a write-through value cache.

pub mod application;
pub mod cache;
pub mod config;
pub mod domain;
pub mod infra;
pub mod util;
