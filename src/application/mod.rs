//! Application layer: loader machinery, freshness examiner and the service contracts they consume.

pub mod error;
pub mod examiner;
pub mod loader;
pub mod pagination;
pub mod repos;
pub mod upstream;
