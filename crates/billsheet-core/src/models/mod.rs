//! Data models: run configuration and the normalized invoice record.

pub mod config;
pub mod record;
