pub mod auth;
pub mod config;
pub mod process;
pub mod templates;
