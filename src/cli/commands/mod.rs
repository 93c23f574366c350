//! CLI command implementations

pub mod utils;

pub mod cache;
pub mod completions;
pub mod config;
pub mod crop;
pub mod field;
pub mod work;
