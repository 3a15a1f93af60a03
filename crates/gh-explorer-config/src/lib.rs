//! Configuration and file management for gh-explorer
//!
//! This crate provides:
//! - Configuration file loading (TOML)
//! - Application configuration (AppConfig)
//! - File path utilities for config, token store and log files

pub mod app_config;
pub mod config_file;
pub mod paths;

pub use app_config::{AppConfig, API_BASE_URL_ENV};
pub use config_file::load_config_file;
pub use paths::{cache_dir, config_dir, log_dir, session_store_path, token_store_path};
