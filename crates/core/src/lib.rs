//! Bookrag Core Library
//!
//! This crate provides the foundational utilities shared by every bookrag crate:
//! - Error handling (`AppError`, `AppResult`)
//! - Logging infrastructure
//! - Configuration management, including the immutable `RagConfig`
//!   injected into the answering pipeline

pub mod config;
pub mod error;
pub mod logging;

// Re-export commonly used types
pub use config::{AppConfig, RagConfig, RetrySettings};
pub use error::{AppError, AppResult};
