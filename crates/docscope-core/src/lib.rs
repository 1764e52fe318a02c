//! # docscope-core
//!
//! Core types, traits, and abstractions for docscope.
//!
//! This crate provides the data model shared by the pipeline crates, the
//! error type, centralized defaults, logging conventions, and the
//! collaborator traits (corpus client, entity recognizer, dictionary source).

pub mod defaults;
pub mod error;
pub mod file_safety;
pub mod logging;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use file_safety::{extension_of, has_allowed_extension, sanitize_filename};
pub use models::*;
pub use traits::*;
