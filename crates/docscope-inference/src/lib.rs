//! # docscope-inference
//!
//! Named-entity recognition clients for docscope.
//!
//! This crate provides:
//! - GLiNER sidecar client implementing [`docscope_core::EntityRecognizer`]
//! - Deterministic gazetteer recognizer (feature `mock`)
//!
//! # Feature Flags
//!
//! - `mock`: Enable [`mock::MockRecognizer`] for tests

pub mod gliner;

// Mock recognizer for testing
#[cfg(any(test, feature = "mock"))]
pub mod mock;

pub use gliner::{GlinerBackend, NerEntity, NerResult};

#[cfg(any(test, feature = "mock"))]
pub use mock::MockRecognizer;
