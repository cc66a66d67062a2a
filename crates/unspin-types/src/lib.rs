//! Shared types for the unspin manipulation-scoring engine.
//!
//! This crate holds the data model used across the workspace: the fixed
//! [`Technique`] enumeration, fragment and result types, cache records,
//! engine configuration, and the top-level error taxonomy. It has no
//! async or networking dependencies so every other crate can depend on it.

pub mod config;
pub mod error;
pub mod fragment;
pub mod technique;

pub use config::EngineConfig;
pub use error::{EngineError, Result};
pub use fragment::{
    CacheRecord, CacheStats, Fragment, FragmentHandle, FragmentOutcome, NeutralizedFragment,
    ProcessingState, ScoreResult,
};
pub use technique::{Technique, TechniqueMatch};
