//! Detection, scoring, caching, and batch scheduling.
//!
//! The pipeline runs in stages: [`fingerprint`] derives a stable cache
//! key from fragment text, [`detector`] decides which manipulation
//! techniques are present, [`scorer`] turns matches into a severity
//! score, [`neutralizer`] obtains (or locally produces) a rewritten
//! rendering, and [`engine`] batches it all behind an async submission
//! surface with per-fragment result delivery.

pub mod cache;
pub mod detector;
pub mod engine;
pub mod fingerprint;
pub mod neutralizer;
pub mod scorer;

pub use cache::ResultCache;
pub use detector::detect;
pub use engine::Engine;
pub use fingerprint::{Fingerprint, fingerprint};
pub use neutralizer::{Neutralization, Neutralizer};
pub use scorer::score;
