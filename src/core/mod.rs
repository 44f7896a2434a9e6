//! Core processing building blocks: contain-fit resize, canvas padding and
//! compositing, the normalizer itself, and the bounded batch pool. These are
//! the primitives consumed by the high-level `api` module.
pub mod params;
pub mod processing;
