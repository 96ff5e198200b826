//! lumen-study library interface
//!
//! The study-side core of Lumen:
//! - [`srs`]: spaced-repetition scheduling for flashcards
//! - [`cache`]: TTL cache for artifacts derived from a set of documents
//! - [`embedding`]: progress tracking for server-side document embedding

pub mod cache;
pub mod embedding;
pub mod error;
pub mod srs;

pub use crate::error::{Error, Result};
