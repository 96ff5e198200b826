//! # Lumen Common Library
//!
//! Shared code for the Lumen study services including:
//! - Error and result types
//! - Configuration loading and config file resolution
//! - Clock abstraction (wall clock and a manually driven test clock)
//! - Event types (LumenEvent enum) and the broadcast EventBus

pub mod config;
pub mod error;
pub mod events;
pub mod time;

pub use error::{Error, Result};
pub use time::{Clock, ManualClock, SystemClock};
