//! djcrate-tagger library interface
//!
//! AI-assisted tag assignment for a scanned music collection: analysis
//! backends, the tolerant response parser, taxonomy enforcement, and the
//! merge/persist pipeline, plus the playlist export and store maintenance
//! commands built on the same collection model.

pub mod backends;
pub mod error;
pub mod models;
pub mod services;

pub use crate::error::{TaggerError, TaggerResult};
