//! # djcrate Common Library
//!
//! Shared code for the djcrate tools including:
//! - Music collection JSON model and store accessor
//! - Tag taxonomy parsing and validation
//! - Configuration loading
//! - Common error types

pub mod config;
pub mod error;
pub mod store;
pub mod taxonomy;

pub use error::{Error, Result};
pub use store::{write_atomic, Collection, CollectionInfo, Track, TrackStore};
pub use taxonomy::{TagValidation, Taxonomy};
