//! Core data structures for the plant record store.
//!
//! This crate defines the record types, identifier constants, error taxonomy
//! and wire result codes shared by the codec, storage and protocol crates.

pub mod error;
pub mod result;
pub mod types;

pub use error::{Error, FormatError, ValidationError};
pub use result::{InstallOutcome, ResultCode};
