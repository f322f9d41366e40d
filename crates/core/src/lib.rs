//! Core library for roster imports
//!
//! This crate contains the network-free half of the import workflow:
//! - Row extraction from uploaded CSV/XLSX files
//! - Validation and normalization into membership requests
//! - Import outcomes and their user-facing summaries
//! - The client-side roster state

pub mod error;
pub mod import;
pub mod member;
pub mod roster;
pub mod validate;

pub use error::Error;
pub type Result<T> = std::result::Result<T, Error>;
