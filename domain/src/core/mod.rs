//! Core domain concepts shared across all subdomains.
//!
//! - [`error::HiveError`] — the error taxonomy every public surface maps into

pub mod error;
