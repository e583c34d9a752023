//! Adega Common - Shared types and utilities
//!
//! This crate provides the foundational pieces used across all Adega
//! components:
//! - Error types and error codes
//! - Canonical client-code and lookup-token helpers
//! - Tolerant numeric/text normalization for spreadsheet exports

pub mod error;
pub mod utils;

// Re-exports for convenience
pub use error::{AdegaError, AppError, ErrorCode};
pub use utils::{
    canonical_code, code_lookup_tokens, digits_only, normalize_document, normalize_lookup_text,
    normalize_setor, normalize_spaces, parse_integer,
};
