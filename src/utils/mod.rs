//! Utilities for Domfuzz.
//!
//! This module aggregates utility helpers used across the crate.
//!
//! Submodules:
//! - `templates`: Single-brace token scanning for `{wordlist}` placeholders
//!   and `{N}` index markers.

pub mod templates;
