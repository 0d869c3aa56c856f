//! Channel layer for prompt-driven reads.
//!
//! This module handles the interactive session plumbing, including
//! tail-only prompt detection and ANSI stripping.

mod buffer;
mod patterns;
mod pty;

pub use buffer::{DEFAULT_SEARCH_DEPTH, PatternBuffer};
pub use patterns::{compile_prompt_pattern, extract_prompt};
pub use pty::{PtyChannel, PtyConfig};
