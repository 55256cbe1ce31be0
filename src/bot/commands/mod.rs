//! Discord command implementations organized by category.

#![allow(clippy::too_long_first_doc_paragraph)]

/// General utility commands
pub mod general;

/// Recurring template, processing, and session commands
pub mod recurring;

// Export commands
pub use general::*;
pub use recurring::*;
