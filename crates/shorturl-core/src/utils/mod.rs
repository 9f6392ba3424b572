//! Utility functions for input validation and display formatting.

pub mod format;
pub mod validate;

pub use format::{format_date, redirect_target, short_link, truncate_string};
pub use validate::{validate_url, ValidationError};
