//! Formatting helpers shared by front-ends.

pub mod format;

pub use format::{format_currency, format_optional, format_phone, truncate_string};
