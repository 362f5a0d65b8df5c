//! Checks over a single resolved string which need nothing beyond the string
//! itself: repeated content and the placement of reserved tags.

pub mod duplicates;
mod reserved;

pub use reserved::{is_reserved, ReservedChecker};
