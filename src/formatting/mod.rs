//! Rendering parsed annotations and issues as text.

mod formatter;
mod syntax;
mod terminal;

pub use formatter::*;
pub use syntax::*;
pub use terminal::Terminal;
