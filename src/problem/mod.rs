// Issues found during validation and their presentation

mod format;
mod issue;
mod messages;

// Re-export all public symbols
pub use format::*;
pub use issue::*;
pub use messages::render_message;
