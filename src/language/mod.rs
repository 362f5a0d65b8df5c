// Types representing parsed HED annotations

mod error;
mod types;

// Re-export all public symbols
pub use error::*;
pub use types::*;
