//! Parsing and semantic validation of HED event annotations.

pub mod checking;
pub mod definitions;
pub mod formatting;
pub mod language;
pub mod parsing;
pub mod problem;
mod regex;
pub mod schema;
pub mod tabular;
pub mod temporal;
pub mod validator;
