//! Kinds of output content and the backends that style them.

/// The parts of an annotation or an issue report which are styled
/// differently from each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Syntax {
    Neutral, // default
    Tag,
    Value,
    Extension,
    Placeholder,
    Reserved,
    Structure,
    Splice,
    Error,
    Warning,
    Problem,
    Gutter,
    Marker,
    Code,
}

/// A backend which styles content: plain text, or ANSI escapes for a
/// terminal.
pub trait Render {
    fn style(&self, syntax: Syntax, content: &str) -> String;
}

/// Plain text, for pipes, files, and tests.
pub struct Identity;

impl Render for Identity {
    fn style(&self, _syntax: Syntax, content: &str) -> String {
        content.to_string()
    }
}

/// Concatenate styled fragments into a single string.
pub fn render(renderer: &dyn Render, fragments: Vec<(Syntax, String)>) -> String {
    let mut output = String::new();
    for (syntax, content) in fragments {
        output.push_str(&renderer.style(syntax, &content));
    }
    output
}
