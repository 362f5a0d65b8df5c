use owo_colors::OwoColorize;

use super::{Render, Syntax};

/// Embellish fragments with ANSI escapes to create syntax highlighting in
/// terminal output.
pub struct Terminal;

impl Render for Terminal {
    fn style(&self, syntax: Syntax, content: &str) -> String {
        match syntax {
            Syntax::Neutral => content.to_string(),
            Syntax::Tag => content // entity.name.tag - #3465a4 (blue)
                .color(owo_colors::Rgb(0x34, 0x65, 0xa4))
                .to_string(),
            Syntax::Value => content // string - #4e9a06 (green) bold
                .color(owo_colors::Rgb(0x4e, 0x9a, 0x06))
                .bold()
                .to_string(),
            Syntax::Extension => content // #8f5902 (brown)
                .color(owo_colors::Rgb(0x8f, 0x59, 0x02))
                .to_string(),
            Syntax::Placeholder => content // variable.parameter - #729fcf (light blue) bold
                .color(owo_colors::Rgb(0x72, 0x9f, 0xcf))
                .bold()
                .to_string(),
            Syntax::Reserved => content // keyword.control - #75507b (purple) bold
                .color(owo_colors::Rgb(0x75, 0x50, 0x7b))
                .bold()
                .to_string(),
            Syntax::Structure => content // punctuation - #999999 bold
                .color(owo_colors::Rgb(153, 153, 153))
                .bold()
                .to_string(),
            Syntax::Splice => content // #f57900 (orange) bold
                .color(owo_colors::Rgb(0xf5, 0x79, 0x00))
                .bold()
                .to_string(),
            Syntax::Error => content
                .bright_red()
                .bold()
                .to_string(),
            Syntax::Warning => content
                .bright_yellow()
                .bold()
                .to_string(),
            Syntax::Problem => content
                .bold()
                .to_string(),
            Syntax::Gutter => content
                .bright_blue()
                .to_string(),
            Syntax::Marker => content
                .bright_red()
                .to_string(),
            Syntax::Code => content.to_string(),
        }
    }
}
