use crate::formatting::{Render, Syntax};

use super::{Issue, Level};

fn label(level: Level, renderer: &dyn Render) -> String {
    match level {
        Level::Error => renderer.style(Syntax::Error, "error"),
        Level::Warning => renderer.style(Syntax::Warning, "warning"),
    }
}

/// Where an issue came from, for the `origin:` prefix of the report.
fn location(issue: &Issue, origin: &str) -> String {
    let parameters = &issue.parameters;

    match (&parameters.sidecar_key, &parameters.tsv_line) {
        (Some(key), _) => format!("{}[{}]", origin, key),
        (None, Some(line)) => format!("{}:{}", origin, line),
        (None, None) => origin.to_string(),
    }
}

/// Format an issue with the offending annotation and a marker underneath the
/// part of it the issue refers to.
pub fn full_issue(issue: &Issue, origin: &str, renderer: &dyn Render) -> String {
    let parameters = &issue.parameters;
    let problem = issue.message();
    let gutter = renderer.style(Syntax::Gutter, "|");

    let code = match (&parameters.string, parameters.bounds) {
        (Some(string), Some([start, end]))
            if start <= end
                && end <= string.len()
                && string.is_char_boundary(start)
                && string.is_char_boundary(end) =>
        {
            let indent = string[..start]
                .chars()
                .count();
            let width = 1.max(
                string[start..end]
                    .chars()
                    .count(),
            );

            format!(
                r#"
    {} {}
    {} {:indent$}{}
                "#,
                gutter,
                renderer.style(Syntax::Code, string),
                gutter,
                "",
                renderer.style(Syntax::Marker, &"^".repeat(width)),
            )
        }
        (Some(string), _) => {
            format!(
                r#"
    {} {}
                "#,
                gutter,
                renderer.style(Syntax::Code, string)
            )
        }
        _ => String::new(),
    };

    format!(
        r#"
{}: {} {}
{}
[{}]
        "#,
        label(issue.level, renderer),
        location(issue, origin),
        renderer.style(Syntax::Problem, &problem),
        code.trim_end(),
        renderer.style(
            Syntax::Gutter,
            issue
                .kind
                .hed_code()
        ),
    )
    .trim_ascii()
    .to_string()
}

/// Format an issue as a single line.
pub fn concise_issue(issue: &Issue, origin: &str, renderer: &dyn Render) -> String {
    format!(
        "{}: {} {}",
        label(issue.level, renderer),
        location(issue, origin),
        renderer.style(Syntax::Problem, &issue.message())
    )
}
