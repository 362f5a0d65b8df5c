//! parser for HED annotation strings

use std::path::Path;
use tracing::debug;

use crate::checking::{duplicates, ReservedChecker};
use crate::language::{ColumnSplice, Group, LoadingError, Node, ParsedString};
use crate::problem::{has_errors, partition, Issue, IssueKind};
use crate::schema::{resolve, Schema};

pub mod tokenizer;

use tokenizer::{tokenize, Fragment};

/// Read a schema, sidecar, or events file into an owned String, which the
/// caller keeps alive for as long as anything parsed from it.
pub fn load(filename: &Path) -> Result<String, LoadingError<'_>> {
    std::fs::read_to_string(filename).map_err(|error| {
        debug!(?error);
        LoadingError::from_io(filename, &error)
    })
}

/// What a string is allowed to contain, and which checks to run over it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseOptions {
    /// `(Definition/Name, (...))` groups may appear (sidecars, definition
    /// files).
    pub allow_definitions: bool,
    /// `#` may appear (sidecar value columns, definition content).
    pub allow_placeholders: bool,
    /// `{column}` references may appear (sidecars).
    pub allow_splices: bool,
    /// The string comes from a file with onsets, so temporal tags are legal.
    pub temporal_context: bool,
    /// Report repeated tags and groups. Turned off for strings which will be
    /// checked again after being assembled with others.
    pub check_duplicates: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            allow_definitions: false,
            allow_placeholders: false,
            allow_splices: false,
            temporal_context: true,
            check_duplicates: true,
        }
    }
}

impl ParseOptions {
    /// Everything a sidecar may contain.
    pub fn permissive() -> Self {
        ParseOptions {
            allow_definitions: true,
            allow_placeholders: true,
            allow_splices: true,
            ..ParseOptions::default()
        }
    }
}

/// Outcome of parsing one string. The tree is present whenever the string was
/// syntactically valid and every tag resolved, even if later checks found
/// errors in it.
#[derive(Debug)]
pub struct ParseResult<'s> {
    pub parsed: Option<ParsedString<'s>>,
    pub errors: Vec<Issue>,
    pub warnings: Vec<Issue>,
}

impl<'s> ParseResult<'s> {
    fn from_issues(parsed: Option<ParsedString<'s>>, issues: Vec<Issue>) -> ParseResult<'s> {
        let (errors, warnings) = partition(issues);
        ParseResult {
            parsed,
            errors,
            warnings,
        }
    }

    /// Add the issues found by a later stage.
    pub fn extend(&mut self, issues: Vec<Issue>) {
        let (errors, warnings) = partition(issues);
        self.errors
            .extend(errors);
        self.warnings
            .extend(warnings);
    }

    pub fn is_valid(&self) -> bool {
        self.errors
            .is_empty()
    }

    /// Errors followed by warnings.
    pub fn issues(&self) -> impl Iterator<Item = &Issue> {
        self.errors
            .iter()
            .chain(
                self.warnings
                    .iter(),
            )
    }
}

/// Tokenize a string, resolve its tags against the schema, and run the checks
/// that need nothing beyond the string itself. Stages run in order and stop
/// at the first one reporting an error.
pub fn parse<'s>(text: &str, schema: &'s Schema, options: &ParseOptions) -> ParseResult<'s> {
    let mut result = read(text, schema, options);

    if let (Some(parsed), true) = (&result.parsed, result.is_valid()) {
        let issues = check_structure(parsed, schema, options);
        result.extend(issues);
    }

    result
}

/// The stages of [`parse`] up to and including placement of placeholders and
/// definitions. Callers which check definition references do so on this
/// result, before [`check_structure`].
pub fn read<'s>(text: &str, schema: &'s Schema, options: &ParseOptions) -> ParseResult<'s> {
    let fragments = match tokenize(text, options.allow_splices) {
        Ok(fragments) => fragments,
        Err(error) => {
            debug!("syntax error at {}", error.offset());
            return ParseResult::from_issues(None, vec![error.to_issue(text)]);
        }
    };

    let mut issues = Vec::new();
    let nodes = build(&fragments, schema, text, &mut issues);
    if has_errors(&issues) {
        return ParseResult::from_issues(None, issues);
    }

    let mut builder = ParsedString::builder(text);
    builder.extend(nodes);
    let parsed = builder.build();

    issues.extend(check_context(&parsed, schema, options));

    debug!(
        "read \"{}\" with {} issue{}",
        text,
        issues.len(),
        if issues.len() == 1 { "" } else { "s" }
    );

    ParseResult::from_issues(Some(parsed), issues)
}

fn build<'s>(
    fragments: &[Fragment<'_>],
    schema: &'s Schema,
    text: &str,
    issues: &mut Vec<Issue>,
) -> Vec<Node<'s>> {
    let mut nodes = Vec::with_capacity(fragments.len());

    for fragment in fragments {
        match fragment {
            Fragment::Tag(fragment) => {
                let (tag, found) = resolve(fragment, schema, text);
                issues.extend(found);
                if let Some(tag) = tag {
                    nodes.push(Node::Tag(tag));
                }
            }
            Fragment::Group(fragment) => {
                let children = build(&fragment.children, schema, text, issues);
                nodes.push(Node::Group(Group::new(children, fragment.span, fragment.text)));
            }
            Fragment::Splice(fragment) => nodes.push(Node::Splice(ColumnSplice {
                name: fragment
                    .name
                    .to_string(),
                span: fragment.span,
            })),
        }
    }

    nodes
}

/// Placeholders and definitions are only legal where the caller says so. A
/// definition may always carry its own placeholder.
fn check_context(parsed: &ParsedString, schema: &Schema, options: &ParseOptions) -> Vec<Issue> {
    let mut issues = Vec::new();
    let text = parsed.original();

    if !options.allow_placeholders {
        let tags = if options.allow_definitions {
            parsed.tags_outside_definitions()
        } else {
            parsed.all_tags()
        };
        for tag in tags {
            if tag.has_placeholder() {
                issues.push(
                    Issue::new(IssueKind::InvalidPlaceholderContext)
                        .with_tag(tag.original())
                        .with_string(text)
                        .with_bounds(tag.span()),
                );
            }
        }
    }

    if schema.generation() >= 3 && !options.allow_definitions {
        for tag in parsed.all_tags() {
            if tag.is("Definition") {
                let name = tag
                    .split_value()
                    .map(|split| split.name.as_str())
                    .unwrap_or_default();
                issues.push(
                    Issue::new(IssueKind::IllegalDefinitionContext)
                        .with_tag(tag.original())
                        .with_definition(name)
                        .with_string(text)
                        .with_bounds(tag.span()),
                );
            }
        }
    }

    issues
}

/// Placement of reserved tags, then repeated content.
pub fn check_structure(parsed: &ParsedString, schema: &Schema, options: &ParseOptions) -> Vec<Issue> {
    let mut issues = Vec::new();

    if schema.generation() >= 3 {
        issues.extend(ReservedChecker::shared().check(parsed, options.temporal_context));
    }

    if options.check_duplicates {
        issues.extend(duplicates::check(parsed));
    }

    issues
}
