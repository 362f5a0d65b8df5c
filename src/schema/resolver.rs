//! Resolve tokenized tags against a schema, producing canonical [`Tag`]s.
//!
//! A tag is walked left to right. The first segment may name any node in the
//! schema (short form) and each further segment must be a child of the node
//! before it, until either a value-taking node is reached, in which case the
//! rest is its value, or a segment is not a child, in which case the rest is an
//! extension.

use tracing::debug;

use crate::language::{
    validate_definition_name, validate_number, Form, Remainder, Span, SplitValue, Tag,
};
use crate::parsing::tokenizer::{tokenize, Fragment, Segment, TagFragment};
use crate::problem::{has_errors, InternalError, Issue, IssueKind};

use super::{Lookup, Schema, SchemaEntry};

/// Resolve a single tag fragment. Issues refer to positions in `original`,
/// the whole string the fragment was tokenized from. A tag is returned only
/// if there were no errors; warnings may accompany it.
pub(crate) fn resolve<'s>(
    fragment: &TagFragment<'_>,
    schema: &'s Schema,
    original: &str,
) -> (Option<Tag<'s>>, Vec<Issue>) {
    let mut resolver = Resolver {
        schema,
        fragment,
        original,
        issues: Vec::new(),
    };

    let tag = resolver.resolve();

    if has_errors(&resolver.issues) {
        debug!("could not resolve tag \"{}\"", fragment.text);
        (None, resolver.issues)
    } else {
        (tag, resolver.issues)
    }
}

struct Resolver<'a, 's, 'i> {
    schema: &'s Schema,
    fragment: &'a TagFragment<'i>,
    original: &'a str,
    issues: Vec<Issue>,
}

impl<'a, 's, 'i> Resolver<'a, 's, 'i> {
    fn problem(&self, kind: IssueKind, tag: &str, span: Span) -> Issue {
        Issue::new(kind)
            .with_tag(tag)
            .with_string(self.original)
            .with_bounds(span)
    }

    fn whole(&self, kind: IssueKind) -> Issue {
        self.problem(kind, self.fragment.text, self.fragment.span)
    }

    /// Long names of every node with this short name, if there are any.
    fn long_names(&self, name: &str) -> Option<String> {
        match self
            .schema
            .lookup(name)
        {
            Lookup::Unique(entry) => Some(
                entry
                    .long_name
                    .clone(),
            ),
            Lookup::Ambiguous(entries) => Some(
                entries
                    .iter()
                    .map(|entry| entry.long_name.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            Lookup::Missing => None,
        }
    }

    fn resolve(&mut self) -> Option<Tag<'s>> {
        let schema = self.schema;
        let fragment = self.fragment;
        let segments = &fragment.segments;
        let (first, _) = segments.split_first()?;

        let mut current = match schema.lookup(first.text) {
            Lookup::Unique(entry) => entry,
            Lookup::Ambiguous(entries) => {
                let candidates = entries
                    .iter()
                    .map(|entry| entry.long_name.as_str())
                    .collect::<Vec<_>>()
                    .join(", ");
                let issue = self
                    .whole(IssueKind::AmbiguousTag)
                    .with_detail(candidates);
                self.issues
                    .push(issue);
                return None;
            }
            Lookup::Missing => {
                self.report_unknown(&segments[1..]);
                return None;
            }
        };

        let mut position = 1;
        while position < segments.len() {
            if current
                .attributes
                .takes_value
            {
                break;
            }
            match schema.find_child(current, segments[position].text) {
                Some(child) => {
                    current = child;
                    position += 1;
                }
                None => break,
            }
        }

        let rest = &segments[position..];

        let (remainder, split) = if rest.is_empty() {
            if current
                .attributes
                .require_child
            {
                let issue = self
                    .whole(IssueKind::ChildRequired)
                    .with_parent_tag(&current.long_name);
                self.issues
                    .push(issue);
                return None;
            }
            (Remainder::None, None)
        } else if current
            .attributes
            .takes_value
        {
            self.read_value(current, rest)?
        } else {
            self.read_extension(current, rest)?
        };

        if current
            .attributes
            .deprecated
        {
            let issue = self.whole(IssueKind::DeprecatedTag);
            self.issues
                .push(issue);
        }

        Some(Tag::new(
            fragment.text,
            fragment.span,
            current,
            remainder,
            split,
        ))
    }

    /// The first segment is not in the schema. If something further along is,
    /// the problem is the path leading to it; otherwise the tag is unknown.
    fn report_unknown(&mut self, rest: &[Segment<'_>]) {
        for segment in rest {
            if let Some(parents) = self.long_names(segment.text) {
                let issue = self
                    .problem(IssueKind::InvalidParentNode, segment.text, segment.span)
                    .with_parent_tag(parents);
                self.issues
                    .push(issue);
                return;
            }
        }

        let issue = self.whole(IssueKind::InvalidTag);
        self.issues
            .push(issue);
    }

    fn read_extension(
        &mut self,
        current: &'s SchemaEntry,
        rest: &[Segment<'_>],
    ) -> Option<(Remainder, Option<SplitValue>)> {
        let mut failed = false;

        for segment in rest {
            if segment
                .text
                .starts_with('#')
            {
                let issue = self
                    .problem(IssueKind::InvalidPlaceholder, self.fragment.text, segment.span)
                    .with_parent_tag(&current.long_name)
                    .with_detail(format!("{} does not take a value.", current.name));
                self.issues
                    .push(issue);
                return None;
            }

            if let Some(parents) = self.long_names(segment.text) {
                let issue = self
                    .problem(IssueKind::InvalidParentNode, segment.text, segment.span)
                    .with_parent_tag(parents);
                self.issues
                    .push(issue);
                return None;
            }

            if !current
                .attributes
                .extension_allowed
            {
                let issue = self
                    .problem(IssueKind::InvalidExtension, self.fragment.text, segment.span)
                    .with_parent_tag(&current.long_name)
                    .with_detail(segment.text);
                self.issues
                    .push(issue);
                failed = true;
            }
        }

        if failed {
            return None;
        }

        let span = covering(rest);
        let extension = joined(rest);
        let issue = self
            .problem(IssueKind::Extension, self.fragment.text, span)
            .with_parent_tag(&current.long_name)
            .with_detail(&extension);
        self.issues
            .push(issue);

        Some((Remainder::Extension(extension), None))
    }

    fn read_value(
        &mut self,
        current: &'s SchemaEntry,
        rest: &[Segment<'_>],
    ) -> Option<(Remainder, Option<SplitValue>)> {
        let span = covering(rest);
        let value = joined(rest);

        if current
            .attributes
            .two_level_value
        {
            let name = rest[0].text;
            if rest.len() > 2 || validate_definition_name(name).is_none() {
                let issue = self
                    .whole(IssueKind::InvalidValue)
                    .with_bounds(span)
                    .with_detail(&value);
                self.issues
                    .push(issue);
                return None;
            }

            let split = SplitValue {
                name: name.to_string(),
                value: rest
                    .get(1)
                    .map(|segment| {
                        segment
                            .text
                            .to_string()
                    }),
            };
            return Some((Remainder::Value(value), Some(split)));
        }

        if rest.len() > 1 {
            let issue = self
                .whole(IssueKind::InvalidValue)
                .with_bounds(span)
                .with_detail(&value);
            self.issues
                .push(issue);
            return None;
        }

        if let Some(class) = &current
            .attributes
            .unit_class
        {
            self.check_units(class, &value, span)?;
        }

        Some((Remainder::Value(value), None))
    }

    /// A value in a unit class is a number (or placeholder), optionally
    /// followed by one of the class's units.
    fn check_units(&mut self, class: &str, value: &str, span: Span) -> Option<()> {
        let schema = self.schema;
        let class = match schema.unit_class(class) {
            Some(class) => class,
            None => {
                let issue = InternalError::new(format!("unit class \"{}\" vanished", class))
                    .into_issue()
                    .with_string(self.original);
                self.issues
                    .push(issue);
                return None;
            }
        };

        let (number, unit) = match value.split_once(char::is_whitespace) {
            Some((number, unit)) => (number, Some(unit.trim())),
            None => (value, None),
        };

        if number != "#" && validate_number(number).is_none() {
            let issue = self
                .whole(IssueKind::InvalidValue)
                .with_bounds(span)
                .with_detail(value);
            self.issues
                .push(issue);
            return None;
        }

        if let Some(unit) = unit {
            if !class.has_unit(unit) {
                let issue = self
                    .whole(IssueKind::InvalidUnit)
                    .with_bounds(span)
                    .with_detail(unit);
                self.issues
                    .push(issue);
                return None;
            }
        }

        Some(())
    }
}

fn joined(segments: &[Segment<'_>]) -> String {
    segments
        .iter()
        .map(|segment| segment.text)
        .collect::<Vec<_>>()
        .join("/")
}

fn covering(segments: &[Segment<'_>]) -> Span {
    match (segments.first(), segments.last()) {
        (Some(first), Some(last)) => Span::new(first.span.start, last.span.end),
        _ => Span::default(),
    }
}

fn collect_tags<'f, 'i>(fragments: &'f [Fragment<'i>], result: &mut Vec<&'f TagFragment<'i>>) {
    for fragment in fragments {
        match fragment {
            Fragment::Tag(tag) => result.push(tag),
            Fragment::Group(group) => collect_tags(&group.children, result),
            Fragment::Splice(_) => {}
        }
    }
}

/// Rewrite every tag in `text` into the requested canonical form, leaving
/// grouping, separators, and whitespace as written. If anything fails to
/// resolve the text is returned unchanged along with the issues found.
pub fn canonicalize(text: &str, schema: &Schema, form: Form) -> (String, Vec<Issue>) {
    let fragments = match tokenize(text, false) {
        Ok(fragments) => fragments,
        Err(error) => return (text.to_string(), vec![error.to_issue(text)]),
    };

    let mut tags = Vec::new();
    collect_tags(&fragments, &mut tags);

    let mut issues = Vec::new();
    let mut replacements = Vec::with_capacity(tags.len());

    for fragment in tags {
        let (tag, found) = resolve(fragment, schema, text);
        issues.extend(found);
        if let Some(tag) = tag {
            replacements.push((
                tag.span(),
                tag.form(form)
                    .to_string(),
            ));
        }
    }

    if has_errors(&issues) {
        return (text.to_string(), issues);
    }

    let mut result = text.to_string();
    for (span, replacement) in replacements
        .into_iter()
        .rev()
    {
        result.replace_range(span.start..span.end, &replacement);
    }

    (result, issues)
}
