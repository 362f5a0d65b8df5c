//! Types representing a parsed and schema-resolved annotation string

use std::sync::OnceLock;

use crate::regex::*;
use crate::schema::SchemaEntry;

/// A range of byte offsets into the original, unstripped annotation string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Span {
    /// Byte offset of the start (inclusive)
    pub start: usize,
    /// Byte offset of the end (exclusive)
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Span {
        debug_assert!(start <= end);
        Span { start, end }
    }

    pub fn at(offset: usize) -> Span {
        Span {
            start: offset,
            end: offset + 1,
        }
    }

    pub fn len(&self) -> usize {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    pub fn slice<'a>(&self, source: &'a str) -> &'a str {
        &source[self.start..self.end]
    }
}

/// Which canonical spelling of a tag is wanted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Form {
    /// The full path from the schema root, `Event/Sensory-event`.
    Long,
    /// Just the schema node and anything after it, `Sensory-event`.
    Short,
}

/// The value of a two-level node like `Def/Acc/5.4`, split into the name
/// `Acc` and the optional parameter `5.4`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SplitValue {
    pub name: String,
    pub value: Option<String>,
}

impl SplitValue {
    /// Case-insensitive identity used to key definitions and temporal
    /// intervals: the lower-cased name, plus the parameter if any.
    pub fn identity(&self) -> String {
        match &self.value {
            Some(value) => format!("{}/{}", self.name.to_lowercase(), value.to_lowercase()),
            None => self
                .name
                .to_lowercase(),
        }
    }

    pub fn has_placeholder(&self) -> bool {
        self.value
            .as_deref()
            == Some("#")
    }
}

/// What follows the schema node in a tag, if anything.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Remainder {
    None,
    /// A value given to a node that takes one; never looked up in the schema.
    Value(String),
    /// Extra segments below a node that allows extension.
    Extension(String),
}

/// A single tag, resolved against the schema.
#[derive(Debug, Clone)]
pub struct Tag<'s> {
    original: String,
    span: Span,
    entry: &'s SchemaEntry,
    remainder: Remainder,
    split: Option<SplitValue>,
    long: String,
    short: String,
    normalized: String,
}

impl<'s> Tag<'s> {
    pub(crate) fn new(
        original: &str,
        span: Span,
        entry: &'s SchemaEntry,
        remainder: Remainder,
        split: Option<SplitValue>,
    ) -> Tag<'s> {
        let (long, short) = match &remainder {
            Remainder::None => (
                entry
                    .long_name
                    .clone(),
                entry
                    .short_name
                    .clone(),
            ),
            Remainder::Value(rest) | Remainder::Extension(rest) => (
                format!("{}/{}", entry.long_name, rest),
                format!("{}/{}", entry.short_name, rest),
            ),
        };
        let normalized = long.to_lowercase();

        Tag {
            original: original.to_string(),
            span,
            entry,
            remainder,
            split,
            long,
            short,
            normalized,
        }
    }

    /// The tag exactly as written, trimmed of surrounding whitespace.
    pub fn original(&self) -> &str {
        &self.original
    }

    pub fn span(&self) -> Span {
        self.span
    }

    pub fn entry(&self) -> &'s SchemaEntry {
        self.entry
    }

    /// Name of the schema node this tag resolved to.
    pub fn name(&self) -> &str {
        &self
            .entry
            .name
    }

    /// Does this tag resolve to the schema node with the given name?
    pub fn is(&self, name: &str) -> bool {
        self.entry
            .name
            .eq_ignore_ascii_case(name)
    }

    pub fn long_form(&self) -> &str {
        &self.long
    }

    pub fn short_form(&self) -> &str {
        &self.short
    }

    pub fn form(&self, form: Form) -> &str {
        match form {
            Form::Long => &self.long,
            Form::Short => &self.short,
        }
    }

    pub fn remainder(&self) -> &Remainder {
        &self.remainder
    }

    pub fn value(&self) -> Option<&str> {
        match &self.remainder {
            Remainder::Value(value) => Some(value),
            _ => None,
        }
    }

    pub fn extension(&self) -> Option<&str> {
        match &self.remainder {
            Remainder::Extension(extension) => Some(extension),
            _ => None,
        }
    }

    pub fn split_value(&self) -> Option<&SplitValue> {
        self.split
            .as_ref()
    }

    pub fn has_placeholder(&self) -> bool {
        self.value()
            .map(|value| value.contains('#'))
            .unwrap_or(false)
    }

    /// Lower-cased long form; two tags are duplicates iff these match.
    pub fn normalized(&self) -> &str {
        &self.normalized
    }
}

impl PartialEq for Tag<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.normalized == other.normalized
    }
}

impl Eq for Tag<'_> {}

/// A `{column}` reference inside a sidecar annotation, to be replaced by
/// another column's annotation when rows are assembled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnSplice {
    pub name: String,
    pub span: Span,
}

#[derive(Debug, Clone)]
pub enum Node<'s> {
    Tag(Tag<'s>),
    Group(Group<'s>),
    Splice(ColumnSplice),
}

impl<'s> Node<'s> {
    pub fn span(&self) -> Span {
        match self {
            Node::Tag(tag) => tag.span(),
            Node::Group(group) => group.span(),
            Node::Splice(splice) => splice.span,
        }
    }

    pub fn as_tag(&self) -> Option<&Tag<'s>> {
        match self {
            Node::Tag(tag) => Some(tag),
            _ => None,
        }
    }

    pub fn as_group(&self) -> Option<&Group<'s>> {
        match self {
            Node::Group(group) => Some(group),
            _ => None,
        }
    }

    pub fn normalized(&self) -> String {
        match self {
            Node::Tag(tag) => tag
                .normalized()
                .to_string(),
            Node::Group(group) => group
                .normalized()
                .to_string(),
            Node::Splice(splice) => format!(
                "{{{}}}",
                splice
                    .name
                    .to_lowercase()
            ),
        }
    }
}

/// A parenthesized group of tags and subgroups. Immutable once built; the
/// normalized form is computed on first use.
#[derive(Debug, Clone)]
pub struct Group<'s> {
    children: Vec<Node<'s>>,
    span: Span,
    original: String,
    normalized: OnceLock<String>,
}

impl<'s> Group<'s> {
    pub(crate) fn new(children: Vec<Node<'s>>, span: Span, original: &str) -> Group<'s> {
        Group {
            children,
            span,
            original: original.to_string(),
            normalized: OnceLock::new(),
        }
    }

    pub fn children(&self) -> &[Node<'s>] {
        &self.children
    }

    pub fn span(&self) -> Span {
        self.span
    }

    /// The group as written, including its parentheses.
    pub fn original(&self) -> &str {
        &self.original
    }

    /// The text between the parentheses.
    pub fn interior(&self) -> &str {
        let text = self
            .original
            .trim();
        text.strip_prefix('(')
            .and_then(|text| text.strip_suffix(')'))
            .unwrap_or(text)
    }

    pub fn is_empty(&self) -> bool {
        self.children
            .is_empty()
    }

    /// Tags which are direct children of this group.
    pub fn tags(&self) -> impl Iterator<Item = &Tag<'s>> {
        self.children
            .iter()
            .filter_map(Node::as_tag)
    }

    /// Groups which are direct children of this group.
    pub fn groups(&self) -> impl Iterator<Item = &Group<'s>> {
        self.children
            .iter()
            .filter_map(Node::as_group)
    }

    /// Every tag in this group, at any depth.
    pub fn all_tags(&self) -> Vec<&Tag<'s>> {
        let mut result = Vec::new();
        collect_tags(&self.children, &mut result);
        result
    }

    /// Every group nested within this group, at any depth.
    pub fn all_groups(&self) -> Vec<&Group<'s>> {
        let mut result = Vec::new();
        collect_groups(&self.children, &mut result);
        result
    }

    /// The first direct child tag resolving to the named schema node.
    pub fn find_tag(&self, name: &str) -> Option<&Tag<'s>> {
        self.tags()
            .find(|tag| tag.is(name))
    }

    pub fn has_tag(&self, name: &str) -> bool {
        self.find_tag(name)
            .is_some()
    }

    /// Order-invariant serialization of this group's content. Two groups are
    /// duplicates iff these are equal.
    pub fn normalized(&self) -> &str {
        self.normalized
            .get_or_init(|| normalize(&self.children))
    }
}

impl PartialEq for Group<'_> {
    fn eq(&self, other: &Self) -> bool {
        self.normalized() == other.normalized()
    }
}

impl Eq for Group<'_> {}

fn normalize(children: &[Node<'_>]) -> String {
    let mut parts: Vec<String> = children
        .iter()
        .map(Node::normalized)
        .collect();
    parts.sort();

    format!("({})", parts.join(","))
}

fn collect_tags<'a, 's>(nodes: &'a [Node<'s>], result: &mut Vec<&'a Tag<'s>>) {
    for node in nodes {
        match node {
            Node::Tag(tag) => result.push(tag),
            Node::Group(group) => collect_tags(&group.children, result),
            Node::Splice(_) => {}
        }
    }
}

fn collect_references<'a, 's>(nodes: &'a [Node<'s>], result: &mut Vec<&'a Tag<'s>>) {
    for node in nodes {
        match node {
            Node::Tag(tag) => result.push(tag),
            Node::Group(group) if !group.has_tag("Definition") => {
                collect_references(&group.children, result)
            }
            _ => {}
        }
    }
}

fn collect_groups<'a, 's>(nodes: &'a [Node<'s>], result: &mut Vec<&'a Group<'s>>) {
    for node in nodes {
        if let Node::Group(group) = node {
            result.push(group);
            collect_groups(&group.children, result);
        }
    }
}

/// One annotation string after tokenizing and resolving. Never altered by
/// the checks that run over it.
#[derive(Debug, Clone)]
pub struct ParsedString<'s> {
    original: String,
    children: Vec<Node<'s>>,
    splices: Vec<String>,
    definitions: bool,
}

impl<'s> ParsedString<'s> {
    pub fn builder(original: &str) -> ParsedStringBuilder<'s> {
        ParsedStringBuilder {
            original: original.to_string(),
            children: Vec::new(),
        }
    }

    /// Combine several strings into one, as when rows sharing an onset are
    /// checked together. Spans keep referring to the contributing strings.
    pub fn union(parts: &[&ParsedString<'s>]) -> ParsedString<'s> {
        let original = parts
            .iter()
            .map(|part| part.original())
            .filter(|text| {
                !text
                    .trim()
                    .is_empty()
            })
            .collect::<Vec<_>>()
            .join(",");

        let mut builder = ParsedString::builder(&original);
        for part in parts {
            builder.extend(
                part.children
                    .iter()
                    .cloned(),
            );
        }
        builder.build()
    }

    pub fn original(&self) -> &str {
        &self.original
    }

    /// Top-level tags and groups, in the order written.
    pub fn children(&self) -> &[Node<'s>] {
        &self.children
    }

    pub fn is_empty(&self) -> bool {
        self.children
            .is_empty()
    }

    /// Tags at the top level, outside any group.
    pub fn tags(&self) -> impl Iterator<Item = &Tag<'s>> {
        self.children
            .iter()
            .filter_map(Node::as_tag)
    }

    /// Groups at the top level.
    pub fn groups(&self) -> impl Iterator<Item = &Group<'s>> {
        self.children
            .iter()
            .filter_map(Node::as_group)
    }

    pub fn all_tags(&self) -> Vec<&Tag<'s>> {
        let mut result = Vec::new();
        collect_tags(&self.children, &mut result);
        result
    }

    pub fn all_groups(&self) -> Vec<&Group<'s>> {
        let mut result = Vec::new();
        collect_groups(&self.children, &mut result);
        result
    }

    /// Tags outside any definition group, which is where definitions are
    /// used rather than declared.
    pub fn tags_outside_definitions(&self) -> Vec<&Tag<'s>> {
        let mut result = Vec::new();
        collect_references(&self.children, &mut result);
        result
    }

    /// Names of the columns spliced into this string with `{column}`.
    pub fn column_splices(&self) -> &[String] {
        &self.splices
    }

    /// Whether any tag in this string declares a definition.
    pub fn has_definitions(&self) -> bool {
        self.definitions
    }

    /// Top-level groups which declare a definition.
    pub fn definition_groups(&self) -> impl Iterator<Item = &Group<'s>> {
        self.groups()
            .filter(|group| group.has_tag("Definition"))
    }

    /// Order-invariant form of the whole string, treated as one group.
    pub fn normalized(&self) -> String {
        normalize(&self.children)
    }
}

/// Collects top-level nodes, then computes the string's indices once in
/// [`build()`](ParsedStringBuilder::build).
#[derive(Debug)]
pub struct ParsedStringBuilder<'s> {
    original: String,
    children: Vec<Node<'s>>,
}

impl<'s> ParsedStringBuilder<'s> {
    pub fn push(&mut self, node: Node<'s>) {
        self.children
            .push(node);
    }

    pub fn extend(&mut self, nodes: impl IntoIterator<Item = Node<'s>>) {
        self.children
            .extend(nodes);
    }

    pub fn build(self) -> ParsedString<'s> {
        let mut splices = Vec::new();
        collect_splices(&self.children, &mut splices);

        let mut tags = Vec::new();
        collect_tags(&self.children, &mut tags);
        let definitions = tags
            .iter()
            .any(|tag| tag.is("Definition"));

        ParsedString {
            original: self.original,
            children: self.children,
            splices,
            definitions,
        }
    }
}

fn collect_splices(nodes: &[Node<'_>], result: &mut Vec<String>) {
    for node in nodes {
        match node {
            Node::Splice(splice) => result.push(
                splice
                    .name
                    .clone(),
            ),
            Node::Group(group) => collect_splices(&group.children, result),
            Node::Tag(_) => {}
        }
    }
}

// the validate functions return the input (or its parsed form) when it is
// acceptable, None otherwise.

pub fn validate_number(input: &str) -> Option<f64> {
    let re = regex!(r"^[+-]?(?:[0-9]+(?:\.[0-9]*)?|\.[0-9]+)(?:[eE][+-]?[0-9]+)?$");

    if re.is_match(input) {
        input
            .parse::<f64>()
            .ok()
    } else {
        None
    }
}

pub fn validate_definition_name(input: &str) -> Option<&str> {
    let re = regex!(r"^[A-Za-z0-9_.\-]+$");

    if re.is_match(input) {
        Some(input)
    } else {
        None
    }
}

pub fn validate_column_name(input: &str) -> Option<&str> {
    let re = regex!(r"^[A-Za-z0-9_.\-]+$");

    if re.is_match(input) {
        Some(input)
    } else {
        None
    }
}

#[cfg(test)]
mod check {
    use super::*;

    #[test]
    fn numbers() {
        assert_eq!(validate_number("5.4"), Some(5.4));
        assert_eq!(validate_number("-3"), Some(-3.0));
        assert_eq!(validate_number(".5"), Some(0.5));
        assert_eq!(validate_number("1e3"), Some(1000.0));
        assert_eq!(validate_number("4."), Some(4.0));
        assert_eq!(validate_number("five"), None);
        assert_eq!(validate_number("5.4.3"), None);
        assert_eq!(validate_number(""), None);
        assert_eq!(validate_number("#"), None);
    }

    #[test]
    fn definition_names() {
        assert_eq!(validate_definition_name("MyColor"), Some("MyColor"));
        assert_eq!(validate_definition_name("my-color_2.b"), Some("my-color_2.b"));
        assert_eq!(validate_definition_name("My Color"), None);
        assert_eq!(validate_definition_name("#"), None);
        assert_eq!(validate_definition_name(""), None);
    }

    #[test]
    fn split_value_identity() {
        let split = SplitValue {
            name: "Acc".to_string(),
            value: Some("5.4".to_string()),
        };
        assert_eq!(split.identity(), "acc/5.4");
        assert!(!split.has_placeholder());

        let split = SplitValue {
            name: "MyColor".to_string(),
            value: None,
        };
        assert_eq!(split.identity(), "mycolor");
    }

    #[test]
    fn span_arithmetic() {
        let span = Span::new(3, 7);
        assert_eq!(span.len(), 4);
        assert_eq!(span.slice("Red,Blue,Green"), ",Blu");
        assert!(Span::new(2, 2).is_empty());
        assert_eq!(Span::at(5), Span::new(5, 6));
    }
}
