//! Issues reported by every stage of validation.

use serde::Serialize;
use std::fmt;

use crate::language::Span;

use super::messages::render_message;

/// Severity of a reported issue. Warnings never block later stages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Error,
    Warning,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Level::Error => write!(f, "error"),
            Level::Warning => write!(f, "warning"),
        }
    }
}

/// The closed set of things that can be wrong with an annotation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum IssueKind {
    // syntax
    UnclosedParenthesis,
    UnmatchedCloseParenthesis,
    ExtraDelimiter,
    EmptyGroup,
    CommaMissing,
    LeadingSlash,
    TrailingSlash,
    ExtraSlash,
    InvalidCharacter,
    InvalidPlaceholder,

    // resolution against the schema
    InvalidTag,
    AmbiguousTag,
    InvalidParentNode,
    InvalidExtension,
    Extension,
    DeprecatedTag,
    ChildRequired,
    InvalidValue,
    InvalidUnit,
    InvalidPlaceholderContext,
    MissingPlaceholder,

    // definitions
    IllegalDefinitionContext,
    InvalidDefinitionGroupStructure,
    InvalidDefinitionForbidden,
    InvalidPlaceholderInDefinition,
    ConflictingDefinitions,
    MissingDefinitionForDef,
    MissingDefinitionForDefExpand,
    DefExpandContentsInvalid,
    RecursiveDefinition,

    // duplicates
    DuplicateTag,
    DuplicateGroup,

    // reserved tags
    InvalidTopLevelTagGroupTag,
    TooManyGroupTopTags,
    InvalidGroupTopTags,
    TemporalTagInNonTemporalContext,

    // temporal
    InactiveOnset,
    SimultaneousDuplicateEvents,
    InvalidOnset,

    // tabular files and sidecars
    SidecarKeyMissing,
    UnknownColumnSplice,
    RecursiveColumnSplice,

    InternalError,
}

impl IssueKind {
    /// Every kind, in declaration order.
    pub const ALL: &[IssueKind] = &[
        IssueKind::UnclosedParenthesis,
        IssueKind::UnmatchedCloseParenthesis,
        IssueKind::ExtraDelimiter,
        IssueKind::EmptyGroup,
        IssueKind::CommaMissing,
        IssueKind::LeadingSlash,
        IssueKind::TrailingSlash,
        IssueKind::ExtraSlash,
        IssueKind::InvalidCharacter,
        IssueKind::InvalidPlaceholder,
        IssueKind::InvalidTag,
        IssueKind::AmbiguousTag,
        IssueKind::InvalidParentNode,
        IssueKind::InvalidExtension,
        IssueKind::Extension,
        IssueKind::DeprecatedTag,
        IssueKind::ChildRequired,
        IssueKind::InvalidValue,
        IssueKind::InvalidUnit,
        IssueKind::InvalidPlaceholderContext,
        IssueKind::MissingPlaceholder,
        IssueKind::IllegalDefinitionContext,
        IssueKind::InvalidDefinitionGroupStructure,
        IssueKind::InvalidDefinitionForbidden,
        IssueKind::InvalidPlaceholderInDefinition,
        IssueKind::ConflictingDefinitions,
        IssueKind::MissingDefinitionForDef,
        IssueKind::MissingDefinitionForDefExpand,
        IssueKind::DefExpandContentsInvalid,
        IssueKind::RecursiveDefinition,
        IssueKind::DuplicateTag,
        IssueKind::DuplicateGroup,
        IssueKind::InvalidTopLevelTagGroupTag,
        IssueKind::TooManyGroupTopTags,
        IssueKind::InvalidGroupTopTags,
        IssueKind::TemporalTagInNonTemporalContext,
        IssueKind::InactiveOnset,
        IssueKind::SimultaneousDuplicateEvents,
        IssueKind::InvalidOnset,
        IssueKind::SidecarKeyMissing,
        IssueKind::UnknownColumnSplice,
        IssueKind::RecursiveColumnSplice,
        IssueKind::InternalError,
    ];

    /// The stable identifier used in the wire format.
    pub fn internal_code(&self) -> &'static str {
        match self {
            IssueKind::UnclosedParenthesis => "unclosedParenthesis",
            IssueKind::UnmatchedCloseParenthesis => "unmatchedCloseParenthesis",
            IssueKind::ExtraDelimiter => "extraDelimiter",
            IssueKind::EmptyGroup => "emptyGroup",
            IssueKind::CommaMissing => "commaMissing",
            IssueKind::LeadingSlash => "leadingSlash",
            IssueKind::TrailingSlash => "trailingSlash",
            IssueKind::ExtraSlash => "extraSlash",
            IssueKind::InvalidCharacter => "invalidCharacter",
            IssueKind::InvalidPlaceholder => "invalidPlaceholder",
            IssueKind::InvalidTag => "invalidTag",
            IssueKind::AmbiguousTag => "ambiguousTag",
            IssueKind::InvalidParentNode => "invalidParentNode",
            IssueKind::InvalidExtension => "invalidExtension",
            IssueKind::Extension => "extension",
            IssueKind::DeprecatedTag => "deprecatedTag",
            IssueKind::ChildRequired => "childRequired",
            IssueKind::InvalidValue => "invalidValue",
            IssueKind::InvalidUnit => "invalidUnit",
            IssueKind::InvalidPlaceholderContext => "invalidPlaceholderContext",
            IssueKind::MissingPlaceholder => "missingPlaceholder",
            IssueKind::IllegalDefinitionContext => "illegalDefinitionContext",
            IssueKind::InvalidDefinitionGroupStructure => "invalidDefinitionGroupStructure",
            IssueKind::InvalidDefinitionForbidden => "invalidDefinitionForbidden",
            IssueKind::InvalidPlaceholderInDefinition => "invalidPlaceholderInDefinition",
            IssueKind::ConflictingDefinitions => "conflictingDefinitions",
            IssueKind::MissingDefinitionForDef => "missingDefinitionForDef",
            IssueKind::MissingDefinitionForDefExpand => "missingDefinitionForDefExpand",
            IssueKind::DefExpandContentsInvalid => "defExpandContentsInvalid",
            IssueKind::RecursiveDefinition => "recursiveDefinition",
            IssueKind::DuplicateTag => "duplicateTag",
            IssueKind::DuplicateGroup => "duplicateGroup",
            IssueKind::InvalidTopLevelTagGroupTag => "invalidTopLevelTagGroupTag",
            IssueKind::TooManyGroupTopTags => "tooManyGroupTopTags",
            IssueKind::InvalidGroupTopTags => "invalidGroupTopTags",
            IssueKind::TemporalTagInNonTemporalContext => "temporalTagInNonTemporalContext",
            IssueKind::InactiveOnset => "inactiveOnset",
            IssueKind::SimultaneousDuplicateEvents => "simultaneousDuplicateEvents",
            IssueKind::InvalidOnset => "invalidOnset",
            IssueKind::SidecarKeyMissing => "sidecarKeyMissing",
            IssueKind::UnknownColumnSplice => "unknownColumnSplice",
            IssueKind::RecursiveColumnSplice => "recursiveColumnSplice",
            IssueKind::InternalError => "internalError",
        }
    }

    /// The coarser, externally documented code this kind belongs to.
    pub fn hed_code(&self) -> &'static str {
        match self {
            IssueKind::UnclosedParenthesis | IssueKind::UnmatchedCloseParenthesis => {
                "PARENTHESES_MISMATCH"
            }
            IssueKind::ExtraDelimiter | IssueKind::EmptyGroup => "TAG_EMPTY",
            IssueKind::CommaMissing => "COMMA_MISSING",
            IssueKind::LeadingSlash | IssueKind::TrailingSlash | IssueKind::ExtraSlash => {
                "TAG_INVALID"
            }
            IssueKind::InvalidCharacter => "CHARACTER_INVALID",
            IssueKind::InvalidPlaceholder
            | IssueKind::InvalidPlaceholderContext
            | IssueKind::MissingPlaceholder => "PLACEHOLDER_INVALID",
            IssueKind::InvalidTag | IssueKind::AmbiguousTag | IssueKind::InvalidParentNode => {
                "TAG_INVALID"
            }
            IssueKind::InvalidExtension => "TAG_EXTENSION_INVALID",
            IssueKind::Extension => "TAG_EXTENDED",
            IssueKind::DeprecatedTag => "ELEMENT_DEPRECATED",
            IssueKind::ChildRequired => "TAG_REQUIRES_CHILD",
            IssueKind::InvalidValue => "VALUE_INVALID",
            IssueKind::InvalidUnit => "UNITS_INVALID",
            IssueKind::IllegalDefinitionContext
            | IssueKind::InvalidDefinitionGroupStructure
            | IssueKind::InvalidDefinitionForbidden
            | IssueKind::InvalidPlaceholderInDefinition
            | IssueKind::ConflictingDefinitions
            | IssueKind::RecursiveDefinition => "DEFINITION_INVALID",
            IssueKind::MissingDefinitionForDef => "DEF_INVALID",
            IssueKind::MissingDefinitionForDefExpand | IssueKind::DefExpandContentsInvalid => {
                "DEF_EXPAND_INVALID"
            }
            IssueKind::DuplicateTag
            | IssueKind::DuplicateGroup
            | IssueKind::SimultaneousDuplicateEvents => "TAG_EXPRESSION_REPEATED",
            IssueKind::InvalidTopLevelTagGroupTag
            | IssueKind::TooManyGroupTopTags
            | IssueKind::InvalidGroupTopTags => "TAG_GROUP_ERROR",
            IssueKind::TemporalTagInNonTemporalContext
            | IssueKind::InactiveOnset
            | IssueKind::InvalidOnset => "TEMPORAL_TAG_ERROR",
            IssueKind::SidecarKeyMissing => "SIDECAR_KEY_MISSING",
            IssueKind::UnknownColumnSplice | IssueKind::RecursiveColumnSplice => {
                "SIDECAR_BRACES_INVALID"
            }
            IssueKind::InternalError => "INTERNAL_ERROR",
        }
    }

    pub fn level(&self) -> Level {
        match self {
            IssueKind::Extension | IssueKind::DeprecatedTag | IssueKind::SidecarKeyMissing => {
                Level::Warning
            }
            _ => Level::Error,
        }
    }
}

impl fmt::Display for IssueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.internal_code())
    }
}

/// Structured details attached to an issue. Which fields are present depends
/// on the kind; message templates only refer to the ones their kind sets.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Parameters {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub string: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bounds: Option<[usize; 2]>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sidecar_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tsv_line: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub definition: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parent_tag: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Issue {
    pub kind: IssueKind,
    pub level: Level,
    pub parameters: Parameters,
}

impl Issue {
    pub fn new(kind: IssueKind) -> Issue {
        Issue {
            kind,
            level: kind.level(),
            parameters: Parameters::default(),
        }
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Issue {
        self.parameters
            .tag = Some(tag.into());
        self
    }

    pub fn with_string(mut self, string: impl Into<String>) -> Issue {
        self.parameters
            .string = Some(string.into());
        self
    }

    pub fn with_bounds(mut self, span: Span) -> Issue {
        self.parameters
            .bounds = Some([span.start, span.end]);
        self
    }

    pub fn with_sidecar_key(mut self, key: impl Into<String>) -> Issue {
        self.parameters
            .sidecar_key = Some(key.into());
        self
    }

    pub fn with_tsv_line(mut self, line: impl Into<String>) -> Issue {
        self.parameters
            .tsv_line = Some(line.into());
        self
    }

    pub fn with_definition(mut self, name: impl Into<String>) -> Issue {
        self.parameters
            .definition = Some(name.into());
        self
    }

    pub fn with_parent_tag(mut self, parent: impl Into<String>) -> Issue {
        self.parameters
            .parent_tag = Some(parent.into());
        self
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Issue {
        self.parameters
            .detail = Some(detail.into());
        self
    }

    /// Attach a string if one isn't already recorded. Used when issues found
    /// deep inside a check bubble up to the place that knows the whole text.
    pub fn or_string(mut self, string: &str) -> Issue {
        if self
            .parameters
            .string
            .is_none()
        {
            self.parameters
                .string = Some(string.to_string());
        }
        self
    }

    pub fn is_error(&self) -> bool {
        self.level == Level::Error
    }

    /// Render the human-readable message for this issue.
    pub fn message(&self) -> String {
        render_message(self.kind, &self.parameters)
    }

    /// Produce the wire representation, rendering the message.
    pub fn to_record(&self) -> IssueRecord {
        IssueRecord {
            internal_code: self
                .kind
                .internal_code(),
            hed_code: self
                .kind
                .hed_code(),
            level: self.level,
            message: self.message(),
            parameters: self
                .parameters
                .clone(),
        }
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: [{}] {}", self.level, self.kind.hed_code(), self.message())
    }
}

/// The serialized form of an [`Issue`].
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IssueRecord {
    pub internal_code: &'static str,
    pub hed_code: &'static str,
    pub level: Level,
    pub message: String,
    pub parameters: Parameters,
}

/// Split a list of issues into errors and warnings, preserving order.
pub fn partition(issues: Vec<Issue>) -> (Vec<Issue>, Vec<Issue>) {
    issues
        .into_iter()
        .partition(Issue::is_error)
}

pub fn has_errors(issues: &[Issue]) -> bool {
    issues
        .iter()
        .any(Issue::is_error)
}

/// An unexpected failure inside a check. It carries a ready-made issue so
/// that whoever catches it at a row or file boundary can report it instead
/// of abandoning the whole run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InternalError {
    issue: Issue,
}

impl InternalError {
    pub fn new(detail: impl Into<String>) -> InternalError {
        InternalError {
            issue: Issue::new(IssueKind::InternalError).with_detail(detail),
        }
    }

    pub fn into_issue(self) -> Issue {
        self.issue
    }
}

impl fmt::Display for InternalError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "internal error: {}", self.issue.message())
    }
}

impl std::error::Error for InternalError {}

#[cfg(test)]
mod check {
    use super::*;

    #[test]
    fn levels_follow_kind() {
        assert_eq!(Issue::new(IssueKind::InvalidTag).level, Level::Error);
        assert_eq!(Issue::new(IssueKind::Extension).level, Level::Warning);
        assert_eq!(Issue::new(IssueKind::DeprecatedTag).level, Level::Warning);
    }

    #[test]
    fn wire_format() {
        let issue = Issue::new(IssueKind::InvalidTag)
            .with_tag("Blah")
            .with_bounds(Span::new(3, 7));

        let value = serde_json::to_value(issue.to_record()).unwrap();
        assert_eq!(value["internalCode"], "invalidTag");
        assert_eq!(value["hedCode"], "TAG_INVALID");
        assert_eq!(value["level"], "error");
        assert_eq!(value["parameters"]["tag"], "Blah");
        assert_eq!(value["parameters"]["bounds"][0], 3);
        assert_eq!(value["parameters"]["bounds"][1], 7);
        assert!(value["parameters"]
            .get("sidecarKey")
            .is_none());
        assert!(value["message"]
            .as_str()
            .unwrap()
            .contains("Blah"));
    }

    #[test]
    fn partitioning() {
        let issues = vec![
            Issue::new(IssueKind::Extension),
            Issue::new(IssueKind::InvalidTag),
            Issue::new(IssueKind::DeprecatedTag),
        ];
        assert!(has_errors(&issues));

        let (errors, warnings) = partition(issues);
        assert_eq!(errors.len(), 1);
        assert_eq!(warnings.len(), 2);
    }

    #[test]
    fn internal_error_becomes_issue() {
        let error = InternalError::new("group lost its anchor");
        let issue = error.into_issue();
        assert_eq!(issue.kind, IssueKind::InternalError);
        assert_eq!(
            issue
                .parameters
                .detail
                .as_deref(),
            Some("group lost its anchor")
        );
    }
}
