use serde::Serialize;
use tinytemplate::{format_unescaped, TinyTemplate};
use tracing::warn;

use super::{IssueKind, Parameters};

/// Everything a message template may refer to. Absent parameters render as
/// empty strings so that a template never fails on a missing field.
#[derive(Serialize)]
struct Context<'a> {
    tag: &'a str,
    string: &'a str,
    bounds: String,
    sidecar_key: &'a str,
    tsv_line: &'a str,
    definition: &'a str,
    parent_tag: &'a str,
    detail: &'a str,
}

fn template(kind: IssueKind) -> &'static str {
    match kind {
        IssueKind::UnclosedParenthesis => {
            "Opening parenthesis at {bounds} is never closed in \"{string}\"."
        }
        IssueKind::UnmatchedCloseParenthesis => {
            "Closing parenthesis at {bounds} has no matching opening parenthesis in \"{string}\"."
        }
        IssueKind::ExtraDelimiter => "Extra delimiter '{detail}' at {bounds} in \"{string}\".",
        IssueKind::EmptyGroup => "Empty tag group at {bounds} in \"{string}\".",
        IssueKind::CommaMissing => "Comma missing before or after \"{tag}\" at {bounds}.",
        IssueKind::LeadingSlash => "Tag \"{tag}\" begins with a slash.",
        IssueKind::TrailingSlash => "Tag \"{tag}\" ends with a slash.",
        IssueKind::ExtraSlash => "Tag \"{tag}\" contains an extra or blank slash at {bounds}.",
        IssueKind::InvalidCharacter => "Invalid character '{detail}' at {bounds} in \"{string}\".",
        IssueKind::InvalidPlaceholder => "Placeholder '#' misused in \"{tag}\". {detail}",
        IssueKind::InvalidTag => "Invalid tag \"{tag}\".",
        IssueKind::AmbiguousTag => {
            "Tag \"{tag}\" matches more than one schema node ({detail}); use a longer form."
        }
        IssueKind::InvalidParentNode => {
            "\"{tag}\" appears as a child of another node but is the schema node \"{parent_tag}\"."
        }
        IssueKind::InvalidExtension => {
            "Extension \"{detail}\" of \"{tag}\" is not allowed; \"{parent_tag}\" does not permit extension."
        }
        IssueKind::Extension => "Tag \"{tag}\" extends the schema with \"{detail}\".",
        IssueKind::DeprecatedTag => "Tag \"{tag}\" is deprecated.",
        IssueKind::ChildRequired => "Tag \"{tag}\" requires a child or value.",
        IssueKind::InvalidValue => "Value \"{detail}\" is not valid for tag \"{tag}\".",
        IssueKind::InvalidUnit => "Unit \"{detail}\" is not valid for tag \"{tag}\".",
        IssueKind::InvalidPlaceholderContext => {
            "Placeholder in \"{tag}\" is not allowed in this context."
        }
        IssueKind::MissingPlaceholder => "Value column annotation \"{string}\" has no placeholder.",
        IssueKind::IllegalDefinitionContext => {
            "Definition \"{definition}\" is not allowed in this context."
        }
        IssueKind::InvalidDefinitionGroupStructure => {
            "Definition group \"{string}\" is malformed. {detail}"
        }
        IssueKind::InvalidDefinitionForbidden => {
            "Definition \"{definition}\" contains a forbidden nested tag \"{tag}\"."
        }
        IssueKind::InvalidPlaceholderInDefinition => {
            "Definition \"{definition}\" has the wrong number of placeholders. {detail}"
        }
        IssueKind::ConflictingDefinitions => {
            "Definition \"{definition}\" was declared more than once with different contents."
        }
        IssueKind::MissingDefinitionForDef => "Def tag \"{tag}\" refers to an unknown definition.",
        IssueKind::MissingDefinitionForDefExpand => {
            "Def-expand tag \"{tag}\" refers to an unknown definition."
        }
        IssueKind::DefExpandContentsInvalid => {
            "Contents of \"{tag}\" do not match definition \"{definition}\"; expected \"{detail}\"."
        }
        IssueKind::RecursiveDefinition => {
            "Definition \"{definition}\" refers back to itself through \"{tag}\"."
        }
        IssueKind::DuplicateTag => "Tag \"{tag}\" is repeated in \"{string}\".",
        IssueKind::DuplicateGroup => "Group \"{tag}\" is repeated in \"{string}\".",
        IssueKind::InvalidTopLevelTagGroupTag => {
            "Tag \"{tag}\" must be in a tag group at the top level of the annotation."
        }
        IssueKind::TooManyGroupTopTags => {
            "Tag \"{tag}\" is one group-defining tag too many in \"{string}\"."
        }
        IssueKind::InvalidGroupTopTags => "Tag \"{tag}\" is used incorrectly in \"{string}\". {detail}",
        IssueKind::TemporalTagInNonTemporalContext => {
            "Temporal tag \"{tag}\" used where rows have no onsets."
        }
        IssueKind::InactiveOnset => {
            "\"{tag}\" for definition \"{definition}\" does not match an active onset."
        }
        IssueKind::SimultaneousDuplicateEvents => {
            "Definition \"{definition}\" is used by several temporal events at the same time (lines {tsv_line})."
        }
        IssueKind::InvalidOnset => "Onset value \"{detail}\" is neither a number nor n/a.",
        IssueKind::SidecarKeyMissing => {
            "Value \"{detail}\" of column \"{sidecar_key}\" has no annotation in the sidecar."
        }
        IssueKind::UnknownColumnSplice => {
            "Column splice \"{detail}\" in \"{sidecar_key}\" refers to an unknown column."
        }
        IssueKind::RecursiveColumnSplice => {
            "Column splice \"{detail}\" in \"{sidecar_key}\" refers to a column that itself contains splices."
        }
        IssueKind::InternalError => "Internal error: {detail}",
    }
}

/// Render the human readable text for an issue. This happens only at the
/// edge, when issues are displayed or serialized.
pub fn render_message(kind: IssueKind, parameters: &Parameters) -> String {
    let context = Context {
        tag: parameters
            .tag
            .as_deref()
            .unwrap_or(""),
        string: parameters
            .string
            .as_deref()
            .unwrap_or(""),
        bounds: match parameters.bounds {
            Some([start, end]) => format!("{}..{}", start, end),
            None => String::new(),
        },
        sidecar_key: parameters
            .sidecar_key
            .as_deref()
            .unwrap_or(""),
        tsv_line: parameters
            .tsv_line
            .as_deref()
            .unwrap_or(""),
        definition: parameters
            .definition
            .as_deref()
            .unwrap_or(""),
        parent_tag: parameters
            .parent_tag
            .as_deref()
            .unwrap_or(""),
        detail: parameters
            .detail
            .as_deref()
            .unwrap_or(""),
    };

    let mut tt = TinyTemplate::new();
    tt.set_default_formatter(&format_unescaped);

    let result = tt
        .add_template("message", template(kind))
        .and_then(|_| tt.render("message", &context));

    match result {
        Ok(text) => text
            .trim_ascii()
            .to_string(),
        Err(error) => {
            warn!(?error, "failed rendering message for {}", kind);
            kind.internal_code()
                .to_string()
        }
    }
}
