//! Split a raw annotation string into a tree of untyped tags and groups.

use tracing::trace;

use crate::language::{validate_column_name, Span};
use crate::problem::{Issue, IssueKind};

/// Malformed input. All offsets are byte positions in the original string,
/// before any whitespace trimming.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParsingError {
    UnclosedParenthesis(usize),
    UnmatchedCloseParenthesis(usize),
    ExtraDelimiter(usize),
    EmptyGroup(Span),
    CommaMissing(Span),
    LeadingSlash(Span),
    TrailingSlash(Span),
    ExtraSlash(Span, usize),
    InvalidCharacter(usize, char),
    InvalidPlaceholder(Span, usize),
}

impl ParsingError {
    pub fn offset(&self) -> usize {
        match self {
            ParsingError::UnclosedParenthesis(offset) => *offset,
            ParsingError::UnmatchedCloseParenthesis(offset) => *offset,
            ParsingError::ExtraDelimiter(offset) => *offset,
            ParsingError::EmptyGroup(span) => span.start,
            ParsingError::CommaMissing(span) => span.start,
            ParsingError::LeadingSlash(span) => span.start,
            ParsingError::TrailingSlash(span) => span.end - 1,
            ParsingError::ExtraSlash(_, offset) => *offset,
            ParsingError::InvalidCharacter(offset, _) => *offset,
            ParsingError::InvalidPlaceholder(_, offset) => *offset,
        }
    }

    /// The part of the original string the error refers to.
    pub fn bounds(&self) -> Span {
        match self {
            ParsingError::EmptyGroup(span) | ParsingError::CommaMissing(span) => *span,
            ParsingError::InvalidCharacter(offset, c) => Span::new(*offset, offset + c.len_utf8()),
            _ => Span::at(self.offset()),
        }
    }

    /// The tag the error occurred in, where there is one.
    fn tag(&self) -> Option<Span> {
        match self {
            ParsingError::CommaMissing(span)
            | ParsingError::LeadingSlash(span)
            | ParsingError::TrailingSlash(span)
            | ParsingError::ExtraSlash(span, _)
            | ParsingError::InvalidPlaceholder(span, _) => Some(*span),
            _ => None,
        }
    }

    pub fn kind(&self) -> IssueKind {
        match self {
            ParsingError::UnclosedParenthesis(_) => IssueKind::UnclosedParenthesis,
            ParsingError::UnmatchedCloseParenthesis(_) => IssueKind::UnmatchedCloseParenthesis,
            ParsingError::ExtraDelimiter(_) => IssueKind::ExtraDelimiter,
            ParsingError::EmptyGroup(_) => IssueKind::EmptyGroup,
            ParsingError::CommaMissing(_) => IssueKind::CommaMissing,
            ParsingError::LeadingSlash(_) => IssueKind::LeadingSlash,
            ParsingError::TrailingSlash(_) => IssueKind::TrailingSlash,
            ParsingError::ExtraSlash(_, _) => IssueKind::ExtraSlash,
            ParsingError::InvalidCharacter(_, _) => IssueKind::InvalidCharacter,
            ParsingError::InvalidPlaceholder(_, _) => IssueKind::InvalidPlaceholder,
        }
    }

    /// Convert to a reportable issue against the string that was tokenized.
    pub fn to_issue(&self, original: &str) -> Issue {
        let mut issue = Issue::new(self.kind())
            .with_string(original)
            .with_bounds(self.bounds());

        if let Some(span) = self.tag() {
            if let Some(text) = original.get(span.start..span.end) {
                issue = issue.with_tag(text);
            }
        }

        match self {
            ParsingError::ExtraDelimiter(_) => issue.with_detail(","),
            ParsingError::InvalidCharacter(_, c) => issue.with_detail(c.to_string()),
            ParsingError::InvalidPlaceholder(_, _) => {
                issue.with_detail("A placeholder must be the whole of the final value segment.")
            }
            _ => issue,
        }
    }
}

/// One segment of a tag path, between slashes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Segment<'i> {
    pub text: &'i str,
    pub span: Span,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TagFragment<'i> {
    pub text: &'i str,
    pub span: Span,
    pub segments: Vec<Segment<'i>>,
}

impl TagFragment<'_> {
    pub fn has_placeholder(&self) -> bool {
        self.text
            .contains('#')
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupFragment<'i> {
    pub text: &'i str,
    pub span: Span,
    pub children: Vec<Fragment<'i>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpliceFragment<'i> {
    pub name: &'i str,
    pub span: Span,
}

/// A node of the untyped tree produced by the tokenizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Fragment<'i> {
    Tag(TagFragment<'i>),
    Group(GroupFragment<'i>),
    Splice(SpliceFragment<'i>),
}

/// Tokenize a complete annotation string.
pub fn tokenize(content: &str, splices: bool) -> Result<Vec<Fragment<'_>>, ParsingError> {
    let mut tokenizer = Tokenizer::new(content);
    tokenizer.allow_splices(splices);
    tokenizer.tokenize()
}

const FORBIDDEN: [char; 4] = ['[', ']', '~', '"'];
const BRACES: [char; 2] = ['{', '}'];

#[derive(Debug)]
pub struct Tokenizer<'i> {
    original: &'i str,
    source: &'i str,
    offset: usize,
    splices: bool,
}

impl<'i> Tokenizer<'i> {
    pub fn new(content: &'i str) -> Tokenizer<'i> {
        Tokenizer {
            original: content,
            source: content,
            offset: 0,
            splices: false,
        }
    }

    /// Whether `{column}` splices are accepted (sidecar annotations).
    pub fn allow_splices(&mut self, allow: bool) {
        self.splices = allow;
    }

    pub fn tokenize(&mut self) -> Result<Vec<Fragment<'i>>, ParsingError> {
        self.check_characters()?;
        self.check_parentheses()?;

        if self
            .source
            .trim()
            .is_empty()
        {
            return Ok(Vec::new());
        }

        let fragments = self.read_items()?;
        trace!("tokenized {} top level items", fragments.len());
        Ok(fragments)
    }

    /// Given a substring, fork a copy of the tokenizer state to process it.
    /// The offset of the new tokenizer is relative to this one's.
    fn subparser(&self, start: usize, content: &'i str) -> Tokenizer<'i> {
        Tokenizer {
            original: self.original,
            source: content,
            offset: self.offset + start,
            splices: self.splices,
        }
    }

    fn span(&self) -> Span {
        Span::new(self.offset, self.offset + self.source.len())
    }

    fn check_characters(&self) -> Result<(), ParsingError> {
        for (i, c) in self
            .source
            .char_indices()
        {
            if FORBIDDEN.contains(&c) || (c.is_control() && !c.is_ascii_whitespace()) {
                return Err(ParsingError::InvalidCharacter(self.offset + i, c));
            }
        }
        Ok(())
    }

    fn check_parentheses(&self) -> Result<(), ParsingError> {
        let mut stack = Vec::new();

        for (i, c) in self
            .source
            .char_indices()
        {
            match c {
                '(' => stack.push(i),
                ')' => {
                    if stack
                        .pop()
                        .is_none()
                    {
                        return Err(ParsingError::UnmatchedCloseParenthesis(self.offset + i));
                    }
                }
                _ => {}
            }
        }

        match stack.pop() {
            Some(i) => Err(ParsingError::UnclosedParenthesis(self.offset + i)),
            None => Ok(()),
        }
    }

    /// Read the comma separated items at this level. Parentheses are known
    /// to be balanced by the time we get here.
    fn read_items(&mut self) -> Result<Vec<Fragment<'i>>, ParsingError> {
        let chunks = split_top_level(self.source);
        let count = chunks.len();
        let mut fragments = Vec::with_capacity(count);

        for (n, (start, chunk)) in chunks
            .into_iter()
            .enumerate()
        {
            let trimmed = chunk.trim();

            if trimmed.is_empty() {
                // blame the comma following the blank, or if this was the last
                // item, the one before it.
                let comma = if n + 1 < count {
                    self.offset + start + chunk.len()
                } else {
                    self.offset + start - 1
                };
                return Err(ParsingError::ExtraDelimiter(comma));
            }

            let lead = chunk.len()
                - chunk
                    .trim_start()
                    .len();

            let mut inner = self.subparser(start + lead, trimmed);
            fragments.push(inner.read_item()?);
        }

        Ok(fragments)
    }

    fn read_item(&mut self) -> Result<Fragment<'i>, ParsingError> {
        let content = self.source;

        if content.starts_with('(') {
            return self.read_group();
        }

        if content.contains('(') {
            return Err(ParsingError::CommaMissing(self.span()));
        }

        if content.starts_with('{') {
            return self.read_splice();
        }

        self.read_tag()
    }

    fn read_group(&mut self) -> Result<Fragment<'i>, ParsingError> {
        let content = self.source;
        let close = matching_parenthesis(content)
            .ok_or(ParsingError::UnclosedParenthesis(self.offset))?;

        if close + 1 != content.len() {
            return Err(ParsingError::CommaMissing(self.span()));
        }

        let interior = &content[1..close];
        if interior
            .trim()
            .is_empty()
        {
            return Err(ParsingError::EmptyGroup(self.span()));
        }

        let mut inner = self.subparser(1, interior);
        let children = inner.read_items()?;

        Ok(Fragment::Group(GroupFragment {
            text: content,
            span: self.span(),
            children,
        }))
    }

    fn read_splice(&mut self) -> Result<Fragment<'i>, ParsingError> {
        let content = self.source;

        if !self.splices {
            return Err(ParsingError::InvalidCharacter(self.offset, '{'));
        }

        let name = match content
            .strip_prefix('{')
            .and_then(|rest| rest.strip_suffix('}'))
        {
            Some(name) => name,
            None => {
                // report the first stray brace, or the unclosed opening one
                let i = content[1..]
                    .find(&BRACES[..])
                    .map(|i| i + 1)
                    .unwrap_or(0);
                let c = content[i..]
                    .chars()
                    .next()
                    .unwrap_or('{');
                return Err(ParsingError::InvalidCharacter(self.offset + i, c));
            }
        };

        if validate_column_name(name.trim()).is_none() {
            let i = name
                .find(&BRACES[..])
                .map(|i| i + 1)
                .unwrap_or(0);
            let c = content[i..]
                .chars()
                .next()
                .unwrap_or('{');
            return Err(ParsingError::InvalidCharacter(self.offset + i, c));
        }

        Ok(Fragment::Splice(SpliceFragment {
            name: name.trim(),
            span: self.span(),
        }))
    }

    fn read_tag(&mut self) -> Result<Fragment<'i>, ParsingError> {
        let content = self.source;
        let span = self.span();

        if let Some(i) = content.find(&BRACES[..]) {
            let c = content[i..]
                .chars()
                .next()
                .unwrap_or('{');
            return Err(ParsingError::InvalidCharacter(self.offset + i, c));
        }

        let pieces: Vec<&str> = content
            .split('/')
            .collect();
        let last = pieces.len() - 1;

        let mut segments = Vec::with_capacity(pieces.len());
        let mut position = 0;

        for (n, piece) in pieces
            .iter()
            .enumerate()
        {
            let trimmed = piece.trim();

            if trimmed.is_empty() {
                if n == 0 {
                    return Err(ParsingError::LeadingSlash(span));
                } else if n == last {
                    return Err(ParsingError::TrailingSlash(span));
                } else {
                    // the slash closing this blank segment is the extra one
                    let slash = self.offset + position + piece.len();
                    return Err(ParsingError::ExtraSlash(span, slash));
                }
            }

            let lead = piece.len()
                - piece
                    .trim_start()
                    .len();
            let start = self.offset + position + lead;

            segments.push(Segment {
                text: trimmed,
                span: Span::new(start, start + trimmed.len()),
            });

            position += piece.len() + 1;
        }

        self.check_placeholder(&segments, span)?;

        Ok(Fragment::Tag(TagFragment {
            text: content,
            span,
            segments,
        }))
    }

    /// A placeholder must be the entire final segment of a path of more
    /// than one segment, optionally followed by a unit: `Speed/# mph`.
    fn check_placeholder(&self, segments: &[Segment<'i>], span: Span) -> Result<(), ParsingError> {
        let last = segments.len() - 1;

        for (n, segment) in segments
            .iter()
            .enumerate()
        {
            for (i, _) in segment
                .text
                .match_indices('#')
            {
                let legal = n == last
                    && n > 0
                    && i == 0
                    && (segment.text == "#"
                        || segment.text[1..].starts_with(char::is_whitespace))
                    && segment.text[1..]
                        .find('#')
                        .is_none();

                if !legal {
                    return Err(ParsingError::InvalidPlaceholder(span, segment.span.start + i));
                }
            }
        }
        Ok(())
    }
}

/// Split content at commas which are not inside parentheses, returning each
/// piece with its starting position.
fn split_top_level(content: &str) -> Vec<(usize, &str)> {
    let mut result = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;

    for (i, c) in content.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                result.push((start, &content[start..i]));
                start = i + 1;
            }
            _ => {}
        }
    }
    result.push((start, &content[start..]));

    result
}

/// Position of the parenthesis closing the one at the start of content.
fn matching_parenthesis(content: &str) -> Option<usize> {
    let mut depth = 0usize;

    for (i, c) in content.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
#[path = "checks/tokenizer.rs"]
mod check;
