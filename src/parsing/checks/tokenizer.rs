use super::*;

fn tags<'i>(fragments: &[Fragment<'i>]) -> Vec<&'i str> {
    fragments
        .iter()
        .filter_map(|fragment| match fragment {
            Fragment::Tag(tag) => Some(tag.text),
            _ => None,
        })
        .collect()
}

fn expect_error(content: &str, expected: ParsingError) {
    match tokenize(content, false) {
        Ok(fragments) => panic!(
            "Expected tokenizing to fail, but it succeeded for input '{}': {:?}",
            content, fragments
        ),
        Err(error) => assert_eq!(error, expected, "for input '{}'", content),
    }
}

#[test]
fn empty_and_blank() {
    assert_eq!(tokenize("", false), Ok(vec![]));
    assert_eq!(tokenize("   ", false), Ok(vec![]));
}

#[test]
fn flat_list() {
    let fragments = tokenize("Red, Blue ,Event/Sensory-event", false).unwrap();
    assert_eq!(tags(&fragments), vec!["Red", "Blue", "Event/Sensory-event"]);

    match &fragments[1] {
        Fragment::Tag(tag) => {
            assert_eq!(tag.span, Span::new(5, 9));
            assert_eq!(tag.segments.len(), 1);
        }
        _ => panic!("expected a tag"),
    }
}

#[test]
fn segments_and_offsets() {
    let fragments = tokenize("  Event / Sensory-event", false).unwrap();
    let tag = match &fragments[0] {
        Fragment::Tag(tag) => tag,
        _ => panic!("expected a tag"),
    };

    assert_eq!(tag.text, "Event / Sensory-event");
    assert_eq!(tag.span, Span::new(2, 23));
    assert_eq!(
        tag.segments,
        vec![
            Segment {
                text: "Event",
                span: Span::new(2, 7),
            },
            Segment {
                text: "Sensory-event",
                span: Span::new(10, 23),
            },
        ]
    );
}

#[test]
fn nested_groups() {
    let fragments = tokenize("A, (B, (C, D)), E", false).unwrap();
    assert_eq!(fragments.len(), 3);
    assert_eq!(tags(&fragments), vec!["A", "E"]);

    let group = match &fragments[1] {
        Fragment::Group(group) => group,
        _ => panic!("expected a group"),
    };
    assert_eq!(group.text, "(B, (C, D))");
    assert_eq!(group.span, Span::new(3, 14));
    assert_eq!(tags(&group.children), vec!["B"]);

    let inner = match &group.children[1] {
        Fragment::Group(group) => group,
        _ => panic!("expected a group"),
    };
    assert_eq!(inner.span, Span::new(7, 13));
    assert_eq!(tags(&inner.children), vec!["C", "D"]);
}

#[test]
fn deep_nesting() {
    let fragments = tokenize("((((A))))", false).unwrap();
    let mut current = &fragments;
    let mut depth = 0;
    while let Some(Fragment::Group(group)) = current.first() {
        current = &group.children;
        depth += 1;
    }
    assert_eq!(depth, 4);
    assert_eq!(tags(current), vec!["A"]);
}

#[test]
fn parentheses_mismatch() {
    expect_error("(A, B", ParsingError::UnclosedParenthesis(0));
    expect_error("A, (B, (C)", ParsingError::UnclosedParenthesis(3));
    expect_error("A), B", ParsingError::UnmatchedCloseParenthesis(1));
    expect_error("(A)), B", ParsingError::UnmatchedCloseParenthesis(3));
}

#[test]
fn extra_delimiters() {
    expect_error("A,,B", ParsingError::ExtraDelimiter(2));
    expect_error(",A", ParsingError::ExtraDelimiter(0));
    expect_error("A, ", ParsingError::ExtraDelimiter(1));
    expect_error("(A, ,B)", ParsingError::ExtraDelimiter(4));
}

#[test]
fn empty_group() {
    expect_error("A, ( )", ParsingError::EmptyGroup(Span::new(3, 6)));
}

#[test]
fn missing_commas() {
    expect_error("(A)B", ParsingError::CommaMissing(Span::new(0, 4)));
    expect_error("Red, A(B)", ParsingError::CommaMissing(Span::new(5, 9)));
}

#[test]
fn slashes() {
    expect_error("/Event", ParsingError::LeadingSlash(Span::new(0, 6)));
    expect_error("Red, Event/", ParsingError::TrailingSlash(Span::new(5, 11)));
    expect_error(
        "Event//Sensory-event",
        ParsingError::ExtraSlash(Span::new(0, 20), 6),
    );
    expect_error(
        "Event/ /Sensory-event",
        ParsingError::ExtraSlash(Span::new(0, 21), 7),
    );
}

#[test]
fn slash_error_offsets() {
    assert_eq!(
        ParsingError::TrailingSlash(Span::new(5, 11)).offset(),
        10
    );
    assert_eq!(
        ParsingError::LeadingSlash(Span::new(5, 11)).bounds(),
        Span::new(5, 6)
    );
}

#[test]
fn invalid_characters() {
    expect_error("Red, Bl~ue", ParsingError::InvalidCharacter(7, '~'));
    expect_error("Label/[x]", ParsingError::InvalidCharacter(6, '['));
    expect_error("Red\u{7}", ParsingError::InvalidCharacter(3, '\u{7}'));
    expect_error("Red, {column}", ParsingError::InvalidCharacter(5, '{'));
    expect_error("Red, Blue}", ParsingError::InvalidCharacter(9, '}'));
}

#[test]
fn whitespace_is_not_invalid() {
    let fragments = tokenize("Red,\n\tBlue", false).unwrap();
    assert_eq!(tags(&fragments), vec!["Red", "Blue"]);
}

#[test]
fn placeholders() {
    let fragments = tokenize("Label/#, Speed/# mph, Def/Acc/#", false).unwrap();
    assert_eq!(tags(&fragments), vec!["Label/#", "Speed/# mph", "Def/Acc/#"]);
    for fragment in &fragments {
        match fragment {
            Fragment::Tag(tag) => assert!(tag.has_placeholder()),
            _ => panic!("expected tags only"),
        }
    }

    expect_error("#", ParsingError::InvalidPlaceholder(Span::new(0, 1), 0));
    expect_error(
        "Label/a#",
        ParsingError::InvalidPlaceholder(Span::new(0, 8), 7),
    );
    expect_error(
        "Def/#/Acc",
        ParsingError::InvalidPlaceholder(Span::new(0, 9), 4),
    );
    expect_error(
        "Label/##",
        ParsingError::InvalidPlaceholder(Span::new(0, 8), 6),
    );
}

#[test]
fn column_splices() {
    let fragments = tokenize("Red, {response_time}, ({trial}, Blue)", true).unwrap();
    match &fragments[1] {
        Fragment::Splice(splice) => {
            assert_eq!(splice.name, "response_time");
            assert_eq!(splice.span, Span::new(5, 20));
        }
        _ => panic!("expected a splice"),
    }

    let result = tokenize("Red, {response time}", true);
    assert_eq!(result, Err(ParsingError::InvalidCharacter(5, '{')));

    let result = tokenize("Red, {a}b", true);
    assert_eq!(result, Err(ParsingError::InvalidCharacter(7, '}')));
}

#[test]
fn errors_become_issues() {
    let content = "Red, Event/";
    let error = tokenize(content, false).unwrap_err();
    let issue = error.to_issue(content);

    assert_eq!(issue.kind, IssueKind::TrailingSlash);
    assert_eq!(
        issue
            .parameters
            .tag
            .as_deref(),
        Some("Event/")
    );
    assert_eq!(issue.parameters.bounds, Some([10, 11]));
    assert_eq!(
        issue
            .parameters
            .string
            .as_deref(),
        Some(content)
    );
}
