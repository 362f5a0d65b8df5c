use super::*;
use crate::schema::fixture;

fn kinds(issues: &[Issue]) -> Vec<IssueKind> {
    issues
        .iter()
        .map(|issue| issue.kind)
        .collect()
}

fn manager(texts: &[&str]) -> DefinitionManager<'static> {
    let (definitions, issues) = DefinitionManager::create_definitions(texts, fixture::standard());
    assert!(issues.is_empty(), "unexpected issues: {:?}", issues);

    let mut manager = DefinitionManager::new();
    let issues = manager.add_definitions(definitions);
    assert!(issues.is_empty(), "unexpected issues: {:?}", issues);
    manager
}

fn definition_issues(text: &str) -> Vec<IssueKind> {
    let (definitions, issues) = DefinitionManager::create_definitions(&[text], fixture::standard());
    assert!(definitions.is_empty());
    kinds(&issues)
}

fn parsed(text: &str) -> ParsedString<'static> {
    let result = parse(text, fixture::standard(), &ParseOptions::permissive());
    assert!(result.is_valid(), "unexpected issues: {:?}", result.errors);
    result
        .parsed
        .unwrap()
}

#[test]
fn creating_definitions() {
    let (definitions, issues) = DefinitionManager::create_definitions(
        &[
            "(Definition/MyColor, (Red))",
            "(Definition/Acc/#, (Acceleration/# m-per-s^2, Red)), (Definition/Empty)",
        ],
        fixture::standard(),
    );
    assert!(issues.is_empty());
    assert_eq!(definitions.len(), 3);

    assert_eq!(definitions[0].name(), "MyColor");
    assert!(!definitions[0].has_placeholder());
    assert!(definitions[1].has_placeholder());
    assert!(definitions[2]
        .content()
        .is_none());
    assert_eq!(definitions[2].normalized_content(), "()");
}

#[test]
fn malformed_definitions() {
    assert_eq!(
        definition_issues("(Definition/A, Red, (Blue))"),
        vec![IssueKind::InvalidDefinitionGroupStructure]
    );
    assert_eq!(
        definition_issues("(Definition/A, (Blue), (Red))"),
        vec![IssueKind::InvalidDefinitionGroupStructure]
    );

    // The nested marker is also misplaced, which parsing reports separately.
    let issues = definition_issues("(Definition/A, (Red, (Onset, Def/B)))");
    assert!(issues.contains(&IssueKind::InvalidDefinitionForbidden));
    assert!(issues.contains(&IssueKind::InvalidTopLevelTagGroupTag));
}

#[test]
fn placeholder_arity() {
    assert_eq!(
        definition_issues("(Definition/A/#, (Red))"),
        vec![IssueKind::InvalidPlaceholderInDefinition]
    );
    assert_eq!(
        definition_issues("(Definition/A, (Label/#))"),
        vec![IssueKind::InvalidPlaceholderInDefinition]
    );
    assert_eq!(
        definition_issues("(Definition/A/#, (Label/#, Speed/# mph))"),
        vec![IssueKind::InvalidPlaceholderInDefinition]
    );
    assert_eq!(
        definition_issues("(Definition/A/5, (Label/#))"),
        vec![IssueKind::InvalidPlaceholderInDefinition]
    );
}

#[test]
fn conflicting_definitions() {
    let schema = fixture::standard();
    let (first, _) = DefinitionManager::create_definitions(&["(Definition/MyColor, (Red, Blue))"], schema);
    let (same, _) = DefinitionManager::create_definitions(&["(Definition/mycolor, (Blue, Red))"], schema);
    let (other, _) = DefinitionManager::create_definitions(&["(Definition/MyColor, (Green))"], schema);

    let mut manager = DefinitionManager::new();
    assert!(manager
        .add_definitions(first)
        .is_empty());
    assert!(manager
        .add_definitions(same)
        .is_empty());
    assert_eq!(manager.len(), 1);

    let issues = manager.add_definitions(other);
    assert_eq!(kinds(&issues), vec![IssueKind::ConflictingDefinitions]);
    assert_eq!(
        issues[0]
            .parameters
            .definition
            .as_deref(),
        Some("MyColor")
    );
}

#[test]
fn expanding_with_a_value() {
    let schema = fixture::standard();
    let manager = manager(&["(Definition/Acc/#, (Acceleration/# m-per-s^2, Red))"]);

    let string = parsed("Def/Acc/5.4");
    let tag = string
        .tags()
        .next()
        .unwrap();
    let expansion = manager
        .evaluate_tag(tag, schema, false)
        .unwrap();
    assert_eq!(expansion.name(), "Acc");
    assert_eq!(expansion.render(Form::Short), "Acceleration/5.4 m-per-s^2,Red");

    assert!(manager
        .validate_defs(&string, schema, false)
        .is_empty());
}

#[test]
fn wrong_arity_is_missing() {
    let schema = fixture::standard();
    let manager = manager(&[
        "(Definition/Acc/#, (Acceleration/# m-per-s^2, Red))",
        "(Definition/MyColor, (Red))",
    ]);

    let issues = manager.validate_defs(&parsed("Def/Acc"), schema, false);
    assert_eq!(kinds(&issues), vec![IssueKind::MissingDefinitionForDef]);

    let issues = manager.validate_defs(&parsed("Def/MyColor/3"), schema, false);
    assert_eq!(kinds(&issues), vec![IssueKind::MissingDefinitionForDef]);

    let issues = manager.validate_defs(&parsed("Red, (Def/Unknown, Blue)"), schema, false);
    assert_eq!(kinds(&issues), vec![IssueKind::MissingDefinitionForDef]);
    assert_eq!(
        issues[0]
            .parameters
            .string
            .as_deref(),
        Some("Red, (Def/Unknown, Blue)")
    );
}

#[test]
fn bad_substitution() {
    let schema = fixture::standard();
    let manager = manager(&["(Definition/Acc/#, (Acceleration/# m-per-s^2, Red))"]);

    let issues = manager.validate_defs(&parsed("Def/Acc/fast"), schema, false);
    assert_eq!(kinds(&issues), vec![IssueKind::InvalidValue]);
}

#[test]
fn placeholders_at_call_site() {
    let schema = fixture::standard();
    let manager = manager(&["(Definition/Acc/#, (Acceleration/# m-per-s^2, Red))"]);
    let string = parsed("Def/Acc/#");

    assert!(manager
        .validate_defs(&string, schema, true)
        .is_empty());
    assert_eq!(
        kinds(&manager.validate_defs(&string, schema, false)),
        vec![IssueKind::InvalidPlaceholderContext]
    );
}

#[test]
fn recursive_definitions() {
    let schema = fixture::standard();
    let manager = manager(&[
        "(Definition/Loop, (Red, Def/Around))",
        "(Definition/Around, (Blue, Def/Loop))",
        "(Definition/Outer, (Green, Def/Inner))",
        "(Definition/Inner, (Circle))",
    ]);

    let issues = manager.validate_defs(&parsed("Def/Loop"), schema, false);
    assert_eq!(kinds(&issues), vec![IssueKind::RecursiveDefinition]);

    assert!(manager
        .validate_defs(&parsed("Def/Outer"), schema, false)
        .is_empty());
}

#[test]
fn def_expand_contents() {
    let schema = fixture::standard();
    let manager = manager(&["(Definition/Acc/#, (Acceleration/# m-per-s^2, Red))"]);

    let string = parsed("(Def-expand/Acc/5.4, (Red, Acceleration/5.4 m-per-s^2))");
    assert!(manager
        .validate_def_expands(&string, schema, false)
        .is_empty());

    let string = parsed("(Def-expand/Acc/5.4, (Acceleration/4.5 m-per-s^2, Red))");
    let issues = manager.validate_def_expands(&string, schema, false);
    assert_eq!(kinds(&issues), vec![IssueKind::DefExpandContentsInvalid]);
    assert_eq!(
        issues[0]
            .parameters
            .detail
            .as_deref(),
        Some("Acceleration/5.4 m-per-s^2,Red")
    );

    let string = parsed("(Def-expand/Nothing, (Red))");
    let issues = manager.validate_def_expands(&string, schema, false);
    assert_eq!(kinds(&issues), vec![IssueKind::MissingDefinitionForDefExpand]);
}

#[test]
fn definitions_are_not_references() {
    let schema = fixture::standard();
    let manager = DefinitionManager::new();
    let string = parsed("(Definition/Outer, (Def/Inner))");
    assert!(manager
        .validate_defs(&string, schema, true)
        .is_empty());
}
