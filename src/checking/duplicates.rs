//! Detect repeated tags and groups among siblings, irrespective of order.

use std::collections::{HashMap, HashSet};
use tracing::trace;

use crate::formatting::render_group;
use crate::language::{Form, Node, ParsedString};
use crate::problem::{Issue, IssueKind};

/// Report each distinct tag or group which appears more than once at the same
/// level of the string. A form repeated in several places is reported once,
/// at its first repetition.
pub fn check(parsed: &ParsedString) -> Vec<Issue> {
    let mut issues = Vec::new();
    let mut reported = HashSet::new();
    let text = parsed.original();

    check_siblings(parsed.children(), text, &mut reported, &mut issues);
    for group in parsed.all_groups() {
        check_siblings(group.children(), text, &mut reported, &mut issues);
    }

    issues
}

fn check_siblings(
    nodes: &[Node],
    text: &str,
    reported: &mut HashSet<String>,
    issues: &mut Vec<Issue>,
) {
    let mut seen: HashMap<String, usize> = HashMap::new();
    let mut order = Vec::new();

    for (i, node) in nodes
        .iter()
        .enumerate()
    {
        if let Node::Splice(_) = node {
            continue;
        }
        let key = node.normalized();
        let count = seen
            .entry(key.clone())
            .or_insert(0);
        *count += 1;
        if *count == 2 {
            order.push((key, i));
        }
    }

    for (key, i) in order {
        if !reported.insert(key.clone()) {
            continue;
        }
        trace!("repeated {}", key);
        let issue = match &nodes[i] {
            Node::Tag(tag) => Issue::new(IssueKind::DuplicateTag).with_tag(tag.long_form()),
            Node::Group(group) => {
                Issue::new(IssueKind::DuplicateGroup).with_tag(render_group(group, Form::Long))
            }
            Node::Splice(_) => continue,
        };
        issues.push(
            issue
                .with_string(text)
                .with_bounds(nodes[i].span()),
        );
    }
}

#[cfg(test)]
mod check {
    use super::*;
    use crate::parsing::{parse, ParseOptions};
    use crate::schema::fixture;

    fn duplicates(text: &str) -> Vec<Issue> {
        let options = ParseOptions {
            check_duplicates: false,
            ..ParseOptions::default()
        };
        let result = parse(text, fixture::standard(), &options);
        check(
            &result
                .parsed
                .unwrap(),
        )
    }

    #[test]
    fn repeated_tags() {
        let issues = duplicates("Red, Blue, red, Property/Sensory-property/Color/Red");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::DuplicateTag);
        assert_eq!(
            issues[0]
                .parameters
                .tag
                .as_deref(),
            Some("Property/Sensory-property/Color/Red")
        );
        assert_eq!(issues[0].parameters.bounds, Some([11, 14]));
    }

    #[test]
    fn distinct_values_are_not_repeats() {
        assert!(duplicates("Label/A, Label/B").is_empty());
        assert!(duplicates("Red, (Red)").is_empty());
    }

    #[test]
    fn repeated_groups_any_order() {
        let issues = duplicates("(Red, (Blue, Green)), ((Green, Blue), Red)");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::DuplicateGroup);
        assert_eq!(
            issues[0]
                .parameters
                .tag
                .as_deref(),
            Some("((Property/Sensory-property/Color/Green,Property/Sensory-property/Color/Blue),Property/Sensory-property/Color/Red)")
        );
    }

    #[test]
    fn repeats_in_several_groups() {
        let issues = duplicates("(Circle, (Red, Red)), (Circle, (Red, Red))");
        assert_eq!(
            issues
                .iter()
                .map(|issue| issue.kind)
                .collect::<Vec<_>>(),
            vec![IssueKind::DuplicateGroup, IssueKind::DuplicateTag]
        );

        let issues = duplicates("(Blue, (Red, Red)), (Green, Red, Red)");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::DuplicateTag);
    }

    #[test]
    fn nested_repeats() {
        let issues = duplicates("(Circle, (Red, Red))");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::DuplicateTag);
    }

    #[test]
    fn multiplicity_matters() {
        // (Red, Red) repeats within itself but is not the same as (Red)
        let issues = duplicates("(Red, Red), (Red)");
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::DuplicateTag);
    }

    #[test]
    fn one_issue_per_form() {
        let issues = duplicates("Red, Red, Red, Blue, Blue");
        assert_eq!(issues.len(), 2);
    }

    #[test]
    fn permutations_are_equivalent() {
        let schema = fixture::standard();
        let permutations = [
            "(Circle, (Red, Blue), Label/x)",
            "(Label/x, Circle, (Blue, Red))",
            "((Blue, Red), Label/x, Circle)",
            "(Circle, Label/x, (Red, Blue))",
        ];

        let normalized: Vec<String> = permutations
            .iter()
            .map(|text| {
                parse(text, schema, &ParseOptions::default())
                    .parsed
                    .unwrap()
                    .normalized()
            })
            .collect();

        for form in &normalized {
            assert_eq!(form, &normalized[0]);
        }

        let combined = permutations.join(", ");
        let issues = duplicates(&combined);
        assert_eq!(issues.len(), 1);
        assert_eq!(issues[0].kind, IssueKind::DuplicateGroup);
    }
}
