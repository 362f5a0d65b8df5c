//! Placement rules for the tags which give a group its meaning: Definition,
//! Def-expand, and the temporal markers.

use std::sync::OnceLock;

use crate::language::{Group, ParsedString, Tag};
use crate::problem::{Issue, IssueKind};

/// How one reserved tag may be used.
#[derive(Debug)]
struct Rule {
    name: &'static str,
    /// May not appear outside a group.
    requires_group: bool,
    /// Its group must be at the top level of the string.
    top_level_group: bool,
    /// Only legal in files with onsets.
    temporal: bool,
    /// Defines what its group is; a group may have only one such tag.
    defining: bool,
    /// Needs one of the defining temporal tags alongside it.
    needs_primary: bool,
    /// Other tags allowed directly in the group. `None` leaves the group's
    /// content to be checked elsewhere.
    companions: Option<&'static [&'static str]>,
    /// Content subgroups allowed, not counting Def-expand references.
    subgroups: Option<usize>,
    /// Exact number of Def or Def-expand references the group must carry.
    references: Option<usize>,
}

const RULES: &[Rule] = &[
    Rule {
        name: "Definition",
        requires_group: true,
        top_level_group: true,
        temporal: false,
        defining: true,
        needs_primary: false,
        companions: None,
        subgroups: None,
        references: None,
    },
    Rule {
        name: "Def-expand",
        requires_group: true,
        top_level_group: false,
        temporal: false,
        defining: true,
        needs_primary: false,
        companions: Some(&[]),
        subgroups: Some(1),
        references: None,
    },
    Rule {
        name: "Onset",
        requires_group: true,
        top_level_group: true,
        temporal: true,
        defining: true,
        needs_primary: false,
        companions: Some(&["Def", "Delay"]),
        subgroups: Some(1),
        references: Some(1),
    },
    Rule {
        name: "Inset",
        requires_group: true,
        top_level_group: true,
        temporal: true,
        defining: true,
        needs_primary: false,
        companions: Some(&["Def", "Delay"]),
        subgroups: Some(1),
        references: Some(1),
    },
    Rule {
        name: "Offset",
        requires_group: true,
        top_level_group: true,
        temporal: true,
        defining: true,
        needs_primary: false,
        companions: Some(&["Def", "Delay"]),
        subgroups: Some(0),
        references: Some(1),
    },
    Rule {
        name: "Duration",
        requires_group: true,
        top_level_group: true,
        temporal: true,
        defining: true,
        needs_primary: false,
        companions: Some(&["Def", "Delay"]),
        subgroups: Some(1),
        references: None,
    },
    Rule {
        name: "Delay",
        requires_group: true,
        top_level_group: true,
        temporal: true,
        defining: false,
        needs_primary: true,
        companions: None,
        subgroups: None,
        references: None,
    },
    Rule {
        name: "Event-context",
        requires_group: true,
        top_level_group: true,
        temporal: false,
        defining: true,
        needs_primary: false,
        companions: Some(&[]),
        subgroups: None,
        references: None,
    },
];

/// Whether the named schema node has placement rules of its own.
pub fn is_reserved(name: &str) -> bool {
    RULES
        .iter()
        .any(|rule| {
            rule.name
                .eq_ignore_ascii_case(name)
        })
}

/// An immutable table of placement rules. Independent of any schema, so one
/// instance can be shared by every validation.
#[derive(Debug)]
pub struct ReservedChecker {
    rules: &'static [Rule],
}

impl Default for ReservedChecker {
    fn default() -> Self {
        ReservedChecker::new()
    }
}

impl ReservedChecker {
    pub fn new() -> ReservedChecker {
        ReservedChecker { rules: RULES }
    }

    pub fn shared() -> &'static ReservedChecker {
        static CHECKER: OnceLock<ReservedChecker> = OnceLock::new();
        CHECKER.get_or_init(ReservedChecker::new)
    }

    fn rule(&self, tag: &Tag) -> Option<&'static Rule> {
        self.rules
            .iter()
            .find(|rule| tag.is(rule.name))
    }

    /// Check every group of the string, reporting at most one problem per
    /// group, plus any reserved tags used outside a group.
    pub fn check(&self, parsed: &ParsedString, temporal_context: bool) -> Vec<Issue> {
        let text = parsed.original();
        let mut issues = Vec::new();

        for tag in parsed.tags() {
            let Some(rule) = self.rule(tag) else {
                continue;
            };
            let kind = if rule.temporal && !temporal_context {
                IssueKind::TemporalTagInNonTemporalContext
            } else if rule.requires_group {
                IssueKind::InvalidTopLevelTagGroupTag
            } else {
                continue;
            };
            issues.push(
                Issue::new(kind)
                    .with_tag(tag.original())
                    .with_string(text)
                    .with_bounds(tag.span()),
            );
        }

        for group in parsed.groups() {
            self.check_group(group, true, temporal_context, text, &mut issues);
        }

        issues
    }

    fn check_group(
        &self,
        group: &Group,
        top: bool,
        temporal_context: bool,
        text: &str,
        issues: &mut Vec<Issue>,
    ) {
        if let Some(issue) = self.first_violation(group, top, temporal_context) {
            issues.push(issue.with_string(text));
        }

        for child in group.groups() {
            self.check_group(child, false, temporal_context, text, issues);
        }
    }

    fn first_violation(&self, group: &Group, top: bool, temporal_context: bool) -> Option<Issue> {
        let reserved: Vec<(&Tag, &Rule)> = group
            .tags()
            .filter_map(|tag| {
                self.rule(tag)
                    .map(|rule| (tag, rule))
            })
            .collect();

        if reserved.is_empty() {
            return None;
        }

        let offending = |kind: IssueKind, tag: &Tag| {
            Issue::new(kind)
                .with_tag(tag.original())
                .with_bounds(tag.span())
        };

        if !temporal_context {
            if let Some((tag, _)) = reserved
                .iter()
                .find(|(_, rule)| rule.temporal)
            {
                return Some(offending(IssueKind::TemporalTagInNonTemporalContext, tag));
            }
        }

        if !top {
            if let Some((tag, _)) = reserved
                .iter()
                .find(|(_, rule)| rule.top_level_group)
            {
                return Some(offending(IssueKind::InvalidTopLevelTagGroupTag, tag));
            }
        }

        let defining: Vec<&(&Tag, &Rule)> = reserved
            .iter()
            .filter(|(_, rule)| rule.defining)
            .collect();
        let delays: Vec<&(&Tag, &Rule)> = reserved
            .iter()
            .filter(|(_, rule)| rule.needs_primary)
            .collect();

        if defining.len() > 1 {
            return Some(offending(IssueKind::TooManyGroupTopTags, defining[1].0));
        }
        if delays.len() > 1 {
            return Some(offending(IssueKind::TooManyGroupTopTags, delays[1].0));
        }

        let Some((primary, rule)) = defining
            .first()
            .copied()
        else {
            let (delay, _) = delays[0];
            return Some(
                offending(IssueKind::InvalidGroupTopTags, delay)
                    .with_detail("Delay must accompany Onset, Offset, Inset, or Duration."),
            );
        };

        if let Some(companions) = rule.companions {
            for tag in group.tags() {
                if std::ptr::eq(tag, *primary) {
                    continue;
                }
                if !companions
                    .iter()
                    .any(|name| tag.is(name))
                {
                    return Some(
                        offending(IssueKind::InvalidGroupTopTags, tag)
                            .with_parent_tag(rule.name),
                    );
                }
            }
        }

        let references = group
            .tags()
            .filter(|tag| tag.is("Def"))
            .count()
            + group
                .groups()
                .filter(|child| child.has_tag("Def-expand"))
                .count();

        if let Some(expected) = rule.references {
            if references != expected {
                return Some(
                    offending(IssueKind::InvalidGroupTopTags, primary).with_detail(format!(
                        "{} must reference exactly {} definition, found {}.",
                        rule.name, expected, references
                    )),
                );
            }
        }

        if let Some(allowed) = rule.subgroups {
            let content = group
                .groups()
                .filter(|child| rule.references.is_none() || !child.has_tag("Def-expand"))
                .count();
            if content > allowed {
                return Some(
                    offending(IssueKind::InvalidGroupTopTags, primary).with_detail(format!(
                        "{} allows at most {} subgroup{}, found {}.",
                        rule.name,
                        allowed,
                        if allowed == 1 { "" } else { "s" },
                        content
                    )),
                );
            }
        }

        None
    }
}

#[cfg(test)]
mod check {
    use super::*;
    use crate::parsing::{parse, ParseOptions};
    use crate::schema::fixture;

    fn reserved(text: &str, temporal: bool) -> Vec<IssueKind> {
        let options = ParseOptions {
            allow_definitions: true,
            allow_placeholders: true,
            check_duplicates: false,
            ..ParseOptions::default()
        };
        let result = parse(text, fixture::standard(), &options);
        let parsed = result
            .parsed
            .unwrap();
        ReservedChecker::new()
            .check(&parsed, temporal)
            .into_iter()
            .map(|issue| issue.kind)
            .collect()
    }

    #[test]
    fn well_formed_groups() {
        assert!(reserved("(Definition/MyColor, (Red))", true).is_empty());
        assert!(reserved("(Onset, Def/MyColor)", true).is_empty());
        assert!(reserved("(Onset, Def/MyColor, (Red, Circle))", true).is_empty());
        assert!(reserved("(Offset, (Def-expand/MyColor, (Red)))", true).is_empty());
        assert!(reserved("(Delay/2 s, Onset, Def/MyColor)", true).is_empty());
        assert!(reserved("(Duration/2 s, (Red))", true).is_empty());
        assert!(reserved("Red, Def/MyColor, (Blue, Def/Other)", false).is_empty());
    }

    #[test]
    fn outside_groups() {
        assert_eq!(
            reserved("Red, Onset", true),
            vec![IssueKind::InvalidTopLevelTagGroupTag]
        );
        assert_eq!(
            reserved("Definition/MyColor", true),
            vec![IssueKind::InvalidTopLevelTagGroupTag]
        );
    }

    #[test]
    fn nested_too_deep() {
        assert_eq!(
            reserved("(Red, (Onset, Def/MyColor))", true),
            vec![IssueKind::InvalidTopLevelTagGroupTag]
        );
        assert!(reserved("(Onset, Def/X, (Def-expand/Y, (Red)))", true).len() == 1);
    }

    #[test]
    fn temporal_context() {
        assert_eq!(
            reserved("(Onset, Def/MyColor)", false),
            vec![IssueKind::TemporalTagInNonTemporalContext]
        );
        assert_eq!(
            reserved("Offset", false),
            vec![IssueKind::TemporalTagInNonTemporalContext]
        );
        assert!(reserved("(Definition/MyColor, (Red))", false).is_empty());
    }

    #[test]
    fn too_many() {
        assert_eq!(
            reserved("(Onset, Offset, Def/MyColor)", true),
            vec![IssueKind::TooManyGroupTopTags]
        );
        assert_eq!(
            reserved("(Onset, Delay/1 s, Delay/2 s, Def/MyColor)", true),
            vec![IssueKind::TooManyGroupTopTags]
        );
    }

    #[test]
    fn invalid_companions() {
        assert_eq!(
            reserved("(Onset, Def/MyColor, Red)", true),
            vec![IssueKind::InvalidGroupTopTags]
        );
        assert_eq!(
            reserved("(Onset, (Red))", true),
            vec![IssueKind::InvalidGroupTopTags]
        );
        assert_eq!(
            reserved("(Offset, Def/MyColor, (Red))", true),
            vec![IssueKind::InvalidGroupTopTags]
        );
        assert_eq!(
            reserved("(Delay/2 s, (Red))", true),
            vec![IssueKind::InvalidGroupTopTags]
        );
        assert_eq!(
            reserved("(Def-expand/MyColor, Red, (Blue))", true),
            vec![IssueKind::InvalidGroupTopTags]
        );
    }

    #[test]
    fn one_issue_per_group() {
        let issues = reserved("(Onset, Offset, Red), (Red, Onset)", true);
        assert_eq!(
            issues,
            vec![IssueKind::TooManyGroupTopTags, IssueKind::InvalidGroupTopTags]
        );
    }

    #[test]
    fn reserved_names() {
        assert!(is_reserved("onset"));
        assert!(is_reserved("Def-expand"));
        assert!(!is_reserved("Def"));
        assert!(!is_reserved("Red"));
    }
}
