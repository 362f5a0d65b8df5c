use std::fs;
use std::sync::OnceLock;

use hedcheck::problem::{Issue, IssueKind};
use hedcheck::schema::Schema;

mod files;
mod sidecars;

pub fn schema() -> &'static Schema {
    static SCHEMA: OnceLock<Schema> = OnceLock::new();
    SCHEMA.get_or_init(|| {
        let content = fs::read_to_string("tests/schemas/standard.json")
            .expect("Failed to read fixture schema");
        Schema::from_json(&content).expect("Failed to build fixture schema")
    })
}

pub fn kinds(issues: &[Issue]) -> Vec<IssueKind> {
    issues
        .iter()
        .map(|issue| issue.kind)
        .collect()
}

/// Assert exactly one issue of the given kind was reported, and return it.
pub fn expect_issue(issues: &[Issue], kind: IssueKind) -> &Issue {
    assert_eq!(kinds(issues), vec![kind], "issues: {:#?}", issues);
    &issues[0]
}

pub fn expect_clean(issues: &[Issue]) {
    assert!(issues.is_empty(), "unexpected issues: {:#?}", issues);
}
