//! Validation of whole files: a tab-separated event file with its merged
//! sidecar, or a standalone annotation string.

use tracing::{debug, info};

use crate::definitions::DefinitionManager;
use crate::language::ParsedString;
use crate::parsing::{check_structure, read, ParseOptions};
use crate::problem::{has_errors, Issue};
use crate::schema::Schema;
use crate::tabular::{assemble_rows, validate_sidecar, Sidecar, TabularFile};
use crate::temporal::{Onset, Row, TemporalEventManager};

/// Validates the files annotated by one sidecar. Every definition the
/// sidecar declares is registered on construction, so the validator itself
/// is read-only and files can be checked in any order.
#[derive(Debug)]
pub struct FileValidator<'s> {
    schema: &'s Schema,
    sidecar: Sidecar,
    definitions: DefinitionManager<'s>,
}

impl<'s> FileValidator<'s> {
    /// Check the sidecar and register its definitions. Problems with the
    /// sidecar are returned alongside the validator.
    pub fn new(schema: &'s Schema, sidecar: Sidecar) -> (FileValidator<'s>, Vec<Issue>) {
        let mut definitions = DefinitionManager::new();
        let (found, mut issues) = validate_sidecar(&sidecar, schema);

        if schema.generation() >= 3 {
            issues.extend(definitions.add_definitions(found));
        }

        info!("registered {} definitions", definitions.len());

        let validator = FileValidator {
            schema,
            sidecar,
            definitions,
        };
        (validator, issues)
    }

    pub fn definitions(&self) -> &DefinitionManager<'s> {
        &self.definitions
    }

    /// Validate every row of the file, then the relationships between rows.
    pub fn validate(&self, file: &TabularFile) -> Vec<Issue> {
        let schema = self.schema;
        let temporal = file.has_onsets() && schema.generation() >= 3;

        let (assembled, mut issues) = assemble_rows(file, &self.sidecar);
        let mut rows = Vec::new();

        for row in assembled {
            let line = row
                .line
                .to_string();
            let onset = row
                .onset
                .clone()
                .unwrap_or_else(|| "n/a".to_string());

            // rows sharing an onset are checked for repeats together
            let timed = temporal && matches!(onset.parse::<Onset>(), Ok(Onset::Time(_)));
            let options = ParseOptions {
                temporal_context: temporal,
                check_duplicates: !timed,
                ..ParseOptions::default()
            };

            let (parsed, found) = self.check(&row.text, &options);
            let clean = !has_errors(&found);
            issues.extend(
                found
                    .into_iter()
                    .map(|issue| issue.with_tsv_line(line.clone())),
            );

            if !temporal || !clean {
                continue;
            }
            if let Some(parsed) = parsed {
                rows.push(Row {
                    line: row.line,
                    onset,
                    parsed,
                });
            }
        }

        if temporal {
            let manager = TemporalEventManager::new();
            let (events, problems) = manager.parse_events(rows);
            issues.extend(problems);
            issues.extend(manager.validate(&events));
        }

        debug!(
            "validated {} rows with {} issues",
            file.rows()
                .len(),
            issues.len()
        );
        issues
    }

    /// Parse one assembled string and check its definition references, then
    /// its structure.
    fn check(&self, text: &str, options: &ParseOptions) -> (Option<ParsedString<'s>>, Vec<Issue>) {
        let schema = self.schema;
        let result = read(text, schema, options);

        let mut issues = result.errors;
        issues.extend(result.warnings);

        let Some(parsed) = result.parsed else {
            return (None, issues);
        };

        if !has_errors(&issues) && schema.generation() >= 3 {
            issues.extend(
                self.definitions
                    .validate_defs(&parsed, schema, options.allow_placeholders),
            );
            issues.extend(
                self.definitions
                    .validate_def_expands(&parsed, schema, options.allow_placeholders),
            );
        }

        if !has_errors(&issues) {
            issues.extend(check_structure(&parsed, schema, options));
        }

        (Some(parsed), issues)
    }
}

/// Validate a standalone string, which may declare the definitions it uses.
/// References to definitions are checked before reserved tags and repeats.
pub fn validate_string(text: &str, schema: &Schema, options: &ParseOptions) -> Vec<Issue> {
    let result = read(text, schema, options);
    let mut issues = result.errors;
    issues.extend(result.warnings);

    let Some(parsed) = result.parsed else {
        return issues;
    };
    if has_errors(&issues) {
        return issues;
    }

    if schema.generation() >= 3 {
        let mut definitions = DefinitionManager::new();
        let (found, problems) = DefinitionManager::create_definitions_from(&parsed);
        issues.extend(problems);
        issues.extend(definitions.add_definitions(found));

        issues.extend(definitions.validate_defs(&parsed, schema, options.allow_placeholders));
        issues.extend(definitions.validate_def_expands(&parsed, schema, options.allow_placeholders));
        if has_errors(&issues) {
            return issues;
        }
    }

    issues.extend(check_structure(&parsed, schema, options));
    issues
}

#[cfg(test)]
mod check {
    use super::*;
    use crate::problem::IssueKind;
    use crate::schema::fixture;

    fn kinds(issues: &[Issue]) -> Vec<IssueKind> {
        issues
            .iter()
            .map(|issue| issue.kind)
            .collect()
    }

    fn sidecar() -> Sidecar {
        Sidecar::from_json(
            r#"{
                "trial_type": {
                    "go": "Sensory-event, (Onset, Def/MyColor)",
                    "stop": "Sensory-event, (Offset, Def/MyColor)",
                    "plain": "Agent-action"
                },
                "speed": "Speed/# mph",
                "defs": {
                    "mycolor": "(Definition/MyColor, (Red))",
                    "acc": "(Definition/Acc/#, (Acceleration/# m-per-s^2, Blue))"
                }
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn sidecar_definitions_are_registered() {
        let (validator, issues) = FileValidator::new(fixture::standard(), sidecar());
        assert!(issues.is_empty(), "unexpected issues: {:?}", issues);
        assert_eq!(
            validator
                .definitions()
                .len(),
            2
        );
    }

    #[test]
    fn clean_file() {
        let (validator, _) = FileValidator::new(fixture::standard(), sidecar());
        let file = TabularFile::from_tsv(
            "onset\ttrial_type\tspeed\tHED\n\
             1.0\tgo\t5\tn/a\n\
             2.0\tplain\tn/a\tDef/Acc/2\n\
             3.0\tstop\tn/a\tn/a\n",
        );
        let issues = validator.validate(&file);
        assert!(issues.is_empty(), "unexpected issues: {:?}", issues);
    }

    #[test]
    fn row_issues_carry_lines() {
        let (validator, _) = FileValidator::new(fixture::standard(), sidecar());
        let file = TabularFile::from_tsv(
            "onset\ttrial_type\tHED\n\
             1.0\tplain\tDef/Missing\n\
             2.0\tplain\tBlah\n",
        );
        let issues = validator.validate(&file);
        assert_eq!(
            kinds(&issues),
            vec![IssueKind::MissingDefinitionForDef, IssueKind::InvalidTag]
        );
        assert_eq!(
            issues[0]
                .parameters
                .tsv_line
                .as_deref(),
            Some("2")
        );
        assert_eq!(
            issues[1]
                .parameters
                .tsv_line
                .as_deref(),
            Some("3")
        );
    }

    #[test]
    fn temporal_rows() {
        let (validator, _) = FileValidator::new(fixture::standard(), sidecar());
        let file = TabularFile::from_tsv(
            "onset\ttrial_type\n\
             1.0\tstop\n\
             2.0\tgo\n",
        );
        let issues = validator.validate(&file);
        assert_eq!(kinds(&issues), vec![IssueKind::InactiveOnset]);
    }

    #[test]
    fn same_time_rows_combined() {
        let (validator, _) = FileValidator::new(fixture::standard(), sidecar());
        let file = TabularFile::from_tsv(
            "onset\ttrial_type\n\
             1.0\tplain\n\
             1.0\tplain\n\
             2.0\tplain\n",
        );
        let issues = validator.validate(&file);
        assert_eq!(kinds(&issues), vec![IssueKind::DuplicateTag]);
        assert_eq!(
            issues[0]
                .parameters
                .tsv_line
                .as_deref(),
            Some("2, 3")
        );
    }

    #[test]
    fn files_without_onsets() {
        let (validator, _) = FileValidator::new(fixture::standard(), sidecar());
        let file = TabularFile::from_tsv(
            "trial_type\tHED\n\
             go\tn/a\n\
             plain\tRed, Red\n",
        );
        let issues = validator.validate(&file);
        assert_eq!(
            kinds(&issues),
            vec![
                IssueKind::TemporalTagInNonTemporalContext,
                IssueKind::DuplicateTag
            ]
        );
    }

    #[test]
    fn standalone_strings() {
        let schema = fixture::standard();
        let options = ParseOptions {
            allow_definitions: true,
            ..ParseOptions::default()
        };

        let issues = validate_string(
            "(Definition/Acc/#, (Acceleration/# m-per-s^2, Red)), Def/Acc/5.4",
            schema,
            &options,
        );
        assert!(issues.is_empty(), "unexpected issues: {:?}", issues);

        let issues = validate_string("Def/Acc", schema, &options);
        assert_eq!(kinds(&issues), vec![IssueKind::MissingDefinitionForDef]);
    }

    #[test]
    fn definitions_checked_before_repeats() {
        let schema = fixture::standard();
        let options = ParseOptions::default();

        let issues = validate_string("Red, Red, Def/Missing", schema, &options);
        assert_eq!(kinds(&issues), vec![IssueKind::MissingDefinitionForDef]);

        let issues = validate_string("Red, Red, Blue", schema, &options);
        assert_eq!(kinds(&issues), vec![IssueKind::DuplicateTag]);

        let (validator, _) = FileValidator::new(schema, sidecar());
        let file = TabularFile::from_tsv("HED\nRed, Red, Def/Missing\n");
        let issues = validator.validate(&file);
        assert_eq!(kinds(&issues), vec![IssueKind::MissingDefinitionForDef]);
    }

    #[test]
    fn files_in_parallel() {
        let schema = fixture::standard();
        let (validator, _) = FileValidator::new(schema, sidecar());
        let good = TabularFile::from_tsv("onset\ttrial_type\n1.0\tgo\n2.0\tstop\n");
        let bad = TabularFile::from_tsv("onset\tHED\n1.0\tBlah\n");

        let (first, second) = std::thread::scope(|scope| {
            let first = scope.spawn(|| validator.validate(&good));
            let second = scope.spawn(|| validator.validate(&bad));
            (
                first
                    .join()
                    .unwrap(),
                second
                    .join()
                    .unwrap(),
            )
        });

        assert!(first.is_empty());
        assert_eq!(kinds(&second), vec![IssueKind::InvalidTag]);
    }
}
