//! Tab-separated event files and the JSON sidecar which annotates their
//! columns. Each row's annotation is assembled from the contributions of its
//! cells before being parsed.

use serde::Deserialize;
use std::collections::{BTreeMap, HashMap, HashSet};
use tracing::{debug, trace};

use crate::definitions::{Definition, DefinitionManager};
use crate::parsing::{parse, ParseOptions};
use crate::problem::{Issue, IssueKind};
use crate::regex::*;
use crate::schema::Schema;

/// Name of the column holding a row's own annotation.
pub const HED_COLUMN: &str = "HED";

/// Name of the column holding each row's onset time.
pub const ONSET_COLUMN: &str = "onset";

/// How the sidecar annotates one column.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(untagged)]
pub enum SidecarEntry {
    /// A template whose `#` is replaced by the cell's value.
    Value(String),
    /// An annotation for each category the cell may hold.
    Categorical(BTreeMap<String, String>),
}

impl SidecarEntry {
    /// Every annotation string in the entry, with the category it belongs to.
    fn strings(&self) -> Vec<(Option<&str>, &str)> {
        match self {
            SidecarEntry::Value(template) => vec![(None, template.as_str())],
            SidecarEntry::Categorical(categories) => categories
                .iter()
                .map(|(category, string)| (Some(category.as_str()), string.as_str()))
                .collect(),
        }
    }

    fn has_splices(&self) -> bool {
        self.strings()
            .iter()
            .any(|(_, string)| splices(string).next().is_some())
    }
}

/// Column annotations, already merged from whatever sidecars apply to a file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(transparent)]
pub struct Sidecar {
    columns: BTreeMap<String, SidecarEntry>,
}

impl Sidecar {
    pub fn from_json(content: &str) -> Result<Sidecar, serde_json::Error> {
        serde_json::from_str(content)
    }

    pub fn get(&self, column: &str) -> Option<&SidecarEntry> {
        self.columns
            .get(column)
    }

    pub fn columns(&self) -> impl Iterator<Item = (&String, &SidecarEntry)> {
        self.columns
            .iter()
    }

    pub fn is_empty(&self) -> bool {
        self.columns
            .is_empty()
    }
}

impl FromIterator<(String, SidecarEntry)> for Sidecar {
    fn from_iter<I: IntoIterator<Item = (String, SidecarEntry)>>(iter: I) -> Self {
        Sidecar {
            columns: iter
                .into_iter()
                .collect(),
        }
    }
}

/// Column names referred to by `{column}` splices in an annotation.
fn splices(text: &str) -> impl Iterator<Item = &str> {
    regex!(r"\{([^{}]*)\}")
        .captures_iter(text)
        .filter_map(|captures| captures.get(1))
        .map(|name| {
            name.as_str()
                .trim()
        })
}

/// Check every annotation in the sidecar, and gather the definitions it
/// declares. Value templates need exactly one placeholder; categorical
/// annotations may not have any.
pub fn validate_sidecar<'s>(
    sidecar: &Sidecar,
    schema: &'s Schema,
) -> (Vec<Definition<'s>>, Vec<Issue>) {
    let mut definitions = Vec::new();
    let mut issues = Vec::new();

    for (key, entry) in sidecar.columns() {
        let placeholders = matches!(entry, SidecarEntry::Value(_));

        for (category, string) in entry.strings() {
            let located = |issue: Issue| issue.with_sidecar_key(key).or_string(string);

            if placeholders {
                let count = string
                    .matches('#')
                    .count();
                if count != 1 {
                    let kind = if count == 0 {
                        IssueKind::MissingPlaceholder
                    } else {
                        IssueKind::InvalidPlaceholder
                    };
                    issues.push(located(Issue::new(kind)));
                    continue;
                }
            }

            issues.extend(check_splices(sidecar, key, string));

            let options = ParseOptions {
                allow_definitions: true,
                allow_placeholders: placeholders,
                allow_splices: true,
                ..ParseOptions::default()
            };
            let result = parse(string, schema, &options);
            trace!("sidecar {} {:?}: {} issues", key, category, result.errors.len());

            issues.extend(
                result
                    .errors
                    .into_iter()
                    .chain(result.warnings)
                    .map(located),
            );

            if let Some(parsed) = result.parsed {
                let (found, problems) = DefinitionManager::create_definitions_from(&parsed);
                definitions.extend(found);
                issues.extend(
                    problems
                        .into_iter()
                        .map(located),
                );
            }
        }
    }

    debug!("sidecar declares {} definitions", definitions.len());
    (definitions, issues)
}

fn check_splices(sidecar: &Sidecar, key: &str, string: &str) -> Vec<Issue> {
    let mut issues = Vec::new();

    for name in splices(string) {
        let problem = match sidecar.get(name) {
            None if name == HED_COLUMN => continue,
            None => IssueKind::UnknownColumnSplice,
            Some(target) if target.has_splices() => IssueKind::RecursiveColumnSplice,
            Some(_) => continue,
        };
        issues.push(
            Issue::new(problem)
                .with_detail(name)
                .with_sidecar_key(key)
                .with_string(string),
        );
    }

    issues
}

/// The cells of a tab-separated file, by column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TabularFile {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl TabularFile {
    /// Rows are padded with empty cells, or cut, to the width of the headers.
    pub fn new(headers: Vec<String>, mut rows: Vec<Vec<String>>) -> TabularFile {
        for row in &mut rows {
            row.resize(headers.len(), String::new());
        }
        TabularFile { headers, rows }
    }

    /// Split tab-separated text into a header line and rows. Short rows are
    /// padded with empty cells.
    pub fn from_tsv(content: &str) -> TabularFile {
        let mut lines = content
            .lines()
            .filter(|line| {
                !line
                    .trim()
                    .is_empty()
            });

        let headers: Vec<String> = match lines.next() {
            Some(line) => line
                .split('\t')
                .map(|cell| {
                    cell.trim()
                        .to_string()
                })
                .collect(),
            None => Vec::new(),
        };

        let rows = lines
            .map(|line| {
                let mut cells: Vec<String> = line
                    .split('\t')
                    .map(|cell| {
                        cell.trim()
                            .to_string()
                    })
                    .collect();
                cells.resize(headers.len(), String::new());
                cells
            })
            .collect();

        TabularFile { headers, rows }
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn column(&self, name: &str) -> Option<usize> {
        self.headers
            .iter()
            .position(|header| header == name)
    }

    pub fn has_onsets(&self) -> bool {
        self.column(ONSET_COLUMN)
            .is_some()
    }
}

/// A row's annotation as assembled from its cells.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssembledRow {
    /// Line in the file; the header is line 1.
    pub line: usize,
    /// The onset cell, when the file has an onset column.
    pub onset: Option<String>,
    pub text: String,
}

/// Build each row's annotation from the sidecar and the row's `HED` column.
/// Columns spliced into another column's annotation contribute only there.
pub fn assemble_rows(file: &TabularFile, sidecar: &Sidecar) -> (Vec<AssembledRow>, Vec<Issue>) {
    let mut issues = Vec::new();
    let onset = file.column(ONSET_COLUMN);

    let spliced: HashSet<&str> = sidecar
        .columns()
        .flat_map(|(_, entry)| {
            entry
                .strings()
                .into_iter()
                .flat_map(|(_, string)| splices(string))
        })
        .collect();

    let rows = file
        .rows()
        .iter()
        .enumerate()
        .map(|(i, cells)| {
            let line = i + 2;
            let mut contributions: HashMap<&str, String> = HashMap::new();

            for (header, cell) in file
                .headers()
                .iter()
                .zip(cells)
            {
                if cell.is_empty() || cell.eq_ignore_ascii_case("n/a") {
                    continue;
                }
                let contribution = if header == HED_COLUMN {
                    cell.clone()
                } else {
                    match sidecar.get(header) {
                        Some(SidecarEntry::Value(template)) => template.replace('#', cell),
                        Some(SidecarEntry::Categorical(categories)) => match categories.get(cell) {
                            Some(string) => string.clone(),
                            None => {
                                issues.push(
                                    Issue::new(IssueKind::SidecarKeyMissing)
                                        .with_detail(cell)
                                        .with_sidecar_key(header)
                                        .with_tsv_line(line.to_string()),
                                );
                                continue;
                            }
                        },
                        None => continue,
                    }
                };
                contributions.insert(header, contribution);
            }

            let parts: Vec<String> = file
                .headers()
                .iter()
                .filter(|header| !spliced.contains(header.as_str()))
                .filter_map(|header| contributions.get(header.as_str()))
                .map(|contribution| splice(contribution, &contributions))
                .filter(|part| !part.is_empty())
                .collect();

            AssembledRow {
                line,
                onset: onset.and_then(|column| cells.get(column).cloned()),
                text: parts.join(", "),
            }
        })
        .collect();

    (rows, issues)
}

/// Replace each `{column}` with that column's contribution to the row,
/// dropping the separators around splices which contribute nothing.
fn splice(text: &str, contributions: &HashMap<&str, String>) -> String {
    if !text.contains('{') {
        return text.to_string();
    }

    let replaced = regex!(r"\{([^{}]*)\}").replace_all(text, |captures: &::regex::Captures| {
        let name = captures
            .get(1)
            .map(|name| {
                name.as_str()
                    .trim()
            })
            .unwrap_or_default();
        contributions
            .get(name)
            .cloned()
            .unwrap_or_default()
    });

    tidy(&replaced)
}

/// Remove separators left dangling by empty splices.
fn tidy(text: &str) -> String {
    let mut current = text.to_string();

    loop {
        let next = regex!(r",\s*,").replace_all(&current, ",");
        let next = regex!(r"\(\s*,\s*").replace_all(&next, "(");
        let next = regex!(r"\s*,\s*\)").replace_all(&next, ")");
        let next = regex!(r"\(\s*\)").replace_all(&next, "");
        let next = next.to_string();
        if next == current {
            break;
        }
        current = next;
    }

    current
        .trim_matches(|c: char| c == ',' || c.is_whitespace())
        .to_string()
}

#[cfg(test)]
mod check {
    use super::*;
    use crate::schema::fixture;

    fn sidecar(json: &str) -> Sidecar {
        Sidecar::from_json(json).unwrap()
    }

    fn kinds(issues: &[Issue]) -> Vec<IssueKind> {
        issues
            .iter()
            .map(|issue| issue.kind)
            .collect()
    }

    #[test]
    fn rows_fit_the_headers() {
        let file = TabularFile::new(
            vec!["HED".to_string(), "onset".to_string()],
            vec![
                vec!["Red".to_string()],
                vec!["Blue".to_string(), "1.0".to_string(), "extra".to_string()],
            ],
        );
        assert_eq!(file.rows()[0], ["Red", ""]);
        assert_eq!(file.rows()[1], ["Blue", "1.0"]);

        let (rows, issues) = assemble_rows(&file, &Sidecar::default());
        assert!(issues.is_empty());
        assert_eq!(rows[0].text, "Red");
        assert_eq!(rows[0].onset.as_deref(), Some(""));
        assert_eq!(rows[1].onset.as_deref(), Some("1.0"));
    }

    #[test]
    fn reading_sidecars() {
        let sidecar = sidecar(
            r#"{
                "speed": "Speed/# mph",
                "color": { "red": "Red", "blue": "Blue" }
            }"#,
        );
        assert_eq!(
            sidecar.get("speed"),
            Some(&SidecarEntry::Value("Speed/# mph".to_string()))
        );
        assert!(matches!(
            sidecar.get("color"),
            Some(SidecarEntry::Categorical(categories)) if categories.len() == 2
        ));
        assert!(Sidecar::from_json(r#"{ "speed": 5 }"#).is_err());
    }

    #[test]
    fn value_column_without_placeholder() {
        let sidecar = sidecar(r#"{ "speed": "Blue,Speed" }"#);
        let (_, issues) = validate_sidecar(&sidecar, fixture::standard());
        assert_eq!(kinds(&issues), vec![IssueKind::MissingPlaceholder]);
        assert_eq!(
            issues[0]
                .parameters
                .sidecar_key
                .as_deref(),
            Some("speed")
        );
    }

    #[test]
    fn placeholder_counts() {
        let schema = fixture::standard();

        let (_, issues) = validate_sidecar(&sidecar(r#"{ "speed": "Speed/# mph, Label/#" }"#), schema);
        assert_eq!(kinds(&issues), vec![IssueKind::InvalidPlaceholder]);

        let (_, issues) = validate_sidecar(&sidecar(r#"{ "color": { "red": "Label/#" } }"#), schema);
        assert_eq!(kinds(&issues), vec![IssueKind::InvalidPlaceholderContext]);

        let (_, issues) = validate_sidecar(&sidecar(r#"{ "speed": "Speed/# mph" }"#), schema);
        assert!(issues.is_empty());
    }

    #[test]
    fn definitions_in_sidecars() {
        let sidecar = sidecar(
            r#"{
                "defs": {
                    "mycolor": "(Definition/MyColor, (Red))",
                    "acc": "(Definition/Acc/#, (Acceleration/# m-per-s^2))"
                }
            }"#,
        );
        let (definitions, issues) = validate_sidecar(&sidecar, fixture::standard());
        assert!(issues.is_empty(), "unexpected issues: {:?}", issues);
        assert_eq!(definitions.len(), 2);
    }

    #[test]
    fn bad_splices() {
        let sidecar = sidecar(
            r#"{
                "event": { "go": "Sensory-event, {response}", "stop": "Sensory-event, {nothing}" },
                "response": { "left": "(Red, {side})" },
                "side": { "l": "Circle" }
            }"#,
        );
        let (_, issues) = validate_sidecar(&sidecar, fixture::standard());
        assert_eq!(
            kinds(&issues),
            vec![IssueKind::RecursiveColumnSplice, IssueKind::UnknownColumnSplice]
        );
        assert_eq!(
            issues[1]
                .parameters
                .detail
                .as_deref(),
            Some("nothing")
        );
    }

    #[test]
    fn reading_tsv() {
        let file = TabularFile::from_tsv("onset\tduration\tHED\n1.0\tn/a\tRed\n2.5\t1\n");
        assert_eq!(file.headers(), ["onset", "duration", "HED"]);
        assert_eq!(file.rows()[1], ["2.5", "1", ""]);
        assert!(file.has_onsets());
        assert_eq!(file.column("HED"), Some(2));
    }

    #[test]
    fn assembling_rows() {
        let sidecar = sidecar(
            r#"{
                "speed": "Speed/# mph",
                "color": { "red": "Red", "blue": "Blue" }
            }"#,
        );
        let file = TabularFile::from_tsv(
            "onset\tspeed\tcolor\tHED\n\
             1.0\t5\tred\tSensory-event\n\
             2.0\tn/a\tgreen\t\n",
        );

        let (rows, issues) = assemble_rows(&file, &sidecar);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].text, "Speed/5 mph, Red, Sensory-event");
        assert_eq!(rows[0].onset.as_deref(), Some("1.0"));
        assert_eq!(rows[0].line, 2);
        assert_eq!(rows[1].text, "");

        assert_eq!(kinds(&issues), vec![IssueKind::SidecarKeyMissing]);
        assert_eq!(
            issues[0]
                .parameters
                .tsv_line
                .as_deref(),
            Some("3")
        );
    }

    #[test]
    fn splicing_columns() {
        let sidecar = sidecar(
            r#"{
                "event": { "go": "Sensory-event, ({response}, Label/go)" },
                "response": "Speed/# mph"
            }"#,
        );
        let file = TabularFile::from_tsv("event\tresponse\ngo\t3\ngo\tn/a\n");

        let (rows, issues) = assemble_rows(&file, &sidecar);
        assert!(issues.is_empty());
        assert_eq!(rows[0].text, "Sensory-event, (Speed/3 mph, Label/go)");
        assert_eq!(rows[1].text, "Sensory-event, (Label/go)");
    }

    #[test]
    fn tidying() {
        assert_eq!(tidy("Red, , Blue"), "Red, Blue");
        assert_eq!(tidy("(, Red)"), "(Red)");
        assert_eq!(tidy("Red, ()"), "Red");
        assert_eq!(tidy(", Red,"), "Red");
    }
}
