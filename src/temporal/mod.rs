//! Pairing of temporal markers across the rows of one file.
//!
//! An `(Onset, Def/Name, ...)` group opens an interval for its definition at
//! the row's onset time; `Offset` closes it and `Inset` marks a point inside
//! it. Rows must be supplied in file order.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::str::FromStr;
use tracing::{debug, trace};

use crate::checking::duplicates;
use crate::language::{validate_number, Group, ParsedString, Span, Tag};
use crate::problem::{InternalError, Issue, IssueKind};

/// The onset column of a row.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Onset {
    /// Seconds from the start of the recording.
    Time(f64),
    NotApplicable,
}

impl Onset {
    pub fn time(&self) -> Option<f64> {
        match self {
            Onset::Time(time) => Some(*time),
            Onset::NotApplicable => None,
        }
    }
}

impl FromStr for Onset {
    type Err = Issue;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("n/a") {
            return Ok(Onset::NotApplicable);
        }
        match validate_number(s) {
            Some(time) if time.is_finite() => Ok(Onset::Time(time)),
            _ => Err(Issue::new(IssueKind::InvalidOnset).with_detail(s)),
        }
    }
}

impl fmt::Display for Onset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Onset::Time(time) => write!(f, "{}", time),
            Onset::NotApplicable => write!(f, "n/a"),
        }
    }
}

/// One row of a file as handed to the temporal checks: where it is, the text
/// of its onset cell, and its assembled annotation.
#[derive(Debug, Clone)]
pub struct Row<'s> {
    pub line: usize,
    pub onset: String,
    pub parsed: ParsedString<'s>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkerKind {
    Onset,
    Offset,
    Inset,
}

impl MarkerKind {
    fn from_group(group: &Group) -> Option<(MarkerKind, &'static str)> {
        [
            (MarkerKind::Onset, "Onset"),
            (MarkerKind::Offset, "Offset"),
            (MarkerKind::Inset, "Inset"),
        ]
        .into_iter()
        .find(|(_, name)| group.has_tag(name))
    }
}

/// A temporal group within a row, reduced to what pairing needs.
#[derive(Debug, Clone)]
pub struct Marker {
    pub kind: MarkerKind,
    /// Identity of the referenced definition, including its parameter.
    pub key: String,
    /// The definition's name as written.
    pub name: String,
    /// Seconds by which a `Delay` tag defers the marker. Reported to callers
    /// through [`Event::effective_time`]; pairing goes by row onsets alone.
    pub delay: Option<f64>,
    /// Text of the marker tag, for reporting.
    pub tag: String,
    pub span: Span,
}

/// A row with a usable onset, and the temporal markers found in it.
#[derive(Debug, Clone)]
pub struct Event<'s> {
    pub line: usize,
    pub onset: Onset,
    pub parsed: ParsedString<'s>,
    pub markers: Vec<Marker>,
}

impl<'s> Event<'s> {
    /// When the marker takes effect, after any delay. Not used for pairing,
    /// which compares the onsets of the rows markers appear in.
    pub fn effective_time(&self, marker: &Marker) -> Option<f64> {
        self.onset
            .time()
            .map(|time| time + marker.delay.unwrap_or(0.0))
    }
}

/// Bookkeeping for one open interval.
#[derive(Debug)]
struct Interval {
    time: f64,
    line: usize,
}

#[derive(Debug, Default)]
pub struct TemporalEventManager;

impl TemporalEventManager {
    pub fn new() -> TemporalEventManager {
        TemporalEventManager
    }

    /// Turn rows into events. Rows with an unreadable onset are reported and
    /// left out; a row whose markers cannot be read is reported on its own.
    pub fn parse_events<'s>(&self, rows: Vec<Row<'s>>) -> (Vec<Event<'s>>, Vec<Issue>) {
        let mut events = Vec::with_capacity(rows.len());
        let mut issues = Vec::new();

        for row in rows {
            let onset = match row
                .onset
                .parse::<Onset>()
            {
                Ok(onset) => onset,
                Err(issue) => {
                    issues.push(issue.with_tsv_line(row.line.to_string()));
                    continue;
                }
            };

            let markers = match markers(&row.parsed) {
                Ok(markers) => markers,
                Err(error) => {
                    issues.push(
                        error
                            .into_issue()
                            .with_string(row.parsed.original())
                            .with_tsv_line(row.line.to_string()),
                    );
                    continue;
                }
            };

            trace!("line {} has {} temporal markers", row.line, markers.len());

            events.push(Event {
                line: row.line,
                onset,
                parsed: row.parsed,
                markers,
            });
        }

        (events, issues)
    }

    /// Check that markers pair up across events, that events at the same time
    /// do not reuse a definition, and that their combined annotation has no
    /// repeats. Events without an onset time take no part.
    pub fn validate(&self, events: &[Event]) -> Vec<Issue> {
        let mut issues = Vec::new();

        issues.extend(self.check_pairing(events));
        for (time, bucket) in simultaneous(events) {
            trace!("{} events at {}", bucket.len(), time);
            issues.extend(check_simultaneous(&bucket));
            issues.extend(check_union(&bucket));
        }

        debug!("temporal validation found {} issues", issues.len());
        issues
    }

    /// Intervals open and close in row order, at row onset times. A delayed
    /// marker still counts from its row's onset.
    fn check_pairing(&self, events: &[Event]) -> Vec<Issue> {
        let mut open: HashMap<String, Interval> = HashMap::new();
        let mut issues = Vec::new();

        for event in events {
            let Onset::Time(time) = event.onset else {
                continue;
            };

            for marker in &event.markers {
                let inactive = || {
                    Issue::new(IssueKind::InactiveOnset)
                        .with_tag(&marker.tag)
                        .with_definition(&marker.name)
                        .with_string(event.parsed.original())
                        .with_bounds(marker.span)
                        .with_tsv_line(event.line.to_string())
                };

                match marker.kind {
                    MarkerKind::Onset => {
                        if let Some(previous) = open.get(&marker.key) {
                            if previous.time > time {
                                issues.push(inactive());
                                continue;
                            }
                        }
                        debug!("opened {} at {}", marker.key, time);
                        open.insert(
                            marker
                                .key
                                .clone(),
                            Interval {
                                time,
                                line: event.line,
                            },
                        );
                    }
                    MarkerKind::Offset => match open.get(&marker.key) {
                        Some(interval) if interval.time <= time => {
                            debug!(
                                "closed {} opened on line {} at {}",
                                marker.key, interval.line, time
                            );
                            open.remove(&marker.key);
                        }
                        _ => issues.push(inactive()),
                    },
                    MarkerKind::Inset => match open.get(&marker.key) {
                        Some(interval) if interval.time <= time => {}
                        _ => issues.push(inactive()),
                    },
                }
            }
        }

        issues
    }
}

/// Events grouped by identical onset time, in order of first appearance.
fn simultaneous<'a, 's>(events: &'a [Event<'s>]) -> Vec<(f64, Vec<&'a Event<'s>>)> {
    let mut buckets: Vec<(f64, Vec<&Event>)> = Vec::new();
    let mut index: HashMap<u64, usize> = HashMap::new();

    for event in events {
        let Onset::Time(time) = event.onset else {
            continue;
        };
        // -0.0 and 0.0 are the same instant
        let bits = (time + 0.0).to_bits();
        match index.get(&bits) {
            Some(&i) => buckets[i]
                .1
                .push(event),
            None => {
                index.insert(bits, buckets.len());
                buckets.push((time, vec![event]));
            }
        }
    }

    buckets
}

fn check_simultaneous(bucket: &[&Event]) -> Vec<Issue> {
    let mut users: BTreeMap<&str, (&str, Vec<usize>, usize)> = BTreeMap::new();

    for event in bucket {
        for marker in &event.markers {
            let entry = users
                .entry(
                    marker
                        .key
                        .as_str(),
                )
                .or_insert((
                    marker
                        .name
                        .as_str(),
                    Vec::new(),
                    0,
                ));
            entry.2 += 1;
            if !entry
                .1
                .contains(&event.line)
            {
                entry
                    .1
                    .push(event.line);
            }
        }
    }

    users
        .into_values()
        .filter(|(_, _, count)| *count > 1)
        .map(|(name, lines, _)| {
            let lines = lines
                .iter()
                .map(|line| line.to_string())
                .collect::<Vec<_>>()
                .join(", ");
            Issue::new(IssueKind::SimultaneousDuplicateEvents)
                .with_definition(name)
                .with_tsv_line(lines)
        })
        .collect()
}

fn check_union(bucket: &[&Event]) -> Vec<Issue> {
    let parts: Vec<&ParsedString> = bucket
        .iter()
        .map(|event| &event.parsed)
        .collect();
    let lines = bucket
        .iter()
        .map(|event| {
            event
                .line
                .to_string()
        })
        .collect::<Vec<_>>()
        .join(", ");

    let combined = ParsedString::union(&parts);
    duplicates::check(&combined)
        .into_iter()
        .map(|mut issue| {
            // positions only make sense within a single contributing row
            if bucket.len() > 1 {
                issue
                    .parameters
                    .bounds = None;
            }
            issue.with_tsv_line(lines.clone())
        })
        .collect()
}

/// Read the temporal groups at the top level of a row.
fn markers(parsed: &ParsedString) -> Result<Vec<Marker>, InternalError> {
    let mut result = Vec::new();

    for group in parsed.groups() {
        let Some((kind, name)) = MarkerKind::from_group(group) else {
            continue;
        };
        let Some(anchor) = group.find_tag(name) else {
            continue;
        };
        // groups without exactly one reference are reported by the placement
        // rules; there is nothing to pair them with
        let Some(reference) = reference(group) else {
            continue;
        };

        let split = reference
            .split_value()
            .ok_or_else(|| {
                InternalError::new(format!(
                    "reference \"{}\" has no definition name",
                    reference.original()
                ))
            })?;

        let delay = match group.find_tag("Delay") {
            Some(tag) => Some(delay(tag)?),
            None => None,
        };

        result.push(Marker {
            kind,
            key: split.identity(),
            name: split
                .name
                .clone(),
            delay,
            tag: anchor
                .original()
                .to_string(),
            span: group.span(),
        });
    }

    Ok(result)
}

fn reference<'a, 's>(group: &'a Group<'s>) -> Option<&'a Tag<'s>> {
    group
        .find_tag("Def")
        .or_else(|| {
            group
                .groups()
                .find_map(|child| child.find_tag("Def-expand"))
        })
}

/// Seconds of a `Delay/<number> [unit]` tag. The resolver has already
/// checked the number and unit.
fn delay(tag: &Tag) -> Result<f64, InternalError> {
    let broken = || InternalError::new(format!("unreadable delay \"{}\"", tag.original()));

    let value = tag
        .value()
        .ok_or_else(broken)?;
    let (number, unit) = match value.split_once(char::is_whitespace) {
        Some((number, unit)) => (number, unit.trim()),
        None => (value, "s"),
    };
    let number = validate_number(number).ok_or_else(broken)?;

    let scale = match unit {
        "s" => 1.0,
        "ms" => 0.001,
        "minute" => 60.0,
        "hour" => 3600.0,
        _ => return Err(broken()),
    };

    Ok(number * scale)
}
