//! Named, reusable annotations: `(Definition/Name, (...))` declares one, and
//! `Def/Name` or `(Def-expand/Name, (...))` refer to it.
//!
//! A [`DefinitionManager`] is filled in one phase and read in another; every
//! definition for a validation scope is registered before any string is
//! checked against them.

use std::collections::HashMap;
use tracing::{debug, trace};

use crate::formatting::render_string;
use crate::language::{Form, Group, Node, ParsedString, Tag};
use crate::parsing::{parse, ParseOptions};
use crate::problem::{InternalError, Issue, IssueKind};
use crate::schema::Schema;

/// Tags which may not appear inside a definition's content.
const FORBIDDEN: [&str; 4] = ["Definition", "Onset", "Offset", "Inset"];

#[derive(Debug, Clone)]
pub struct Definition<'s> {
    name: String,
    anchor: Tag<'s>,
    placeholder: bool,
    content: Option<Group<'s>>,
}

impl<'s> Definition<'s> {
    /// Build a definition from a `(Definition/Name[/#], (...))` group.
    pub fn from_group(group: &Group<'s>) -> Result<Definition<'s>, Vec<Issue>> {
        let malformed = |detail: &str| {
            Issue::new(IssueKind::InvalidDefinitionGroupStructure)
                .with_tag(group.original())
                .with_bounds(group.span())
                .with_detail(detail)
        };

        let mut anchors = group
            .tags()
            .filter(|tag| tag.is("Definition"));
        let anchor = match (anchors.next(), anchors.next()) {
            (Some(anchor), None) => anchor,
            (None, _) => return Err(vec![malformed("There is no Definition tag.")]),
            (Some(_), Some(_)) => {
                return Err(vec![malformed("There is more than one Definition tag.")])
            }
        };

        let split = match anchor.split_value() {
            Some(split) => split,
            None => {
                let error = InternalError::new(format!(
                    "definition anchor \"{}\" has no name",
                    anchor.original()
                ));
                return Err(vec![error.into_issue()]);
            }
        };
        let name = &split.name;

        if group
            .tags()
            .count()
            > 1
        {
            let issue = malformed("A definition may contain only its Definition tag and one group.");
            return Err(vec![issue.with_definition(name)]);
        }

        let mut groups = group.groups();
        let content = groups
            .next()
            .cloned();
        if groups
            .next()
            .is_some()
        {
            let issue = malformed("A definition may have at most one content group.");
            return Err(vec![issue.with_definition(name)]);
        }

        let placeholder = match split.value {
            None => false,
            Some(_) if split.has_placeholder() => true,
            Some(ref value) => {
                return Err(vec![Issue::new(IssueKind::InvalidPlaceholderInDefinition)
                    .with_tag(anchor.original())
                    .with_definition(name)
                    .with_bounds(anchor.span())
                    .with_detail(format!("\"{}\" is not a placeholder.", value))]);
            }
        };

        let mut issues = Vec::new();

        if let Some(content) = &content {
            for tag in content.all_tags() {
                if FORBIDDEN
                    .iter()
                    .any(|forbidden| tag.is(forbidden))
                {
                    issues.push(
                        Issue::new(IssueKind::InvalidDefinitionForbidden)
                            .with_tag(tag.original())
                            .with_definition(name)
                            .with_bounds(tag.span()),
                    );
                }
            }
        }

        let count = content
            .as_ref()
            .map(count_placeholders)
            .unwrap_or(0);
        let expected = if placeholder { 1 } else { 0 };
        if count != expected {
            issues.push(
                Issue::new(IssueKind::InvalidPlaceholderInDefinition)
                    .with_tag(anchor.original())
                    .with_definition(name)
                    .with_bounds(group.span())
                    .with_detail(format!("Expected {} but found {}.", expected, count)),
            );
        }

        if !issues.is_empty() {
            return Err(issues);
        }

        Ok(Definition {
            name: name.clone(),
            anchor: anchor.clone(),
            placeholder,
            content,
        })
    }

    /// The name as written in its declaration.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The name definitions are registered and looked up by.
    pub fn key(&self) -> String {
        self.name
            .to_lowercase()
    }

    pub fn anchor(&self) -> &Tag<'s> {
        &self.anchor
    }

    pub fn has_placeholder(&self) -> bool {
        self.placeholder
    }

    pub fn content(&self) -> Option<&Group<'s>> {
        self.content
            .as_ref()
    }

    /// Normalized content; equal for definitions which expand identically.
    pub fn normalized_content(&self) -> String {
        match &self.content {
            Some(group) => group
                .normalized()
                .to_string(),
            None => "()".to_string(),
        }
    }

    /// Text of the content with the placeholder replaced by `value`.
    fn substitute(&self, value: Option<&str>) -> String {
        let interior = match &self.content {
            Some(group) => group.interior(),
            None => return String::new(),
        };
        match value {
            Some(value) if self.placeholder => interior.replace('#', value),
            _ => interior.to_string(),
        }
    }
}

fn count_placeholders(group: &Group) -> usize {
    group
        .all_tags()
        .iter()
        .filter_map(|tag| tag.value())
        .map(|value| {
            value
                .matches('#')
                .count()
        })
        .sum()
}

/// A definition's content after substituting a call site's value.
#[derive(Debug)]
pub struct Expansion<'s> {
    name: String,
    parsed: ParsedString<'s>,
}

impl<'s> Expansion<'s> {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parsed(&self) -> &ParsedString<'s> {
        &self.parsed
    }

    /// Comparable with [`Group::normalized()`] of a literal expansion.
    pub fn normalized(&self) -> String {
        self.parsed
            .normalized()
    }

    pub fn render(&self, form: Form) -> String {
        render_string(&self.parsed, form)
    }
}

/// The definitions available to one validation scope, by lower-cased name.
#[derive(Debug, Default)]
pub struct DefinitionManager<'s> {
    definitions: HashMap<String, Definition<'s>>,
}

impl<'s> DefinitionManager<'s> {
    pub fn new() -> DefinitionManager<'s> {
        DefinitionManager {
            definitions: HashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.definitions
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.definitions
            .is_empty()
    }

    pub fn get(&self, name: &str) -> Option<&Definition<'s>> {
        self.definitions
            .get(&name.to_lowercase())
    }

    /// Extract the definitions declared in an already parsed string.
    pub fn create_definitions_from(parsed: &ParsedString<'s>) -> (Vec<Definition<'s>>, Vec<Issue>) {
        let mut definitions = Vec::new();
        let mut issues = Vec::new();

        for group in parsed.definition_groups() {
            match Definition::from_group(group) {
                Ok(definition) => definitions.push(definition),
                Err(found) => issues.extend(
                    found
                        .into_iter()
                        .map(|issue| issue.or_string(parsed.original())),
                ),
            }
        }

        (definitions, issues)
    }

    /// Parse each text and extract the definitions it declares.
    pub fn create_definitions(
        texts: &[&str],
        schema: &'s Schema,
    ) -> (Vec<Definition<'s>>, Vec<Issue>) {
        let options = ParseOptions {
            allow_definitions: true,
            allow_placeholders: true,
            ..ParseOptions::default()
        };

        let mut definitions = Vec::new();
        let mut issues = Vec::new();

        for text in texts {
            let result = parse(text, schema, &options);
            issues.extend(result.errors);
            issues.extend(result.warnings);

            if let Some(parsed) = result.parsed {
                let (found, problems) = DefinitionManager::create_definitions_from(&parsed);
                definitions.extend(found);
                issues.extend(problems);
            }
        }

        (definitions, issues)
    }

    /// Register a definition. A second definition of the same name is only
    /// accepted if it is equivalent to the first.
    pub fn add_definition(&mut self, definition: Definition<'s>) -> Result<(), Issue> {
        let key = definition.key();

        if let Some(existing) = self
            .definitions
            .get(&key)
        {
            if existing.placeholder == definition.placeholder
                && existing.normalized_content() == definition.normalized_content()
            {
                trace!("definition {} registered again", key);
                return Ok(());
            }
            return Err(Issue::new(IssueKind::ConflictingDefinitions)
                .with_tag(
                    definition
                        .anchor
                        .original(),
                )
                .with_definition(definition.name()));
        }

        debug!("registered definition {}", key);
        self.definitions
            .insert(key, definition);
        Ok(())
    }

    pub fn add_definitions(&mut self, definitions: Vec<Definition<'s>>) -> Vec<Issue> {
        definitions
            .into_iter()
            .filter_map(|definition| {
                self.add_definition(definition)
                    .err()
            })
            .collect()
    }

    /// Expand a `Def` or `Def-expand` tag by substituting its value into the
    /// definition's content and resolving the result against the schema.
    /// Definitions referred to from within the content are expanded too.
    pub fn evaluate_tag(
        &self,
        tag: &Tag<'s>,
        schema: &'s Schema,
        placeholder_allowed: bool,
    ) -> Result<Expansion<'s>, Vec<Issue>> {
        let mut visited = Vec::new();
        self.expand(tag, schema, placeholder_allowed, &mut visited)
    }

    fn expand(
        &self,
        tag: &Tag<'s>,
        schema: &'s Schema,
        placeholder_allowed: bool,
        visited: &mut Vec<String>,
    ) -> Result<Expansion<'s>, Vec<Issue>> {
        let missing = if tag.is("Def-expand") {
            IssueKind::MissingDefinitionForDefExpand
        } else {
            IssueKind::MissingDefinitionForDef
        };

        let split = tag
            .split_value()
            .ok_or_else(|| {
                vec![InternalError::new(format!(
                    "reference \"{}\" has no definition name",
                    tag.original()
                ))
                .into_issue()]
            })?;

        let problem = |kind: IssueKind| {
            vec![Issue::new(kind)
                .with_tag(tag.original())
                .with_definition(&split.name)
                .with_bounds(tag.span())]
        };

        let key = split
            .name
            .to_lowercase();
        let definition = match self
            .definitions
            .get(&key)
        {
            Some(definition) => definition,
            None => return Err(problem(missing)),
        };

        if definition.placeholder
            != split
                .value
                .is_some()
        {
            return Err(problem(missing));
        }

        if visited.contains(&key) {
            return Err(problem(IssueKind::RecursiveDefinition));
        }

        let value = split
            .value
            .as_deref();
        let placeholder = value == Some("#");
        if placeholder && !placeholder_allowed {
            return Err(problem(IssueKind::InvalidPlaceholderContext));
        }

        let text = definition.substitute(value);
        let options = ParseOptions {
            allow_placeholders: placeholder,
            check_duplicates: false,
            ..ParseOptions::default()
        };
        let result = parse(&text, schema, &options);
        if !result.is_valid() {
            return Err(result.errors);
        }
        let parsed = result
            .parsed
            .ok_or_else(|| {
                vec![InternalError::new(format!("expansion of \"{}\" was lost", tag.original()))
                    .into_issue()]
            })?;

        visited.push(key);
        for nested in parsed.all_tags() {
            if nested.is("Def") || nested.is("Def-expand") {
                if let Err(issues) = self.expand(nested, schema, placeholder_allowed, visited) {
                    return Err(issues
                        .into_iter()
                        .map(|issue| issue.or_string(&text))
                        .collect());
                }
            }
        }
        visited.pop();

        trace!("expanded {} to \"{}\"", tag.original(), text);

        Ok(Expansion {
            name: definition
                .name
                .clone(),
            parsed,
        })
    }

    /// Check every `Def` tag in the string refers to a known definition with
    /// the right number of values.
    pub fn validate_defs(
        &self,
        parsed: &ParsedString<'s>,
        schema: &'s Schema,
        placeholders_allowed: bool,
    ) -> Vec<Issue> {
        let mut issues = Vec::new();

        for tag in parsed.tags_outside_definitions() {
            if !tag.is("Def") {
                continue;
            }
            if let Err(found) = self.evaluate_tag(tag, schema, placeholders_allowed) {
                issues.extend(
                    found
                        .into_iter()
                        .map(|issue| issue.or_string(parsed.original())),
                );
            }
        }

        issues
    }

    /// Check every `(Def-expand/Name, (...))` group carries exactly what its
    /// definition expands to.
    pub fn validate_def_expands(
        &self,
        parsed: &ParsedString<'s>,
        schema: &'s Schema,
        placeholders_allowed: bool,
    ) -> Vec<Issue> {
        let mut issues = Vec::new();

        for group in expansion_groups(parsed) {
            let Some(tag) = group.find_tag("Def-expand") else {
                continue;
            };

            let expansion = match self.evaluate_tag(tag, schema, placeholders_allowed) {
                Ok(expansion) => expansion,
                Err(found) => {
                    issues.extend(
                        found
                            .into_iter()
                            .map(|issue| issue.or_string(parsed.original())),
                    );
                    continue;
                }
            };

            let literal = match group
                .groups()
                .next()
            {
                Some(content) => content
                    .normalized()
                    .to_string(),
                None => "()".to_string(),
            };

            if literal != expansion.normalized() {
                issues.push(
                    Issue::new(IssueKind::DefExpandContentsInvalid)
                        .with_tag(tag.original())
                        .with_definition(expansion.name())
                        .with_string(parsed.original())
                        .with_bounds(group.span())
                        .with_detail(expansion.render(Form::Short)),
                );
            }
        }

        issues
    }
}

/// Groups holding a `Def-expand` tag, outside any definition's content.
fn expansion_groups<'a, 's>(parsed: &'a ParsedString<'s>) -> Vec<&'a Group<'s>> {
    let mut result = Vec::new();
    collect_expansions(parsed.children(), &mut result);
    result
}

fn collect_expansions<'a, 's>(nodes: &'a [Node<'s>], result: &mut Vec<&'a Group<'s>>) {
    for node in nodes {
        if let Node::Group(group) = node {
            if group.has_tag("Definition") {
                continue;
            }
            if group.has_tag("Def-expand") {
                result.push(group);
            }
            collect_expansions(group.children(), result);
        }
    }
}

#[cfg(test)]
#[path = "checks/definitions.rs"]
mod check;
