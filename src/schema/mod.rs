//! The vocabulary a string is validated against: a tree of tag nodes with
//! attributes, plus the unit classes values may be measured in.
//!
//! Acquiring schemas (from disk, network, or a cache) happens elsewhere; here a
//! schema is an immutable value, built once and then shared by reference by any
//! number of validations, on any number of threads.

use serde::Deserialize;
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

mod resolver;

pub use resolver::canonicalize;
pub(crate) use resolver::resolve;

/// Per-node behaviour flags.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Attributes {
    /// The segment after this node is a value, never looked up in the schema.
    pub takes_value: bool,
    /// The value has up to two segments, a name and a parameter, as in
    /// `Def/Acc/5.4`.
    pub two_level_value: bool,
    /// Arbitrary further segments may follow this node. Inherited by all
    /// descendants.
    pub extension_allowed: bool,
    /// The node may not be used bare.
    pub require_child: bool,
    pub deprecated: bool,
    /// Name of the unit class a numeric value is measured in.
    pub unit_class: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchemaEntry {
    /// Index of this entry within its schema.
    pub id: usize,
    /// The node's own name, `Sensory-event`.
    pub name: String,
    /// Path from the root, `Event/Sensory-event`.
    pub long_name: String,
    /// Shortest trailing part of the path which resolves back to this node.
    /// The node's own name unless another node shares it, as in
    /// `Data-marker/Marker`.
    pub short_name: String,
    pub parent: Option<usize>,
    pub attributes: Attributes,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UnitClass {
    pub name: String,
    pub units: Vec<String>,
    #[serde(default)]
    pub default_unit: Option<String>,
}

impl UnitClass {
    pub fn has_unit(&self, unit: &str) -> bool {
        self.units
            .iter()
            .any(|candidate| candidate == unit)
    }
}

/// Result of looking a node up by its short name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Lookup<'s> {
    Unique(&'s SchemaEntry),
    Ambiguous(Vec<&'s SchemaEntry>),
    Missing,
}

#[derive(Debug)]
pub enum SchemaError {
    Json(serde_json::Error),
    InvalidName(String),
    UnknownUnitClass(String, String),
    UnsupportedGeneration(u8),
}

impl fmt::Display for SchemaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchemaError::Json(error) => write!(f, "malformed schema description: {}", error),
            SchemaError::InvalidName(name) => write!(f, "invalid schema node name \"{}\"", name),
            SchemaError::UnknownUnitClass(node, class) => {
                write!(f, "node \"{}\" refers to unknown unit class \"{}\"", node, class)
            }
            SchemaError::UnsupportedGeneration(generation) => {
                write!(f, "unsupported schema generation {}", generation)
            }
        }
    }
}

impl std::error::Error for SchemaError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SchemaError::Json(error) => Some(error),
            _ => None,
        }
    }
}

impl From<serde_json::Error> for SchemaError {
    fn from(error: serde_json::Error) -> Self {
        SchemaError::Json(error)
    }
}

// The description a schema is built from. Nodes nest through `children`.

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SchemaDocument {
    version: String,
    #[serde(default)]
    library: Option<String>,
    #[serde(default = "default_generation")]
    generation: u8,
    #[serde(default)]
    unit_classes: Vec<UnitClass>,
    tags: Vec<NodeDocument>,
}

fn default_generation() -> u8 {
    3
}

#[derive(Debug, Deserialize)]
struct NodeDocument {
    name: String,
    #[serde(flatten)]
    attributes: Attributes,
    #[serde(default)]
    children: Vec<NodeDocument>,
}

#[derive(Debug, Clone)]
pub struct Schema {
    version: String,
    library: Option<String>,
    generation: u8,
    entries: Vec<SchemaEntry>,
    index: HashMap<String, Vec<usize>>,
    unit_classes: HashMap<String, UnitClass>,
}

impl Schema {
    /// Build a schema from its JSON description.
    pub fn from_json(content: &str) -> Result<Schema, SchemaError> {
        let document: SchemaDocument = serde_json::from_str(content)?;
        Schema::from_document(document)
    }

    fn from_document(document: SchemaDocument) -> Result<Schema, SchemaError> {
        if !(2..=3).contains(&document.generation) {
            return Err(SchemaError::UnsupportedGeneration(document.generation));
        }

        let mut schema = Schema {
            version: document.version,
            library: document.library,
            generation: document.generation,
            entries: Vec::new(),
            index: HashMap::new(),
            unit_classes: HashMap::new(),
        };

        for class in document.unit_classes {
            schema
                .unit_classes
                .insert(
                    class
                        .name
                        .to_lowercase(),
                    class,
                );
        }

        for node in document.tags {
            schema.insert(node, None)?;
        }
        schema.qualify_short_names();

        debug!(
            "loaded schema {} with {} nodes",
            schema.version,
            schema
                .entries
                .len()
        );

        Ok(schema)
    }

    fn insert(&mut self, node: NodeDocument, parent: Option<usize>) -> Result<(), SchemaError> {
        let name = node
            .name
            .trim();
        if name.is_empty() || name.contains(['/', ',', '(', ')', '#']) {
            return Err(SchemaError::InvalidName(node.name));
        }

        let mut attributes = node.attributes;

        if let Some(class) = &attributes.unit_class {
            if !self
                .unit_classes
                .contains_key(&class.to_lowercase())
            {
                return Err(SchemaError::UnknownUnitClass(name.to_string(), class.clone()));
            }
        }

        let long_name = match parent {
            Some(id) => {
                let above = &self.entries[id];
                if above
                    .attributes
                    .extension_allowed
                {
                    attributes.extension_allowed = true;
                }
                format!("{}/{}", above.long_name, name)
            }
            None => name.to_string(),
        };

        let id = self
            .entries
            .len();
        self.entries
            .push(SchemaEntry {
                id,
                name: name.to_string(),
                short_name: name.to_string(),
                long_name,
                parent,
                attributes,
            });
        self.index
            .entry(name.to_lowercase())
            .or_default()
            .push(id);

        for child in node.children {
            self.insert(child, Some(id))?;
        }

        Ok(())
    }

    /// A name shared by several nodes cannot be written alone, so prefix it
    /// with as many ancestors as it takes to start from a unique one.
    fn qualify_short_names(&mut self) {
        for id in 0..self
            .entries
            .len()
        {
            let entry = &self.entries[id];
            if self.is_unique(&entry.name) {
                continue;
            }

            let segments: Vec<&str> = entry
                .long_name
                .split('/')
                .collect();
            let last = segments.len() - 1;
            let short_name = (0..last)
                .rev()
                .find(|k| self.is_unique(segments[*k]))
                .map(|k| segments[k..].join("/"))
                .unwrap_or_else(|| {
                    entry
                        .long_name
                        .clone()
                });

            self.entries[id].short_name = short_name;
        }
    }

    fn is_unique(&self, name: &str) -> bool {
        self.index
            .get(&name.to_lowercase())
            .is_some_and(|ids| ids.len() == 1)
    }

    pub fn version(&self) -> &str {
        &self.version
    }

    pub fn library(&self) -> Option<&str> {
        self.library
            .as_deref()
    }

    /// Which generation of the vocabulary this schema belongs to. Definitions,
    /// reserved tags, and temporal checks only apply from generation 3.
    pub fn generation(&self) -> u8 {
        self.generation
    }

    pub fn entry(&self, id: usize) -> &SchemaEntry {
        &self.entries[id]
    }

    pub fn entries(&self) -> &[SchemaEntry] {
        &self.entries
    }

    pub fn parent(&self, entry: &SchemaEntry) -> Option<&SchemaEntry> {
        entry
            .parent
            .map(|id| &self.entries[id])
    }

    /// Find nodes by their short name, case-insensitively.
    pub fn lookup(&self, name: &str) -> Lookup<'_> {
        match self
            .index
            .get(&name.to_lowercase())
        {
            None => Lookup::Missing,
            Some(ids) if ids.len() == 1 => Lookup::Unique(&self.entries[ids[0]]),
            Some(ids) => Lookup::Ambiguous(
                ids.iter()
                    .map(|id| &self.entries[*id])
                    .collect(),
            ),
        }
    }

    /// The child of the given node with the given name, if there is one.
    pub fn find_child(&self, parent: &SchemaEntry, name: &str) -> Option<&SchemaEntry> {
        self.index
            .get(&name.to_lowercase())?
            .iter()
            .map(|id| &self.entries[*id])
            .find(|entry| entry.parent == Some(parent.id))
    }

    /// Find a node by its full path, case-insensitively.
    pub fn find_long(&self, long_name: &str) -> Option<&SchemaEntry> {
        let last = long_name
            .rsplit('/')
            .next()?;
        self.index
            .get(&last.to_lowercase())?
            .iter()
            .map(|id| &self.entries[*id])
            .find(|entry| {
                entry
                    .long_name
                    .eq_ignore_ascii_case(long_name)
            })
    }

    pub fn unit_class(&self, name: &str) -> Option<&UnitClass> {
        self.unit_classes
            .get(&name.to_lowercase())
    }
}


#[cfg(test)]
mod check {
    use super::*;

    #[test]
    fn loads_fixture() {
        let schema = fixture::standard();
        assert_eq!(schema.generation(), 3);
        assert_eq!(schema.version(), "8.3.0");

        match schema.lookup("sensory-EVENT") {
            Lookup::Unique(entry) => {
                assert_eq!(entry.name, "Sensory-event");
                assert_eq!(entry.long_name, "Event/Sensory-event");
                let parent = schema
                    .parent(entry)
                    .unwrap();
                assert_eq!(parent.name, "Event");
            }
            other => panic!("expected a unique match, got {:?}", other),
        }

        assert_eq!(schema.lookup("Nonexistent"), Lookup::Missing);
    }

    #[test]
    fn ambiguous_names() {
        let schema = fixture::standard();
        match schema.lookup("Marker") {
            Lookup::Ambiguous(entries) => assert_eq!(entries.len(), 2),
            other => panic!("expected an ambiguous match, got {:?}", other),
        }

        let entry = schema
            .find_long("Property/Data-property/Data-marker/Marker")
            .unwrap();
        assert_eq!(entry.short_name, "Data-marker/Marker");

        let entry = schema
            .find_long("Event/Sensory-event")
            .unwrap();
        assert_eq!(entry.short_name, "Sensory-event");
    }

    #[test]
    fn extension_allowed_is_inherited() {
        let schema = fixture::standard();
        let entry = schema
            .find_long("Item/Object/Geometric-object")
            .unwrap();
        assert!(
            entry
                .attributes
                .extension_allowed
        );

        let entry = schema
            .find_long("event/sensory-event")
            .unwrap();
        assert!(
            !entry
                .attributes
                .extension_allowed
        );
    }

    #[test]
    fn children() {
        let schema = fixture::standard();
        let event = schema
            .find_long("Event")
            .unwrap();
        assert!(schema
            .find_child(event, "Sensory-event")
            .is_some());
        assert!(schema
            .find_child(event, "Red")
            .is_none());
    }

    #[test]
    fn unit_classes() {
        let schema = fixture::standard();
        let class = schema
            .unit_class("accelerationUnits")
            .unwrap();
        assert!(class.has_unit("m-per-s^2"));
        assert!(!class.has_unit("mph"));
    }

    #[test]
    fn rejects_bad_descriptions() {
        let result = Schema::from_json(r#"{"version": "1", "tags": [{"name": "A/B"}]}"#);
        assert!(matches!(result, Err(SchemaError::InvalidName(_))));

        let result = Schema::from_json(
            r#"{"version": "1", "tags": [{"name": "Speed", "takesValue": true, "unitClass": "speedUnits"}]}"#,
        );
        assert!(matches!(result, Err(SchemaError::UnknownUnitClass(_, _))));

        let result = Schema::from_json(r#"{"version": "1", "generation": 4, "tags": []}"#);
        assert!(matches!(result, Err(SchemaError::UnsupportedGeneration(4))));

        let result = Schema::from_json("not json");
        assert!(matches!(result, Err(SchemaError::Json(_))));
    }

    #[test]
    fn shareable_across_threads() {
        fn assert_sync<T: Send + Sync>() {}
        assert_sync::<Schema>();
    }
}
