//! Schema declarations: which keys exist, their kinds, and their defaults.
//!
//! A schema is a tree of [`Section`]s whose leaves are [`Field`]s. It can be
//! built in code:
//!
//! ```
//! use sharedconf::{Field, Schema};
//!
//! let schema = Schema::new()
//!     .field("count", Field::integer().default(0))
//!     .field("ui.locale", Field::string().default("en"))
//!     .field("keypairdb.*.fingerprint", Field::string());
//! ```
//!
//! or loaded from a TOML schema document, where a leaf is an inline table
//! carrying a `type` string and a section is any other table:
//!
//! ```toml
//! count = { type = "integer", default = 0 }
//!
//! [ui]
//! locale = { type = "string", default = "en" }
//!
//! [keypairdb."*"]
//! fingerprint = { type = "string" }
//! ```
//!
//! The `*` segment declares a wildcard: its schema applies to every
//! sub-section of the parent that is not declared by name.

use std::fmt;
use std::path::Path;

use toml::{Table, Value};

use crate::error::{StoreError, ValidationError};
use crate::validate;

/// Segment naming the wildcard sub-section of a section.
pub const WILDCARD: &str = "*";

/// The kind of value a field holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    String,
    Integer,
    Float,
    Boolean,
    List,
}

impl ValueKind {
    pub fn name(self) -> &'static str {
        match self {
            ValueKind::String => "string",
            ValueKind::Integer => "integer",
            ValueKind::Float => "float",
            ValueKind::Boolean => "boolean",
            ValueKind::List => "list",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            "string" => Some(ValueKind::String),
            "integer" => Some(ValueKind::Integer),
            "float" => Some(ValueKind::Float),
            "boolean" => Some(ValueKind::Boolean),
            "list" => Some(ValueKind::List),
            _ => None,
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A leaf declaration.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub kind: ValueKind,
    /// Copied into the document when the key is missing.
    pub default: Option<Value>,
    /// Whether a missing key without a default fails validation.
    pub required: bool,
}

impl Field {
    pub fn new(kind: ValueKind) -> Self {
        Self {
            kind,
            default: None,
            required: true,
        }
    }

    pub fn string() -> Self {
        Self::new(ValueKind::String)
    }

    pub fn integer() -> Self {
        Self::new(ValueKind::Integer)
    }

    pub fn float() -> Self {
        Self::new(ValueKind::Float)
    }

    pub fn boolean() -> Self {
        Self::new(ValueKind::Boolean)
    }

    pub fn list() -> Self {
        Self::new(ValueKind::List)
    }

    pub fn default<V: Into<Value>>(mut self, value: V) -> Self {
        self.default = Some(value.into());
        self
    }

    /// Allow the key to be absent when no default is declared.
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

/// A node in the schema tree.
#[derive(Debug, Clone, PartialEq)]
pub enum Entry {
    Field(Field),
    Section(Section),
}

/// A section declaration: named entries in declaration order, plus an
/// optional wildcard schema for undeclared sub-sections.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Section {
    entries: Vec<(String, Entry)>,
    wildcard: Option<Box<Section>>,
}

impl Section {
    pub fn entries(&self) -> impl Iterator<Item = (&str, &Entry)> {
        self.entries.iter().map(|(name, entry)| (name.as_str(), entry))
    }

    pub fn get(&self, name: &str) -> Option<&Entry> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, entry)| entry)
    }

    pub fn wildcard(&self) -> Option<&Section> {
        self.wildcard.as_deref()
    }

    fn insert(&mut self, name: &str, entry: Entry) {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some((_, existing)) => *existing = entry,
            None => self.entries.push((name.to_string(), entry)),
        }
    }

    /// The named sub-section, created (or replacing a field) if needed.
    fn section_mut(&mut self, name: &str) -> &mut Section {
        if name == WILDCARD {
            return self.wildcard.get_or_insert_with(Box::default);
        }
        if !matches!(self.get(name), Some(Entry::Section(_))) {
            self.insert(name, Entry::Section(Section::default()));
        }
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some((_, Entry::Section(section))) => section,
            _ => unreachable!("section was just inserted"),
        }
    }

    fn section_at<'k>(&mut self, mut names: impl Iterator<Item = &'k str>) -> &mut Section {
        match names.next() {
            Some(name) => self.section_mut(name).section_at(names),
            None => self,
        }
    }

    fn extend(&mut self, other: Section) {
        for (name, entry) in other.entries {
            match entry {
                Entry::Section(sub) => self.section_mut(&name).extend(sub),
                field => self.insert(&name, field),
            }
        }
        if let Some(wildcard) = other.wildcard {
            self.section_mut(WILDCARD).extend(*wildcard);
        }
    }
}

/// The full set of declarations checked by [`Store::validate`](crate::Store::validate).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    root: Section,
}

impl Schema {
    /// An empty schema: validation accepts any document unchanged.
    pub fn new() -> Self {
        Self::default()
    }

    /// Declare a field at a dotted key path. A `*` segment addresses the
    /// wildcard sub-section of its parent. Redeclaring a key replaces it.
    pub fn field(mut self, key: &str, field: Field) -> Self {
        let (section, leaf) = match key.rsplit_once('.') {
            Some((parents, leaf)) => (self.root.section_at(parents.split('.')), leaf),
            None => (&mut self.root, key),
        };
        section.insert(leaf, Entry::Field(field));
        self
    }

    /// Declare a (possibly empty) section so validation always creates it.
    pub fn section(mut self, key: &str) -> Self {
        self.root.section_at(key.split('.'));
        self
    }

    /// Layer `other` over this schema; `other`'s declarations win.
    pub fn extend(mut self, other: Schema) -> Self {
        self.root.extend(other.root);
        self
    }

    pub fn root(&self) -> &Section {
        &self.root
    }

    /// Parse a TOML schema document.
    pub fn from_toml(content: &str) -> Result<Self, StoreError> {
        let table: Table = content.parse().map_err(|e: toml::de::Error| {
            StoreError::InvalidSchema {
                key: "<document>".into(),
                reason: e.to_string(),
            }
        })?;
        let mut path = Vec::new();
        Ok(Self {
            root: parse_section(&table, &mut path)?,
        })
    }

    /// Read and parse a TOML schema document from disk.
    pub fn load(path: &Path) -> Result<Self, StoreError> {
        let content = std::fs::read_to_string(path).map_err(|e| StoreError::io(path, e))?;
        Self::from_toml(&content)
    }

    /// Check `document` against this schema, filling defaults and coercing
    /// parseable values in place. See [`validate`](crate::validate) for the
    /// exact rules.
    pub fn validate(&self, document: &mut Table) -> Result<(), ValidationError> {
        validate::validate(&self.root, document)
    }
}

fn parse_section(table: &Table, path: &mut Vec<String>) -> Result<Section, StoreError> {
    let mut section = Section::default();
    for (key, value) in table {
        path.push(key.clone());
        match value {
            Value::Table(spec) if is_field_spec(spec) => {
                if key == WILDCARD {
                    return Err(invalid(path, "'*' must be a section, not a field"));
                }
                section.insert(key, Entry::Field(parse_field(spec, path)?));
            }
            Value::Table(nested) => {
                let sub = parse_section(nested, path)?;
                if key == WILDCARD {
                    section.wildcard = Some(Box::new(sub));
                } else {
                    section.insert(key, Entry::Section(sub));
                }
            }
            other => {
                return Err(invalid(
                    path,
                    &format!(
                        "expected a field spec or a section, found {}",
                        other.type_str()
                    ),
                ));
            }
        }
        path.pop();
    }
    Ok(section)
}

fn is_field_spec(table: &Table) -> bool {
    matches!(table.get("type"), Some(Value::String(_)))
}

fn parse_field(spec: &Table, path: &[String]) -> Result<Field, StoreError> {
    let mut kind = None;
    let mut default = None;
    let mut required = None;

    for (attr, value) in spec {
        match (attr.as_str(), value) {
            ("type", Value::String(name)) => {
                kind = Some(
                    ValueKind::from_name(name)
                        .ok_or_else(|| invalid(path, &format!("unknown type '{name}'")))?,
                );
            }
            ("default", value) => default = Some(value.clone()),
            ("required", Value::Boolean(b)) => required = Some(*b),
            ("required", other) => {
                return Err(invalid(
                    path,
                    &format!("'required' must be a boolean, found {}", other.type_str()),
                ));
            }
            (other, _) => {
                return Err(invalid(path, &format!("unknown attribute '{other}'")));
            }
        }
    }

    let Some(kind) = kind else {
        return Err(invalid(path, "missing 'type'"));
    };

    let default = match default {
        Some(value) => match validate::coerce(kind, &value) {
            Ok(coerced) => Some(coerced.unwrap_or(value)),
            Err(reason) => return Err(invalid(path, &format!("bad default: {reason}"))),
        },
        None => None,
    };

    Ok(Field {
        kind,
        required: required.unwrap_or(true),
        default,
    })
}

fn invalid(path: &[String], reason: &str) -> StoreError {
    StoreError::InvalidSchema {
        key: crate::keypath::join(path),
        reason: reason.into(),
    }
}
