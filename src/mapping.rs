//! Component Mapping Table
//!
//! Declarative rules, keyed by source component type, describing how a
//! component becomes an Android view: element tag, id prefix, default
//! properties, the ordered property → attribute table, and the Java templates
//! used by the block compiler for property access, method calls and events.
//!
//! The table is plain immutable data. It is passed by reference into every
//! conversion, so any number of runs may share one instance without locking.

use lazy_static::lazy_static;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::Path;

use crate::error::ConversionError;
use crate::parse::PropertyValue;

const BUILTIN_TABLE: &str = include_str!("../config/components.json");

lazy_static! {
    static ref TEMPLATE_SLOT_RE: Regex = Regex::new(r"\{(target|value|args|\d+)\}").unwrap();
    static ref ID_PREFIX_RE: Regex = Regex::new(r"^[a-z][A-Za-z0-9_]*$").unwrap();
}

// ═══════════════════════════════════════════════════════════════════════════════
// RULE TYPES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AttributeKind {
    #[default]
    Plain,
    /// `-1` wrap_content, `-2` match_parent, numbers get the rule's unit.
    Dimension,
    /// `&HAARRGGBB` → `#AARRGGBB`
    Color,
    /// `True`/`False` → `true`/`false`
    Boolean,
    /// Asset file name → `@drawable/<name>`
    Drawable,
}

/// One entry of a rule's property → attribute table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AttributeRule {
    pub property: String,
    pub attribute: String,
    #[serde(default)]
    pub kind: AttributeKind,
    /// Unit appended to numeric dimensions, `dp` when absent.
    #[serde(default)]
    pub unit: Option<String>,
    /// Exact source value → attribute value overrides, applied before `kind`.
    #[serde(default)]
    pub values: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Coercion {
    #[default]
    None,
    Text,
    Float,
    Int,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccessorRule {
    #[serde(default)]
    pub get: Option<String>,
    #[serde(default)]
    pub set: Option<String>,
    #[serde(default)]
    pub coerce: Coercion,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodRule {
    pub call: String,
    #[serde(default)]
    pub arity: usize,
}

/// An implicit event parameter: the block-level name and the Java expression
/// that supplies it inside the listener.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventParam {
    pub name: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventRule {
    /// Listener installer; `None` means the handler runs once from `onCreate`.
    #[serde(default)]
    pub listener: Option<String>,
    #[serde(default)]
    pub lambda_params: Vec<String>,
    #[serde(default)]
    pub params: Vec<EventParam>,
    #[serde(default)]
    pub returns: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingRule {
    pub target_tag: String,
    pub id_prefix: String,
    #[serde(default)]
    pub default_properties: BTreeMap<String, PropertyValue>,
    #[serde(default)]
    pub property_to_attribute: Vec<AttributeRule>,
    #[serde(default)]
    pub accessors: BTreeMap<String, AccessorRule>,
    #[serde(default)]
    pub methods: BTreeMap<String, MethodRule>,
    #[serde(default)]
    pub events: BTreeMap<String, EventRule>,
    /// Java field type, defaults to the target tag.
    #[serde(default)]
    pub java_type: Option<String>,
}

impl MappingRule {
    pub fn java_type(&self) -> &str {
        self.java_type.as_deref().unwrap_or(&self.target_tag)
    }

    /// Getter template for `property`, falling back to `{target}.get<Property>()`.
    pub fn getter(&self, property: &str) -> String {
        self.accessors
            .get(property)
            .and_then(|a| a.get.clone())
            .unwrap_or_else(|| format!("{{target}}.get{}()", property))
    }

    /// Setter template and value coercion for `property`.
    pub fn setter(&self, property: &str) -> (String, Coercion) {
        match self.accessors.get(property) {
            Some(AccessorRule {
                set: Some(set),
                coerce,
                ..
            }) => (set.clone(), *coerce),
            Some(a) => (format!("{{target}}.set{}({{value}})", property), a.coerce),
            None => (
                format!("{{target}}.set{}({{value}})", property),
                Coercion::None,
            ),
        }
    }

    /// Call template and declared arity for `method`.
    pub fn method(&self, method: &str) -> (String, usize) {
        match self.methods.get(method) {
            Some(rule) => (rule.call.clone(), rule.arity),
            None => (format!("{{target}}.{}({{args}})", lower_camel(method)), 0),
        }
    }

    pub fn event(&self, event: &str) -> Option<&EventRule> {
        self.events.get(event)
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TABLE
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingTable {
    pub components: BTreeMap<String, MappingRule>,
}

impl MappingTable {
    /// Table shipped with the crate.
    pub fn builtin() -> Result<Self, ConversionError> {
        Self::from_json(BUILTIN_TABLE)
    }

    pub fn load(path: &Path) -> Result<Self, ConversionError> {
        let text = fs::read_to_string(path).map_err(|source| ConversionError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&text)
    }

    pub fn from_json(text: &str) -> Result<Self, ConversionError> {
        let table: MappingTable =
            serde_json::from_str(text).map_err(|e| ConversionError::MappingTable {
                reason: e.to_string(),
            })?;
        table.check()?;
        tracing::debug!(rules = table.components.len(), "loaded component mapping table");
        Ok(table)
    }

    pub fn lookup(&self, component_type: &str) -> Option<&MappingRule> {
        self.components.get(component_type)
    }

    fn check(&self) -> Result<(), ConversionError> {
        for (component_type, rule) in &self.components {
            if rule.target_tag.trim().is_empty() {
                return Err(ConversionError::MappingTable {
                    reason: format!("`{}` has an empty targetTag", component_type),
                });
            }
            if !ID_PREFIX_RE.is_match(&rule.id_prefix) {
                return Err(ConversionError::MappingTable {
                    reason: format!(
                        "`{}` has idPrefix `{}`, expected a lowercase identifier",
                        component_type, rule.id_prefix
                    ),
                });
            }
            let mut seen = HashSet::new();
            for attr in &rule.property_to_attribute {
                if !seen.insert(attr.property.as_str()) {
                    return Err(ConversionError::MappingTable {
                        reason: format!(
                            "`{}` maps property `{}` more than once",
                            component_type, attr.property
                        ),
                    });
                }
            }
        }
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// TEMPLATES
// ═══════════════════════════════════════════════════════════════════════════════

/// Expand `{target}`, `{value}`, `{args}` and `{0}`, `{1}`, ... in a Java
/// template. Substituted text is never rescanned.
pub fn expand_template(template: &str, target: &str, args: &[String]) -> String {
    TEMPLATE_SLOT_RE
        .replace_all(template, |caps: &Captures| match &caps[1] {
            "target" => target.to_string(),
            "value" => args.first().cloned().unwrap_or_default(),
            "args" => args.join(", "),
            index => index
                .parse::<usize>()
                .ok()
                .and_then(|i| args.get(i).cloned())
                .unwrap_or_default(),
        })
        .into_owned()
}

fn lower_camel(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}
