//! Parse Module
//!
//! Reads the component-tree descriptor of one screen into a [`ComponentNode`]
//! tree. The descriptor is a JSON document, optionally wrapped as
//! `#|\n$JSON\n{...}\n|#`, whose `Properties` object is the screen's root
//! component.
//!
//! Structural failures (not JSON, no root component) abort the screen. Defects
//! inside one component only cost that component's bad properties, or the
//! component itself, and are recorded as diagnostics.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;

use crate::deadline::Deadline;
use crate::error::ConversionError;
use crate::validate::{Diagnostic, DIAG_INVALID_PROPERTY, DIAG_MALFORMED_COMPONENT};

lazy_static! {
    /// `#|` `$JSON` ... `|#` wrapper around the descriptor body
    static ref SCM_WRAPPER_RE: Regex = Regex::new(r"(?s)^\s*#\|\s*\$JSON\s*(.*?)\s*\|#\s*$").unwrap();
}

const TYPE_KEY: &str = "$Type";
const NAME_KEY: &str = "$Name";
const CHILDREN_KEY: &str = "$Components";

// ═══════════════════════════════════════════════════════════════════════════════
// COMPONENT TREE TYPES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PropertyValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

impl PropertyValue {
    fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::String(s) => Some(PropertyValue::Text(s.clone())),
            Value::Bool(b) => Some(PropertyValue::Bool(*b)),
            Value::Number(n) => n.as_f64().map(PropertyValue::Number),
            Value::Null | Value::Array(_) | Value::Object(_) => None,
        }
    }
}

impl fmt::Display for PropertyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PropertyValue::Bool(true) => f.write_str("True"),
            PropertyValue::Bool(false) => f.write_str("False"),
            PropertyValue::Number(n) => write!(f, "{}", n),
            PropertyValue::Text(s) => f.write_str(s),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(value: &str) -> Self {
        PropertyValue::Text(value.to_string())
    }
}

/// One visual component. Immutable once parsed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentNode {
    pub component_type: String,
    /// Instance name (`Button1`); event handlers bind through it.
    pub name: Option<String>,
    pub properties: BTreeMap<String, PropertyValue>,
    pub children: Vec<ComponentNode>,
}

impl ComponentNode {
    pub fn new(component_type: &str, name: &str) -> Self {
        Self {
            component_type: component_type.to_string(),
            name: Some(name.to_string()),
            properties: BTreeMap::new(),
            children: Vec::new(),
        }
    }

    pub fn with_property(mut self, key: &str, value: impl Into<PropertyValue>) -> Self {
        self.properties.insert(key.to_string(), value.into());
        self
    }

    pub fn with_child(mut self, child: ComponentNode) -> Self {
        self.children.push(child);
        self
    }

    /// Number of nodes in this subtree, including `self`.
    pub fn subtree_len(&self) -> usize {
        1 + self.children.iter().map(|c| c.subtree_len()).sum::<usize>()
    }

    /// Name used in diagnostics.
    pub fn label(&self) -> &str {
        self.name.as_deref().unwrap_or(&self.component_type)
    }
}

#[derive(Debug, Clone)]
pub struct LayoutTree {
    pub root: ComponentNode,
    pub diagnostics: Vec<Diagnostic>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// PARSING
// ═══════════════════════════════════════════════════════════════════════════════

/// Strip the `#|$JSON ... |#` wrapper if present.
pub fn strip_scm_wrapper(text: &str) -> &str {
    match SCM_WRAPPER_RE.captures(text).and_then(|caps| caps.get(1)) {
        Some(body) => body.as_str(),
        None => text.trim(),
    }
}

pub fn parse_layout(screen: &str, text: &str) -> Result<LayoutTree, ConversionError> {
    parse_layout_with_deadline(screen, text, &Deadline::none())
}

pub fn parse_layout_with_deadline(
    screen: &str,
    text: &str,
    deadline: &Deadline,
) -> Result<LayoutTree, ConversionError> {
    let malformed = |reason: String| ConversionError::MalformedLayoutDescriptor {
        screen: screen.to_string(),
        reason,
    };

    let document: Value = serde_json::from_str(strip_scm_wrapper(text))
        .map_err(|e| malformed(format!("not a JSON document: {}", e)))?;

    let root = document
        .get("Properties")
        .and_then(Value::as_object)
        .ok_or_else(|| malformed("missing `Properties` root component".to_string()))?;

    if root.get(TYPE_KEY).and_then(Value::as_str).is_none() {
        return Err(malformed("root component has no `$Type`".to_string()));
    }

    let mut diagnostics = Vec::new();
    let root = parse_component(screen, root, screen, deadline, &mut diagnostics)?
        .ok_or_else(|| malformed("root component could not be read".to_string()))?;

    tracing::debug!(
        screen,
        components = root.subtree_len(),
        diagnostics = diagnostics.len(),
        "parsed layout descriptor"
    );

    Ok(LayoutTree { root, diagnostics })
}

/// Parse one component object. `Ok(None)` means the component was skipped and
/// a diagnostic recorded.
fn parse_component(
    screen: &str,
    object: &Map<String, Value>,
    path: &str,
    deadline: &Deadline,
    diagnostics: &mut Vec<Diagnostic>,
) -> Result<Option<ComponentNode>, ConversionError> {
    deadline.check(screen)?;

    let name = object
        .get(NAME_KEY)
        .and_then(Value::as_str)
        .map(str::to_string);
    let label = name.clone().unwrap_or_else(|| path.to_string());

    let component_type = match object.get(TYPE_KEY).and_then(Value::as_str) {
        Some(t) if !t.trim().is_empty() => t.to_string(),
        _ => {
            tracing::warn!(screen, component = %label, "component without $Type skipped");
            diagnostics.push(Diagnostic::with_details(
                DIAG_MALFORMED_COMPONENT,
                &format!("Component `{}` has no `$Type`; it was skipped.", label),
                screen,
                Some(label),
                vec!["Every component entry needs a string `$Type`.".to_string()],
            ));
            return Ok(None);
        }
    };

    let mut properties = BTreeMap::new();
    for (key, value) in object {
        if key.starts_with('$') || key == "Uuid" {
            continue;
        }
        match PropertyValue::from_json(value) {
            Some(v) => {
                properties.insert(key.clone(), v);
            }
            None => {
                tracing::warn!(screen, component = %label, property = %key, "non-scalar property dropped");
                diagnostics.push(Diagnostic::at(
                    DIAG_INVALID_PROPERTY,
                    &format!(
                        "Property `{}` of `{}` is not a string, number or boolean; it was dropped.",
                        key, label
                    ),
                    screen,
                    &label,
                ));
            }
        }
    }

    let mut children = Vec::new();
    match object.get(CHILDREN_KEY) {
        None => {}
        Some(Value::Array(entries)) => {
            for (index, entry) in entries.iter().enumerate() {
                let child_path = format!("{}/{}[{}]", label, CHILDREN_KEY, index);
                match entry.as_object() {
                    Some(child) => {
                        if let Some(node) =
                            parse_component(screen, child, &child_path, deadline, diagnostics)?
                        {
                            children.push(node);
                        }
                    }
                    None => diagnostics.push(Diagnostic::at(
                        DIAG_MALFORMED_COMPONENT,
                        &format!("Entry `{}` is not a component object; it was skipped.", child_path),
                        screen,
                        &child_path,
                    )),
                }
            }
        }
        Some(_) => diagnostics.push(Diagnostic::at(
            DIAG_MALFORMED_COMPONENT,
            &format!("`{}` of `{}` is not a list; children ignored.", CHILDREN_KEY, label),
            screen,
            &label,
        )),
    }

    Ok(Some(ComponentNode {
        component_type,
        name,
        properties,
        children,
    }))
}
