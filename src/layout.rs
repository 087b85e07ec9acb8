//! Layout Code Generator
//!
//! Walks a [`ComponentNode`] tree depth-first, pre-order, and writes one
//! Android layout document. Each mapped component becomes one element with a
//! freshly allocated `android:id` and one attribute per entry of its rule's
//! property → attribute table, in the rule's declared order. Unmapped
//! components are left out (with their subtree) and reported.
//!
//! Every instance name that received an element is recorded in the
//! [`ComponentRegistry`], which the block compiler uses to resolve component
//! references.

use serde::Serialize;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

use crate::deadline::Deadline;
use crate::error::ConversionError;
use crate::mapping::{AttributeKind, AttributeRule, MappingRule, MappingTable};
use crate::parse::{ComponentNode, PropertyValue};
use crate::renamer::IdAllocator;
use crate::validate::{Diagnostic, DIAG_MALFORMED_COMPONENT, DIAG_UNMAPPED_COMPONENT};

const ANDROID_NS: &str = "http://schemas.android.com/apk/res/android";
const FALLBACK_ROOT_TAG: &str = "LinearLayout";
const FALLBACK_ROOT_PREFIX: &str = "root";
const INDENT: &str = "    ";

// ═══════════════════════════════════════════════════════════════════════════════
// COMPONENT REGISTRY
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ComponentBinding {
    pub name: Option<String>,
    pub component_type: String,
    /// Generated view id, also used as the Java field name.
    pub id: String,
    pub java_type: String,
}

/// Instance name → generated identifier, in layout order.
#[derive(Debug, Clone, Default)]
pub struct ComponentRegistry {
    bindings: Vec<ComponentBinding>,
    by_name: HashMap<String, usize>,
}

impl ComponentRegistry {
    /// Record `binding`. Returns `false` when its instance name was already
    /// bound; the first binding keeps the name.
    pub fn insert(&mut self, binding: ComponentBinding) -> bool {
        let index = self.bindings.len();
        let fresh = match &binding.name {
            Some(name) if self.by_name.contains_key(name) => false,
            Some(name) => {
                self.by_name.insert(name.clone(), index);
                true
            }
            None => true,
        };
        self.bindings.push(binding);
        fresh
    }

    pub fn resolve(&self, name: &str) -> Option<&ComponentBinding> {
        self.by_name.get(name).map(|&i| &self.bindings[i])
    }

    pub fn iter(&self) -> impl Iterator<Item = &ComponentBinding> {
        self.bindings.iter()
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct LayoutOutput {
    pub markup: String,
    pub registry: ComponentRegistry,
    pub diagnostics: Vec<Diagnostic>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// GENERATION
// ═══════════════════════════════════════════════════════════════════════════════

pub fn generate_layout(
    screen: &str,
    root: &ComponentNode,
    table: &MappingTable,
    deadline: &Deadline,
) -> Result<LayoutOutput, ConversionError> {
    let mut writer = LayoutWriter {
        screen,
        table,
        deadline,
        ids: IdAllocator::new(),
        registry: ComponentRegistry::default(),
        diagnostics: Vec::new(),
        out: String::from("<?xml version=\"1.0\" encoding=\"utf-8\"?>\n"),
    };

    match table.lookup(&root.component_type) {
        Some(rule) => writer.write_element(root, rule, 0, true)?,
        None => {
            writer.report_unmapped(root, "its children were placed in a fallback container");
            writer.write_fallback_root(root)?;
        }
    }

    tracing::debug!(
        screen,
        elements = writer.registry.len(),
        diagnostics = writer.diagnostics.len(),
        "generated layout markup"
    );

    Ok(LayoutOutput {
        markup: writer.out,
        registry: writer.registry,
        diagnostics: writer.diagnostics,
    })
}

struct LayoutWriter<'a> {
    screen: &'a str,
    table: &'a MappingTable,
    deadline: &'a Deadline,
    ids: IdAllocator,
    registry: ComponentRegistry,
    diagnostics: Vec<Diagnostic>,
    out: String,
}

impl<'a> LayoutWriter<'a> {
    fn write_node(&mut self, node: &ComponentNode, depth: usize) -> Result<(), ConversionError> {
        match self.table.lookup(&node.component_type) {
            Some(rule) => self.write_element(node, rule, depth, false),
            None => {
                let dropped = node.subtree_len() - 1;
                let note = if dropped == 0 {
                    "it was skipped".to_string()
                } else {
                    format!("it was skipped with {} nested component(s)", dropped)
                };
                self.report_unmapped(node, &note);
                Ok(())
            }
        }
    }

    fn write_element(
        &mut self,
        node: &ComponentNode,
        rule: &MappingRule,
        depth: usize,
        is_root: bool,
    ) -> Result<(), ConversionError> {
        self.deadline.check(self.screen)?;

        let id = self.allocate(&rule.id_prefix)?;
        let fresh = self.registry.insert(ComponentBinding {
            name: node.name.clone(),
            component_type: node.component_type.clone(),
            id: id.clone(),
            java_type: rule.java_type().to_string(),
        });
        if !fresh {
            self.diagnostics.push(Diagnostic::at(
                DIAG_MALFORMED_COMPONENT,
                &format!(
                    "Instance name `{}` is used twice; blocks resolve to the first one.",
                    node.label()
                ),
                self.screen,
                node.label(),
            ));
        }

        let mut merged: BTreeMap<&str, &PropertyValue> = rule
            .default_properties
            .iter()
            .map(|(k, v)| (k.as_str(), v))
            .collect();
        merged.extend(node.properties.iter().map(|(k, v)| (k.as_str(), v)));

        let mut attributes = vec![("android:id".to_string(), format!("@+id/{}", id))];
        for attr in &rule.property_to_attribute {
            if let Some(value) = merged.get(attr.property.as_str()) {
                attributes.push((attr.attribute.clone(), render_attribute_value(attr, value)));
            }
        }

        self.open_tag(&rule.target_tag, &attributes, depth, is_root);
        if node.children.is_empty() {
            self.out.push_str(" />\n");
            return Ok(());
        }
        self.out.push_str(">\n");
        for child in &node.children {
            self.write_node(child, depth + 1)?;
        }
        self.close_tag(&rule.target_tag, depth);
        Ok(())
    }

    fn write_fallback_root(&mut self, root: &ComponentNode) -> Result<(), ConversionError> {
        self.deadline.check(self.screen)?;
        let id = self.allocate(FALLBACK_ROOT_PREFIX)?;
        let attributes = vec![
            ("android:id".to_string(), format!("@+id/{}", id)),
            ("android:layout_width".to_string(), "match_parent".to_string()),
            ("android:layout_height".to_string(), "match_parent".to_string()),
            ("android:orientation".to_string(), "vertical".to_string()),
        ];
        self.open_tag(FALLBACK_ROOT_TAG, &attributes, 0, true);
        if root.children.is_empty() {
            self.out.push_str(" />\n");
            return Ok(());
        }
        self.out.push_str(">\n");
        for child in &root.children {
            self.write_node(child, 1)?;
        }
        self.close_tag(FALLBACK_ROOT_TAG, 0);
        Ok(())
    }

    fn allocate(&mut self, prefix: &str) -> Result<String, ConversionError> {
        self.ids
            .allocate(prefix)
            .ok_or_else(|| ConversionError::IdentifierCollision {
                screen: self.screen.to_string(),
                id: prefix.to_string(),
            })
    }

    fn open_tag(&mut self, tag: &str, attributes: &[(String, String)], depth: usize, is_root: bool) {
        let indent = INDENT.repeat(depth);
        self.out.push_str(&indent);
        self.out.push('<');
        self.out.push_str(tag);
        if is_root {
            self.out
                .push_str(&format!(" xmlns:android=\"{}\"", ANDROID_NS));
        }
        for (name, value) in attributes {
            self.out.push('\n');
            self.out.push_str(&indent);
            self.out.push_str(INDENT);
            self.out
                .push_str(&format!("{}=\"{}\"", name, escape_xml(value)));
        }
    }

    fn close_tag(&mut self, tag: &str, depth: usize) {
        self.out.push_str(&INDENT.repeat(depth));
        self.out.push_str(&format!("</{}>\n", tag));
    }

    fn report_unmapped(&mut self, node: &ComponentNode, note: &str) {
        tracing::warn!(
            screen = self.screen,
            component = node.label(),
            component_type = %node.component_type,
            "unmapped component type"
        );
        self.diagnostics.push(Diagnostic::with_details(
            DIAG_UNMAPPED_COMPONENT,
            &format!(
                "No mapping rule for component type `{}` (`{}`); {}.",
                node.component_type,
                node.label(),
                note
            ),
            self.screen,
            Some(node.label().to_string()),
            vec![format!(
                "Add a `{}` entry to the component mapping table to convert it.",
                node.component_type
            )],
        ));
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// ATTRIBUTE VALUES
// ═══════════════════════════════════════════════════════════════════════════════

pub fn render_attribute_value(rule: &AttributeRule, value: &PropertyValue) -> String {
    let raw = value.to_string();
    if let Some(mapped) = rule.values.get(&raw) {
        return mapped.clone();
    }
    match rule.kind {
        AttributeKind::Plain => raw,
        AttributeKind::Dimension => render_dimension(&raw, rule.unit.as_deref().unwrap_or("dp")),
        AttributeKind::Color => match raw.strip_prefix("&H") {
            Some(hex) => format!("#{}", hex.to_ascii_uppercase()),
            None => raw,
        },
        AttributeKind::Boolean => {
            if raw.eq_ignore_ascii_case("true") {
                "true".to_string()
            } else if raw.eq_ignore_ascii_case("false") {
                "false".to_string()
            } else {
                raw
            }
        }
        AttributeKind::Drawable => render_drawable(&raw),
    }
}

fn render_dimension(raw: &str, unit: &str) -> String {
    match raw.trim().parse::<f64>() {
        Ok(n) if n == -1.0 => "wrap_content".to_string(),
        Ok(n) if n == -2.0 || n <= -1000.0 => "match_parent".to_string(),
        Ok(n) if n < 0.0 => "wrap_content".to_string(),
        Ok(n) => format!("{}{}", n, unit),
        Err(_) => raw.to_string(),
    }
}

fn render_drawable(raw: &str) -> String {
    let stem = Path::new(raw)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(raw);
    if stem.is_empty() {
        return raw.to_string();
    }
    let name: String = stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_lowercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("@drawable/{}", name)
}

pub fn escape_xml(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            '\n' => escaped.push_str("\\n"),
            _ => escaped.push(c),
        }
    }
    escaped
}
