//! Block Graph Parser
//!
//! Reads the Blockly XML of one screen into an abstract program: event
//! handler roots (source order preserved), global variable declarations, and
//! for every block a typed [`BlockKind`] with its value slots and statement
//! sequences. `<next>` chains are flattened into ordered sequences.
//!
//! Block types outside the known vocabulary become [`BlockKind::Opaque`] with
//! their fields kept verbatim, so the compiler can mark them instead of
//! losing them.

use lazy_static::lazy_static;
use markup5ever_rcdom::{Handle, NodeData, RcDom};
use regex::Regex;
use std::collections::BTreeMap;
use tendril::TendrilSink;
use xml5ever::driver::{parse_document, XmlParseOpts};

use crate::deadline::Deadline;
use crate::error::ConversionError;
use crate::validate::{Diagnostic, DIAG_IGNORED_BLOCK, DIAG_OPAQUE_BLOCK, DIAG_UNRESOLVED_REFERENCE};

/// Deepest element nesting accepted in a block descriptor.
pub(crate) const MAX_NESTING: usize = 128;
/// Largest socket count a block may declare (`items`, `elseif`).
pub(crate) const MAX_SOCKETS: usize = 512;

lazy_static! {
    /// Comments, CDATA, processing instructions and doctypes are skipped;
    /// groups 1-3 capture a tag's closing slash, name and self-closing slash.
    /// A bare `<` matches when nothing else does and marks a cut-off tag.
    static ref MARKUP_RE: Regex = Regex::new(
        r#"(?s)<!--.*?-->|<!\[CDATA\[.*?\]\]>|<\?.*?\?>|<!DOCTYPE[^>]*>|<(/?)([A-Za-z_][\w:.\-]*)(?:[^>"']|"[^"]*"|'[^']*')*?(/?)>|<"#
    )
    .unwrap();
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROGRAM GRAPH TYPES
// ═══════════════════════════════════════════════════════════════════════════════

/// A value socket: one expression block, or empty.
pub type Slot = Option<Box<BlockNode>>;

/// A statement socket: blocks in link order.
pub type Sequence = Vec<BlockNode>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComponentRef {
    /// Instance name, empty when the block did not name one.
    pub instance: String,
    pub component_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VariableRef {
    pub name: String,
    pub global: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Neq,
    Lt,
    Lte,
    Gt,
    Gte,
}

/// Which operand domain a comparison block came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareDomain {
    Math,
    Logic,
    Text,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicOp {
    And,
    Or,
}

#[derive(Debug, Clone, PartialEq)]
pub enum BlockKind {
    // literals
    Number(String),
    Text(String),
    Boolean(bool),

    // operators
    Arithmetic {
        op: ArithmeticOp,
        operands: Vec<Slot>,
    },
    Negate(Slot),
    Compare {
        op: CompareOp,
        domain: CompareDomain,
        left: Slot,
        right: Slot,
    },
    Logic {
        op: LogicOp,
        left: Slot,
        right: Slot,
    },
    Not(Slot),
    TextJoin(Vec<Slot>),
    TextLength(Slot),
    TextIsEmpty(Slot),
    ListCreate(Vec<Slot>),
    ListLength(Slot),
    ListSelect {
        list: Slot,
        index: Slot,
    },
    ListAdd {
        list: Slot,
        items: Vec<Slot>,
    },

    // components
    PropertyGet {
        component: ComponentRef,
        property: String,
    },
    PropertySet {
        component: ComponentRef,
        property: String,
        value: Slot,
    },
    MethodCall {
        component: ComponentRef,
        method: String,
        args: Vec<Slot>,
    },

    // variables
    VariableGet(VariableRef),
    VariableSet {
        variable: VariableRef,
        value: Slot,
    },
    LocalDeclaration {
        names: Vec<(String, Slot)>,
        body: Sequence,
    },

    // control
    If {
        branches: Vec<(Slot, Sequence)>,
        otherwise: Option<Sequence>,
    },
    While {
        condition: Slot,
        body: Sequence,
    },
    ForRange {
        variable: String,
        start: Slot,
        end: Slot,
        step: Slot,
        body: Sequence,
    },
    ForEach {
        variable: String,
        list: Slot,
        body: Sequence,
    },

    Opaque {
        fields: BTreeMap<String, String>,
    },
}

/// Where a block may legally appear.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Statement,
    Value,
    Either,
}

#[derive(Debug, Clone, PartialEq)]
pub struct BlockNode {
    pub id: String,
    pub block_type: String,
    pub kind: BlockKind,
}

impl BlockNode {
    pub fn role(&self) -> Role {
        match &self.kind {
            BlockKind::PropertySet { .. }
            | BlockKind::VariableSet { .. }
            | BlockKind::LocalDeclaration { .. }
            | BlockKind::If { .. }
            | BlockKind::While { .. }
            | BlockKind::ForRange { .. }
            | BlockKind::ForEach { .. }
            | BlockKind::ListAdd { .. } => Role::Statement,
            BlockKind::MethodCall { .. } | BlockKind::Opaque { .. } => Role::Either,
            _ => Role::Value,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EventHandlerRoot {
    pub id: String,
    pub component: ComponentRef,
    pub event: String,
    pub body: Sequence,
}

#[derive(Debug, Clone, PartialEq)]
pub struct GlobalVariable {
    pub id: String,
    pub name: String,
    pub value: Slot,
}

#[derive(Debug, Clone, Default)]
pub struct BlockProgram {
    pub handlers: Vec<EventHandlerRoot>,
    pub globals: Vec<GlobalVariable>,
    pub diagnostics: Vec<Diagnostic>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// XML ELEMENT VIEW
// ═══════════════════════════════════════════════════════════════════════════════

/// Owned view of one DOM element: local name, attributes, child elements and
/// concatenated text.
#[derive(Debug, Clone, Default)]
struct XmlElement {
    name: String,
    attrs: BTreeMap<String, String>,
    children: Vec<XmlElement>,
    text: String,
}

impl XmlElement {
    fn from_dom(handle: &Handle) -> Option<XmlElement> {
        let NodeData::Element { name, attrs, .. } = &handle.data else {
            return None;
        };
        let mut element = XmlElement {
            name: name.local.to_string(),
            attrs: attrs
                .borrow()
                .iter()
                .map(|a| (a.name.local.to_string(), a.value.to_string()))
                .collect(),
            ..Default::default()
        };
        for child in handle.children.borrow().iter() {
            match &child.data {
                NodeData::Element { .. } => {
                    if let Some(el) = XmlElement::from_dom(child) {
                        element.children.push(el);
                    }
                }
                NodeData::Text { contents } => element.text.push_str(&contents.borrow()),
                _ => {}
            }
        }
        Some(element)
    }

    fn attr(&self, name: &str) -> Option<&str> {
        self.attrs.get(name).map(String::as_str)
    }

    fn named_children<'a>(&'a self, tag: &'a str) -> impl Iterator<Item = &'a XmlElement> + 'a {
        self.children.iter().filter(move |c| c.name == tag)
    }

    fn named_child<'s>(&'s self, tag: &str, name: &str) -> Option<&'s XmlElement> {
        self.children
            .iter()
            .find(|c| c.name == tag && c.attr("name") == Some(name))
    }

    fn field(&self, name: &str) -> Option<String> {
        self.named_child("field", name).map(|f| f.text.clone())
    }

    fn fields(&self) -> BTreeMap<String, String> {
        self.named_children("field")
            .filter_map(|f| f.attr("name").map(|n| (n.to_string(), f.text.clone())))
            .collect()
    }

    fn mutation(&self) -> Option<&XmlElement> {
        self.named_children("mutation").next()
    }

    fn mutation_attr(&self, name: &str) -> Option<&str> {
        self.mutation().and_then(|m| m.attr(name))
    }

    /// First `<block>` (or, failing that, `<shadow>`) directly inside `el`.
    fn inner_block(el: &XmlElement) -> Option<&XmlElement> {
        el.named_children("block")
            .next()
            .or_else(|| el.named_children("shadow").next())
    }

    fn value(&self, name: &str) -> Option<&XmlElement> {
        self.named_child("value", name).and_then(XmlElement::inner_block)
    }

    fn statement(&self, name: &str) -> Option<&XmlElement> {
        self.named_child("statement", name)
            .and_then(XmlElement::inner_block)
    }

    fn next_block(&self) -> Option<&XmlElement> {
        self.named_children("next")
            .next()
            .and_then(XmlElement::inner_block)
    }

    fn is_disabled(&self) -> bool {
        self.attr("disabled") == Some("true")
    }

    fn block_id(&self) -> String {
        self.attr("id").unwrap_or_default().to_string()
    }

    fn block_type(&self) -> &str {
        self.attr("type").unwrap_or_default()
    }

    /// Socket count for `prefix0..prefixN`: the mutation's `items` when given,
    /// otherwise one past the highest index present. Unbounded; see `BlockReader::bounded`.
    fn socket_count(&self, prefix: &str, default: usize) -> usize {
        if let Some(items) = self.mutation_attr("items").and_then(|v| v.parse().ok()) {
            return items;
        }
        self.named_children("value")
            .filter_map(|v| v.attr("name"))
            .filter_map(|n| n.strip_prefix(prefix))
            .filter_map(|i| i.parse::<usize>().ok())
            .map(|i| i.saturating_add(1))
            .max()
            .unwrap_or(default)
    }

    fn component_ref(&self) -> ComponentRef {
        let instance = self
            .mutation_attr("instance_name")
            .map(str::to_string)
            .or_else(|| self.field("COMPONENT_SELECTOR"))
            .unwrap_or_default();
        ComponentRef {
            instance,
            component_type: self
                .mutation_attr("component_type")
                .unwrap_or_default()
                .to_string(),
        }
    }

    fn is_generic(&self) -> bool {
        self.mutation_attr("is_generic") == Some("true")
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PARSING
// ═══════════════════════════════════════════════════════════════════════════════

pub fn parse_blocks(screen: &str, text: &str) -> Result<BlockProgram, ConversionError> {
    parse_blocks_with_deadline(screen, text, &Deadline::none())
}

pub fn parse_blocks_with_deadline(
    screen: &str,
    text: &str,
    deadline: &Deadline,
) -> Result<BlockProgram, ConversionError> {
    if text.trim().is_empty() {
        return Ok(BlockProgram::default());
    }

    let root = read_root(screen, text)?;
    let mut reader = BlockReader {
        screen,
        deadline,
        diagnostics: Vec::new(),
    };
    let mut program = BlockProgram::default();

    for top in root.named_children("block") {
        deadline.check(screen)?;
        if top.is_disabled() {
            reader.ignore(top, "it is disabled");
            continue;
        }
        match top.block_type() {
            "component_event" => {
                if let Some(handler) = reader.event_handler(top)? {
                    program.handlers.push(handler);
                }
            }
            "global_declaration" => {
                let name = top.field("NAME").unwrap_or_default();
                if name.trim().is_empty() {
                    reader.ignore(top, "it declares no name");
                    continue;
                }
                program.globals.push(GlobalVariable {
                    id: top.block_id(),
                    name,
                    value: reader.slot(top, "VALUE")?,
                });
            }
            _ => reader.ignore(top, "it is not attached to an event handler"),
        }
    }

    program.diagnostics = reader.diagnostics;
    tracing::debug!(
        screen,
        handlers = program.handlers.len(),
        globals = program.globals.len(),
        "parsed block descriptor"
    );
    Ok(program)
}

fn read_root(screen: &str, text: &str) -> Result<XmlElement, ConversionError> {
    let malformed = |reason: String| ConversionError::MalformedBlockDescriptor {
        screen: screen.to_string(),
        reason,
    };

    check_balanced(text).map_err(malformed)?;

    let dom: RcDom = parse_document(RcDom::default(), XmlParseOpts::default()).one(text);
    if let Some(first) = dom.errors.first() {
        return Err(malformed(format!("XML parse error: {}", first)));
    }

    let mut roots = dom
        .document
        .children
        .borrow()
        .iter()
        .filter_map(XmlElement::from_dom)
        .collect::<Vec<_>>();

    match roots.len() {
        0 => Err(malformed("no root element".to_string())),
        1 => {
            let root = roots.remove(0);
            if root.name == "xml" {
                Ok(root)
            } else {
                Err(malformed(format!("expected an <xml> root, found <{}>", root.name)))
            }
        }
        n => Err(malformed(format!("expected one root element, found {}", n))),
    }
}

struct BlockReader<'a> {
    screen: &'a str,
    deadline: &'a Deadline,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> BlockReader<'a> {
    fn ignore(&mut self, el: &XmlElement, why: &str) {
        tracing::debug!(screen = self.screen, block = el.block_type(), why, "ignoring block");
        self.diagnostics.push(Diagnostic::at(
            DIAG_IGNORED_BLOCK,
            &format!("Block `{}` was ignored: {}.", el.block_type(), why),
            self.screen,
            &el.block_id(),
        ));
    }

    fn event_handler(&mut self, el: &XmlElement) -> Result<Option<EventHandlerRoot>, ConversionError> {
        if el.is_generic() {
            self.diagnostics.push(Diagnostic::at(
                DIAG_OPAQUE_BLOCK,
                "Generic \"any component\" event handlers are not supported; handler skipped.",
                self.screen,
                &el.block_id(),
            ));
            return Ok(None);
        }

        let component = el.component_ref();
        let event = el.mutation_attr("event_name").unwrap_or_default().to_string();
        if component.instance.is_empty() || event.is_empty() {
            self.diagnostics.push(Diagnostic::with_details(
                DIAG_UNRESOLVED_REFERENCE,
                "Event handler does not name its component instance or event; handler skipped.",
                self.screen,
                Some(el.block_id()).filter(|id| !id.is_empty()),
                vec!["Expected `instance_name` and `event_name` on the block mutation.".to_string()],
            ));
            return Ok(None);
        }

        Ok(Some(EventHandlerRoot {
            id: el.block_id(),
            component,
            event,
            body: self.sequence(el.statement("DO"))?,
        }))
    }

    fn sequence(&mut self, first: Option<&XmlElement>) -> Result<Sequence, ConversionError> {
        let mut blocks = Vec::new();
        let mut cursor = first;
        while let Some(el) = cursor {
            if el.is_disabled() {
                self.ignore(el, "it is disabled");
            } else {
                blocks.push(self.block(el)?);
            }
            cursor = el.next_block();
        }
        Ok(blocks)
    }

    fn slot(&mut self, el: &XmlElement, name: &str) -> Result<Slot, ConversionError> {
        el.value(name)
            .map(|v| self.block(v).map(Box::new))
            .transpose()
    }

    fn slots(&mut self, el: &XmlElement, prefix: &str, default: usize) -> Result<Vec<Slot>, ConversionError> {
        let count = self.bounded(el, el.socket_count(prefix, default))?;
        let mut slots = Vec::with_capacity(count);
        for i in 0..count {
            self.deadline.check(self.screen)?;
            slots.push(self.slot(el, &format!("{}{}", prefix, i))?);
        }
        Ok(slots)
    }

    /// A socket count read from the descriptor, rejected above [`MAX_SOCKETS`].
    fn bounded(&self, el: &XmlElement, count: usize) -> Result<usize, ConversionError> {
        if count > MAX_SOCKETS {
            return Err(ConversionError::MalformedBlockDescriptor {
                screen: self.screen.to_string(),
                reason: format!(
                    "block `{}` declares {} sockets (at most {})",
                    el.block_id(),
                    count,
                    MAX_SOCKETS
                ),
            });
        }
        Ok(count)
    }

    fn block(&mut self, el: &XmlElement) -> Result<BlockNode, ConversionError> {
        self.deadline.check(self.screen)?;
        let kind = self.kind(el)?;
        Ok(BlockNode {
            id: el.block_id(),
            block_type: el.block_type().to_string(),
            kind,
        })
    }

    fn kind(&mut self, el: &XmlElement) -> Result<BlockKind, ConversionError> {
        let opaque = || BlockKind::Opaque { fields: el.fields() };

        let kind = match el.block_type() {
            "math_number" => BlockKind::Number(el.field("NUM").unwrap_or_default().trim().to_string()),
            "text" => BlockKind::Text(el.field("TEXT").unwrap_or_default()),
            "logic_boolean" => match el.field("BOOL").as_deref() {
                Some("TRUE") => BlockKind::Boolean(true),
                Some("FALSE") => BlockKind::Boolean(false),
                _ => opaque(),
            },
            "logic_false" => BlockKind::Boolean(false),

            "math_add" => BlockKind::Arithmetic {
                op: ArithmeticOp::Add,
                operands: self.slots(el, "NUM", 2)?,
            },
            "math_multiply" => BlockKind::Arithmetic {
                op: ArithmeticOp::Multiply,
                operands: self.slots(el, "NUM", 2)?,
            },
            "math_subtract" | "math_division" | "math_power" => {
                let op = match el.block_type() {
                    "math_subtract" => ArithmeticOp::Subtract,
                    "math_division" => ArithmeticOp::Divide,
                    _ => ArithmeticOp::Power,
                };
                BlockKind::Arithmetic {
                    op,
                    operands: vec![self.slot(el, "A")?, self.slot(el, "B")?],
                }
            }
            "math_neg" => BlockKind::Negate(self.slot(el, "NUM")?),
            "math_compare" | "logic_compare" => {
                let domain = if el.block_type() == "math_compare" {
                    CompareDomain::Math
                } else {
                    CompareDomain::Logic
                };
                match el.field("OP").as_deref().and_then(compare_op) {
                    Some(op) => BlockKind::Compare {
                        op,
                        domain,
                        left: self.slot(el, "A")?,
                        right: self.slot(el, "B")?,
                    },
                    None => opaque(),
                }
            }
            "text_compare" => match el.field("OP").as_deref().and_then(compare_op) {
                Some(op) => BlockKind::Compare {
                    op,
                    domain: CompareDomain::Text,
                    left: self.slot(el, "TEXT1")?,
                    right: self.slot(el, "TEXT2")?,
                },
                None => opaque(),
            },
            "logic_operation" => {
                let op = match el.field("OP").as_deref() {
                    Some("AND") => Some(LogicOp::And),
                    Some("OR") => Some(LogicOp::Or),
                    _ => None,
                };
                match op {
                    Some(op) => BlockKind::Logic {
                        op,
                        left: self.slot(el, "A")?,
                        right: self.slot(el, "B")?,
                    },
                    None => opaque(),
                }
            }
            "logic_negate" => BlockKind::Not(self.slot(el, "BOOL")?),

            "text_join" => BlockKind::TextJoin(self.slots(el, "ADD", 2)?),
            "text_length" => BlockKind::TextLength(self.slot(el, "VALUE")?),
            "text_isEmpty" => BlockKind::TextIsEmpty(self.slot(el, "VALUE")?),

            "lists_create_with" => {
                BlockKind::ListCreate(self.slots(el, "ADD", 0)?)
            }
            "lists_length" => BlockKind::ListLength(self.slot(el, "LIST")?),
            "lists_select_item" => BlockKind::ListSelect {
                list: self.slot(el, "LIST")?,
                index: self.slot(el, "NUM")?,
            },
            "lists_add_items" => BlockKind::ListAdd {
                list: self.slot(el, "LIST")?,
                items: self.slots(el, "ITEM", 1)?,
            },

            "component_set_get" if !el.is_generic() => {
                let component = el.component_ref();
                let property = el
                    .mutation_attr("property_name")
                    .map(str::to_string)
                    .or_else(|| el.field("PROP"))
                    .unwrap_or_default();
                if el.mutation_attr("set_or_get") == Some("set") {
                    BlockKind::PropertySet {
                        component,
                        property,
                        value: self.slot(el, "VALUE")?,
                    }
                } else {
                    BlockKind::PropertyGet { component, property }
                }
            }
            "component_method" if !el.is_generic() => BlockKind::MethodCall {
                component: el.component_ref(),
                method: el.mutation_attr("method_name").unwrap_or_default().to_string(),
                args: self.slots(el, "ARG", 0)?,
            },

            "lexical_variable_get" => BlockKind::VariableGet(variable_ref(
                &el.field("VAR").unwrap_or_default(),
            )),
            "lexical_variable_set" => BlockKind::VariableSet {
                variable: variable_ref(&el.field("VAR").unwrap_or_default()),
                value: self.slot(el, "VALUE")?,
            },
            "local_declaration_statement" => {
                let declared: Vec<String> = match el.mutation() {
                    Some(m) if m.named_children("localname").next().is_some() => m
                        .named_children("localname")
                        .filter_map(|l| l.attr("name").map(str::to_string))
                        .collect(),
                    _ => (0..)
                        .map_while(|i| el.field(&format!("VAR{}", i)))
                        .collect(),
                };
                let mut names = Vec::with_capacity(declared.len());
                for (i, name) in declared.into_iter().enumerate() {
                    let init = self.slot(el, &format!("DECL{}", i))?;
                    names.push((name, init));
                }
                BlockKind::LocalDeclaration {
                    names,
                    body: self.sequence(el.statement("STACK"))?,
                }
            }

            "controls_if" => {
                let else_ifs = el
                    .mutation_attr("elseif")
                    .and_then(|v| v.parse::<usize>().ok())
                    .unwrap_or(0);
                let else_ifs = self.bounded(el, else_ifs)?;
                let mut branches = Vec::with_capacity(else_ifs + 1);
                for i in 0..=else_ifs {
                    self.deadline.check(self.screen)?;
                    let condition = self.slot(el, &format!("IF{}", i))?;
                    let body = self.sequence(el.statement(&format!("DO{}", i)))?;
                    branches.push((condition, body));
                }
                let otherwise = if el.mutation_attr("else") == Some("1") {
                    Some(self.sequence(el.statement("ELSE"))?)
                } else {
                    None
                };
                BlockKind::If { branches, otherwise }
            }
            "controls_while" => BlockKind::While {
                condition: self.slot(el, "TEST")?,
                body: self.sequence(el.statement("DO"))?,
            },
            "controls_forRange" => BlockKind::ForRange {
                variable: el.field("VAR").unwrap_or_else(|| "number".to_string()),
                start: self.slot(el, "START")?,
                end: self.slot(el, "END")?,
                step: self.slot(el, "STEP")?,
                body: self.sequence(el.statement("DO"))?,
            },
            "controls_forEach" => BlockKind::ForEach {
                variable: el.field("VAR").unwrap_or_else(|| "item".to_string()),
                list: self.slot(el, "LIST")?,
                body: self.sequence(el.statement("DO"))?,
            },

            _ => opaque(),
        };
        Ok(kind)
    }
}

fn compare_op(op: &str) -> Option<CompareOp> {
    match op {
        "EQ" | "EQUAL" => Some(CompareOp::Eq),
        "NEQ" => Some(CompareOp::Neq),
        "LT" => Some(CompareOp::Lt),
        "LTE" => Some(CompareOp::Lte),
        "GT" => Some(CompareOp::Gt),
        "GTE" => Some(CompareOp::Gte),
        _ => None,
    }
}

fn variable_ref(raw: &str) -> VariableRef {
    match raw.trim().strip_prefix("global ") {
        Some(name) => VariableRef {
            name: name.trim().to_string(),
            global: true,
        },
        None => VariableRef {
            name: raw.trim().to_string(),
            global: false,
        },
    }
}

/// Every tag must be closed by a matching end tag, and no deeper than
/// [`MAX_NESTING`]. The DOM builder closes whatever is still open at end of
/// input, so a cut-off descriptor only shows up here.
fn check_balanced(text: &str) -> Result<(), String> {
    let mut open: Vec<&str> = Vec::new();
    for caps in MARKUP_RE.captures_iter(text) {
        let whole = caps.get(0).map_or("", |m| m.as_str());
        let Some(name) = caps.get(2).map(|m| m.as_str()) else {
            if whole == "<" {
                let at = caps.get(0).map_or(0, |m| m.start());
                return Err(format!("unterminated markup at byte {}", at));
            }
            continue;
        };
        let closing = caps.get(1).is_some_and(|m| !m.as_str().is_empty());
        let self_closing = caps.get(3).is_some_and(|m| !m.as_str().is_empty());

        if closing {
            match open.pop() {
                Some(expected) if expected == name => {}
                Some(expected) => {
                    return Err(format!("expected </{}>, found </{}>", expected, name));
                }
                None => return Err(format!("unexpected </{}>", name)),
            }
        } else if !self_closing {
            open.push(name);
            if open.len() > MAX_NESTING {
                return Err(format!("elements nested deeper than {}", MAX_NESTING));
            }
        }
    }
    match open.last() {
        Some(name) => Err(format!("<{}> is never closed", name)),
        None => Ok(()),
    }
}
