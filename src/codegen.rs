//! Block-to-Code Compiler
//!
//! Turns a [`BlockProgram`] into one Java activity class. Component
//! references resolve through the [`ComponentRegistry`] produced by layout
//! generation, property and method access through the mapping table's
//! templates, and variables through a per-handler [`Scope`].
//!
//! Nothing here aborts on a bad block. Opaque blocks, unresolved names, empty
//! sockets, unmapped events and blocks in the wrong position each compile to
//! a commented placeholder and one diagnostic. Only the deadline and
//! identifier exhaustion are fatal.

use serde::Serialize;
use std::collections::{HashMap, HashSet};

use crate::blocks::{
    ArithmeticOp, BlockKind, BlockNode, BlockProgram, CompareDomain, CompareOp, ComponentRef,
    EventHandlerRoot, LogicOp, Role, Slot, VariableRef,
};
use crate::deadline::Deadline;
use crate::error::ConversionError;
use crate::layout::{ComponentBinding, ComponentRegistry};
use crate::mapping::{expand_template, Coercion, MappingRule, MappingTable};
use crate::renamer::{class_name, java_identifier, layout_name, IdAllocator};
use crate::scope::Scope;
use crate::validate::{
    Diagnostic, DIAG_IGNORED_BLOCK, DIAG_INVALID_LITERAL, DIAG_MISPLACED_BLOCK, DIAG_MISSING_VALUE,
    DIAG_OPAQUE_BLOCK, DIAG_UNMAPPED_EVENT, DIAG_UNRESOLVED_REFERENCE,
};
use crate::ConvertOptions;

const INDENT: &str = "    ";

const IMPORTS: &[&str] = &[
    "android.os.Bundle",
    "android.view.View",
    "android.widget.*",
    "androidx.appcompat.app.AppCompatActivity",
];

// ═══════════════════════════════════════════════════════════════════════════════
// OUTPUT TYPES
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompiledSource {
    pub class_name: String,
    pub source: String,
    pub diagnostics: Vec<Diagnostic>,
}

// ═══════════════════════════════════════════════════════════════════════════════
// ENTRY POINT
// ═══════════════════════════════════════════════════════════════════════════════

pub fn compile_program(
    screen: &str,
    program: &BlockProgram,
    registry: &ComponentRegistry,
    table: &MappingTable,
    options: &ConvertOptions,
    deadline: &Deadline,
) -> Result<CompiledSource, ConversionError> {
    let mut members = IdAllocator::new();
    for binding in registry.iter() {
        members.reserve(&binding.id);
    }
    for name in ["onCreate", "bindEvents"] {
        members.reserve(name);
    }

    let mut compiler = Compiler {
        screen,
        registry,
        table,
        deadline,
        globals: HashMap::new(),
        global_types: Vec::new(),
        fields: Vec::new(),
        field_ids: HashSet::new(),
        members,
        diagnostics: Vec::new(),
    };

    let global_inits = compiler.globals(program)?;

    let mut listeners = String::new();
    let mut init_methods: Vec<(String, String)> = Vec::new();
    for handler in &program.handlers {
        compiler.handler(handler, &mut listeners, &mut init_methods)?;
    }

    let class = class_name(screen);
    let source = compiler.assemble(&class, options, &global_inits, &listeners, &init_methods);

    tracing::debug!(
        screen,
        class = %class,
        handlers = program.handlers.len(),
        diagnostics = compiler.diagnostics.len(),
        "compiled block program"
    );

    Ok(CompiledSource {
        class_name: class,
        source,
        diagnostics: compiler.diagnostics,
    })
}

struct Compiler<'a> {
    screen: &'a str,
    registry: &'a ComponentRegistry,
    table: &'a MappingTable,
    deadline: &'a Deadline,
    /// Block-level global name → Java field.
    globals: HashMap<String, String>,
    /// Java field, declared type, in declaration order.
    global_types: Vec<(String, &'static str)>,
    /// Component fields in first-reference order.
    fields: Vec<&'a ComponentBinding>,
    field_ids: HashSet<String>,
    members: IdAllocator,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> Compiler<'a> {
    // ───────────────────────────────────────────────────────────────────────────
    // Class structure
    // ───────────────────────────────────────────────────────────────────────────

    /// Declare every global first so initializers may refer to one another,
    /// then compile the initializers in source order.
    fn globals(&mut self, program: &BlockProgram) -> Result<Vec<String>, ConversionError> {
        let mut declared = Vec::new();
        for global in &program.globals {
            if self.globals.contains_key(&global.name) {
                self.report(Diagnostic::at(
                    DIAG_IGNORED_BLOCK,
                    &format!("Global `{}` is declared more than once; the first declaration is used.", global.name),
                    self.screen,
                    &global.id,
                ));
                continue;
            }
            let field = self
                .members
                .fresh(&java_identifier(&global.name))
                .ok_or_else(|| self.collision(&global.name))?;
            self.globals.insert(global.name.clone(), field.clone());
            self.global_types
                .push((field.clone(), declared_type(global.value.as_deref())));
            declared.push((field, global));
        }

        let scope = Scope::new(self.reserved().iter().map(String::as_str));
        let mut inits = Vec::with_capacity(declared.len());
        for (field, global) in declared {
            let value = match &global.value {
                Some(node) => self.expression(node, &scope)?,
                None => self.missing(&global.id, "initial value"),
            };
            inits.push(format!("{} = {};", field, value));
        }
        Ok(inits)
    }

    fn handler(
        &mut self,
        handler: &EventHandlerRoot,
        listeners: &mut String,
        init_methods: &mut Vec<(String, String)>,
    ) -> Result<(), ConversionError> {
        self.deadline.check(self.screen)?;

        let registry = self.registry;
        let table = self.table;
        let resolved = registry
            .resolve(&handler.component.instance)
            .and_then(|binding| table.lookup(&binding.component_type).map(|rule| (binding, rule)));

        let Some((binding, rule)) = resolved else {
            self.unresolved(&format!("component `{}`", handler.component.instance), &handler.id);
            return self.commented_handler(handler, "refers to an unknown component", listeners);
        };
        let Some(event) = rule.event(&handler.event) else {
            tracing::warn!(screen = self.screen, component = %binding.component_type, event = %handler.event, "unmapped event");
            self.report(Diagnostic::with_details(
                DIAG_UNMAPPED_EVENT,
                &format!(
                    "Event `{}.{}` has no listener mapping; the handler was emitted as a comment.",
                    handler.component.instance, handler.event
                ),
                self.screen,
                Some(handler.id.clone()).filter(|id| !id.is_empty()),
                vec![format!(
                    "Add `{}` to the `{}` events in the component mapping table.",
                    handler.event, binding.component_type
                )],
            ));
            return self.commented_handler(handler, "has no listener mapping", listeners);
        };

        if event.listener.is_some() {
            self.use_field(binding);
        }
        let mut reserved = self.reserved();
        reserved.extend(event.lambda_params.iter().cloned());
        let mut scope = Scope::new(reserved.iter().map(String::as_str));

        let body_depth = if event.listener.is_some() { 3 } else { 2 };
        let mut body = String::new();
        for param in &event.params {
            let java = scope
                .declare(&param.name)
                .ok_or_else(|| self.collision(&param.name))?;
            line(&mut body, body_depth, &format!("var {} = {};", java, param.value));
        }
        self.sequence(&handler.body, &mut scope, body_depth, &mut body)?;
        if let Some(returns) = &event.returns {
            line(&mut body, body_depth, &format!("return {};", returns));
        }

        match &event.listener {
            Some(listener) => {
                let params = match event.lambda_params.as_slice() {
                    [single] => single.clone(),
                    many => format!("({})", many.join(", ")),
                };
                line(listeners, 2, &format!("{}.{}({} -> {{", binding.id, listener, params));
                listeners.push_str(&body);
                line(listeners, 2, "});");
            }
            None => {
                let base = format!("{}{}", binding.id, java_identifier(&handler.event));
                let name = self.members.fresh(&base).ok_or_else(|| self.collision(&base))?;
                init_methods.push((name, body));
            }
        }
        Ok(())
    }

    /// Compile a handler that cannot be installed and keep it as comments.
    fn commented_handler(
        &mut self,
        handler: &EventHandlerRoot,
        why: &str,
        listeners: &mut String,
    ) -> Result<(), ConversionError> {
        let mut scope = Scope::new(self.reserved().iter().map(String::as_str));
        let mut body = String::new();
        self.sequence(&handler.body, &mut scope, 1, &mut body)?;

        line(
            listeners,
            2,
            &format!(
                "// when {}.{} ({})",
                comment_text(&handler.component.instance),
                comment_text(&handler.event),
                why
            ),
        );
        for text in body.lines() {
            line(listeners, 2, &format!("//{}", text));
        }
        Ok(())
    }

    fn assemble(
        &self,
        class: &str,
        options: &ConvertOptions,
        global_inits: &[String],
        listeners: &str,
        init_methods: &[(String, String)],
    ) -> String {
        let mut out = String::new();
        if !options.package.is_empty() {
            out.push_str(&format!("package {};\n\n", options.package));
        }
        for import in IMPORTS {
            out.push_str(&format!("import {};\n", import));
        }
        out.push('\n');
        out.push_str(&format!("public class {} extends AppCompatActivity {{\n", class));

        if !self.fields.is_empty() || !self.global_types.is_empty() {
            out.push('\n');
        }
        for binding in &self.fields {
            line(&mut out, 1, &format!("private {} {};", binding.java_type, binding.id));
        }
        for (field, ty) in &self.global_types {
            line(&mut out, 1, &format!("private {} {};", ty, field));
        }

        out.push('\n');
        line(&mut out, 1, "@Override");
        line(&mut out, 1, "protected void onCreate(Bundle savedInstanceState) {");
        line(&mut out, 2, "super.onCreate(savedInstanceState);");
        line(&mut out, 2, &format!("setContentView(R.layout.{});", layout_name(self.screen)));
        for binding in &self.fields {
            line(&mut out, 2, &format!("{} = findViewById(R.id.{});", binding.id, binding.id));
        }
        for init in global_inits {
            line(&mut out, 2, init);
        }
        line(&mut out, 2, "bindEvents();");
        for (name, _) in init_methods {
            line(&mut out, 2, &format!("{}();", name));
        }
        line(&mut out, 1, "}");

        out.push('\n');
        line(&mut out, 1, "private void bindEvents() {");
        out.push_str(listeners);
        line(&mut out, 1, "}");

        for (name, body) in init_methods {
            out.push('\n');
            line(&mut out, 1, &format!("private void {}() {{", name));
            out.push_str(body);
            line(&mut out, 1, "}");
        }

        out.push_str("}\n");
        out
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Statements
    // ───────────────────────────────────────────────────────────────────────────

    fn sequence(
        &mut self,
        blocks: &[BlockNode],
        scope: &mut Scope,
        depth: usize,
        out: &mut String,
    ) -> Result<(), ConversionError> {
        for block in blocks {
            self.statement(block, scope, depth, out)?;
        }
        Ok(())
    }

    /// A nested statement body with its own frame.
    fn nested(
        &mut self,
        blocks: &[BlockNode],
        scope: &mut Scope,
        depth: usize,
        out: &mut String,
    ) -> Result<(), ConversionError> {
        scope.push();
        let result = self.sequence(blocks, scope, depth, out);
        scope.pop();
        result
    }

    fn statement(
        &mut self,
        node: &BlockNode,
        scope: &mut Scope,
        depth: usize,
        out: &mut String,
    ) -> Result<(), ConversionError> {
        self.deadline.check(self.screen)?;

        match &node.kind {
            BlockKind::PropertySet {
                component,
                property,
                value,
            } => {
                let value_text = self.value(value, node, "VALUE", scope)?;
                match self.component(component, &node.id) {
                    Some((target, rule)) => {
                        let (template, coercion) = rule.setter(property);
                        let coerced = coerce(&value_text, coercion, value.as_deref());
                        let call = expand_template(&template, &target, &[coerced]);
                        line(out, depth, &format!("{};", call));
                    }
                    None => line(
                        out,
                        depth,
                        &format!(
                            "// unresolved: set {}.{} to {}",
                            comment_text(&component.instance),
                            comment_text(property),
                            comment_text(&value_text)
                        ),
                    ),
                }
            }
            BlockKind::MethodCall { .. } => {
                let call = self.expression(node, scope)?;
                if call.starts_with("null /*") {
                    line(out, depth, &format!("// {}", comment_text(&call)));
                } else {
                    line(out, depth, &format!("{};", call));
                }
            }
            BlockKind::VariableSet { variable, value } => {
                let value_text = self.value(value, node, "VALUE", scope)?;
                match self.variable(variable, scope, &node.id) {
                    Some(java) => line(out, depth, &format!("{} = {};", java, value_text)),
                    None => line(
                        out,
                        depth,
                        &format!(
                            "// unresolved: set {} to {}",
                            comment_text(&variable.name),
                            comment_text(&value_text)
                        ),
                    ),
                }
            }
            BlockKind::LocalDeclaration { names, body } => {
                // initializers see the enclosing scope only
                let mut inits = Vec::with_capacity(names.len());
                for (i, (name, init)) in names.iter().enumerate() {
                    let text = self.value(init, node, &format!("DECL{}", i), scope)?;
                    inits.push((name, declared_type(init.as_deref()), text));
                }
                for (name, ty, text) in inits {
                    let java = scope.declare(name).ok_or_else(|| self.collision(name))?;
                    line(out, depth, &format!("{} {} = {};", ty, java, text));
                }
                self.sequence(body, scope, depth, out)?;
            }
            BlockKind::If {
                branches,
                otherwise,
            } => {
                for (i, (condition, body)) in branches.iter().enumerate() {
                    let test = self.value(condition, node, &format!("IF{}", i), scope)?;
                    if i == 0 {
                        line(out, depth, &format!("if ({}) {{", test));
                    } else {
                        line(out, depth, &format!("}} else if ({}) {{", test));
                    }
                    self.nested(body, scope, depth + 1, out)?;
                }
                if let Some(body) = otherwise {
                    line(out, depth, "} else {");
                    self.nested(body, scope, depth + 1, out)?;
                }
                line(out, depth, "}");
            }
            BlockKind::While { condition, body } => {
                let test = self.value(condition, node, "TEST", scope)?;
                line(out, depth, &format!("while ({}) {{", test));
                self.nested(body, scope, depth + 1, out)?;
                line(out, depth, "}");
            }
            BlockKind::ForRange {
                variable,
                start,
                end,
                step,
                body,
            } => {
                let from = self.value(start, node, "START", scope)?;
                let to = self.value(end, node, "END", scope)?;
                let by = self.value(step, node, "STEP", scope)?;
                let comparison = if is_negative(step.as_deref()) { ">=" } else { "<=" };

                scope.push();
                let result = match scope.declare(variable) {
                    Some(java) => {
                        line(
                            out,
                            depth,
                            &format!(
                                "for (double {j} = {}; {j} {} {}; {j} += {}) {{",
                                from,
                                comparison,
                                to,
                                by,
                                j = java
                            ),
                        );
                        self.sequence(body, scope, depth + 1, out)
                    }
                    None => Err(self.collision(variable)),
                };
                scope.pop();
                result?;
                line(out, depth, "}");
            }
            BlockKind::ForEach {
                variable,
                list,
                body,
            } => {
                let items = self.value(list, node, "LIST", scope)?;
                scope.push();
                let result = match scope.declare(variable) {
                    Some(java) => {
                        line(
                            out,
                            depth,
                            &format!("for (Object {} : (Iterable<?>) {}) {{", java, items),
                        );
                        self.sequence(body, scope, depth + 1, out)
                    }
                    None => Err(self.collision(variable)),
                };
                scope.pop();
                result?;
                line(out, depth, "}");
            }
            BlockKind::ListAdd { list, items } => {
                let target = self.value(list, node, "LIST", scope)?;
                let mut args = vec![format!("(java.util.List<Object>) {}", target)];
                for (i, item) in items.iter().enumerate() {
                    args.push(self.value(item, node, &format!("ITEM{}", i), scope)?);
                }
                line(
                    out,
                    depth,
                    &format!("java.util.Collections.addAll({});", args.join(", ")),
                );
            }
            BlockKind::Opaque { .. } => {
                self.opaque(node);
                line(
                    out,
                    depth,
                    &format!("// unsupported block: {}", comment_text(&node.block_type)),
                );
            }
            _ => {
                self.report(Diagnostic::at(
                    DIAG_MISPLACED_BLOCK,
                    &format!("Value block `{}` stands where a statement is expected.", node.block_type),
                    self.screen,
                    &node.id,
                ));
                line(
                    out,
                    depth,
                    &format!("// misplaced value block: {}", comment_text(&node.block_type)),
                );
            }
        }
        Ok(())
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Expressions
    // ───────────────────────────────────────────────────────────────────────────

    fn value(
        &mut self,
        slot: &Slot,
        owner: &BlockNode,
        socket: &str,
        scope: &Scope,
    ) -> Result<String, ConversionError> {
        match slot {
            Some(node) => self.expression(node, scope),
            None => Ok(self.missing(&owner.id, &format!("`{}` socket of `{}`", socket, owner.block_type))),
        }
    }

    fn values(
        &mut self,
        slots: &[Slot],
        owner: &BlockNode,
        prefix: &str,
        scope: &Scope,
    ) -> Result<Vec<String>, ConversionError> {
        slots
            .iter()
            .enumerate()
            .map(|(i, slot)| self.value(slot, owner, &format!("{}{}", prefix, i), scope))
            .collect()
    }

    fn expression(&mut self, node: &BlockNode, scope: &Scope) -> Result<String, ConversionError> {
        self.deadline.check(self.screen)?;

        if node.role() == Role::Statement {
            self.report(Diagnostic::at(
                DIAG_MISPLACED_BLOCK,
                &format!("Statement block `{}` stands where a value is expected.", node.block_type),
                self.screen,
                &node.id,
            ));
            return Ok(format!("null /* misplaced statement: {} */", comment_text(&node.block_type)));
        }

        let text = match &node.kind {
            BlockKind::Number(raw) => match number_literal(raw) {
                Some(n) => n,
                None => {
                    self.report(Diagnostic::at(
                        DIAG_INVALID_LITERAL,
                        &format!("`{}` is not a number.", raw),
                        self.screen,
                        &node.id,
                    ));
                    format!("0 /* invalid number: {} */", comment_text(raw))
                }
            },
            BlockKind::Text(text) => format!("\"{}\"", escape_java(text)),
            BlockKind::Boolean(b) => b.to_string(),

            BlockKind::Arithmetic { op, operands } => {
                let prefix = match op {
                    ArithmeticOp::Add | ArithmeticOp::Multiply => "NUM",
                    _ => "",
                };
                let args = if prefix.is_empty() {
                    vec![
                        self.value(operands.first().unwrap_or(&None), node, "A", scope)?,
                        self.value(operands.get(1).unwrap_or(&None), node, "B", scope)?,
                    ]
                } else {
                    self.values(operands, node, prefix, scope)?
                };
                arithmetic(*op, &args)
            }
            BlockKind::Negate(operand) => {
                let v = self.value(operand, node, "NUM", scope)?;
                if v.starts_with('-') {
                    format!("(- {})", v)
                } else {
                    format!("(-{})", v)
                }
            }
            BlockKind::Compare {
                op,
                domain,
                left,
                right,
            } => {
                let (a_name, b_name) = match domain {
                    CompareDomain::Text => ("TEXT1", "TEXT2"),
                    _ => ("A", "B"),
                };
                let a = self.value(left, node, a_name, scope)?;
                let b = self.value(right, node, b_name, scope)?;
                compare(*op, *domain, &a, &b)
            }
            BlockKind::Logic { op, left, right } => {
                let a = self.value(left, node, "A", scope)?;
                let b = self.value(right, node, "B", scope)?;
                let symbol = match op {
                    LogicOp::And => "&&",
                    LogicOp::Or => "||",
                };
                format!("({} {} {})", a, symbol, b)
            }
            BlockKind::Not(operand) => format!("(!{})", self.value(operand, node, "BOOL", scope)?),

            BlockKind::TextJoin(parts) => {
                let parts = self.values(parts, node, "ADD", scope)?;
                match parts.as_slice() {
                    [] => "\"\"".to_string(),
                    [single] => format!("String.valueOf({})", single),
                    many => format!(
                        "({})",
                        many.iter()
                            .map(|p| format!("String.valueOf({})", p))
                            .collect::<Vec<_>>()
                            .join(" + ")
                    ),
                }
            }
            BlockKind::TextLength(operand) => {
                format!("String.valueOf({}).length()", self.value(operand, node, "VALUE", scope)?)
            }
            BlockKind::TextIsEmpty(operand) => {
                format!("String.valueOf({}).isEmpty()", self.value(operand, node, "VALUE", scope)?)
            }

            BlockKind::ListCreate(items) => {
                let items = self.values(items, node, "ADD", scope)?;
                if items.is_empty() {
                    "new java.util.ArrayList<Object>()".to_string()
                } else {
                    format!(
                        "new java.util.ArrayList<Object>(java.util.Arrays.asList({}))",
                        items.join(", ")
                    )
                }
            }
            BlockKind::ListLength(list) => {
                format!("((java.util.List<?>) {}).size()", self.value(list, node, "LIST", scope)?)
            }
            BlockKind::ListSelect { list, index } => {
                let list = self.value(list, node, "LIST", scope)?;
                let index = self.value(index, node, "NUM", scope)?;
                format!("((java.util.List<?>) {}).get((int) {} - 1)", list, index)
            }

            BlockKind::PropertyGet {
                component,
                property,
            } => match self.component(component, &node.id) {
                Some((target, rule)) => expand_template(&rule.getter(property), &target, &[]),
                None => format!("null /* unresolved: {} */", comment_text(&component.instance)),
            },
            BlockKind::MethodCall {
                component,
                method,
                args,
            } => {
                // arguments compile in declared order even when the call is unresolved
                let mut compiled = self.values(args, node, "ARG", scope)?;
                match self.component(component, &node.id) {
                    Some((target, rule)) => {
                        let (template, arity) = rule.method(method);
                        for i in compiled.len()..arity {
                            compiled.push(self.missing(&node.id, &format!("`ARG{}` socket of `{}`", i, method)));
                        }
                        expand_template(&template, &target, &compiled)
                    }
                    None => format!("null /* unresolved: {} */", comment_text(&component.instance)),
                }
            }

            BlockKind::VariableGet(variable) => match self.variable(variable, scope, &node.id) {
                Some(java) => java,
                None => format!("null /* unresolved: {} */", comment_text(&variable.name)),
            },

            BlockKind::Opaque { .. } => {
                self.opaque(node);
                format!("null /* unsupported block: {} */", comment_text(&node.block_type))
            }

            // statement kinds returned above
            _ => format!("null /* misplaced statement: {} */", comment_text(&node.block_type)),
        };
        Ok(text)
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Resolution
    // ───────────────────────────────────────────────────────────────────────────

    fn component(&mut self, component: &ComponentRef, at: &str) -> Option<(String, &'a MappingRule)> {
        let registry: &'a ComponentRegistry = self.registry;
        let table: &'a MappingTable = self.table;
        let found = registry
            .resolve(&component.instance)
            .and_then(|binding| table.lookup(&binding.component_type).map(|rule| (binding, rule)));
        match found {
            Some((binding, rule)) => {
                self.use_field(binding);
                Some((binding.id.clone(), rule))
            }
            None => {
                let what = if component.instance.is_empty() {
                    "a component block with no instance name".to_string()
                } else {
                    format!("component `{}`", component.instance)
                };
                self.unresolved(&what, at);
                None
            }
        }
    }

    fn variable(&mut self, variable: &VariableRef, scope: &Scope, at: &str) -> Option<String> {
        let found = if variable.global {
            self.globals.get(&variable.name).cloned()
        } else {
            scope.resolve(&variable.name).map(str::to_string)
        };
        if found.is_none() {
            let what = if variable.global {
                format!("global variable `{}`", variable.name)
            } else {
                format!("variable `{}`", variable.name)
            };
            self.unresolved(&what, at);
        }
        found
    }

    fn use_field(&mut self, binding: &'a ComponentBinding) {
        if self.field_ids.insert(binding.id.clone()) {
            self.fields.push(binding);
        }
    }

    /// Names locals must never take: every view field and every global field.
    fn reserved(&self) -> Vec<String> {
        self.registry
            .iter()
            .map(|b| b.id.clone())
            .chain(self.global_types.iter().map(|(field, _)| field.clone()))
            .collect()
    }

    // ───────────────────────────────────────────────────────────────────────────
    // Diagnostics
    // ───────────────────────────────────────────────────────────────────────────

    fn report(&mut self, diagnostic: Diagnostic) {
        tracing::debug!(
            screen = self.screen,
            code = %diagnostic.code,
            context = diagnostic.context.as_deref().unwrap_or(""),
            "{}",
            diagnostic.message
        );
        self.diagnostics.push(diagnostic);
    }

    fn unresolved(&mut self, what: &str, at: &str) {
        self.report(Diagnostic::at(
            DIAG_UNRESOLVED_REFERENCE,
            &format!("Reference to {} could not be resolved.", what),
            self.screen,
            at,
        ));
    }

    fn missing(&mut self, at: &str, what: &str) -> String {
        self.report(Diagnostic::at(
            DIAG_MISSING_VALUE,
            &format!("The {} is empty.", what),
            self.screen,
            at,
        ));
        "null /* missing value */".to_string()
    }

    fn opaque(&mut self, node: &BlockNode) {
        tracing::warn!(screen = self.screen, block = %node.block_type, "unsupported block");
        self.report(Diagnostic::at(
            DIAG_OPAQUE_BLOCK,
            &format!("Block type `{}` is not supported and was left as a marker.", node.block_type),
            self.screen,
            &node.id,
        ));
    }

    fn collision(&self, name: &str) -> ConversionError {
        ConversionError::IdentifierCollision {
            screen: self.screen.to_string(),
            id: name.to_string(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// HELPERS
// ═══════════════════════════════════════════════════════════════════════════════

fn line(out: &mut String, depth: usize, text: &str) {
    out.push_str(&INDENT.repeat(depth));
    out.push_str(text);
    out.push('\n');
}

fn arithmetic(op: ArithmeticOp, args: &[String]) -> String {
    match op {
        ArithmeticOp::Add | ArithmeticOp::Multiply => {
            let (separator, identity) = if op == ArithmeticOp::Add {
                (" + ", "0")
            } else {
                (" * ", "1")
            };
            match args {
                [] => identity.to_string(),
                [single] => format!("({})", single),
                many => format!("({})", many.join(separator)),
            }
        }
        ArithmeticOp::Subtract => format!("({} - {})", args[0], args[1]),
        ArithmeticOp::Divide => format!("((double) {} / {})", args[0], args[1]),
        ArithmeticOp::Power => format!("Math.pow({}, {})", args[0], args[1]),
    }
}

fn compare(op: CompareOp, domain: CompareDomain, a: &str, b: &str) -> String {
    let symbol = match op {
        CompareOp::Eq => "==",
        CompareOp::Neq => "!=",
        CompareOp::Lt => "<",
        CompareOp::Lte => "<=",
        CompareOp::Gt => ">",
        CompareOp::Gte => ">=",
    };
    match (domain, op) {
        (CompareDomain::Math, _) => format!("({} {} {})", a, symbol, b),
        (CompareDomain::Logic, CompareOp::Eq) => format!("java.util.Objects.equals({}, {})", a, b),
        (CompareDomain::Logic, _) => format!("(!java.util.Objects.equals({}, {}))", a, b),
        (CompareDomain::Text, CompareOp::Eq) => {
            format!("String.valueOf({}).equals(String.valueOf({}))", a, b)
        }
        (CompareDomain::Text, CompareOp::Neq) => {
            format!("(!String.valueOf({}).equals(String.valueOf({})))", a, b)
        }
        (CompareDomain::Text, _) => format!(
            "(String.valueOf({}).compareTo(String.valueOf({})) {} 0)",
            a, b, symbol
        ),
    }
}

/// Apply a setter's declared coercion to a compiled value.
fn coerce(value: &str, coercion: Coercion, node: Option<&BlockNode>) -> String {
    match coercion {
        Coercion::None => value.to_string(),
        Coercion::Text => match node.map(|n| &n.kind) {
            None | Some(BlockKind::Text(_)) | Some(BlockKind::TextJoin(_)) => value.to_string(),
            _ => format!("String.valueOf({})", value),
        },
        _ if node.is_none() => value.to_string(),
        Coercion::Float => format!("(float) {}", cast_operand(value)),
        Coercion::Int => format!("(int) {}", cast_operand(value)),
    }
}

fn cast_operand(value: &str) -> String {
    let simple = value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
    if simple {
        value.to_string()
    } else {
        format!("({})", value)
    }
}

/// Java type for a declaration initialized by `init`.
fn declared_type(init: Option<&BlockNode>) -> &'static str {
    match init.map(|n| &n.kind) {
        Some(BlockKind::Number(_))
        | Some(BlockKind::Arithmetic { .. })
        | Some(BlockKind::Negate(_))
        | Some(BlockKind::TextLength(_))
        | Some(BlockKind::ListLength(_)) => "double",
        Some(BlockKind::Text(_)) | Some(BlockKind::TextJoin(_)) => "String",
        Some(BlockKind::Boolean(_))
        | Some(BlockKind::Compare { .. })
        | Some(BlockKind::Logic { .. })
        | Some(BlockKind::Not(_))
        | Some(BlockKind::TextIsEmpty(_)) => "boolean",
        Some(BlockKind::ListCreate(_)) => "java.util.List<Object>",
        _ => "Object",
    }
}

fn is_negative(step: Option<&BlockNode>) -> bool {
    match step.map(|n| &n.kind) {
        Some(BlockKind::Number(raw)) => raw.trim().starts_with('-'),
        Some(BlockKind::Negate(_)) => true,
        _ => false,
    }
}

/// Normalize a numeric field into a Java literal, `None` when it is not a
/// finite number.
fn number_literal(raw: &str) -> Option<String> {
    let text = raw.trim();
    let text = text.strip_prefix('+').unwrap_or(text);
    let parsed: f64 = text.parse().ok()?;
    if !parsed.is_finite() {
        return None;
    }
    let integral = text
        .strip_prefix('-')
        .unwrap_or(text)
        .chars()
        .all(|c| c.is_ascii_digit());
    if integral {
        // leading zeros would read as octal
        return Some(match text.parse::<i32>() {
            Ok(n) => n.to_string(),
            Err(_) => format!("{:?}", parsed),
        });
    }
    Some(text.to_string())
}

pub fn escape_java(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len() + 2);
    for c in value.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            '"' => escaped.push_str("\\\""),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\t' => escaped.push_str("\\t"),
            c if c.is_control() => escaped.push_str(&format!("\\u{:04x}", c as u32)),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Text safe inside both `//` and `/* */` comments.
fn comment_text(value: &str) -> String {
    value.replace("*/", "* /").replace(['\n', '\r'], " ")
}
