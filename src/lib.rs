//! # Block project → native Android converter
//!
//! Converts one screen of a visual block-based project into a native Android
//! layout document and a Java activity.
//!
//! ## Pipeline
//!
//! 1. **Layout tree** (`parse`): the `.scm` component descriptor becomes a
//!    [`ComponentNode`] tree. Structural failure is fatal; a bad node or
//!    property is skipped and reported.
//! 2. **Layout markup** (`layout`): mapped components become elements with
//!    generated ids. The [`ComponentRegistry`] records instance name → id.
//! 3. **Block graph** (`blocks`): the `.bky` XML becomes a [`BlockProgram`] of
//!    event handlers and globals.
//! 4. **Source** (`codegen`): handlers compile to listeners on the registered
//!    views.
//!
//! ## Invariants
//!
//! 1. **Determinism**: identical input and table yield byte-identical
//!    artifacts. Every counter lives in the run that uses it.
//! 2. **Shared table**: the [`MappingTable`] is read-only and passed by
//!    reference, so concurrent runs share it without locks.
//! 3. **Graceful degradation**: only malformed descriptors, the deadline and
//!    identifier exhaustion abort a run. Everything else is a [`Diagnostic`].
//! 4. **Binding by name**: blocks reach components through their declared
//!    instance name, resolved against the registry of the same run.

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::time::Duration;

mod blocks;
mod codegen;
mod deadline;
mod discovery;
mod error;
mod finalize;
mod layout;
mod mapping;
mod parse;
mod renamer;
mod scope;
mod validate;

#[cfg(test)]
mod codegen_tests;
#[cfg(test)]
mod layout_tests;

pub use blocks::{
    parse_blocks, ArithmeticOp, BlockKind, BlockNode, BlockProgram, CompareDomain, CompareOp,
    ComponentRef, EventHandlerRoot, GlobalVariable, LogicOp, Role, Sequence, Slot, VariableRef,
};
pub use codegen::{compile_program, CompiledSource};
pub use deadline::Deadline;
pub use discovery::{convert_project_dir, discover_screens, entry_screen, load_screen, ScreenFiles};
pub use error::ConversionError;
pub use finalize::{compute_digest, write_artifacts, Artifact, ConversionOutput};
pub use layout::{generate_layout, ComponentBinding, ComponentRegistry, LayoutOutput};
pub use mapping::{
    AccessorRule, AttributeKind, AttributeRule, Coercion, EventParam, EventRule, MappingRule,
    MappingTable, MethodRule,
};
pub use parse::{parse_layout, ComponentNode, LayoutTree, PropertyValue};
pub use renamer::{class_name, java_identifier, IdAllocator};
pub use validate::*;

// ═══════════════════════════════════════════════════════════════════════════════
// OPTIONS & INPUT
// ═══════════════════════════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConvertOptions {
    /// Java package of the generated activity.
    pub package: String,
    /// Wall-clock budget for one screen; `None` never times out.
    pub timeout: Option<Duration>,
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            package: "com.example.app".to_string(),
            timeout: None,
        }
    }
}

/// One screen's descriptors, as UTF-8 text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScreenSource {
    pub name: String,
    /// Component-tree descriptor (`.scm`).
    pub layout: String,
    /// Block-graph descriptor (`.bky`); may be empty.
    #[serde(default)]
    pub blocks: String,
}

impl ScreenSource {
    pub fn new(name: &str, layout: &str, blocks: &str) -> Self {
        Self {
            name: name.to_string(),
            layout: layout.to_string(),
            blocks: blocks.to_string(),
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// PIPELINE
// ═══════════════════════════════════════════════════════════════════════════════

/// Convert one screen. Either every artifact is produced or the first fatal
/// error is returned; nothing partial escapes.
pub fn convert_screen(
    source: &ScreenSource,
    table: &MappingTable,
    options: &ConvertOptions,
) -> Result<ConversionOutput, ConversionError> {
    let screen = source.name.as_str();
    let deadline = Deadline::after(options.timeout);
    tracing::info!(screen, "converting screen");

    let tree = parse::parse_layout_with_deadline(screen, &source.layout, &deadline)?;
    let layout = generate_layout(screen, &tree.root, table, &deadline)?;
    let program = blocks::parse_blocks_with_deadline(screen, &source.blocks, &deadline)?;
    let compiled = compile_program(screen, &program, &layout.registry, table, options, &deadline)?;

    let mut diagnostics = tree.diagnostics;
    diagnostics.extend(layout.diagnostics);
    diagnostics.extend(program.diagnostics);
    diagnostics.extend(compiled.diagnostics);

    if !diagnostics.is_empty() {
        tracing::warn!(screen, count = diagnostics.len(), "conversion finished with diagnostics");
    }

    Ok(finalize::finalize_output(
        screen,
        &options.package,
        &compiled.class_name,
        layout.markup,
        compiled.source,
        diagnostics,
    ))
}

/// Convert independent screens in parallel. Results keep input order.
pub fn convert_batch(
    sources: &[ScreenSource],
    table: &MappingTable,
    options: &ConvertOptions,
) -> Vec<Result<ConversionOutput, ConversionError>> {
    sources
        .par_iter()
        .map(|source| convert_screen(source, table, options))
        .collect()
}
