use serde::{Deserialize, Serialize};

// ═══════════════════════════════════════════════════════════════════════════════
// DIAGNOSTIC CODES
// ═══════════════════════════════════════════════════════════════════════════════

pub const DIAG_UNMAPPED_COMPONENT: &str = "UnmappedComponentType";
pub const DIAG_INVALID_PROPERTY: &str = "InvalidProperty";
pub const DIAG_MALFORMED_COMPONENT: &str = "MalformedComponent";
pub const DIAG_UNRESOLVED_REFERENCE: &str = "UnresolvedReferenceError";
pub const DIAG_OPAQUE_BLOCK: &str = "OpaqueBlockEncountered";
pub const DIAG_MISSING_VALUE: &str = "MissingValue";
pub const DIAG_UNMAPPED_EVENT: &str = "UnmappedEvent";
pub const DIAG_IGNORED_BLOCK: &str = "IgnoredBlock";
pub const DIAG_MISPLACED_BLOCK: &str = "MisplacedBlock";
pub const DIAG_INVALID_LITERAL: &str = "InvalidLiteral";

// ═══════════════════════════════════════════════════════════════════════════════
// GUARANTEES
// ═══════════════════════════════════════════════════════════════════════════════

fn get_guarantee(code: &str) -> &'static str {
    match code {
        DIAG_UNMAPPED_COMPONENT => {
            "Components without a mapping rule are left out of the layout together with their children."
        }
        DIAG_INVALID_PROPERTY => "Only string, number and boolean property values reach the layout.",
        DIAG_MALFORMED_COMPONENT => "A malformed component never discards its siblings.",
        DIAG_UNRESOLVED_REFERENCE => {
            "Unresolved names compile to a placeholder; the rest of the handler still emits."
        }
        DIAG_OPAQUE_BLOCK => "Unsupported blocks are kept as explicit markers, never dropped silently.",
        DIAG_MISSING_VALUE => "Empty required sockets are reported, never guessed.",
        DIAG_UNMAPPED_EVENT => "Events without a listener rule are emitted as commented handlers.",
        DIAG_IGNORED_BLOCK => "Disabled and free-standing top-level blocks never run.",
        DIAG_MISPLACED_BLOCK => "Statements and values only compile in their own position.",
        DIAG_INVALID_LITERAL => "Literals keep their source typing or are reported.",
        _ => "Unknown diagnostic.",
    }
}

// ═══════════════════════════════════════════════════════════════════════════════
// DIAGNOSTIC
// ═══════════════════════════════════════════════════════════════════════════════

/// A recoverable, node- or block-level defect. Every skip or placeholder path
/// produces exactly one of these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Diagnostic {
    pub code: String,
    pub message: String,
    pub guarantee: String,
    pub screen: String,
    /// Component instance name or block id the defect was found on.
    pub context: Option<String>,
    pub hints: Vec<String>,
}

impl Diagnostic {
    pub fn new(code: &str, message: &str, screen: &str) -> Self {
        Self::with_details(code, message, screen, None, vec![])
    }

    pub fn with_details(
        code: &str,
        message: &str,
        screen: &str,
        context: Option<String>,
        hints: Vec<String>,
    ) -> Self {
        Diagnostic {
            code: code.to_string(),
            message: message.to_string(),
            guarantee: get_guarantee(code).to_string(),
            screen: screen.to_string(),
            context,
            hints,
        }
    }

    pub fn at(code: &str, message: &str, screen: &str, context: &str) -> Self {
        let context = if context.is_empty() {
            None
        } else {
            Some(context.to_string())
        };
        Self::with_details(code, message, screen, context, vec![])
    }

    pub fn is(&self, code: &str) -> bool {
        self.code == code
    }
}

/// Number of diagnostics carrying `code`.
pub fn count_code(diagnostics: &[Diagnostic], code: &str) -> usize {
    diagnostics.iter().filter(|d| d.is(code)).count()
}
