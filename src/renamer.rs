//! Identifier synthesis.
//!
//! Every generated name comes from a per-run [`IdAllocator`]: sequential
//! counters keyed by prefix, checked against everything already handed out.
//! No randomness and no process-wide state, so identical input always yields
//! identical identifiers.

use lazy_static::lazy_static;
use regex::Regex;
use std::collections::{HashMap, HashSet};

lazy_static! {
    static ref NON_IDENT_RE: Regex = Regex::new(r"[^A-Za-z0-9_]+").unwrap();

    pub static ref JAVA_KEYWORDS: HashSet<&'static str> = {
        let mut s = HashSet::new();
        for kw in [
            "abstract", "assert", "boolean", "break", "byte", "case", "catch", "char",
            "class", "const", "continue", "default", "do", "double", "else", "enum",
            "extends", "final", "finally", "float", "for", "goto", "if", "implements",
            "import", "instanceof", "int", "interface", "long", "native", "new",
            "package", "private", "protected", "public", "return", "short", "static",
            "strictfp", "super", "switch", "synchronized", "this", "throw", "throws",
            "transient", "try", "void", "volatile", "while", "var", "record", "yield",
            "true", "false", "null",
        ] {
            s.insert(kw);
        }
        s
    };
}

#[derive(Debug, Default)]
pub struct IdAllocator {
    counters: HashMap<String, u32>,
    used: HashSet<String>,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `id` as taken without going through a counter.
    pub fn reserve(&mut self, id: &str) -> bool {
        self.used.insert(id.to_string())
    }

    pub fn is_used(&self, id: &str) -> bool {
        self.used.contains(id)
    }

    /// Give `id` back so a sibling scope may reuse it.
    pub fn release(&mut self, id: &str) -> bool {
        self.used.remove(id)
    }

    /// Next free `<prefix><n>`, starting at 1. `None` once the counter space
    /// for `prefix` is exhausted.
    pub fn allocate(&mut self, prefix: &str) -> Option<String> {
        let counter = self.counters.entry(prefix.to_string()).or_insert(0);
        loop {
            *counter = counter.checked_add(1)?;
            let candidate = format!("{}{}", prefix, counter);
            if self.used.insert(candidate.clone()) {
                return Some(candidate);
            }
        }
    }

    /// `base` itself if free, otherwise `base_2`, `base_3`, ...
    pub fn fresh(&mut self, base: &str) -> Option<String> {
        if self.used.insert(base.to_string()) {
            return Some(base.to_string());
        }
        let mut n: u32 = 1;
        loop {
            n = n.checked_add(1)?;
            let candidate = format!("{}_{}", base, n);
            if self.used.insert(candidate.clone()) {
                return Some(candidate);
            }
        }
    }
}

/// Turn a block-level name into a legal Java identifier.
pub fn java_identifier(name: &str) -> String {
    let mut ident = NON_IDENT_RE.replace_all(name.trim(), "_").into_owned();
    if ident.is_empty() {
        ident.push_str("_v");
    }
    if ident.starts_with(|c: char| c.is_ascii_digit()) {
        ident.insert(0, '_');
    }
    if JAVA_KEYWORDS.contains(ident.as_str()) {
        ident.push('_');
    }
    ident
}

/// Java class name for a screen: identifier-safe with an upper-case initial.
pub fn class_name(screen: &str) -> String {
    let ident = java_identifier(screen);
    let mut chars = ident.chars();
    match chars.next() {
        Some(first) if first.is_ascii_lowercase() => {
            first.to_ascii_uppercase().to_string() + chars.as_str()
        }
        _ => ident,
    }
}

/// Layout resource name for a screen, without extension.
pub fn layout_name(screen: &str) -> String {
    format!("activity_{}", java_identifier(screen).to_ascii_lowercase())
}
