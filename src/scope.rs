//! Lexical scope for block variables.
//!
//! A stack of frames mapping block-level names to the Java local that holds
//! them. Lookup is innermost-first. Java forbids a local from shadowing an
//! enclosing local, so a nested declaration of a live name gets a fresh
//! suffixed identifier; names are released when their frame pops and sibling
//! scopes reuse them.

use lazy_static::lazy_static;
use std::collections::{HashMap, HashSet};

use crate::renamer::{java_identifier, IdAllocator};

lazy_static! {
    /// Names the generated activity already refers to unqualified.
    pub static ref ACTIVITY_RESERVED: HashSet<&'static str> = {
        let mut s = HashSet::new();
        // Android
        s.insert("R");
        s.insert("View");
        s.insert("Bundle");
        s.insert("savedInstanceState");
        s.insert("onCreate");
        s.insert("bindEvents");
        s.insert("setContentView");
        s.insert("findViewById");

        // java.lang
        s.insert("Math");
        s.insert("String");
        s.insert("Object");
        s.insert("Integer");
        s.insert("Double");
        s.insert("Boolean");
        s.insert("java");
        s.insert("android");
        s.insert("androidx");
        s
    };
}

#[derive(Debug, Default)]
struct Frame {
    bindings: HashMap<String, String>,
    allocated: Vec<String>,
}

#[derive(Debug)]
pub struct Scope {
    frames: Vec<Frame>,
    names: IdAllocator,
}

impl Scope {
    /// A scope with one open frame. `reserved` names (fields, lambda
    /// parameters) are never handed out to locals.
    pub fn new<'r>(reserved: impl IntoIterator<Item = &'r str>) -> Self {
        let mut names = IdAllocator::new();
        for name in ACTIVITY_RESERVED.iter() {
            names.reserve(name);
        }
        for name in reserved {
            names.reserve(name);
        }
        Self {
            frames: vec![Frame::default()],
            names,
        }
    }

    pub fn push(&mut self) {
        self.frames.push(Frame::default());
    }

    pub fn pop(&mut self) {
        if self.frames.len() == 1 {
            return;
        }
        if let Some(frame) = self.frames.pop() {
            for name in &frame.allocated {
                self.names.release(name);
            }
        }
    }

    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Bind `name` in the innermost frame and return its Java identifier.
    /// `None` only when the suffix space is exhausted.
    pub fn declare(&mut self, name: &str) -> Option<String> {
        let java = self.names.fresh(&java_identifier(name))?;
        let frame = self.frames.last_mut()?;
        frame.allocated.push(java.clone());
        frame.bindings.insert(name.to_string(), java.clone());
        Some(java)
    }

    pub fn resolve(&self, name: &str) -> Option<&str> {
        self.frames
            .iter()
            .rev()
            .find_map(|f| f.bindings.get(name))
            .map(String::as_str)
    }
}
