use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// One node of a trace tree. Attribute values are scalar strings only; the
/// builder stringifies scalars and drops anything else.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Span {
    pub name: String,
    pub attributes: BTreeMap<String, String>,
    pub children: Vec<Span>,
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Span {
    /// Depth-first count of spans in this tree, including self.
    pub fn node_count(&self) -> usize {
        1 + self.children.iter().map(Span::node_count).sum::<usize>()
    }

    /// Find a descendant (or self) by name, depth-first.
    pub fn find(&self, name: &str) -> Option<&Span> {
        if self.name == name {
            return Some(self);
        }
        self.children.iter().find_map(|c| c.find(name))
    }

    /// `end >= start` here and in every descendant, and no child interval
    /// exceeds its parent's.
    pub fn is_well_formed(&self) -> bool {
        self.end >= self.start
            && self.children.iter().all(|c| {
                c.start >= self.start && c.end <= self.end && c.is_well_formed()
            })
    }
}

struct OpenSpan {
    name: String,
    attributes: BTreeMap<String, String>,
    children: Vec<Span>,
    start: DateTime<Utc>,
}

impl OpenSpan {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            attributes: BTreeMap::new(),
            children: Vec::new(),
            start: Utc::now(),
        }
    }

    fn close(self, end: DateTime<Utc>) -> Span {
        Span {
            name: self.name,
            attributes: self.attributes,
            children: self.children,
            start: self.start,
            // Clock adjustments must not violate end >= start.
            end: end.max(self.start),
        }
    }
}

/// Assembles one cycle's span tree as steps complete.
///
/// `finish()` closes every still-open span, so the tree is complete even when
/// the cycle terminates abnormally — partial trees are emitted, never dropped.
pub struct TraceBuilder {
    root: OpenSpan,
    /// Open descendants, outermost first. Push/pop keeps nesting well formed.
    stack: Vec<OpenSpan>,
}

impl TraceBuilder {
    pub fn new(root_name: &str) -> Self {
        Self {
            root: OpenSpan::new(root_name),
            stack: Vec::new(),
        }
    }

    /// Open a child of the innermost open span.
    pub fn push(&mut self, name: &str) {
        self.stack.push(OpenSpan::new(name));
    }

    /// Close the innermost open span and attach it to its parent. No-op at
    /// the root — the root only closes through `finish()`.
    pub fn pop(&mut self) {
        if let Some(open) = self.stack.pop() {
            let span = open.close(Utc::now());
            match self.stack.last_mut() {
                Some(parent) => parent.children.push(span),
                None => self.root.children.push(span),
            }
        }
    }

    /// Set a string attribute on the innermost open span.
    pub fn set_attribute(&mut self, key: &str, value: impl Into<String>) {
        let target = self.stack.last_mut().unwrap_or(&mut self.root);
        target.attributes.insert(key.to_string(), value.into());
    }

    /// Set an attribute from a JSON value. Scalars are stringified; arrays,
    /// objects, and null are logged and dropped — never a crash.
    pub fn set_json_attribute(&mut self, key: &str, value: &serde_json::Value) {
        match scalar_string(value) {
            Some(s) => self.set_attribute(key, s),
            None => warn!(key, "dropping non-scalar trace attribute"),
        }
    }

    /// How many spans are currently open below the root.
    pub fn open_depth(&self) -> usize {
        self.stack.len()
    }

    /// Close everything and return the finished tree.
    pub fn finish(mut self) -> Span {
        while !self.stack.is_empty() {
            self.pop();
        }
        self.root.close(Utc::now())
    }
}

fn scalar_string(value: &serde_json::Value) -> Option<String> {
    match value {
        serde_json::Value::String(s) => Some(s.clone()),
        serde_json::Value::Number(n) => Some(n.to_string()),
        serde_json::Value::Bool(b) => Some(b.to_string()),
        serde_json::Value::Null | serde_json::Value::Array(_) | serde_json::Value::Object(_) => None,
    }
}
