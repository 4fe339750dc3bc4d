//! The document tree the typedb sink builds. A small owned tree rather than an XML DOM: the
//! reference emitter this is grounded on uses `pugixml`, but nothing else in this workspace
//! pulls in an XML library, so the tree is serialized as JSON instead via `serde_json`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DocNode {
    pub name: String,
    pub attrs: Vec<(String, String)>,
    pub children: Vec<DocNode>,
}

impl DocNode {
    pub fn new(name: impl Into<String>) -> Self {
        DocNode {
            name: name.into(),
            attrs: Vec::new(),
            children: Vec::new(),
        }
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_attr(key, value);
        self
    }

    pub fn set_attr(&mut self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        match self.attrs.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.attrs.push((key, value)),
        }
    }

    pub fn attr(&self, key: &str) -> Option<&str> {
        self.attrs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    /// Finds a child by name, creating an empty one if none exists yet. Mirrors the reference
    /// emitter's `rewriteChild`: idempotent find-or-create rather than always-append.
    pub fn rewrite_child_mut(&mut self, name: &str) -> &mut DocNode {
        if let Some(idx) = self.children.iter().position(|c| c.name == name) {
            &mut self.children[idx]
        } else {
            self.children.push(DocNode::new(name));
            self.children.last_mut().expect("just pushed")
        }
    }
}
