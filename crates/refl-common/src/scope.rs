//! Scope kinds and access control, shared between the parser and every sink.

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ScopeKind {
    Unknown,
    Global,
    Namespace,
    Class,
    Structure,
    Union,
}

impl ScopeKind {
    /// The access-control default a scope of this kind starts with.
    pub fn default_access(&self) -> AccessControl {
        match self {
            ScopeKind::Class => AccessControl::Private,
            _ => AccessControl::Public,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ScopeKind::Global => "global",
            ScopeKind::Namespace => "namespace",
            ScopeKind::Class => "class",
            ScopeKind::Structure => "struct",
            ScopeKind::Union => "union",
            ScopeKind::Unknown => "unknown",
        }
    }

    /// Maps a record-introducing keyword to its scope kind. `class -> Class`, `struct ->
    /// Structure`, `union -> Union`, everything else `Unknown`.
    pub fn from_record_keyword(keyword: &str) -> ScopeKind {
        match keyword {
            "class" => ScopeKind::Class,
            "struct" => ScopeKind::Structure,
            "union" => ScopeKind::Union,
            _ => ScopeKind::Unknown,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum AccessControl {
    Public,
    Protected,
    Private,
}

impl AccessControl {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessControl::Public => "public",
            AccessControl::Protected => "protected",
            AccessControl::Private => "private",
        }
    }
}

/// One entry in the parser's scope stack. Index 0 is always a sentinel `Global` scope with
/// `Public` access.
#[derive(Debug, Clone)]
pub struct Scope {
    pub kind: ScopeKind,
    pub name: String,
    pub access: AccessControl,
}

impl Scope {
    pub fn global() -> Self {
        Scope {
            kind: ScopeKind::Global,
            name: String::new(),
            access: AccessControl::Public,
        }
    }

    pub fn new(kind: ScopeKind, name: impl Into<String>) -> Self {
        Scope {
            access: kind.default_access(),
            kind,
            name: name.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn class_scope_defaults_private_others_public() {
        assert_eq!(ScopeKind::Class.default_access(), AccessControl::Private);
        assert_eq!(ScopeKind::Structure.default_access(), AccessControl::Public);
        assert_eq!(ScopeKind::Union.default_access(), AccessControl::Public);
        assert_eq!(ScopeKind::Namespace.default_access(), AccessControl::Public);
    }

    #[test]
    fn record_keyword_mapping_has_no_dead_branch() {
        assert_eq!(ScopeKind::from_record_keyword("class"), ScopeKind::Class);
        assert_eq!(ScopeKind::from_record_keyword("struct"), ScopeKind::Structure);
        assert_eq!(ScopeKind::from_record_keyword("union"), ScopeKind::Union);
        assert_eq!(ScopeKind::from_record_keyword("enum"), ScopeKind::Unknown);
    }
}
