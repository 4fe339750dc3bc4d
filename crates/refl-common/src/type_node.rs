//! The polymorphic type tree.
//!
//! The original reference implementation dispatches over type-node kinds with a virtual
//! visitor. Rust has no need for that: one tagged enum with exhaustive `match` at every call
//! site gives the same "visit each kind" shape without a vtable, and the compiler checks that
//! every kind is handled whenever a new one is added.

use serde::Serialize;

use crate::specifiers::{Signedness, Size, Specifiers};

/// The discriminant carried standalone in `beginType`/`beginFunction` events, independent of
/// the owned tree payload (the sink reconstructs the tree from a flat stream of these).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TypeKind {
    None,
    Pointer,
    Reference,
    LReference,
    Literal,
    Template,
    Function,
    Variadic,
    Constructor,
    Destructor,
    FunctionPointer,
}

/// One named, possibly-defaulted function argument: `(name, type)`.
#[derive(Debug, Clone)]
pub struct Argument {
    pub name: String,
    pub ty: TypeNode,
}

/// One parsed type expression. Strictly tree-shaped: every child is owned exclusively, there
/// is no sharing and no cycles. A `parent` slot (on the name-bearing variants) links `X<T>::Y`
/// qualifier chains and is itself owning.
#[derive(Debug, Clone)]
pub struct TypeNode {
    pub specifiers: Specifiers,
    pub signedness: Signedness,
    pub size: Size,
    pub data: TypeNodeData,
}

#[derive(Debug, Clone)]
pub enum TypeNodeData {
    None,
    Pointer(Box<TypeNode>),
    Reference(Box<TypeNode>),
    LReference(Box<TypeNode>),
    Literal {
        name: String,
        parent: Option<Box<TypeNode>>,
    },
    Variadic {
        name: String,
        parent: Option<Box<TypeNode>>,
    },
    Constructor {
        name: String,
        parent: Option<Box<TypeNode>>,
    },
    Destructor {
        name: String,
        parent: Option<Box<TypeNode>>,
    },
    Template {
        name: String,
        arguments: Vec<TypeNode>,
    },
    Function {
        returns: Box<TypeNode>,
        name: Option<String>,
        arguments: Vec<Argument>,
    },
    FunctionPointer {
        returns: Box<TypeNode>,
        name: Option<String>,
        arguments: Vec<Argument>,
    },
}

impl TypeNode {
    pub fn none() -> Self {
        TypeNode {
            specifiers: Specifiers::default(),
            signedness: Signedness::None,
            size: Size::None,
            data: TypeNodeData::None,
        }
    }

    pub fn literal(name: impl Into<String>) -> Self {
        TypeNode {
            specifiers: Specifiers::default(),
            signedness: Signedness::None,
            size: Size::None,
            data: TypeNodeData::Literal {
                name: name.into(),
                parent: None,
            },
        }
    }

    pub fn kind(&self) -> TypeKind {
        match &self.data {
            TypeNodeData::None => TypeKind::None,
            TypeNodeData::Pointer(_) => TypeKind::Pointer,
            TypeNodeData::Reference(_) => TypeKind::Reference,
            TypeNodeData::LReference(_) => TypeKind::LReference,
            TypeNodeData::Literal { .. } => TypeKind::Literal,
            TypeNodeData::Variadic { .. } => TypeKind::Variadic,
            TypeNodeData::Constructor { .. } => TypeKind::Constructor,
            TypeNodeData::Destructor { .. } => TypeKind::Destructor,
            TypeNodeData::Template { .. } => TypeKind::Template,
            TypeNodeData::Function { .. } => TypeKind::Function,
            TypeNodeData::FunctionPointer { .. } => TypeKind::FunctionPointer,
        }
    }

    /// The declared name, for the variants that carry one.
    pub fn name(&self) -> Option<&str> {
        match &self.data {
            TypeNodeData::Literal { name, .. }
            | TypeNodeData::Variadic { name, .. }
            | TypeNodeData::Constructor { name, .. }
            | TypeNodeData::Destructor { name, .. }
            | TypeNodeData::Template { name, .. } => Some(name),
            TypeNodeData::Function { name, .. } | TypeNodeData::FunctionPointer { name, .. } => {
                name.as_deref()
            }
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pointer_wraps_base_and_reports_pointer_kind() {
        let base = TypeNode::literal("int");
        let ptr = TypeNode {
            specifiers: Specifiers::default(),
            signedness: Signedness::None,
            size: Size::None,
            data: TypeNodeData::Pointer(Box::new(base)),
        };
        assert_eq!(ptr.kind(), TypeKind::Pointer);
        assert_eq!(ptr.name(), None);
    }

    #[test]
    fn literal_name_is_reachable() {
        let lit = TypeNode::literal("Foo");
        assert_eq!(lit.name(), Some("Foo"));
        assert_eq!(lit.kind(), TypeKind::Literal);
    }
}
