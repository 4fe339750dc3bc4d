//! A materialized type tree the typedb sink reconstructs from the flat `beginType`/`typeName`/
//! `endType` event stream, and its textual rendering for `type`/`returns`/`spec` attributes.

use refl_common::{AccessControl, Specifiers, TypeKind};

#[derive(Debug, Clone)]
pub struct TypeData {
    pub kind: TypeKind,
    pub access: AccessControl,
    pub specifiers: Specifiers,
    pub name: String,
    pub children: Vec<TypeData>,
}

/// A materialized template parameter: its constraint type, its own name, and an optional
/// default type, all already rendered to strings.
#[derive(Debug, Clone)]
pub struct TemplateArgument {
    pub ty: String,
    pub name: String,
    pub default: String,
}

impl TypeData {
    pub fn none() -> Self {
        TypeData {
            kind: TypeKind::None,
            access: AccessControl::Public,
            specifiers: Specifiers::default(),
            name: String::new(),
            children: Vec::new(),
        }
    }

    /// Mirrors the reference emitter's storage-specifier prefix exactly, quirk included: a
    /// `mutable` specifier discards any `static`/`constexpr` text already appended and short-
    /// circuits before `volatile` is considered.
    fn storage_prefix(&self) -> String {
        let s = self.specifiers;
        let mut out = String::new();
        if s.is_static {
            out.push_str("static ");
        }
        if s.is_constexpr {
            out.push_str("constexpr ");
        }
        if s.is_inline {
            out.push_str("inline ");
        } else if s.is_const {
            out.push_str("const ");
        } else if s.is_mutable {
            return "mutable ".to_string();
        }
        if s.is_volatile {
            out.push_str("volatile ");
        }
        out
    }

    /// Renders the tree to the same textual form the reference emitter's `TypeData::ToString`
    /// produces, e.g. `int*p`, `std::vector<int>`, `void(int,const Foo&)`.
    pub fn to_type_string(&self) -> String {
        let stor = self.storage_prefix();
        match self.kind {
            TypeKind::Pointer => {
                format!("{stor}{}*{}", self.children[0].to_type_string(), self.name)
            }
            TypeKind::Reference => {
                format!("{stor}{}&{}", self.children[0].to_type_string(), self.name)
            }
            TypeKind::LReference => {
                format!("{stor}{}&&{}", self.children[0].to_type_string(), self.name)
            }
            TypeKind::Literal => match self.children.first() {
                Some(parent) => format!("{stor}{}::{}", parent.to_type_string(), self.name),
                None => format!("{stor}{}", self.name),
            },
            TypeKind::Variadic => format!("{stor}{}", self.name),
            TypeKind::Template => {
                let args: Vec<String> = self.children.iter().map(TypeData::to_type_string).collect();
                format!("{}<{}>", self.name, args.join(","))
            }
            TypeKind::Function | TypeKind::FunctionPointer => {
                let mut s = self.children.first().map(TypeData::to_type_string).unwrap_or_default();
                s.push('(');
                if self.kind == TypeKind::FunctionPointer {
                    s.push_str("*)(");
                }
                let args: Vec<String> =
                    self.children.iter().skip(1).map(TypeData::to_type_string).collect();
                s.push_str(&args.join(","));
                s.push(')');
                s
            }
            TypeKind::Constructor => self.name.clone(),
            TypeKind::Destructor => "void".to_string(),
            TypeKind::None => String::new(),
        }
    }
}
