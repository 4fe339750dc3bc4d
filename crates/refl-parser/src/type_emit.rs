//! Walks a built `TypeNode` tree, streaming the flat `beginType/typeName/endType` events a
//! sink reconstructs into its own materialized form.
//!
//! Mirrors the original's `TypeNodeWriter` visitor: a pointer/reference/r-value-reference
//! wrapper recurses into its base with an empty declarator name, while literal/template/
//! function/constructor/destructor nodes call `type_name` with their own stored name,
//! overwriting whatever declarator name the caller supplied. The declarator name is only
//! load-bearing for the *outermost* wrapper kinds — it lets `int* p` surface `p` on the
//! pointer's own node while the literal `int` base still gets its own nested node.

use refl_common::{TypeNode, TypeNodeData};

use crate::event_sink::EventSink;

pub fn emit_type_node(sink: &mut dyn EventSink, node: &TypeNode, declarator_name: &str) {
    sink.begin_type(node.kind(), node.specifiers);
    if !declarator_name.is_empty() {
        sink.type_name(declarator_name);
    }

    match &node.data {
        TypeNodeData::None => {}
        TypeNodeData::Pointer(base) | TypeNodeData::Reference(base) | TypeNodeData::LReference(base) => {
            emit_type_node(sink, base, "");
        }
        TypeNodeData::Literal { name, parent }
        | TypeNodeData::Variadic { name, parent }
        | TypeNodeData::Constructor { name, parent }
        | TypeNodeData::Destructor { name, parent } => {
            if let Some(parent) = parent {
                emit_type_node(sink, parent, "");
            }
            sink.type_name(name);
        }
        TypeNodeData::Template { name, arguments } => {
            sink.type_name(name);
            for arg in arguments {
                emit_type_node(sink, arg, "");
            }
        }
        TypeNodeData::Function { returns, name, arguments }
        | TypeNodeData::FunctionPointer { returns, name, arguments } => {
            sink.type_name(name.as_deref().unwrap_or(""));
            emit_type_node(sink, returns, "");
            for arg in arguments {
                emit_type_node(sink, &arg.ty, &arg.name);
            }
        }
    }

    sink.end_type();
}

#[cfg(test)]
mod tests {
    use super::*;
    use refl_common::{AccessControl, ScopeKind, Specifiers, TypeKind};

    #[derive(Default)]
    struct RecordingSink {
        events: Vec<String>,
    }

    impl EventSink for RecordingSink {
        fn begin(&mut self, _source: &str) {}
        fn end(&mut self, _source: &str, _error: &str) {}
        fn include(&mut self, _filename: &str) {}
        fn comment(&mut self, _text: &str) {}
        fn access(&mut self, _access: AccessControl) {}
        fn using_(&mut self, _has_assignment: bool) {}
        fn friend_(&mut self) {}
        fn begin_enum(&mut self, _l: u32, _n: &str, _b: &str, _c: bool) {}
        fn enum_value(&mut self, _k: &str, _v: &str) {}
        fn end_enum(&mut self, _n: &str) {}
        fn begin_class(&mut self, _l: u32, _n: &str, _k: ScopeKind) {}
        fn base_type(&mut self) {}
        fn end_class(&mut self, _n: &str, _f: bool) {}
        fn begin_namespace(&mut self, _n: &str) {}
        fn end_namespace(&mut self, _n: &str) {}
        fn begin_template(&mut self) {}
        fn template_argument(&mut self, _n: &str, _d: bool) {}
        fn end_template(&mut self) {}
        fn begin_type(&mut self, kind: TypeKind, _s: Specifiers) {
            self.events.push(format!("begin_type({kind:?})"));
        }
        fn type_name(&mut self, name: &str) {
            self.events.push(format!("type_name({name})"));
        }
        fn end_type(&mut self) {
            self.events.push("end_type".to_string());
        }
        fn begin_property(&mut self, _l: u32, _n: &str, _s: Specifiers) {}
        fn array_subscript(&mut self, _n: &str) {}
        fn end_property(&mut self, _n: &str) {}
        fn begin_function(&mut self, _l: u32, _k: TypeKind, _n: &str) {}
        fn function_argument(&mut self, _n: &str, _d: &str) {}
        fn end_function(&mut self, _n: &str, _s: Specifiers) {}
        fn begin_typedef(&mut self, _l: u32, _n: &str) {}
        fn end_typedef(&mut self, _n: &str) {}
        fn begin_macro(&mut self, _n: &str) {}
        fn macro_argument(&mut self, _n: &str) {}
        fn end_macro(&mut self, _n: &str) {}
    }

    #[test]
    fn pointer_wrapper_keeps_declarator_name_on_outer_node() {
        let mut sink = RecordingSink::default();
        let ptr = TypeNode {
            specifiers: Specifiers::default(),
            signedness: Default::default(),
            size: Default::default(),
            data: TypeNodeData::Pointer(Box::new(TypeNode::literal("int"))),
        };
        emit_type_node(&mut sink, &ptr, "p");
        assert_eq!(
            sink.events,
            vec![
                "begin_type(Pointer)",
                "type_name(p)",
                "begin_type(Literal)",
                "type_name(int)",
                "end_type",
                "end_type",
            ]
        );
    }

    #[test]
    fn literal_declarator_name_is_overwritten_by_own_name() {
        let mut sink = RecordingSink::default();
        let lit = TypeNode::literal("int");
        emit_type_node(&mut sink, &lit, "x");
        assert_eq!(
            sink.events,
            vec!["begin_type(Literal)", "type_name(x)", "type_name(int)", "end_type"]
        );
    }
}
