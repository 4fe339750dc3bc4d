//! Wraps any other sink by reference, forwarding every call unchanged while additionally
//! logging it through `tracing`. Grounded on `DebugParserInterface`, simplified: rather than
//! reconstructing a parallel `TypeData` tree purely to pretty-print type strings in the log
//! line (as the original does), each event is logged with its own raw arguments. Selected with
//! `--debug`.

use refl_common::{AccessControl, ScopeKind, Specifiers, TypeKind};
use refl_parser::EventSink;

pub struct DebugSink<'a> {
    inner: &'a mut dyn EventSink,
}

impl<'a> DebugSink<'a> {
    pub fn new(inner: &'a mut dyn EventSink) -> Self {
        DebugSink { inner }
    }
}

impl<'a> EventSink for DebugSink<'a> {
    fn destroy(&mut self) {
        self.inner.destroy();
    }

    fn begin(&mut self, source: &str) {
        tracing::debug!(source, "begin");
        self.inner.begin(source);
    }

    fn end(&mut self, source: &str, error: &str) {
        tracing::debug!(source, error, "end");
        self.inner.end(source, error);
    }

    fn include(&mut self, filename: &str) {
        tracing::debug!(filename, "include");
        self.inner.include(filename);
    }

    fn comment(&mut self, text: &str) {
        tracing::debug!(text, "comment");
        self.inner.comment(text);
    }

    fn access(&mut self, access: AccessControl) {
        tracing::debug!(access = access.as_str(), "access");
        self.inner.access(access);
    }

    fn using_(&mut self, has_assignment: bool) {
        tracing::debug!(has_assignment, "using");
        self.inner.using_(has_assignment);
    }

    fn friend_(&mut self) {
        tracing::debug!("friend");
        self.inner.friend_();
    }

    fn begin_enum(&mut self, start_line: u32, name: &str, base: &str, is_enum_class: bool) {
        tracing::debug!(start_line, name, base, is_enum_class, "beginEnum");
        self.inner.begin_enum(start_line, name, base, is_enum_class);
    }

    fn enum_value(&mut self, key: &str, value: &str) {
        tracing::debug!(key, value, "enumValue");
        self.inner.enum_value(key, value);
    }

    fn end_enum(&mut self, name: &str) {
        tracing::debug!(name, "endEnum");
        self.inner.end_enum(name);
    }

    fn begin_class(&mut self, start_line: u32, name: &str, kind: ScopeKind) {
        tracing::debug!(start_line, name, kind = kind.as_str(), "beginClass");
        self.inner.begin_class(start_line, name, kind);
    }

    fn base_type(&mut self) {
        tracing::debug!("baseType");
        self.inner.base_type();
    }

    fn end_class(&mut self, name: &str, forward_decl: bool) {
        tracing::debug!(name, forward_decl, "endClass");
        self.inner.end_class(name, forward_decl);
    }

    fn begin_namespace(&mut self, name: &str) {
        tracing::debug!(name, "beginNamespace");
        self.inner.begin_namespace(name);
    }

    fn end_namespace(&mut self, name: &str) {
        tracing::debug!(name, "endNamespace");
        self.inner.end_namespace(name);
    }

    fn begin_template(&mut self) {
        tracing::debug!("beginTemplate");
        self.inner.begin_template();
    }

    fn template_argument(&mut self, name: &str, has_default_type: bool) {
        tracing::debug!(name, has_default_type, "templateArgument");
        self.inner.template_argument(name, has_default_type);
    }

    fn end_template(&mut self) {
        tracing::debug!("endTemplate");
        self.inner.end_template();
    }

    fn begin_type(&mut self, kind: TypeKind, specifiers: Specifiers) {
        tracing::debug!(?kind, spec = specifiers.to_spec_string(), "beginType");
        self.inner.begin_type(kind, specifiers);
    }

    fn type_name(&mut self, name: &str) {
        tracing::debug!(name, "typeName");
        self.inner.type_name(name);
    }

    fn end_type(&mut self) {
        tracing::debug!("endType");
        self.inner.end_type();
    }

    fn begin_property(&mut self, start_line: u32, name: &str, specifiers: Specifiers) {
        tracing::debug!(start_line, name, spec = specifiers.to_spec_string(), "beginProperty");
        self.inner.begin_property(start_line, name, specifiers);
    }

    fn array_subscript(&mut self, name: &str) {
        tracing::debug!(name, "arraySubscript");
        self.inner.array_subscript(name);
    }

    fn end_property(&mut self, name: &str) {
        tracing::debug!(name, "endProperty");
        self.inner.end_property(name);
    }

    fn begin_function(&mut self, start_line: u32, kind: TypeKind, name: &str) {
        tracing::debug!(start_line, ?kind, name, "beginFunction");
        self.inner.begin_function(start_line, kind, name);
    }

    fn function_argument(&mut self, name: &str, default_value: &str) {
        tracing::debug!(name, default_value, "functionArgument");
        self.inner.function_argument(name, default_value);
    }

    fn end_function(&mut self, name: &str, specifiers: Specifiers) {
        tracing::debug!(name, spec = specifiers.to_spec_string(), "endFunction");
        self.inner.end_function(name, specifiers);
    }

    fn begin_typedef(&mut self, start_line: u32, name: &str) {
        tracing::debug!(start_line, name, "beginTypedef");
        self.inner.begin_typedef(start_line, name);
    }

    fn end_typedef(&mut self, name: &str) {
        tracing::debug!(name, "endTypedef");
        self.inner.end_typedef(name);
    }

    fn begin_macro(&mut self, name: &str) {
        tracing::debug!(name, "beginMacro");
        self.inner.begin_macro(name);
    }

    fn macro_argument(&mut self, name: &str) {
        tracing::debug!(name, "macroArgument");
        self.inner.macro_argument(name);
    }

    fn end_macro(&mut self, name: &str) {
        tracing::debug!(name, "endMacro");
        self.inner.end_macro(name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct CountingSink {
        begins: u32,
    }

    impl EventSink for CountingSink {
        fn begin(&mut self, _source: &str) {
            self.begins += 1;
        }
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
        fn begin_type(&mut self, _k: TypeKind, _s: Specifiers) {}
        fn type_name(&mut self, _n: &str) {}
        fn end_type(&mut self) {}
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
    fn forwards_calls_to_the_wrapped_sink_unchanged() {
        let mut inner = CountingSink::default();
        let mut debug = DebugSink::new(&mut inner);
        debug.begin("a.h");
        debug.begin("b.h");
        assert_eq!(inner.begins, 2);
    }
}
