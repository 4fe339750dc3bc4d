//! The event-sink contract: the language-neutral sequence of semantic callbacks the parser
//! drives. Every string parameter borrows source bytes valid only for the call's duration;
//! a sink that needs to keep one past the call must copy it.

use refl_common::{AccessControl, ScopeKind, Specifiers, TypeKind};

pub trait EventSink {
    fn destroy(&mut self) {}

    fn begin(&mut self, source: &str);
    fn end(&mut self, source: &str, error: &str);

    fn include(&mut self, filename: &str);
    fn comment(&mut self, text: &str);
    fn access(&mut self, access: AccessControl);
    fn using_(&mut self, has_assignment: bool);
    fn friend_(&mut self);

    fn begin_enum(&mut self, start_line: u32, name: &str, base: &str, is_enum_class: bool);
    fn enum_value(&mut self, key: &str, value: &str);
    fn end_enum(&mut self, name: &str);

    fn begin_class(&mut self, start_line: u32, name: &str, kind: ScopeKind);
    fn base_type(&mut self);
    fn end_class(&mut self, name: &str, forward_decl: bool);

    fn begin_namespace(&mut self, name: &str);
    fn end_namespace(&mut self, name: &str);

    fn begin_template(&mut self);
    fn template_argument(&mut self, name: &str, has_default_type: bool);
    fn end_template(&mut self);

    fn begin_type(&mut self, kind: TypeKind, specifiers: Specifiers);
    fn type_name(&mut self, name: &str);
    fn end_type(&mut self);

    fn begin_property(&mut self, start_line: u32, name: &str, specifiers: Specifiers);
    fn array_subscript(&mut self, name: &str);
    fn end_property(&mut self, name: &str);

    fn begin_function(&mut self, start_line: u32, kind: TypeKind, name: &str);
    fn function_argument(&mut self, name: &str, default_value: &str);
    fn end_function(&mut self, name: &str, specifiers: Specifiers);

    fn begin_typedef(&mut self, start_line: u32, name: &str);
    fn end_typedef(&mut self, name: &str);

    fn begin_macro(&mut self, name: &str);
    fn macro_argument(&mut self, name: &str);
    fn end_macro(&mut self, name: &str);
}
