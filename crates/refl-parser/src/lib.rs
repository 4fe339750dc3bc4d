//! Recursive-descent parser for the header reflector. Turns a token stream into a sequence of
//! semantic begin/end events delivered to a pluggable [`EventSink`].

pub mod event_sink;
pub mod type_emit;

mod parser;

pub use event_sink::EventSink;
pub use parser::Parser;
pub use type_emit::emit_type_node;
