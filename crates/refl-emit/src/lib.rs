//! Reference event sinks: the typedb document emitter and a debug tracing sink.

mod debug_sink;
mod doc_node;
mod type_data;
mod typedb_sink;

pub use debug_sink::DebugSink;
pub use doc_node::DocNode;
pub use type_data::{TemplateArgument, TypeData};
pub use typedb_sink::TypeDbSink;
