//! Per-worker event sink that records every call as a closure instead of applying it, so a
//! whole file's worth of events can cross to the main thread as one atomic batch and be replayed
//! against the single real sink in order. Grounded on `ParserInterfaceSynchronizer`, with one
//! deliberate fix: the original's `comment()` forwards to `include()` on the wrapped interface
//! (a copy-paste bug); this replays as `comment()`.

use std::collections::VecDeque;

use crossbeam_channel::Sender;
use refl_common::{AccessControl, ScopeKind, Specifiers, TypeKind};
use refl_parser::EventSink;

pub type Operation = Box<dyn FnOnce(&mut dyn EventSink) + Send>;
pub type Batch = VecDeque<Operation>;

pub struct BufferingSink {
    queue: Batch,
    result_tx: Sender<Batch>,
}

impl BufferingSink {
    pub fn new(result_tx: Sender<Batch>) -> Self {
        BufferingSink {
            queue: Batch::new(),
            result_tx,
        }
    }

    fn enqueue(&mut self, op: impl FnOnce(&mut dyn EventSink) + Send + 'static) {
        self.queue.push_back(Box::new(op));
    }

    /// Sends a single closure straight to the shared queue, bypassing the per-file batch -- for
    /// diagnostics (load failures, `--profile` timings) that have no corresponding sink event.
    pub fn log(result_tx: &Sender<Batch>, op: impl FnOnce(&mut dyn EventSink) + Send + 'static) {
        let mut batch = Batch::new();
        batch.push_back(Box::new(op));
        let _ = result_tx.send(batch);
    }
}

impl EventSink for BufferingSink {
    fn begin(&mut self, source: &str) {
        let source = source.to_string();
        self.enqueue(move |sink| sink.begin(&source));
    }

    fn end(&mut self, source: &str, error: &str) {
        let source = source.to_string();
        let error = error.to_string();
        self.enqueue(move |sink| sink.end(&source, &error));
        let batch = std::mem::take(&mut self.queue);
        let _ = self.result_tx.send(batch);
    }

    fn include(&mut self, filename: &str) {
        let filename = filename.to_string();
        self.enqueue(move |sink| sink.include(&filename));
    }

    fn comment(&mut self, text: &str) {
        let text = text.to_string();
        self.enqueue(move |sink| sink.comment(&text));
    }

    fn access(&mut self, access: AccessControl) {
        self.enqueue(move |sink| sink.access(access));
    }

    fn using_(&mut self, has_assignment: bool) {
        self.enqueue(move |sink| sink.using_(has_assignment));
    }

    fn friend_(&mut self) {
        self.enqueue(|sink| sink.friend_());
    }

    fn begin_enum(&mut self, start_line: u32, name: &str, base: &str, is_enum_class: bool) {
        let name = name.to_string();
        let base = base.to_string();
        self.enqueue(move |sink| sink.begin_enum(start_line, &name, &base, is_enum_class));
    }

    fn enum_value(&mut self, key: &str, value: &str) {
        let key = key.to_string();
        let value = value.to_string();
        self.enqueue(move |sink| sink.enum_value(&key, &value));
    }

    fn end_enum(&mut self, name: &str) {
        let name = name.to_string();
        self.enqueue(move |sink| sink.end_enum(&name));
    }

    fn begin_class(&mut self, start_line: u32, name: &str, kind: ScopeKind) {
        let name = name.to_string();
        self.enqueue(move |sink| sink.begin_class(start_line, &name, kind));
    }

    fn base_type(&mut self) {
        self.enqueue(|sink| sink.base_type());
    }

    fn end_class(&mut self, name: &str, forward_decl: bool) {
        let name = name.to_string();
        self.enqueue(move |sink| sink.end_class(&name, forward_decl));
    }

    fn begin_namespace(&mut self, name: &str) {
        let name = name.to_string();
        self.enqueue(move |sink| sink.begin_namespace(&name));
    }

    fn end_namespace(&mut self, name: &str) {
        let name = name.to_string();
        self.enqueue(move |sink| sink.end_namespace(&name));
    }

    fn begin_template(&mut self) {
        self.enqueue(|sink| sink.begin_template());
    }

    fn template_argument(&mut self, name: &str, has_default_type: bool) {
        let name = name.to_string();
        self.enqueue(move |sink| sink.template_argument(&name, has_default_type));
    }

    fn end_template(&mut self) {
        self.enqueue(|sink| sink.end_template());
    }

    fn begin_type(&mut self, kind: TypeKind, specifiers: Specifiers) {
        self.enqueue(move |sink| sink.begin_type(kind, specifiers));
    }

    fn type_name(&mut self, name: &str) {
        let name = name.to_string();
        self.enqueue(move |sink| sink.type_name(&name));
    }

    fn end_type(&mut self) {
        self.enqueue(|sink| sink.end_type());
    }

    fn begin_property(&mut self, start_line: u32, name: &str, specifiers: Specifiers) {
        let name = name.to_string();
        self.enqueue(move |sink| sink.begin_property(start_line, &name, specifiers));
    }

    fn array_subscript(&mut self, name: &str) {
        let name = name.to_string();
        self.enqueue(move |sink| sink.array_subscript(&name));
    }

    fn end_property(&mut self, name: &str) {
        let name = name.to_string();
        self.enqueue(move |sink| sink.end_property(&name));
    }

    fn begin_function(&mut self, start_line: u32, kind: TypeKind, name: &str) {
        let name = name.to_string();
        self.enqueue(move |sink| sink.begin_function(start_line, kind, &name));
    }

    fn function_argument(&mut self, name: &str, default_value: &str) {
        let name = name.to_string();
        let default_value = default_value.to_string();
        self.enqueue(move |sink| sink.function_argument(&name, &default_value));
    }

    fn end_function(&mut self, name: &str, specifiers: Specifiers) {
        let name = name.to_string();
        self.enqueue(move |sink| sink.end_function(&name, specifiers));
    }

    fn begin_typedef(&mut self, start_line: u32, name: &str) {
        let name = name.to_string();
        self.enqueue(move |sink| sink.begin_typedef(start_line, &name));
    }

    fn end_typedef(&mut self, name: &str) {
        let name = name.to_string();
        self.enqueue(move |sink| sink.end_typedef(&name));
    }

    fn begin_macro(&mut self, name: &str) {
        let name = name.to_string();
        self.enqueue(move |sink| sink.begin_macro(&name));
    }

    fn macro_argument(&mut self, name: &str) {
        let name = name.to_string();
        self.enqueue(move |sink| sink.macro_argument(&name));
    }

    fn end_macro(&mut self, name: &str) {
        let name = name.to_string();
        self.enqueue(move |sink| sink.end_macro(&name));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingSink {
        events: Vec<String>,
    }

    impl EventSink for RecordingSink {
        fn begin(&mut self, source: &str) {
            self.events.push(format!("begin({source})"));
        }
        fn end(&mut self, source: &str, error: &str) {
            self.events.push(format!("end({source},{error})"));
        }
        fn include(&mut self, filename: &str) {
            self.events.push(format!("include({filename})"));
        }
        fn comment(&mut self, text: &str) {
            self.events.push(format!("comment({text})"));
        }
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
    fn end_flushes_the_whole_batch_as_one_atomic_send() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut sink = BufferingSink::new(tx);
        sink.begin("a.h");
        sink.comment("note");
        sink.end("a.h", "");

        let mut batch = rx.try_recv().expect("a batch was sent");
        assert!(rx.try_recv().is_err(), "exactly one batch for one file");

        let mut real = RecordingSink::default();
        while let Some(op) = batch.pop_front() {
            op(&mut real);
        }
        assert_eq!(real.events, vec!["begin(a.h)", "comment(note)", "end(a.h,)"]);
    }

    #[test]
    fn comment_replays_as_comment_not_include() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let mut sink = BufferingSink::new(tx);
        sink.comment("hello");
        sink.end("a.h", "");

        let mut batch = rx.try_recv().unwrap();
        let mut real = RecordingSink::default();
        while let Some(op) = batch.pop_front() {
            op(&mut real);
        }
        assert_eq!(real.events[0], "comment(hello)");
    }
}
