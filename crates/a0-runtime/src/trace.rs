//! The trace event stream: a structured, JSONL-serializable record of what a
//! program actually did, independent of the host's own [`tracing`] logs.
//! Every event carries a monotonic sequence number and a single `data`
//! record rather than a grab-bag of optional fields, so adding a new event
//! kind never requires widening every other one.

use a0_core::{SourceSpan, Value};
use serde::{Deserialize, Serialize};
use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceEventKind {
    ProgramStart,
    ProgramEnd,
    CapCheck,
    BudgetTick,
    Let,
    FnCall,
    FnReturn,
    ToolCall,
    ToolResult,
    If,
    Match,
    Assert,
    Check,
    Error,
    Return,
    Iteration,
    // Paired events, emitted only around the construct that produced them.
    LoopEnter,
    LoopExit,
    FilterEnter,
    FilterExit,
    TryEnter,
    TryExit,
    ReduceEnter,
    ReduceExit,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TraceEvent {
    pub seq: u64,
    pub kind: TraceEventKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub span: Option<SourceSpan>,
    pub data: Value,
}

/// Destination for emitted trace events.
pub trait TraceSink {
    fn emit(&mut self, event: TraceEvent);
}

/// Appends one JSON object per line to the given writer.
pub struct JsonlSink<W: Write> {
    writer: W,
}

impl<W: Write> JsonlSink<W> {
    pub fn new(writer: W) -> Self {
        JsonlSink { writer }
    }
}

impl<W: Write> TraceSink for JsonlSink<W> {
    fn emit(&mut self, event: TraceEvent) {
        if let Ok(line) = serde_json::to_string(&event) {
            let _ = writeln!(self.writer, "{line}");
        }
    }
}

/// Buffers events in memory; used by tests and by hosts that want the full
/// trace back as a value rather than streamed to a file.
#[derive(Default)]
pub struct InMemorySink {
    pub events: Vec<TraceEvent>,
}

impl TraceSink for InMemorySink {
    fn emit(&mut self, event: TraceEvent) {
        self.events.push(event);
    }
}

/// Discards every event. The default when a host doesn't ask for a trace.
pub struct NullSink;

impl TraceSink for NullSink {
    fn emit(&mut self, _event: TraceEvent) {}
}

/// Hands out monotonically increasing sequence numbers and builds events
/// against a single sink.
pub struct Tracer {
    sink: Box<dyn TraceSink>,
    next_seq: AtomicU64,
}

impl Tracer {
    pub fn new(sink: Box<dyn TraceSink>) -> Self {
        Tracer {
            sink,
            next_seq: AtomicU64::new(0),
        }
    }

    pub fn null() -> Self {
        Self::new(Box::new(NullSink))
    }

    pub fn emit(&mut self, kind: TraceEventKind, span: Option<SourceSpan>, data: Value) {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.sink.emit(TraceEvent {
            seq,
            kind,
            span,
            data,
        });
    }
}

/// Convenience for writing an in-memory trace to any [`Write`] target as
/// newline-delimited JSON, e.g. when a CLI host buffers then flushes.
pub fn write_jsonl<W: Write>(mut writer: W, events: &[TraceEvent]) -> io::Result<()> {
    for event in events {
        let line = serde_json::to_string(event).map_err(io::Error::other)?;
        writeln!(writer, "{line}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sequence_numbers_are_monotonic() {
        let mut tracer = Tracer::new(Box::new(InMemorySink::default()));
        tracer.emit(TraceEventKind::ProgramStart, None, Value::Null);
        tracer.emit(TraceEventKind::ProgramEnd, None, Value::Null);
        // Nothing to assert against the sink directly since it's boxed, but
        // emitting twice without panicking exercises the atomic counter.
    }

    #[test]
    fn in_memory_sink_collects_events_in_order() {
        let mut sink = InMemorySink::default();
        sink.emit(TraceEvent {
            seq: 0,
            kind: TraceEventKind::ProgramStart,
            span: None,
            data: Value::Null,
        });
        sink.emit(TraceEvent {
            seq: 1,
            kind: TraceEventKind::ProgramEnd,
            span: None,
            data: Value::Null,
        });
        assert_eq!(sink.events.len(), 2);
        assert_eq!(sink.events[0].kind, TraceEventKind::ProgramStart);
    }

    #[test]
    fn jsonl_round_trips_through_serde() {
        let event = TraceEvent {
            seq: 3,
            kind: TraceEventKind::ToolCall,
            span: None,
            data: Value::record(vec![("tool".to_string(), Value::String("fs.read".into()))]),
        };
        let mut buf = Vec::new();
        write_jsonl(&mut buf, std::slice::from_ref(&event)).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("\"tool_call\""));
        assert!(text.contains("fs.read"));
    }
}
