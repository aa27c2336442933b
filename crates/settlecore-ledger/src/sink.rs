//! Event sinks: where the engines append their audit records.

use parking_lot::Mutex;
use settlecore_types::EventRecord;

/// Append-only destination for event records. Never read back by the engines.
pub trait EventSink: Send + Sync {
    fn emit(&self, record: EventRecord);
}

/// Keeps every record in memory, in emission order.
#[derive(Debug, Default)]
pub struct MemoryEventSink {
    records: Mutex<Vec<EventRecord>>,
}

impl MemoryEventSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all records so far.
    #[must_use]
    pub fn records(&self) -> Vec<EventRecord> {
        self.records.lock().clone()
    }

    /// Records whose event kind is `kind` (see [`settlecore_types::Event::kind`]).
    #[must_use]
    pub fn of_kind(&self, kind: &str) -> Vec<EventRecord> {
        self.records
            .lock()
            .iter()
            .filter(|r| r.event.kind() == kind)
            .cloned()
            .collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.lock().len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.lock().is_empty()
    }
}

impl EventSink for MemoryEventSink {
    fn emit(&self, record: EventRecord) {
        self.records.lock().push(record);
    }
}

/// Writes each record as a structured `tracing` line.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, record: EventRecord) {
        tracing::info!(
            registry = %record.registry,
            kind = record.event.kind(),
            digest = %record.digest_hex(),
            event = ?record.event,
            "Settlement event"
        );
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEventSink;

impl EventSink for NullEventSink {
    fn emit(&self, _record: EventRecord) {}
}
