//! Progress events emitted by the export pipeline.
//!
//! The pipeline emits structured [`ProgressEvent`] values through a
//! [`ProgressSink`]; rendering is entirely the sink's concern. Sinks are
//! presentational observers and must never influence control flow, so the
//! pipeline ignores their errors.

use std::fmt;
use std::io::{self, Result as IoResult, Stdout, Write};
use std::sync::{Arc, Mutex};

use serde::{Deserialize, Serialize};

/// The three sequential pipeline phases.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Phase {
    Stores,
    Taxonomies,
    Products,
}

impl Phase {
    /// Human-readable label used by rendering sinks.
    pub fn label(&self) -> &'static str {
        match self {
            Phase::Stores => "Get Stores",
            Phase::Taxonomies => "Get Store Taxonomies",
            Phase::Products => "Get Products",
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum PhaseStatus {
    Pending,
    Started,
    Done,
    Error,
}

/// A discrete status update: phase, state, and step counters.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProgressEvent {
    pub phase: Phase,
    pub status: PhaseStatus,
    pub current: usize,
    pub total: usize,
}

impl ProgressEvent {
    pub fn new(phase: Phase, status: PhaseStatus, current: usize, total: usize) -> Self {
        Self {
            phase,
            status,
            current,
            total,
        }
    }
}

impl fmt::Display for ProgressEvent {
    /// ```
    /// use shelfgrab::progress::{Phase, PhaseStatus, ProgressEvent};
    ///
    /// let event = ProgressEvent::new(Phase::Taxonomies, PhaseStatus::Started, 3, 9);
    /// assert_eq!(event.to_string(), "→ Get Store Taxonomies (3/9)");
    /// ```
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let glyph = match self.status {
            PhaseStatus::Pending => "·",
            PhaseStatus::Started => "→",
            PhaseStatus::Done => "✅",
            PhaseStatus::Error => "✗",
        };
        write!(
            f,
            "{glyph} {} ({}/{})",
            self.phase.label(),
            self.current,
            self.total
        )
    }
}

/// Abstraction over an output target that consumes progress events.
pub trait ProgressSink: Send {
    fn handle(&mut self, event: &ProgressEvent) -> IoResult<()>;
}

/// Stdout sink: one line per event.
pub struct StdOutSink {
    handle: Stdout,
}

impl Default for StdOutSink {
    fn default() -> Self {
        Self {
            handle: io::stdout(),
        }
    }
}

impl ProgressSink for StdOutSink {
    fn handle(&mut self, event: &ProgressEvent) -> IoResult<()> {
        writeln!(self.handle, "{event}")?;
        self.handle.flush()
    }
}

/// In-memory sink for testing and snapshots.
#[derive(Clone, Default)]
pub struct MemorySink {
    entries: Arc<Mutex<Vec<ProgressEvent>>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a snapshot of all captured events.
    pub fn snapshot(&self) -> Vec<ProgressEvent> {
        self.entries.lock().unwrap().clone()
    }

    /// Clear all captured events.
    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }
}

impl ProgressSink for MemorySink {
    fn handle(&mut self, event: &ProgressEvent) -> IoResult<()> {
        self.entries.lock().unwrap().push(*event);
        Ok(())
    }
}

/// Sink that discards every event.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullSink;

impl ProgressSink for NullSink {
    fn handle(&mut self, _event: &ProgressEvent) -> IoResult<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_sink_captures_in_order() {
        let mut sink = MemorySink::new();
        let observer = sink.clone();

        sink.handle(&ProgressEvent::new(Phase::Stores, PhaseStatus::Started, 0, 1))
            .unwrap();
        sink.handle(&ProgressEvent::new(Phase::Stores, PhaseStatus::Done, 1, 1))
            .unwrap();

        let events = observer.snapshot();
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].status, PhaseStatus::Started);
        assert_eq!(events[1].status, PhaseStatus::Done);

        observer.clear();
        assert!(observer.snapshot().is_empty());
    }

    #[test]
    fn display_includes_step_counters() {
        let event = ProgressEvent::new(Phase::Products, PhaseStatus::Done, 12, 12);
        assert_eq!(event.to_string(), "✅ Get Products (12/12)");
    }
}
