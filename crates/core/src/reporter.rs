//! User-facing progress reporting.
//!
//! Components never print directly. They emit [`ReportEvent`]s through an
//! injected [`Reporter`]; the CLI renders them as colored console lines and
//! tests collect them with [`RecordingReporter`].

use std::sync::Mutex;

/// One user-visible progress event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportEvent {
    /// A pipeline step is starting.
    Step(String),
    /// Neutral progress information.
    Info(String),
    /// Something completed successfully.
    Success(String),
    /// Recoverable problem or non-passing result.
    Warning(String),
    /// A step or prerequisite failed.
    Failure(String),
    /// Framed heading line.
    Banner(String),
    /// Raw text passed through verbatim (pod logs, summary lines).
    Output(String),
}

/// Sink for progress events.
pub trait Reporter: Send + Sync {
    fn emit(&self, event: ReportEvent);

    fn step(&self, message: &str) {
        self.emit(ReportEvent::Step(message.to_owned()));
    }

    fn info(&self, message: &str) {
        self.emit(ReportEvent::Info(message.to_owned()));
    }

    fn success(&self, message: &str) {
        self.emit(ReportEvent::Success(message.to_owned()));
    }

    fn warn(&self, message: &str) {
        self.emit(ReportEvent::Warning(message.to_owned()));
    }

    fn error(&self, message: &str) {
        self.emit(ReportEvent::Failure(message.to_owned()));
    }

    fn banner(&self, message: &str) {
        self.emit(ReportEvent::Banner(message.to_owned()));
    }

    fn output(&self, text: &str) {
        self.emit(ReportEvent::Output(text.to_owned()));
    }
}

/// Reporter that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct SilentReporter;

impl Reporter for SilentReporter {
    fn emit(&self, _event: ReportEvent) {}
}

/// Reporter that keeps every event in memory.
#[derive(Debug, Default)]
pub struct RecordingReporter {
    events: Mutex<Vec<ReportEvent>>,
}

impl RecordingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all events emitted so far.
    pub fn events(&self) -> Vec<ReportEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    /// Messages of all `Failure` events.
    pub fn failures(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ReportEvent::Failure(msg) => Some(msg),
                _ => None,
            })
            .collect()
    }

    /// Messages of all `Warning` events.
    pub fn warnings(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ReportEvent::Warning(msg) => Some(msg),
                _ => None,
            })
            .collect()
    }

    /// Text of all `Output` events.
    pub fn outputs(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ReportEvent::Output(text) => Some(text),
                _ => None,
            })
            .collect()
    }
}

impl Reporter for RecordingReporter {
    fn emit(&self, event: ReportEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event);
        }
    }
}
