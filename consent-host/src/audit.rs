//! Audit trail for permission decisions
//!
//! The manager reports every request, short-circuit and failure to an
//! [`AuditSink`]. Sinks are best-effort: a failing sink is logged and never
//! changes the outcome of a request.

use consent_api::{PermissionKind, PermissionStatus};
use serde::Serialize;
use std::fmt;
use std::collections::VecDeque;
use std::fs::{self, File, OpenOptions};
use std::io::{LineWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use thiserror::Error;

/// Timestamp type (RFC 3339 string)
pub type Timestamp = String;

fn now_rfc3339() -> Timestamp {
    chrono::Utc::now().to_rfc3339()
}

/// Audit event describing one permission decision
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub timestamp: Timestamp,
    pub event_type: AuditEventType,
    pub kind: PermissionKind,
    /// Status after the event
    pub status: PermissionStatus,
    /// Status observed before the event, when it differs in meaning
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous: Option<PermissionStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl AuditEvent {
    /// Create a new audit event
    pub fn new(event_type: AuditEventType, kind: PermissionKind, status: PermissionStatus) -> Self {
        Self {
            timestamp: now_rfc3339(),
            event_type,
            kind,
            status,
            previous: None,
            reason: None,
        }
    }

    /// Attach the status observed before the event
    pub fn with_previous(mut self, previous: PermissionStatus) -> Self {
        self.previous = Some(previous);
        self
    }

    /// Attach a reason
    pub fn with_reason(mut self, reason: impl Into<String>) -> Self {
        self.reason = Some(reason.into());
        self
    }
}

/// Type of audit event
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AuditEventType {
    /// A request was forwarded to the adapter
    PermissionRequested,
    /// The request resolved to an authorized status
    PermissionGranted,
    /// The request resolved to a non-authorized status
    PermissionDenied,
    /// The adapter reported a failure
    RequestFailed,
    /// The status was already decided; no adapter call was made
    RequestSkipped,
    /// No adapter is registered for the kind
    NotSupported,
    /// A test double overrode the status
    StatusOverridden,
}

/// Failure to persist an audit event
#[derive(Debug, Error)]
pub enum AuditError {
    #[error("audit log I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("audit event could not be encoded: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Destination for audit events
///
/// # Example
///
/// ```rust
/// use consent_host::audit::{AuditError, AuditEvent, AuditSink};
///
/// struct StderrAuditSink;
///
/// impl AuditSink for StderrAuditSink {
///     fn record(&self, event: AuditEvent) -> Result<(), AuditError> {
///         eprintln!("{:?} {} -> {}", event.event_type, event.kind, event.status);
///         Ok(())
///     }
/// }
/// ```
pub trait AuditSink: Send + Sync {
    fn record(&self, event: AuditEvent) -> Result<(), AuditError>;

    /// Push buffered events to their destination
    fn flush(&self) -> Result<(), AuditError> {
        Ok(())
    }
}

/// Appends one JSON object per line to a log file
///
/// Lines are written through on every event, so a crash loses at most the
/// event being recorded.
pub struct FileAuditSink {
    path: PathBuf,
    log: Mutex<LineWriter<File>>,
}

impl FileAuditSink {
    /// Open `path` for appending, creating it and its directories
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, AuditError> {
        let path = path.into();
        if let Some(dir) = path.parent() {
            fs::create_dir_all(dir)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&path)?;
        Ok(Self {
            path,
            log: Mutex::new(LineWriter::new(file)),
        })
    }

    /// Open `<config dir>/<app>/permission-audit.jsonl`
    pub fn for_app(app_name: &str) -> Result<Self, AuditError> {
        let base = dirs::config_dir().unwrap_or_else(|| PathBuf::from(".config"));
        Self::open(base.join(app_name).join(AUDIT_FILE_NAME))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// File name used by [`FileAuditSink::for_app`]
pub const AUDIT_FILE_NAME: &str = "permission-audit.jsonl";

impl AuditSink for FileAuditSink {
    fn record(&self, event: AuditEvent) -> Result<(), AuditError> {
        let mut line = serde_json::to_vec(&event)?;
        line.push(b'\n');
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .write_all(&line)?;
        Ok(())
    }

    fn flush(&self) -> Result<(), AuditError> {
        self.log
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .flush()?;
        Ok(())
    }
}

impl fmt::Debug for FileAuditSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("FileAuditSink").field(&self.path).finish()
    }
}

/// Retains the most recent events in memory
///
/// Older events are dropped once `limit` is reached; a limit of zero keeps
/// nothing.
pub struct MemoryAuditSink {
    events: Mutex<VecDeque<AuditEvent>>,
    limit: usize,
}

impl MemoryAuditSink {
    /// Events kept by [`MemoryAuditSink::new`]
    pub const DEFAULT_LIMIT: usize = 1000;

    pub fn new() -> Self {
        Self::with_limit(Self::DEFAULT_LIMIT)
    }

    pub fn with_limit(limit: usize) -> Self {
        Self {
            events: Mutex::new(VecDeque::new()),
            limit,
        }
    }

    /// Retained events, oldest first
    pub fn events(&self) -> Vec<AuditEvent> {
        self.matching(|_| true)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn of_type(&self, event_type: AuditEventType) -> Vec<AuditEvent> {
        self.matching(|event| event.event_type == event_type)
    }

    pub fn for_kind(&self, kind: PermissionKind) -> Vec<AuditEvent> {
        self.matching(|event| event.kind == kind)
    }

    fn matching(&self, keep: impl Fn(&AuditEvent) -> bool) -> Vec<AuditEvent> {
        self.lock().iter().filter(|&event| keep(event)).cloned().collect()
    }

    fn lock(&self) -> MutexGuard<'_, VecDeque<AuditEvent>> {
        self.events.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for MemoryAuditSink {
    fn default() -> Self {
        Self::new()
    }
}

impl AuditSink for MemoryAuditSink {
    fn record(&self, event: AuditEvent) -> Result<(), AuditError> {
        if self.limit == 0 {
            return Ok(());
        }
        let mut events = self.lock();
        while events.len() >= self.limit {
            events.pop_front();
        }
        events.push_back(event);
        Ok(())
    }
}

impl fmt::Debug for MemoryAuditSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemoryAuditSink")
            .field("len", &self.len())
            .field("limit", &self.limit)
            .finish()
    }
}

/// Discards every event
#[derive(Debug, Default, Clone, Copy)]
pub struct NullAuditSink;

impl AuditSink for NullAuditSink {
    fn record(&self, _event: AuditEvent) -> Result<(), AuditError> {
        Ok(())
    }
}

/// Records each event in every inner sink
///
/// A failing sink does not stop delivery to the others; the first error is
/// returned once all have been tried.
#[derive(Default)]
pub struct CompositeAuditSink {
    sinks: Vec<Arc<dyn AuditSink>>,
}

impl CompositeAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.sinks.push(sink);
        self
    }

    fn each(
        &self,
        mut apply: impl FnMut(&dyn AuditSink) -> Result<(), AuditError>,
    ) -> Result<(), AuditError> {
        let mut first_error = None;
        for sink in &self.sinks {
            if let Err(e) = apply(sink.as_ref()) {
                first_error.get_or_insert(e);
            }
        }
        first_error.map_or(Ok(()), Err)
    }
}

impl AuditSink for CompositeAuditSink {
    fn record(&self, event: AuditEvent) -> Result<(), AuditError> {
        self.each(|sink| sink.record(event.clone()))
    }

    fn flush(&self) -> Result<(), AuditError> {
        self.each(|sink| sink.flush())
    }
}

impl fmt::Debug for CompositeAuditSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeAuditSink")
            .field("sinks", &self.sinks.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn requested(kind: PermissionKind) -> AuditEvent {
        AuditEvent::new(
            AuditEventType::PermissionRequested,
            kind,
            PermissionStatus::NotDetermined,
        )
    }

    /// Sink that rejects every event
    struct BrokenSink;

    impl AuditSink for BrokenSink {
        fn record(&self, _event: AuditEvent) -> Result<(), AuditError> {
            Err(std::io::Error::other("disk full").into())
        }
    }

    #[test]
    fn test_memory_sink_queries() {
        let sink = MemoryAuditSink::new();
        assert!(sink.is_empty());
        sink.record(requested(PermissionKind::Camera)).unwrap();

        assert_eq!(sink.len(), 1);
        let events = sink.of_type(AuditEventType::PermissionRequested);
        assert_eq!(events[0].kind, PermissionKind::Camera);
        assert!(sink.for_kind(PermissionKind::Contacts).is_empty());
    }

    #[test]
    fn test_memory_sink_keeps_most_recent() {
        let sink = MemoryAuditSink::with_limit(2);
        for kind in [
            PermissionKind::Camera,
            PermissionKind::Microphone,
            PermissionKind::Contacts,
        ] {
            sink.record(requested(kind)).unwrap();
        }

        let kinds: Vec<_> = sink.events().iter().map(|e| e.kind).collect();
        assert_eq!(kinds, vec![PermissionKind::Microphone, PermissionKind::Contacts]);
    }

    #[test]
    fn test_zero_limit_keeps_nothing() {
        let sink = MemoryAuditSink::with_limit(0);
        assert!(sink.record(requested(PermissionKind::Motion)).is_ok());
        assert!(sink.is_empty());
    }

    #[test]
    fn test_null_sink() {
        assert!(NullAuditSink.record(requested(PermissionKind::Health)).is_ok());
        assert!(NullAuditSink.flush().is_ok());
    }

    #[test]
    fn test_composite_delivers_past_failure() {
        let memory = Arc::new(MemoryAuditSink::new());
        let composite = CompositeAuditSink::new()
            .with(Arc::new(BrokenSink))
            .with(memory.clone());

        let err = composite.record(requested(PermissionKind::Motion)).unwrap_err();
        assert!(matches!(err, AuditError::Io(_)));
        assert_eq!(memory.len(), 1);
        assert!(composite.flush().is_ok());
    }

    #[test]
    fn test_event_serialization() {
        let event = AuditEvent::new(
            AuditEventType::PermissionDenied,
            PermissionKind::PhotoLibrary,
            PermissionStatus::Denied,
        )
        .with_previous(PermissionStatus::NotDetermined);

        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("permission_denied"));
        assert!(json.contains("photo_library"));
        assert!(json.contains("not_determined"));
        assert!(!json.contains("reason"));
    }

    #[test]
    fn test_file_sink_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join(AUDIT_FILE_NAME);

        let sink = FileAuditSink::open(&path).unwrap();
        sink.record(requested(PermissionKind::Calendar)).unwrap();
        sink.record(requested(PermissionKind::Reminders)).unwrap();
        drop(sink);

        let reopened = FileAuditSink::open(&path).unwrap();
        reopened.record(requested(PermissionKind::Health)).unwrap();
        reopened.flush().unwrap();

        let content = std::fs::read_to_string(reopened.path()).unwrap();
        let kinds: Vec<String> = content
            .lines()
            .map(|line| {
                let value: serde_json::Value = serde_json::from_str(line).unwrap();
                value["kind"].as_str().unwrap().to_string()
            })
            .collect();
        assert_eq!(kinds, vec!["calendar", "reminders", "health"]);
    }
}
