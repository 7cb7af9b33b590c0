//! Notification and activity-log sinks
//!
//! The engine only ever writes to these; storage, read/unread state and
//! rendering belong to the host.

use parking_lot::Mutex;
use serde::Serialize;
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum NoticeSeverity {
    Info,
    Success,
    Warning,
    Critical,
}

impl NoticeSeverity {
    pub fn as_str(&self) -> &'static str {
        match self {
            NoticeSeverity::Info => "info",
            NoticeSeverity::Success => "success",
            NoticeSeverity::Warning => "warning",
            NoticeSeverity::Critical => "critical",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LogKind {
    Scan,
    Verification,
    NoShow,
    Swap,
    Upgrade,
    Penalty,
    Incident,
    Station,
    Handover,
}

impl LogKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LogKind::Scan => "scan",
            LogKind::Verification => "verification",
            LogKind::NoShow => "no_show",
            LogKind::Swap => "swap",
            LogKind::Upgrade => "upgrade",
            LogKind::Penalty => "penalty",
            LogKind::Incident => "incident",
            LogKind::Station => "station",
            LogKind::Handover => "handover",
        }
    }
}

/// Fire-and-forget outlet for user-facing notices and the duty log
pub trait SessionSink: Send + Sync {
    fn add_notification(&self, title: &str, message: &str, severity: NoticeSeverity);
    fn add_log(&self, action: &str, kind: LogKind);
}

/// Writes everything to the tracing subscriber
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl SessionSink for TracingSink {
    fn add_notification(&self, title: &str, message: &str, severity: NoticeSeverity) {
        match severity {
            NoticeSeverity::Warning | NoticeSeverity::Critical => {
                warn!(title = %title, message = %message, severity = %severity.as_str(), "notification")
            }
            _ => info!(title = %title, message = %message, severity = %severity.as_str(), "notification"),
        }
    }

    fn add_log(&self, action: &str, kind: LogKind) {
        info!(action = %action, kind = %kind.as_str(), "duty_log");
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Notification {
    pub title: String,
    pub message: String,
    pub severity: NoticeSeverity,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogEntry {
    pub action: String,
    pub kind: LogKind,
}

/// Keeps everything in memory for hosts that render later, and for tests
#[derive(Debug, Default)]
pub struct MemorySink {
    notifications: Mutex<Vec<Notification>>,
    logs: Mutex<Vec<LogEntry>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<Notification> {
        self.notifications.lock().clone()
    }

    pub fn logs(&self) -> Vec<LogEntry> {
        self.logs.lock().clone()
    }
}

impl SessionSink for MemorySink {
    fn add_notification(&self, title: &str, message: &str, severity: NoticeSeverity) {
        self.notifications.lock().push(Notification {
            title: title.to_string(),
            message: message.to_string(),
            severity,
        });
    }

    fn add_log(&self, action: &str, kind: LogKind) {
        self.logs.lock().push(LogEntry { action: action.to_string(), kind });
    }
}
