//! Fraud and anomaly warnings produced per evaluation

use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum WarningKind {
    NotFound,
    DuplicateQr,
    AlreadyVerified,
    ExpiredJourney,
    WrongDate,
    Blacklisted,
    CoachMismatch,
}

impl WarningKind {
    pub const COUNT: usize = 7;

    pub const ALL: [WarningKind; Self::COUNT] = [
        WarningKind::NotFound,
        WarningKind::DuplicateQr,
        WarningKind::AlreadyVerified,
        WarningKind::ExpiredJourney,
        WarningKind::WrongDate,
        WarningKind::Blacklisted,
        WarningKind::CoachMismatch,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WarningKind::NotFound => "NOT_FOUND",
            WarningKind::DuplicateQr => "DUPLICATE_QR",
            WarningKind::AlreadyVerified => "ALREADY_VERIFIED",
            WarningKind::ExpiredJourney => "EXPIRED_JOURNEY",
            WarningKind::WrongDate => "WRONG_DATE",
            WarningKind::Blacklisted => "BLACKLISTED",
            WarningKind::CoachMismatch => "COACH_MISMATCH",
        }
    }

    /// Dense index used by the metrics counters
    #[inline]
    pub fn index(&self) -> usize {
        *self as usize
    }

    pub fn severity(&self) -> Severity {
        match self {
            WarningKind::AlreadyVerified | WarningKind::CoachMismatch => Severity::Warning,
            _ => Severity::Critical,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Warning,
}

impl Severity {
    pub fn as_str(&self) -> &'static str {
        match self {
            Severity::Critical => "critical",
            Severity::Warning => "warning",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FraudWarning {
    #[serde(rename = "type")]
    pub kind: WarningKind,
    pub severity: Severity,
    pub message: String,
}

impl FraudWarning {
    pub fn new(kind: WarningKind, message: impl Into<String>) -> Self {
        Self { kind, severity: kind.severity(), message: message.into() }
    }

    #[inline]
    pub fn is_critical(&self) -> bool {
        self.severity == Severity::Critical
    }
}
