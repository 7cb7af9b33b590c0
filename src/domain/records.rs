//! Append-only session books: no-shows, swaps, penalties, incidents, revenue

use crate::domain::passenger::{BerthType, Passenger, PassengerId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Generate a new UUIDv7 (time-sortable) record id
pub fn new_record_id() -> String {
    Uuid::now_v7().to_string()
}

/// A passenger removed from the active chart for not turning up
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NoShowRecord {
    pub record_id: String,
    pub passenger: Passenger,
    pub station: String,
    pub at: DateTime<Utc>,
}

/// Seat and berth a passenger held before a swap
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SeatHolding {
    pub passenger_id: PassengerId,
    pub seat: Option<u16>,
    pub berth: Option<BerthType>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SwapRecord {
    pub record_id: String,
    pub first: SeatHolding,
    pub second: SeatHolding,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Penalty {
    pub record_id: String,
    pub passenger_id: Option<PassengerId>,
    pub payer: String,
    pub amount_inr: u64,
    pub reason: String,
    pub station: String,
    pub at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IncidentKind {
    Medical,
    Security,
    Nuisance,
    Infrastructure,
    Other,
}

impl IncidentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            IncidentKind::Medical => "medical",
            IncidentKind::Security => "security",
            IncidentKind::Nuisance => "nuisance",
            IncidentKind::Infrastructure => "infrastructure",
            IncidentKind::Other => "other",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Incident {
    pub record_id: String,
    pub kind: IncidentKind,
    pub description: String,
    pub coach: Option<String>,
    pub station: String,
    pub at: DateTime<Utc>,
}

/// An RAC passenger moved into a confirmed seat
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RacUpgrade {
    pub passenger_id: PassengerId,
    pub coach: String,
    pub seat: u16,
    pub fee_inr: u64,
}

/// Money collected on board during this duty
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RevenueLedger {
    pub upgrade_fees_inr: u64,
    pub penalties_inr: u64,
}

impl RevenueLedger {
    #[inline]
    pub fn total_inr(&self) -> u64 {
        self.upgrade_fees_inr + self.penalties_inr
    }

    pub fn with_upgrade_fee(self, fee_inr: u64) -> Self {
        Self { upgrade_fees_inr: self.upgrade_fees_inr + fee_inr, ..self }
    }

    pub fn with_penalty(self, amount_inr: u64) -> Self {
        Self { penalties_inr: self.penalties_inr + amount_inr, ..self }
    }
}
