//! TT-to-TT duty handover
//!
//! ```text
//!   Idle ──initiate / force_transfer──► ActiveLocked ──accept──► Completed
//!    ▲                                       │
//!    └───────────────cancel──────────────────┘
//! ```
//!
//! While `ActiveLocked` the session refuses chart mutations. The summary
//! handed to `initiate` is stored as-is and never recomputed.

use crate::domain::error::{EngineError, Result};
use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HandoverPhase {
    Idle,
    ActiveLocked,
    Completed,
}

impl HandoverPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            HandoverPhase::Idle => "idle",
            HandoverPhase::ActiveLocked => "active_locked",
            HandoverPhase::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TtIdentity {
    pub id: String,
    pub name: String,
}

impl TtIdentity {
    pub fn new(id: &str, name: &str) -> Self {
        Self { id: id.to_string(), name: name.to_string() }
    }
}

/// Aggregate duty figures frozen at handover time
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HandoverSummary {
    pub station: String,
    pub total_passengers: usize,
    pub verified: usize,
    pub pending: usize,
    pub rac_pending: usize,
    pub vacant_seats: usize,
    pub penalties: usize,
    pub incidents: usize,
    pub revenue_inr: u64,
    pub no_shows: usize,
    pub rac_upgrades: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandoverState {
    pub phase: HandoverPhase,
    pub active: bool,
    pub locked: bool,
    pub previous_tt: Option<TtIdentity>,
    pub new_tt_id: Option<String>,
    pub new_tt_name: Option<String>,
    pub summary: Option<HandoverSummary>,
    pub transfer_reason: Option<String>,
    pub initiated_at: Option<DateTime<Utc>>,
}

impl HandoverState {
    fn idle() -> Self {
        Self {
            phase: HandoverPhase::Idle,
            active: false,
            locked: false,
            previous_tt: None,
            new_tt_id: None,
            new_tt_name: None,
            summary: None,
            transfer_reason: None,
            initiated_at: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandoverCoordinator {
    current_tt: TtIdentity,
    state: HandoverState,
}

impl HandoverCoordinator {
    pub fn new(current_tt: TtIdentity) -> Self {
        Self { current_tt, state: HandoverState::idle() }
    }

    #[inline]
    pub fn state(&self) -> &HandoverState {
        &self.state
    }

    #[inline]
    pub fn phase(&self) -> HandoverPhase {
        self.state.phase
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        self.state.locked
    }

    #[inline]
    pub fn current_tt(&self) -> &TtIdentity {
        &self.current_tt
    }

    fn illegal(&self, action: &'static str) -> EngineError {
        error!(
            phase = %self.state.phase.as_str(),
            action = %action,
            tt_id = %self.current_tt.id,
            "handover_illegal_transition"
        );
        EngineError::IllegalTransition { from: self.state.phase.as_str(), action }
    }

    fn lock_with(&mut self, summary: HandoverSummary, reason: Option<String>, at: DateTime<Utc>) {
        self.state = HandoverState {
            phase: HandoverPhase::ActiveLocked,
            active: true,
            locked: true,
            previous_tt: Some(self.current_tt.clone()),
            new_tt_id: None,
            new_tt_name: None,
            summary: Some(summary),
            transfer_reason: reason,
            initiated_at: Some(at),
        };
    }

    /// Start a regular handover, freezing `summary`
    pub fn initiate(&mut self, summary: HandoverSummary, at: DateTime<Utc>) -> Result<&HandoverState> {
        if self.state.phase != HandoverPhase::Idle {
            return Err(self.illegal("initiate"));
        }

        info!(
            tt_id = %self.current_tt.id,
            station = %summary.station,
            passengers = %summary.total_passengers,
            revenue_inr = %summary.revenue_inr,
            "handover_initiated"
        );
        self.lock_with(summary, None, at);
        Ok(&self.state)
    }

    /// Start a handover outside the normal trigger; the reason is kept for audit
    pub fn force_transfer(
        &mut self,
        summary: HandoverSummary,
        reason: &str,
        at: DateTime<Utc>,
    ) -> Result<&HandoverState> {
        let reason = reason.trim();
        if reason.is_empty() {
            return Err(EngineError::validation("forced transfer requires a reason"));
        }
        if self.state.phase != HandoverPhase::Idle {
            return Err(self.illegal("force_transfer"));
        }

        warn!(
            tt_id = %self.current_tt.id,
            station = %summary.station,
            reason = %reason,
            "handover_forced"
        );
        self.lock_with(summary, Some(reason.to_string()), at);
        Ok(&self.state)
    }

    /// Relieving TT takes over. Both id and name are required.
    pub fn accept(&mut self, new_tt_id: &str, new_tt_name: &str) -> Result<&HandoverState> {
        if self.state.phase != HandoverPhase::ActiveLocked {
            return Err(self.illegal("accept"));
        }

        let (id, name) = (new_tt_id.trim(), new_tt_name.trim());
        if id.is_empty() || name.is_empty() {
            return Err(EngineError::validation("relieving TT id and name are both required"));
        }

        self.state.phase = HandoverPhase::Completed;
        self.state.active = false;
        self.state.locked = false;
        self.state.new_tt_id = Some(id.to_string());
        self.state.new_tt_name = Some(name.to_string());

        info!(
            from_tt = %self.current_tt.id,
            to_tt = %id,
            to_name = %name,
            forced = %self.state.transfer_reason.is_some(),
            "handover_accepted"
        );
        Ok(&self.state)
    }

    /// Abort a pending handover and unlock
    pub fn cancel(&mut self) -> Result<&HandoverState> {
        if self.state.phase != HandoverPhase::ActiveLocked {
            return Err(self.illegal("cancel"));
        }

        info!(tt_id = %self.current_tt.id, "handover_cancelled");
        self.state = HandoverState::idle();
        Ok(&self.state)
    }

    /// Fresh coordinator for the TT who accepted duty
    pub fn for_successor(&self) -> Result<HandoverCoordinator> {
        match (&self.state.phase, &self.state.new_tt_id, &self.state.new_tt_name) {
            (HandoverPhase::Completed, Some(id), Some(name)) => {
                Ok(HandoverCoordinator::new(TtIdentity::new(id, name)))
            }
            _ => Err(self.illegal("hand duty to successor")),
        }
    }
}
