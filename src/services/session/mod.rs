//! Duty session state and event reducer
//!
//! `SessionState` is the explicit container the host owns. `Engine::reduce`
//! never mutates its input: it takes the current state and one
//! `SessionEvent` and returns the next state, an `Outcome` for the UI, and
//! the `Effect`s (notifications, duty-log lines) to hand to the sinks. A
//! failed step returns an error and the caller keeps the old state.
//!
//! It is not pure in the strict sense. Handlers emit tracing events and new
//! records get UUIDv7 ids stamped with the `now` passed in.
//!
//! `Session` is the thin host wrapper that swaps state in, dispatches effects
//! and records metrics.

mod handlers;
#[cfg(test)]
mod tests;

use crate::domain::error::{EngineError, Result};
use crate::domain::passenger::{Passenger, PassengerId};
use crate::domain::records::{
    Incident, IncidentKind, NoShowRecord, Penalty, RacUpgrade, RevenueLedger, SwapRecord,
};
use crate::domain::station::Route;
use crate::infra::config::Config;
use crate::infra::metrics::Metrics;
use crate::io::sink::{LogKind, NoticeSeverity, SessionSink};
use crate::services::fraud::{Blacklist, FraudContext, FraudRuleEngine, ScannedCodeSet, Warnings};
use crate::services::handover::{HandoverCoordinator, HandoverState, HandoverSummary, TtIdentity};
use crate::services::registry::PassengerRegistry;
use crate::services::station_progressor::{station_summary, StationSummary};
use chrono::{DateTime, NaiveDate, Utc};
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, warn};

/// Everything the TT's device knows about the current duty
#[derive(Debug, Clone)]
pub struct SessionState {
    pub registry: PassengerRegistry,
    pub route: Route,
    /// Only ever increases, bounded by the route
    pub current_station: usize,
    pub scanned: ScannedCodeSet,
    pub handover: HandoverCoordinator,
    pub ledger: RevenueLedger,
    pub penalties: Vec<Penalty>,
    pub incidents: Vec<Incident>,
    pub upgrades: Vec<RacUpgrade>,
    pub current_coach: Option<String>,
    /// Reference date for the wrong-date rule
    pub today: NaiveDate,
}

impl SessionState {
    pub fn new(
        passengers: Vec<Passenger>,
        route: Route,
        tt: TtIdentity,
        today: NaiveDate,
    ) -> Result<Self> {
        Ok(Self {
            registry: PassengerRegistry::new(passengers)?,
            route,
            current_station: 0,
            scanned: ScannedCodeSet::new(),
            handover: HandoverCoordinator::new(tt),
            ledger: RevenueLedger::default(),
            penalties: Vec::new(),
            incidents: Vec::new(),
            upgrades: Vec::new(),
            current_coach: None,
            today,
        })
    }

    #[inline]
    pub fn station_name(&self) -> &str {
        self.route.name_at(self.current_station)
    }

    #[inline]
    pub fn is_locked(&self) -> bool {
        self.handover.is_locked()
    }

    pub fn handover_state(&self) -> &HandoverState {
        self.handover.state()
    }

    pub fn fraud_context<'a>(&'a self, scanned_code: Option<&'a str>) -> FraudContext<'a> {
        FraudContext {
            scanned_code,
            scanned: &self.scanned,
            route: &self.route,
            current_station: self.current_station,
            today: self.today,
            current_coach: self.current_coach.as_deref(),
        }
    }

    /// Aggregate figures as they stand right now
    pub fn summarize(&self) -> HandoverSummary {
        HandoverSummary {
            station: self.station_name().to_string(),
            total_passengers: self.registry.len(),
            verified: self.registry.verified_count(),
            pending: self.registry.pending_count(),
            rac_pending: self.registry.rac_pending_count(),
            vacant_seats: self.registry.total_vacant_seats(),
            penalties: self.penalties.len(),
            incidents: self.incidents.len(),
            revenue_inr: self.ledger.total_inr(),
            no_shows: self.registry.no_shows().len(),
            rac_upgrades: self.upgrades.len(),
        }
    }

    pub fn station_summary(&self, near_end_threshold: usize) -> StationSummary {
        station_summary(
            self.registry.passengers(),
            self.route.stations(),
            self.current_station,
            self.route.segment_end(),
            near_end_threshold,
        )
    }
}

/// Something the TT did, or something that happened to the train
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SessionEvent {
    Scan {
        payload: String,
    },
    Lookup {
        passenger_id: PassengerId,
    },
    Verify {
        passenger_id: PassengerId,
    },
    VerifyPnr {
        pnr: String,
    },
    MarkNoShow {
        passenger_id: PassengerId,
    },
    SwapSeats {
        first: PassengerId,
        second: PassengerId,
    },
    UpgradeRac {
        coach: String,
    },
    IssuePenalty {
        #[serde(default)]
        passenger_id: Option<PassengerId>,
        #[serde(default)]
        payer: Option<String>,
        #[serde(default)]
        amount_inr: Option<u64>,
        reason: String,
    },
    ReportIncident {
        kind: IncidentKind,
        description: String,
        #[serde(default)]
        coach: Option<String>,
    },
    ChangeCoach {
        coach: String,
    },
    AdvanceStation,
    InitiateHandover,
    ForceTransfer {
        reason: String,
    },
    AcceptHandover {
        #[serde(default)]
        tt_id: String,
        #[serde(default)]
        tt_name: String,
    },
    CancelHandover,
    /// The accepting TT starts a fresh duty with an idle coordinator
    AssumeDuty,
}

impl SessionEvent {
    pub fn name(&self) -> &'static str {
        match self {
            SessionEvent::Scan { .. } => "scan",
            SessionEvent::Lookup { .. } => "lookup",
            SessionEvent::Verify { .. } => "verify",
            SessionEvent::VerifyPnr { .. } => "verify_pnr",
            SessionEvent::MarkNoShow { .. } => "mark_no_show",
            SessionEvent::SwapSeats { .. } => "swap_seats",
            SessionEvent::UpgradeRac { .. } => "upgrade_rac",
            SessionEvent::IssuePenalty { .. } => "issue_penalty",
            SessionEvent::ReportIncident { .. } => "report_incident",
            SessionEvent::ChangeCoach { .. } => "change_coach",
            SessionEvent::AdvanceStation => "advance_station",
            SessionEvent::InitiateHandover => "initiate_handover",
            SessionEvent::ForceTransfer { .. } => "force_transfer",
            SessionEvent::AcceptHandover { .. } => "accept_handover",
            SessionEvent::CancelHandover => "cancel_handover",
            SessionEvent::AssumeDuty => "assume_duty",
        }
    }

    /// Events that change the chart or the books, refused during handover
    pub fn is_locked_mutation(&self) -> bool {
        matches!(
            self,
            SessionEvent::Verify { .. }
                | SessionEvent::VerifyPnr { .. }
                | SessionEvent::MarkNoShow { .. }
                | SessionEvent::SwapSeats { .. }
                | SessionEvent::UpgradeRac { .. }
                | SessionEvent::IssuePenalty { .. }
        )
    }
}

/// What the UI gets back from a successful step
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Checked { passenger: Option<Passenger>, warnings: Warnings },
    Verified { passenger_id: PassengerId, changed: bool },
    PnrVerified { pnr: String, changed: usize },
    NoShow(NoShowRecord),
    Swapped(SwapRecord),
    Upgraded(RacUpgrade),
    /// No RAC passenger or no free seat; nothing changed
    NoUpgrade { coach: String },
    PenaltyIssued(Penalty),
    IncidentReported(Incident),
    CoachChanged { coach: String },
    Arrived(StationSummary),
    Handover(HandoverState),
}

impl Outcome {
    pub fn label(&self) -> &'static str {
        match self {
            Outcome::Checked { .. } => "checked",
            Outcome::Verified { .. } => "verified",
            Outcome::PnrVerified { .. } => "pnr_verified",
            Outcome::NoShow(_) => "no_show",
            Outcome::Swapped(_) => "swapped",
            Outcome::Upgraded(_) => "upgraded",
            Outcome::NoUpgrade { .. } => "no_upgrade",
            Outcome::PenaltyIssued(_) => "penalty_issued",
            Outcome::IncidentReported(_) => "incident_reported",
            Outcome::CoachChanged { .. } => "coach_changed",
            Outcome::Arrived(_) => "arrived",
            Outcome::Handover(_) => "handover",
        }
    }
}

/// Side effect for the host to deliver after the step commits
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    Notify { title: String, message: String, severity: NoticeSeverity },
    Log { action: String, kind: LogKind },
}

impl Effect {
    pub fn notify(title: &str, message: impl Into<String>, severity: NoticeSeverity) -> Self {
        Effect::Notify { title: title.to_string(), message: message.into(), severity }
    }

    pub fn log(action: impl Into<String>, kind: LogKind) -> Self {
        Effect::Log { action: action.into(), kind }
    }
}

#[derive(Debug, Clone)]
pub struct Transition {
    pub state: SessionState,
    pub outcome: Outcome,
    pub effects: Vec<Effect>,
}

/// Fares and thresholds the reducer applies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Policy {
    pub rac_upgrade_fee_inr: u64,
    pub default_penalty_inr: u64,
    pub near_end_threshold: usize,
}

impl Policy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            rac_upgrade_fee_inr: config.rac_upgrade_fee_inr(),
            default_penalty_inr: config.default_penalty_inr(),
            near_end_threshold: config.near_end_threshold(),
        }
    }
}

/// Stateless rules applied to a `SessionState`
pub struct Engine {
    pub(crate) fraud: FraudRuleEngine,
    pub(crate) policy: Policy,
}

impl Engine {
    pub fn new(fraud: FraudRuleEngine, policy: Policy) -> Self {
        Self { fraud, policy }
    }

    pub fn from_config(config: &Config) -> Self {
        let blacklist = Blacklist::from_entries(config.blacklist());
        Self::new(FraudRuleEngine::new(blacklist), Policy::from_config(config))
    }

    #[inline]
    pub fn policy(&self) -> &Policy {
        &self.policy
    }

    /// Apply one event to `state`, producing the next state.
    ///
    /// `state` itself is never modified; on error nothing has changed.
    pub fn reduce(&self, state: &SessionState, event: SessionEvent, now: DateTime<Utc>) -> Result<Transition> {
        if event.is_locked_mutation() && state.is_locked() {
            return Err(EngineError::HandoverLocked { action: event.name() });
        }

        let mut next = state.clone();
        let mut effects = Vec::new();

        let outcome = match event {
            SessionEvent::Scan { payload } => self.handle_scan(&mut next, &payload, &mut effects),
            SessionEvent::Lookup { passenger_id } => {
                self.handle_lookup(&next, passenger_id, &mut effects)
            }
            SessionEvent::Verify { passenger_id } => {
                self.handle_verify(&mut next, passenger_id, &mut effects)?
            }
            SessionEvent::VerifyPnr { pnr } => self.handle_verify_pnr(&mut next, &pnr, &mut effects)?,
            SessionEvent::MarkNoShow { passenger_id } => {
                self.handle_no_show(&mut next, passenger_id, now, &mut effects)?
            }
            SessionEvent::SwapSeats { first, second } => {
                self.handle_swap(&mut next, first, second, now, &mut effects)?
            }
            SessionEvent::UpgradeRac { coach } => self.handle_upgrade(&mut next, &coach, &mut effects)?,
            SessionEvent::IssuePenalty { passenger_id, payer, amount_inr, reason } => self
                .handle_penalty(&mut next, passenger_id, payer, amount_inr, &reason, now, &mut effects)?,
            SessionEvent::ReportIncident { kind, description, coach } => {
                self.handle_incident(&mut next, kind, &description, coach, now, &mut effects)?
            }
            SessionEvent::ChangeCoach { coach } => self.handle_change_coach(&mut next, &coach)?,
            SessionEvent::AdvanceStation => self.handle_advance(&mut next, &mut effects),
            SessionEvent::InitiateHandover => {
                self.handle_initiate_handover(&mut next, None, now, &mut effects)?
            }
            SessionEvent::ForceTransfer { reason } => {
                self.handle_initiate_handover(&mut next, Some(&reason), now, &mut effects)?
            }
            SessionEvent::AcceptHandover { tt_id, tt_name } => {
                self.handle_accept_handover(&mut next, &tt_id, &tt_name, &mut effects)?
            }
            SessionEvent::CancelHandover => self.handle_cancel_handover(&mut next, &mut effects)?,
            SessionEvent::AssumeDuty => self.handle_assume_duty(&mut next, &mut effects)?,
        };

        Ok(Transition { state: next, outcome, effects })
    }
}

/// Host-side owner of a running duty
pub struct Session {
    state: SessionState,
    engine: Engine,
    sink: Arc<dyn SessionSink>,
    metrics: Arc<Metrics>,
}

impl Session {
    pub fn new(
        state: SessionState,
        engine: Engine,
        sink: Arc<dyn SessionSink>,
        metrics: Arc<Metrics>,
    ) -> Self {
        Self { state, engine, sink, metrics }
    }

    /// Build a session for the configured train and duty.
    ///
    /// Fails on an invalid route or a chart with duplicate ids or seated RAC
    /// passengers.
    pub fn from_config(
        config: &Config,
        passengers: Vec<Passenger>,
        sink: Arc<dyn SessionSink>,
        metrics: Arc<Metrics>,
    ) -> Result<Self> {
        let route = Route::new(config.stations().to_vec(), config.segment_end())?;
        let tt = TtIdentity::new(config.tt_id(), config.tt_name());
        let mut state = SessionState::new(passengers, route, tt, config.journey_date())?;
        state.current_coach = config.start_coach().map(str::to_string);

        Ok(Self::new(state, Engine::from_config(config), sink, metrics))
    }

    #[inline]
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    #[inline]
    pub fn metrics(&self) -> &Arc<Metrics> {
        &self.metrics
    }

    /// Read-only view of the current station
    pub fn station_summary(&self) -> StationSummary {
        self.state.station_summary(self.engine.policy.near_end_threshold)
    }

    /// Apply an event; on success the new state replaces the old one whole
    pub fn apply(&mut self, event: SessionEvent) -> Result<Outcome> {
        let started = Instant::now();
        let name = event.name();

        let result = self.engine.reduce(&self.state, event, Utc::now());
        let outcome = match result {
            Ok(Transition { state, outcome, effects }) => {
                self.state = state;
                self.record(&outcome);
                self.dispatch(effects);
                Ok(outcome)
            }
            Err(err) => {
                match &err {
                    EngineError::HandoverLocked { .. } => {
                        self.metrics.record_locked_rejection();
                        self.sink.add_notification(
                            "Action locked",
                            &err.to_string(),
                            NoticeSeverity::Warning,
                        );
                    }
                    _ => self.metrics.record_rejection(),
                }
                warn!(event = %name, error = %err, "session_event_rejected");
                Err(err)
            }
        };

        let micros = u64::try_from(started.elapsed().as_micros()).unwrap_or(u64::MAX);
        self.metrics.record_event_processed(micros);
        outcome
    }

    fn record(&self, outcome: &Outcome) {
        match outcome {
            Outcome::Checked { warnings, .. } => self.metrics.record_scan(warnings),
            Outcome::Verified { changed, .. } => self.metrics.record_verifications(u64::from(*changed)),
            Outcome::PnrVerified { changed, .. } => {
                self.metrics.record_verifications(u64::try_from(*changed).unwrap_or(u64::MAX))
            }
            Outcome::NoShow(_) => self.metrics.record_no_show(),
            Outcome::Swapped(_) => self.metrics.record_swap(),
            Outcome::Upgraded(_) => self.metrics.record_rac_upgrade(true),
            Outcome::NoUpgrade { .. } => self.metrics.record_rac_upgrade(false),
            Outcome::PenaltyIssued(p) => self.metrics.record_penalty(p.amount_inr),
            Outcome::IncidentReported(_) => self.metrics.record_incident(),
            Outcome::Handover(h) if h.new_tt_id.is_some() && !h.locked => {
                self.metrics.record_handover_completed()
            }
            Outcome::CoachChanged { .. } | Outcome::Arrived(_) | Outcome::Handover(_) => {}
        }
    }

    fn dispatch(&self, effects: Vec<Effect>) {
        debug!(count = %effects.len(), "session_effects");
        for effect in effects {
            match effect {
                Effect::Notify { title, message, severity } => {
                    self.sink.add_notification(&title, &message, severity)
                }
                Effect::Log { action, kind } => self.sink.add_log(&action, kind),
            }
        }
    }
}
