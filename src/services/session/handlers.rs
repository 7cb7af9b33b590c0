//! Event handlers for the session reducer
//!
//! Each handler works on the cloned `next` state and pushes the effects the
//! host should deliver once the step commits.

use super::{Effect, Engine, Outcome, SessionState};
use crate::domain::error::{EngineError, Result};
use crate::domain::passenger::PassengerId;
use crate::domain::records::{new_record_id, Incident, IncidentKind, Penalty, RacUpgrade};
use crate::domain::warning::{FraudWarning, WarningKind};
use crate::io::sink::{LogKind, NoticeSeverity};
use crate::services::fraud::Warnings;
use crate::services::rac_allocator::{allocate_rac, find_upgrade};
use crate::services::station_progressor::move_to_next;
use chrono::{DateTime, Utc};
use smallvec::smallvec;
use tracing::{debug, info, warn};

fn required<'a>(value: &'a str, what: &str) -> Result<&'a str> {
    let value = value.trim();
    if value.is_empty() {
        return Err(EngineError::validation(format!("{what} is required")));
    }
    Ok(value)
}

/// One notification per warning, critical ones first in rule order
fn warning_effects(warnings: &[FraudWarning], effects: &mut Vec<Effect>) {
    for w in warnings {
        let severity =
            if w.is_critical() { NoticeSeverity::Critical } else { NoticeSeverity::Warning };
        effects.push(Effect::notify("Fraud alert", w.message.clone(), severity));
    }
}

impl Engine {
    /// Resolve a QR scan, run every fraud rule, then remember the code
    pub(crate) fn handle_scan(
        &self,
        next: &mut SessionState,
        payload: &str,
        effects: &mut Vec<Effect>,
    ) -> Outcome {
        let passenger = next.registry.find_by_qr(payload).cloned();
        let warnings: Warnings =
            self.fraud.run_all_checks(passenger.as_ref(), &next.fraud_context(Some(payload)));

        // Recorded after the checks so a first scan is never its own duplicate
        next.scanned.insert(payload);

        match &passenger {
            Some(p) => {
                info!(
                    passenger_id = %p.id,
                    coach = %p.coach,
                    warnings = %warnings.len(),
                    station = %next.station_name(),
                    "qr_scanned"
                );
                effects.push(Effect::log(format!("Scanned ticket of {}", p.name), LogKind::Scan));
                if warnings.is_empty() {
                    effects.push(Effect::notify(
                        "Ticket valid",
                        format!("{} in {} seat {}", p.name, p.coach, seat_label(p.seat)),
                        NoticeSeverity::Success,
                    ));
                }
            }
            None => {
                warn!(station = %next.station_name(), "qr_scan_unresolved");
                effects.push(Effect::log("Scanned unknown ticket", LogKind::Scan));
            }
        }
        warning_effects(&warnings, effects);

        Outcome::Checked { passenger, warnings }
    }

    /// Manual lookup by id; same rules as a scan minus the duplicate check
    pub(crate) fn handle_lookup(
        &self,
        next: &SessionState,
        passenger_id: PassengerId,
        effects: &mut Vec<Effect>,
    ) -> Outcome {
        let passenger = next.registry.find_by_id(passenger_id).cloned();
        let warnings: Warnings = match passenger.as_ref() {
            Some(p) => self.fraud.run_all_checks(Some(p), &next.fraud_context(None)),
            None => smallvec![FraudWarning::new(
                WarningKind::NotFound,
                format!("No passenger with id {passenger_id}"),
            )],
        };

        debug!(passenger_id = %passenger_id, warnings = %warnings.len(), "passenger_lookup");
        warning_effects(&warnings, effects);

        Outcome::Checked { passenger, warnings }
    }

    pub(crate) fn handle_verify(
        &self,
        next: &mut SessionState,
        passenger_id: PassengerId,
        effects: &mut Vec<Effect>,
    ) -> Result<Outcome> {
        let changed = next.registry.verify(passenger_id)?;
        let name = next
            .registry
            .find_by_id(passenger_id)
            .map(|p| p.name.clone())
            .unwrap_or_default();

        if changed {
            effects.push(Effect::log(format!("Verified {name}"), LogKind::Verification));
            effects.push(Effect::notify(
                "Passenger verified",
                format!("{name} verified"),
                NoticeSeverity::Success,
            ));
        } else {
            effects.push(Effect::notify(
                "Already verified",
                format!("{name} was verified earlier"),
                NoticeSeverity::Info,
            ));
        }

        Ok(Outcome::Verified { passenger_id, changed })
    }

    pub(crate) fn handle_verify_pnr(
        &self,
        next: &mut SessionState,
        pnr: &str,
        effects: &mut Vec<Effect>,
    ) -> Result<Outcome> {
        let pnr = required(pnr, "PNR")?;
        let changed = next.registry.verify_pnr_group(pnr)?;

        if changed > 0 {
            effects.push(Effect::log(
                format!("Verified {changed} passenger(s) on PNR {pnr}"),
                LogKind::Verification,
            ));
        }
        effects.push(Effect::notify(
            "PNR verified",
            format!("{changed} passenger(s) newly verified on PNR {pnr}"),
            NoticeSeverity::Success,
        ));

        Ok(Outcome::PnrVerified { pnr: pnr.to_string(), changed })
    }

    pub(crate) fn handle_no_show(
        &self,
        next: &mut SessionState,
        passenger_id: PassengerId,
        now: DateTime<Utc>,
        effects: &mut Vec<Effect>,
    ) -> Result<Outcome> {
        let station = next.station_name().to_string();
        let record = next.registry.mark_no_show(passenger_id, &station, now)?.clone();

        effects.push(Effect::log(
            format!("Marked {} no-show at {station}", record.passenger.name),
            LogKind::NoShow,
        ));
        effects.push(Effect::notify(
            "No-show recorded",
            format!(
                "{} ({} seat {}) removed from chart",
                record.passenger.name,
                record.passenger.coach,
                seat_label(record.passenger.seat)
            ),
            NoticeSeverity::Info,
        ));

        Ok(Outcome::NoShow(record))
    }

    pub(crate) fn handle_swap(
        &self,
        next: &mut SessionState,
        first: PassengerId,
        second: PassengerId,
        now: DateTime<Utc>,
        effects: &mut Vec<Effect>,
    ) -> Result<Outcome> {
        let record = next.registry.swap_seats(first, second, now)?.clone();

        effects.push(Effect::log(
            format!(
                "Swapped seats {} and {} between passengers {first} and {second}",
                seat_label(record.first.seat),
                seat_label(record.second.seat)
            ),
            LogKind::Swap,
        ));
        effects.push(Effect::notify("Seats swapped", "Seat swap recorded", NoticeSeverity::Success));

        Ok(Outcome::Swapped(record))
    }

    /// Try one RAC upgrade in `coach` and charge the upgrade fee if it happens
    pub(crate) fn handle_upgrade(
        &self,
        next: &mut SessionState,
        coach: &str,
        effects: &mut Vec<Effect>,
    ) -> Result<Outcome> {
        let coach = required(coach, "coach")?.to_string();

        let after = allocate_rac(next.registry.passengers(), &coach);
        let upgraded = find_upgrade(next.registry.passengers(), &after)
            .and_then(|p| p.seat.map(|seat| (p.id, p.name.clone(), seat)));

        let Some((passenger_id, name, seat)) = upgraded else {
            effects.push(Effect::notify(
                "No upgrade possible",
                format!("No RAC passenger or free seat in {coach}"),
                NoticeSeverity::Info,
            ));
            return Ok(Outcome::NoUpgrade { coach });
        };

        let fee_inr = self.policy.rac_upgrade_fee_inr;
        next.registry.replace_all(after);
        next.ledger = next.ledger.with_upgrade_fee(fee_inr);

        let upgrade = RacUpgrade { passenger_id, coach: coach.clone(), seat, fee_inr };
        next.upgrades.push(upgrade.clone());

        info!(
            passenger_id = %passenger_id,
            coach = %coach,
            seat = %seat,
            fee_inr = %fee_inr,
            "rac_upgraded"
        );
        effects.push(Effect::log(
            format!("Upgraded {name} to {coach} seat {seat} (fee {fee_inr} INR)"),
            LogKind::Upgrade,
        ));
        effects.push(Effect::notify(
            "RAC upgraded",
            format!("{name} confirmed in {coach} seat {seat}"),
            NoticeSeverity::Success,
        ));

        Ok(Outcome::Upgraded(upgrade))
    }

    #[allow(clippy::too_many_arguments)]
    pub(crate) fn handle_penalty(
        &self,
        next: &mut SessionState,
        passenger_id: Option<PassengerId>,
        payer: Option<String>,
        amount_inr: Option<u64>,
        reason: &str,
        now: DateTime<Utc>,
        effects: &mut Vec<Effect>,
    ) -> Result<Outcome> {
        let reason = required(reason, "penalty reason")?;

        let passenger_name = match passenger_id {
            Some(id) => Some(
                next.registry
                    .find_by_id(id)
                    .map(|p| p.name.clone())
                    .ok_or_else(|| EngineError::not_found(format!("passenger {id}")))?,
            ),
            None => None,
        };
        let payer = payer
            .map(|p| p.trim().to_string())
            .filter(|p| !p.is_empty())
            .or(passenger_name)
            .ok_or_else(|| EngineError::validation("penalty needs a passenger or a payer name"))?;

        let amount_inr = amount_inr.unwrap_or(self.policy.default_penalty_inr);
        if amount_inr == 0 {
            return Err(EngineError::validation("penalty amount must be positive"));
        }

        let penalty = Penalty {
            record_id: new_record_id(),
            passenger_id,
            payer,
            amount_inr,
            reason: reason.to_string(),
            station: next.station_name().to_string(),
            at: now,
        };
        next.ledger = next.ledger.with_penalty(amount_inr);
        next.penalties.push(penalty.clone());

        info!(
            record_id = %penalty.record_id,
            payer = %penalty.payer,
            amount_inr = %amount_inr,
            station = %penalty.station,
            "penalty_issued"
        );
        effects.push(Effect::log(
            format!("Penalty of {amount_inr} INR on {} ({reason})", penalty.payer),
            LogKind::Penalty,
        ));
        effects.push(Effect::notify(
            "Penalty issued",
            format!("{amount_inr} INR collected from {}", penalty.payer),
            NoticeSeverity::Success,
        ));

        Ok(Outcome::PenaltyIssued(penalty))
    }

    pub(crate) fn handle_incident(
        &self,
        next: &mut SessionState,
        kind: IncidentKind,
        description: &str,
        coach: Option<String>,
        now: DateTime<Utc>,
        effects: &mut Vec<Effect>,
    ) -> Result<Outcome> {
        let description = required(description, "incident description")?;
        let coach = coach
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .or_else(|| next.current_coach.clone());

        let incident = Incident {
            record_id: new_record_id(),
            kind,
            description: description.to_string(),
            coach,
            station: next.station_name().to_string(),
            at: now,
        };
        next.incidents.push(incident.clone());

        warn!(
            record_id = %incident.record_id,
            kind = %kind.as_str(),
            coach = ?incident.coach,
            station = %incident.station,
            "incident_reported"
        );
        effects.push(Effect::log(
            format!("{} incident: {description}", kind.as_str()),
            LogKind::Incident,
        ));
        let severity = match kind {
            IncidentKind::Medical | IncidentKind::Security => NoticeSeverity::Critical,
            _ => NoticeSeverity::Warning,
        };
        effects.push(Effect::notify("Incident reported", description, severity));

        Ok(Outcome::IncidentReported(incident))
    }

    pub(crate) fn handle_change_coach(&self, next: &mut SessionState, coach: &str) -> Result<Outcome> {
        let coach = required(coach, "coach")?.to_string();
        debug!(from = ?next.current_coach, to = %coach, "coach_changed");
        next.current_coach = Some(coach.clone());
        Ok(Outcome::CoachChanged { coach })
    }

    /// Move to the next station; stays put at the terminal
    pub(crate) fn handle_advance(&self, next: &mut SessionState, effects: &mut Vec<Effect>) -> Outcome {
        let index = move_to_next(next.current_station, next.route.stations());
        let moved = index != next.current_station;
        next.current_station = index;

        let summary = next.station_summary(self.policy.near_end_threshold);
        if !moved {
            debug!(station = %summary.station, "advance_at_terminal");
            return Outcome::Arrived(summary);
        }

        info!(
            station = %summary.station,
            station_index = %summary.station_index,
            expected_boarding = %summary.expected_boarding_count,
            boarding_missed = %summary.boarding_missed_count,
            alighting = %summary.alighting_count,
            near_segment_end = %summary.near_segment_end,
            "station_arrived"
        );
        effects.push(Effect::log(format!("Arrived at {}", summary.station), LogKind::Station));
        if summary.boarding_missed_count > 0 {
            effects.push(Effect::notify(
                "Boarding missed",
                format!("{} passenger(s) have not boarded yet", summary.boarding_missed_count),
                NoticeSeverity::Warning,
            ));
        }
        if summary.near_segment_end {
            effects.push(Effect::notify(
                "Segment ending",
                format!("Duty segment ends at {}; prepare handover", next.route.segment_end()),
                NoticeSeverity::Warning,
            ));
        }

        Outcome::Arrived(summary)
    }

    /// Regular handover when `reason` is `None`, forced transfer otherwise
    pub(crate) fn handle_initiate_handover(
        &self,
        next: &mut SessionState,
        reason: Option<&str>,
        now: DateTime<Utc>,
        effects: &mut Vec<Effect>,
    ) -> Result<Outcome> {
        let summary = next.summarize();
        let state = match reason {
            None => next.handover.initiate(summary, now)?.clone(),
            Some(reason) => next.handover.force_transfer(summary, reason, now)?.clone(),
        };

        let action = match &state.transfer_reason {
            Some(reason) => format!("Forced handover at {} ({reason})", next.station_name()),
            None => format!("Handover initiated at {}", next.station_name()),
        };
        effects.push(Effect::log(action, LogKind::Handover));
        effects.push(Effect::notify(
            "Handover pending",
            "Chart is locked until the relieving TT accepts",
            NoticeSeverity::Warning,
        ));

        Ok(Outcome::Handover(state))
    }

    pub(crate) fn handle_accept_handover(
        &self,
        next: &mut SessionState,
        tt_id: &str,
        tt_name: &str,
        effects: &mut Vec<Effect>,
    ) -> Result<Outcome> {
        let state = next.handover.accept(tt_id, tt_name)?.clone();

        let name = state.new_tt_name.clone().unwrap_or_default();
        effects.push(Effect::log(format!("Duty handed over to {name}"), LogKind::Handover));
        effects.push(Effect::notify(
            "Handover complete",
            format!("{name} has taken over"),
            NoticeSeverity::Success,
        ));

        Ok(Outcome::Handover(state))
    }

    pub(crate) fn handle_cancel_handover(
        &self,
        next: &mut SessionState,
        effects: &mut Vec<Effect>,
    ) -> Result<Outcome> {
        let state = next.handover.cancel()?.clone();

        effects.push(Effect::log("Handover cancelled", LogKind::Handover));
        effects.push(Effect::notify("Handover cancelled", "Chart unlocked", NoticeSeverity::Info));

        Ok(Outcome::Handover(state))
    }

    pub(crate) fn handle_assume_duty(
        &self,
        next: &mut SessionState,
        effects: &mut Vec<Effect>,
    ) -> Result<Outcome> {
        next.handover = next.handover.for_successor()?;
        let tt = next.handover.current_tt();

        info!(tt_id = %tt.id, tt_name = %tt.name, "duty_assumed");
        effects.push(Effect::log(format!("{} on duty", tt.name), LogKind::Handover));

        Ok(Outcome::Handover(next.handover.state().clone()))
    }
}

fn seat_label(seat: Option<u16>) -> String {
    seat.map_or_else(|| "RAC".to_string(), |s| s.to_string())
}
