//! Tests for the session reducer

use super::*;
use crate::domain::passenger::{BerthType, TicketStatus};
use crate::domain::warning::WarningKind;
use crate::io::sink::MemorySink;
use crate::services::fraud::BlacklistEntry;
use crate::services::handover::HandoverPhase;

fn date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
}

fn config() -> Config {
    Config::default()
        .with_journey_date(date())
        .with_route(&["NDLS", "KOTA", "RTM", "BRC", "ST"], "BRC")
        .with_start_coach("S3")
        .with_blacklist(vec![BlacklistEntry {
            name: "Vikram Shah".to_string(),
            reason: "repeat ticketless travel".to_string(),
        }])
}

fn chart() -> Vec<Passenger> {
    vec![
        Passenger::confirmed(PassengerId(1), "A. Rao", "S3", 1, date())
            .with_route("NDLS", "BRC")
            .with_berth(BerthType::Lower)
            .with_pnr("P100"),
        Passenger::confirmed(PassengerId(2), "B. Iyer", "S3", 2, date())
            .with_route("NDLS", "ST")
            .with_berth(BerthType::Upper)
            .with_pnr("P100"),
        Passenger::confirmed(PassengerId(3), "C. Das", "S3", 4, date()).with_route("KOTA", "ST"),
        Passenger::rac(PassengerId(4), "D. Khan", "S3", date()).with_route("NDLS", "ST"),
        Passenger::confirmed(PassengerId(5), "Vikram Shah", "S4", 9, date()).with_route("NDLS", "ST"),
    ]
}

struct Harness {
    session: Session,
    sink: Arc<MemorySink>,
    metrics: Arc<Metrics>,
}

fn harness() -> Harness {
    let sink = Arc::new(MemorySink::new());
    let metrics = Arc::new(Metrics::new());
    let session = Session::from_config(&config(), chart(), sink.clone(), metrics.clone()).unwrap();
    Harness { session, sink, metrics }
}

fn scan(payload: &str) -> SessionEvent {
    SessionEvent::Scan { payload: payload.to_string() }
}

fn warning_kinds(outcome: &Outcome) -> Vec<WarningKind> {
    match outcome {
        Outcome::Checked { warnings, .. } => warnings.iter().map(|w| w.kind).collect(),
        other => panic!("expected Checked, got {}", other.label()),
    }
}

#[test]
fn test_clean_scan_has_no_warnings() {
    let mut h = harness();
    let outcome = h.session.apply(scan("SMARTRAIL|1|A. Rao|S3|1")).unwrap();

    match &outcome {
        Outcome::Checked { passenger, warnings } => {
            assert_eq!(passenger.as_ref().map(|p| p.id), Some(PassengerId(1)));
            assert!(warnings.is_empty());
        }
        other => panic!("unexpected {}", other.label()),
    }
    assert!(h.session.state().scanned.contains("SMARTRAIL|1|A. Rao|S3|1"));
    assert_eq!(h.sink.notifications()[0].severity, NoticeSeverity::Success);
}

#[test]
fn test_second_scan_of_same_code_is_duplicate() {
    let mut h = harness();
    h.session.apply(scan("1")).unwrap();
    let outcome = h.session.apply(scan("1")).unwrap();

    assert_eq!(warning_kinds(&outcome), vec![WarningKind::DuplicateQr]);
    assert_eq!(h.metrics.warnings_of(WarningKind::DuplicateQr), 1);
}

#[test]
fn test_unknown_scan_is_not_found() {
    let mut h = harness();
    let outcome = h.session.apply(scan("SMARTRAIL|oops")).unwrap();

    assert_eq!(warning_kinds(&outcome), vec![WarningKind::NotFound]);
    let notices = h.sink.notifications();
    assert_eq!(notices.len(), 1);
    assert_eq!(notices[0].severity, NoticeSeverity::Critical);
}

#[test]
fn test_scan_flags_blacklist_and_coach_mismatch_in_order() {
    let mut h = harness();
    let outcome = h.session.apply(scan("5")).unwrap();

    assert_eq!(warning_kinds(&outcome), vec![WarningKind::Blacklisted, WarningKind::CoachMismatch]);
}

#[test]
fn test_lookup_of_unknown_id_names_the_id() {
    let mut h = harness();
    let outcome = h.session.apply(SessionEvent::Lookup { passenger_id: PassengerId(99) }).unwrap();

    match &outcome {
        Outcome::Checked { passenger, warnings } => {
            assert!(passenger.is_none());
            assert_eq!(warnings.len(), 1);
            assert_eq!(warnings[0].kind, WarningKind::NotFound);
            assert!(warnings[0].message.contains("99"));
        }
        other => panic!("unexpected {}", other.label()),
    }
    assert!(h.sink.notifications()[0].message.contains("99"));
}

#[test]
fn test_chart_with_duplicate_ids_is_rejected() {
    let mut passengers = chart();
    passengers.push(Passenger::confirmed(PassengerId(1), "A. Rao", "S3", 6, date()));

    let result = Session::from_config(
        &config(),
        passengers,
        Arc::new(MemorySink::new()),
        Arc::new(Metrics::new()),
    );
    assert!(matches!(result, Err(EngineError::Validation(_))));
}

#[test]
fn test_chart_with_seated_rac_is_rejected() {
    let mut passengers = chart();
    passengers[3].seat = Some(5);

    let result = Session::from_config(
        &config(),
        passengers,
        Arc::new(MemorySink::new()),
        Arc::new(Metrics::new()),
    );
    assert!(matches!(result, Err(EngineError::Validation(_))));
}

#[test]
fn test_lookup_does_not_record_code() {
    let mut h = harness();
    h.session.apply(SessionEvent::Lookup { passenger_id: PassengerId(2) }).unwrap();
    assert!(h.session.state().scanned.is_empty());
}

#[test]
fn test_verify_is_idempotent() {
    let mut h = harness();
    let first = h.session.apply(SessionEvent::Verify { passenger_id: PassengerId(1) }).unwrap();
    let second = h.session.apply(SessionEvent::Verify { passenger_id: PassengerId(1) }).unwrap();

    assert_eq!(first, Outcome::Verified { passenger_id: PassengerId(1), changed: true });
    assert_eq!(second, Outcome::Verified { passenger_id: PassengerId(1), changed: false });
    assert_eq!(h.session.state().registry.verified_count(), 1);

    // Already verified is now reported on scan
    let outcome = h.session.apply(scan("2")).unwrap();
    assert!(warning_kinds(&outcome).is_empty());
    let outcome = h.session.apply(SessionEvent::Lookup { passenger_id: PassengerId(1) }).unwrap();
    assert_eq!(warning_kinds(&outcome), vec![WarningKind::AlreadyVerified]);
}

#[test]
fn test_verify_unknown_passenger_leaves_state() {
    let mut h = harness();
    let err = h.session.apply(SessionEvent::Verify { passenger_id: PassengerId(99) }).unwrap_err();

    assert!(matches!(err, EngineError::NotFound(_)));
    assert_eq!(h.session.state().registry.verified_count(), 0);
    assert_eq!(h.metrics.report().rejected_other_total, 1);
}

#[test]
fn test_verify_pnr_group() {
    let mut h = harness();
    h.session.apply(SessionEvent::Verify { passenger_id: PassengerId(2) }).unwrap();
    let outcome = h.session.apply(SessionEvent::VerifyPnr { pnr: "P100".to_string() }).unwrap();

    assert_eq!(outcome, Outcome::PnrVerified { pnr: "P100".to_string(), changed: 1 });
    assert!(h.session.state().registry.pnr_group("P100").unwrap().all_verified());
}

#[test]
fn test_no_show_removes_and_books() {
    let mut h = harness();
    let outcome = h.session.apply(SessionEvent::MarkNoShow { passenger_id: PassengerId(3) }).unwrap();

    let Outcome::NoShow(record) = outcome else { panic!("expected NoShow") };
    assert_eq!(record.passenger.id, PassengerId(3));
    assert_eq!(record.station, "NDLS");
    assert!(h.session.state().registry.find_by_id(PassengerId(3)).is_none());
    assert_eq!(h.session.state().registry.no_shows().len(), 1);
}

#[test]
fn test_swap_exchanges_seat_and_berth() {
    let mut h = harness();
    h.session
        .apply(SessionEvent::SwapSeats { first: PassengerId(1), second: PassengerId(2) })
        .unwrap();

    let reg = &h.session.state().registry;
    let a = reg.find_by_id(PassengerId(1)).unwrap();
    let b = reg.find_by_id(PassengerId(2)).unwrap();
    assert_eq!((a.seat, a.berth), (Some(2), Some(BerthType::Upper)));
    assert_eq!((b.seat, b.berth), (Some(1), Some(BerthType::Lower)));
    assert_eq!(reg.swaps().len(), 1);
}

#[test]
fn test_swap_with_rac_passenger_fails_without_change() {
    let mut h = harness();
    let before = h.session.state().registry.passengers().to_vec();
    let err = h
        .session
        .apply(SessionEvent::SwapSeats { first: PassengerId(1), second: PassengerId(4) })
        .unwrap_err();

    assert!(matches!(err, EngineError::Validation(_)));
    assert_eq!(h.session.state().registry.passengers(), before.as_slice());
    assert!(h.session.state().registry.swaps().is_empty());
}

#[test]
fn test_upgrade_takes_lowest_free_seat_and_charges_fee() {
    let mut h = harness();
    let outcome = h.session.apply(SessionEvent::UpgradeRac { coach: "S3".to_string() }).unwrap();

    let Outcome::Upgraded(upgrade) = outcome else { panic!("expected Upgraded") };
    assert_eq!(upgrade.passenger_id, PassengerId(4));
    assert_eq!(upgrade.seat, 3);
    assert_eq!(upgrade.fee_inr, 250);

    let state = h.session.state();
    let p = state.registry.find_by_id(PassengerId(4)).unwrap();
    assert_eq!(p.status, TicketStatus::Confirmed);
    assert_eq!(p.seat, Some(3));
    assert_eq!(state.ledger.upgrade_fees_inr, 250);
    assert_eq!(state.upgrades.len(), 1);
    assert_eq!(h.metrics.report().rac_upgrades_total, 1);
}

#[test]
fn test_upgrade_without_rac_is_noop() {
    let mut h = harness();
    let outcome = h.session.apply(SessionEvent::UpgradeRac { coach: "S4".to_string() }).unwrap();

    assert_eq!(outcome, Outcome::NoUpgrade { coach: "S4".to_string() });
    assert_eq!(h.session.state().ledger.total_inr(), 0);
    assert!(h.session.state().upgrades.is_empty());
}

#[test]
fn test_penalty_defaults_amount_and_payer() {
    let mut h = harness();
    let outcome = h
        .session
        .apply(SessionEvent::IssuePenalty {
            passenger_id: Some(PassengerId(3)),
            payer: None,
            amount_inr: None,
            reason: "travelling beyond destination".to_string(),
        })
        .unwrap();

    let Outcome::PenaltyIssued(penalty) = outcome else { panic!("expected PenaltyIssued") };
    assert_eq!(penalty.payer, "C. Das");
    assert_eq!(penalty.amount_inr, 1000);
    assert_eq!(h.session.state().ledger.penalties_inr, 1000);
}

#[test]
fn test_penalty_validation() {
    let mut h = harness();
    let no_payer = SessionEvent::IssuePenalty {
        passenger_id: None,
        payer: None,
        amount_inr: Some(500),
        reason: "ticketless".to_string(),
    };
    assert!(matches!(h.session.apply(no_payer), Err(EngineError::Validation(_))));

    let zero = SessionEvent::IssuePenalty {
        passenger_id: None,
        payer: Some("Walk-in".to_string()),
        amount_inr: Some(0),
        reason: "ticketless".to_string(),
    };
    assert!(matches!(h.session.apply(zero), Err(EngineError::Validation(_))));

    let blank_reason = SessionEvent::IssuePenalty {
        passenger_id: None,
        payer: Some("Walk-in".to_string()),
        amount_inr: None,
        reason: "  ".to_string(),
    };
    assert!(matches!(h.session.apply(blank_reason), Err(EngineError::Validation(_))));
    assert!(h.session.state().penalties.is_empty());
}

#[test]
fn test_incident_uses_current_coach() {
    let mut h = harness();
    let outcome = h
        .session
        .apply(SessionEvent::ReportIncident {
            kind: IncidentKind::Medical,
            description: "passenger fainted".to_string(),
            coach: None,
        })
        .unwrap();

    let Outcome::IncidentReported(incident) = outcome else { panic!("expected IncidentReported") };
    assert_eq!(incident.coach.as_deref(), Some("S3"));
    assert_eq!(h.sink.notifications()[0].severity, NoticeSeverity::Critical);
}

#[test]
fn test_advance_reports_missed_boarding_and_segment_end() {
    let mut h = harness();

    let Outcome::Arrived(kota) = h.session.apply(SessionEvent::AdvanceStation).unwrap() else {
        panic!("expected Arrived")
    };
    assert_eq!(kota.station, "KOTA");
    // Everyone boarding at NDLS is still unverified
    assert_eq!(kota.boarding_missed_count, 4);
    assert_eq!(kota.expected_boarding_count, 1);
    assert!(!kota.near_segment_end);

    let Outcome::Arrived(rtm) = h.session.apply(SessionEvent::AdvanceStation).unwrap() else {
        panic!("expected Arrived")
    };
    assert!(rtm.near_segment_end);
}

#[test]
fn test_advance_clamps_at_terminal() {
    let mut h = harness();
    for _ in 0..10 {
        h.session.apply(SessionEvent::AdvanceStation).unwrap();
    }
    assert_eq!(h.session.state().current_station, 4);
    assert_eq!(h.session.state().station_name(), "ST");
}

#[test]
fn test_expired_journey_after_destination_passes() {
    let mut h = harness();
    for _ in 0..4 {
        h.session.apply(SessionEvent::AdvanceStation).unwrap();
    }
    // Passenger 1 alights at BRC; the train is now at ST
    let outcome = h.session.apply(SessionEvent::Lookup { passenger_id: PassengerId(1) }).unwrap();
    assert_eq!(warning_kinds(&outcome), vec![WarningKind::ExpiredJourney]);
}

#[test]
fn test_lock_rejects_mutations_but_allows_scans() {
    let mut h = harness();
    h.session.apply(SessionEvent::InitiateHandover).unwrap();
    assert!(h.session.state().is_locked());

    let locked = [
        SessionEvent::Verify { passenger_id: PassengerId(1) },
        SessionEvent::VerifyPnr { pnr: "P100".to_string() },
        SessionEvent::MarkNoShow { passenger_id: PassengerId(3) },
        SessionEvent::SwapSeats { first: PassengerId(1), second: PassengerId(2) },
        SessionEvent::UpgradeRac { coach: "S3".to_string() },
        SessionEvent::IssuePenalty {
            passenger_id: Some(PassengerId(3)),
            payer: None,
            amount_inr: None,
            reason: "ticketless".to_string(),
        },
    ];
    for event in locked {
        let name = event.name();
        assert_eq!(h.session.apply(event), Err(EngineError::HandoverLocked { action: name }));
    }
    assert_eq!(h.metrics.rejected_locked_total(), 6);
    assert_eq!(h.session.state().registry.verified_count(), 0);
    assert_eq!(h.session.state().ledger.total_inr(), 0);

    let lock_notices =
        h.sink.notifications().iter().filter(|n| n.title == "Action locked").count();
    assert_eq!(lock_notices, 6);

    // Still allowed
    h.session.apply(scan("1")).unwrap();
    h.session.apply(SessionEvent::AdvanceStation).unwrap();
    h.session.apply(SessionEvent::ChangeCoach { coach: "S4".to_string() }).unwrap();
}

#[test]
fn test_handover_summary_is_frozen() {
    let mut h = harness();
    h.session.apply(SessionEvent::Verify { passenger_id: PassengerId(1) }).unwrap();
    h.session.apply(SessionEvent::UpgradeRac { coach: "S3".to_string() }).unwrap();
    h.session.apply(SessionEvent::InitiateHandover).unwrap();

    let frozen = h.session.state().handover_state().summary.clone().unwrap();
    assert_eq!(frozen.verified, 1);
    assert_eq!(frozen.revenue_inr, 250);
    assert_eq!(frozen.rac_upgrades, 1);
    assert_eq!(frozen.rac_pending, 0);

    // Later activity changes live figures only
    h.session.apply(scan("3")).unwrap();
    h.session.apply(SessionEvent::AdvanceStation).unwrap();
    h.session
        .apply(SessionEvent::ReportIncident {
            kind: IncidentKind::Nuisance,
            description: "loud music".to_string(),
            coach: Some("S4".to_string()),
        })
        .unwrap();

    assert_eq!(h.session.state().handover_state().summary.as_ref(), Some(&frozen));
    assert_eq!(h.session.state().summarize().incidents, 1);
}

#[test]
fn test_handover_accept_then_successor() {
    let mut h = harness();
    h.session.apply(SessionEvent::InitiateHandover).unwrap();

    let err = h
        .session
        .apply(SessionEvent::AcceptHandover { tt_id: "TT5921".to_string(), tt_name: String::new() })
        .unwrap_err();
    assert!(matches!(err, EngineError::Validation(_)));
    assert!(h.session.state().is_locked());

    let Outcome::Handover(state) = h
        .session
        .apply(SessionEvent::AcceptHandover {
            tt_id: "TT5921".to_string(),
            tt_name: "S. Patel".to_string(),
        })
        .unwrap()
    else {
        panic!("expected Handover")
    };
    assert_eq!(state.phase, HandoverPhase::Completed);
    assert!(!state.locked);
    assert_eq!(h.metrics.report().handovers_completed_total, 1);

    // Completed is terminal for this coordinator
    assert!(matches!(
        h.session.apply(SessionEvent::InitiateHandover),
        Err(EngineError::IllegalTransition { .. })
    ));

    h.session.apply(SessionEvent::AssumeDuty).unwrap();
    assert_eq!(h.session.state().handover.current_tt().id, "TT5921");
    assert_eq!(h.session.state().handover.phase(), HandoverPhase::Idle);
    h.session.apply(SessionEvent::Verify { passenger_id: PassengerId(1) }).unwrap();
}

#[test]
fn test_cancel_unlocks() {
    let mut h = harness();
    h.session.apply(SessionEvent::ForceTransfer { reason: "TT unwell".to_string() }).unwrap();
    assert_eq!(h.session.state().handover_state().transfer_reason.as_deref(), Some("TT unwell"));

    h.session.apply(SessionEvent::CancelHandover).unwrap();
    assert!(!h.session.state().is_locked());
    assert!(h.session.state().handover_state().summary.is_none());
    h.session.apply(SessionEvent::Verify { passenger_id: PassengerId(1) }).unwrap();
}

#[test]
fn test_reduce_leaves_input_untouched() {
    let h = harness();
    let engine = Engine::from_config(&config());
    let before = h.session.state().clone();

    let transition = engine
        .reduce(&before, SessionEvent::Verify { passenger_id: PassengerId(1) }, Utc::now())
        .unwrap();

    assert_eq!(before.registry.verified_count(), 0);
    assert_eq!(transition.state.registry.verified_count(), 1);
    assert!(transition
        .effects
        .iter()
        .any(|e| matches!(e, Effect::Log { kind: LogKind::Verification, .. })));
}

#[test]
fn test_event_deserializes_from_tagged_json() {
    let event: SessionEvent =
        serde_json::from_str(r#"{"type":"swap_seats","first":1,"second":2}"#).unwrap();
    assert_eq!(event, SessionEvent::SwapSeats { first: PassengerId(1), second: PassengerId(2) });

    let event: SessionEvent = serde_json::from_str(
        r#"{"type":"issue_penalty","payer":"Walk-in","reason":"ticketless"}"#,
    )
    .unwrap();
    assert!(matches!(event, SessionEvent::IssuePenalty { amount_inr: None, .. }));

    let event: SessionEvent = serde_json::from_str(r#"{"type":"advance_station"}"#).unwrap();
    assert_eq!(event.name(), "advance_station");
}
