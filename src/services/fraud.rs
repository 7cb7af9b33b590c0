//! Fraud and anomaly rule engine
//!
//! Evaluates a resolved passenger against every rule and reports warnings
//! in a fixed order:
//! 1. duplicate scanned code
//! 2. already verified
//! 3. expired journey
//! 4. wrong travel date
//! 5. blacklist
//! 6. coach mismatch
//!
//! An unresolved scan short-circuits to a single NOT_FOUND warning.

use crate::domain::passenger::Passenger;
use crate::domain::station::Route;
use crate::domain::warning::{FraudWarning, WarningKind};
use chrono::NaiveDate;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::Deserialize;
use smallvec::{smallvec, SmallVec};
use tracing::debug;

/// Warnings from one evaluation; usually zero to two
pub type Warnings = SmallVec<[FraudWarning; 4]>;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BlacklistEntry {
    pub name: String,
    pub reason: String,
}

/// Names barred from travel, matched case-insensitively
#[derive(Debug, Clone, Default)]
pub struct Blacklist {
    reasons: FxHashMap<String, String>,
}

impl Blacklist {
    pub fn from_entries(entries: &[BlacklistEntry]) -> Self {
        let reasons = entries
            .iter()
            .map(|e| (e.name.trim().to_lowercase(), e.reason.clone()))
            .collect();
        Self { reasons }
    }

    pub fn reason_for(&self, name: &str) -> Option<&str> {
        self.reasons.get(&name.trim().to_lowercase()).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.reasons.len()
    }

    pub fn is_empty(&self) -> bool {
        self.reasons.is_empty()
    }
}

/// Every QR string scanned this session. Append-only.
#[derive(Debug, Clone, Default)]
pub struct ScannedCodeSet {
    codes: FxHashSet<String>,
}

impl ScannedCodeSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a code; returns false if it was already present
    pub fn insert(&mut self, code: &str) -> bool {
        self.codes.insert(code.to_string())
    }

    pub fn contains(&self, code: &str) -> bool {
        self.codes.contains(code)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

/// Everything the rules need besides the passenger
#[derive(Debug, Clone, Copy)]
pub struct FraudContext<'a> {
    /// Raw code that was scanned, if the lookup came from a scan
    pub scanned_code: Option<&'a str>,
    pub scanned: &'a ScannedCodeSet,
    pub route: &'a Route,
    pub current_station: usize,
    /// Reference date supplied by the caller, never read from the clock
    pub today: NaiveDate,
    /// Coach the TT is currently working
    pub current_coach: Option<&'a str>,
}

pub struct FraudRuleEngine {
    blacklist: Blacklist,
}

impl FraudRuleEngine {
    pub fn new(blacklist: Blacklist) -> Self {
        Self { blacklist }
    }

    pub fn blacklist(&self) -> &Blacklist {
        &self.blacklist
    }

    /// Run every rule against the passenger
    pub fn run_all_checks(&self, passenger: Option<&Passenger>, ctx: &FraudContext<'_>) -> Warnings {
        let Some(p) = passenger else {
            let what = ctx.scanned_code.unwrap_or("lookup");
            debug!(code = %what, "fraud_not_found");
            return smallvec![FraudWarning::new(
                WarningKind::NotFound,
                format!("No passenger matches {what}"),
            )];
        };

        let mut warnings = Warnings::new();
        if let Some(code) = ctx.scanned_code {
            warnings.extend(check_duplicate_qr(code, ctx.scanned));
        }
        warnings.extend(check_already_verified(p));
        warnings.extend(check_expired_journey(p, ctx.route, ctx.current_station));
        warnings.extend(check_wrong_date(p, ctx.today));
        warnings.extend(self.check_blacklist(p));
        if let Some(coach) = ctx.current_coach {
            warnings.extend(check_coach_mismatch(p, coach));
        }

        if !warnings.is_empty() {
            debug!(
                passenger_id = %p.id,
                kinds = ?warnings.iter().map(|w| w.kind.as_str()).collect::<Vec<_>>(),
                "fraud_warnings"
            );
        }
        warnings
    }

    pub fn check_blacklist(&self, p: &Passenger) -> Option<FraudWarning> {
        let reason = self.blacklist.reason_for(&p.name)?;
        Some(FraudWarning::new(
            WarningKind::Blacklisted,
            format!("{} is blacklisted: {}", p.name, reason),
        ))
    }
}

pub fn check_duplicate_qr(code: &str, scanned: &ScannedCodeSet) -> Option<FraudWarning> {
    scanned
        .contains(code)
        .then(|| FraudWarning::new(WarningKind::DuplicateQr, "This QR code was already scanned"))
}

pub fn check_already_verified(p: &Passenger) -> Option<FraudWarning> {
    p.verified.then(|| {
        FraudWarning::new(WarningKind::AlreadyVerified, format!("{} is already verified", p.name))
    })
}

/// Destination lies behind the current station
pub fn check_expired_journey(p: &Passenger, route: &Route, current_station: usize) -> Option<FraudWarning> {
    let destination = route.index_of(&p.destination)?;
    (destination < current_station).then(|| {
        FraudWarning::new(
            WarningKind::ExpiredJourney,
            format!("Journey ended at {}, train is past it", p.destination),
        )
    })
}

pub fn check_wrong_date(p: &Passenger, today: NaiveDate) -> Option<FraudWarning> {
    (p.ticket_date != today).then(|| {
        FraudWarning::new(
            WarningKind::WrongDate,
            format!("Ticket is for {}, not {}", p.ticket_date, today),
        )
    })
}

/// Only evaluated when the ticket names a coach
pub fn check_coach_mismatch(p: &Passenger, current_coach: &str) -> Option<FraudWarning> {
    if p.coach.trim().is_empty() || p.coach == current_coach {
        return None;
    }
    Some(FraudWarning::new(
        WarningKind::CoachMismatch,
        format!("Ticket is for coach {}, checked in {}", p.coach, current_coach),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::passenger::PassengerId;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 10, 18).unwrap()
    }

    fn route() -> Route {
        Route::new(["A", "B", "C", "D"].iter().map(|s| s.to_string()).collect(), "").unwrap()
    }

    fn passenger() -> Passenger {
        Passenger::confirmed(PassengerId(1), "Ravi Kumar", "S3", 4, today()).with_route("A", "D")
    }

    fn engine() -> FraudRuleEngine {
        FraudRuleEngine::new(Blacklist::from_entries(&[BlacklistEntry {
            name: "Ravi Kumar".to_string(),
            reason: "repeated ticketless travel".to_string(),
        }]))
    }

    fn kinds(w: &Warnings) -> Vec<WarningKind> {
        w.iter().map(|w| w.kind).collect()
    }

    #[test]
    fn test_duplicate_check() {
        let mut scanned = ScannedCodeSet::new();
        scanned.insert("Q1");

        let w = check_duplicate_qr("Q1", &scanned).unwrap();
        assert_eq!(w.kind, WarningKind::DuplicateQr);
        assert!(w.is_critical());
        assert!(check_duplicate_qr("Q2", &scanned).is_none());
    }

    #[test]
    fn test_expired_journey() {
        let p = passenger().with_route("A", "B");
        let w = check_expired_journey(&p, &route(), 2).unwrap();
        assert_eq!(w.kind, WarningKind::ExpiredJourney);

        // At the destination itself the journey is still valid
        assert!(check_expired_journey(&p, &route(), 1).is_none());
        // Destination not on this route: rule does not apply
        let off_route = passenger().with_route("A", "Z");
        assert!(check_expired_journey(&off_route, &route(), 3).is_none());
    }

    #[test]
    fn test_wrong_date_uses_reference_day() {
        let p = passenger();
        assert!(check_wrong_date(&p, today()).is_none());
        let tomorrow = today().succ_opt().unwrap();
        assert_eq!(check_wrong_date(&p, tomorrow).unwrap().kind, WarningKind::WrongDate);
    }

    #[test]
    fn test_blacklist_case_insensitive_with_reason() {
        let p = passenger();
        let mut shouting = p.clone();
        shouting.name = "RAVI KUMAR".to_string();

        let w = engine().check_blacklist(&shouting).unwrap();
        assert_eq!(w.kind, WarningKind::Blacklisted);
        assert!(w.message.contains("repeated ticketless travel"));

        let other = Passenger { name: "Someone Else".to_string(), ..p };
        assert!(engine().check_blacklist(&other).is_none());
    }

    #[test]
    fn test_coach_mismatch_only_when_ticket_coach_known() {
        let p = passenger();
        assert!(check_coach_mismatch(&p, "S3").is_none());
        assert_eq!(check_coach_mismatch(&p, "S4").unwrap().kind, WarningKind::CoachMismatch);

        let unknown = Passenger { coach: String::new(), ..p };
        assert!(check_coach_mismatch(&unknown, "S4").is_none());
    }

    #[test]
    fn test_not_found_short_circuits() {
        let mut scanned = ScannedCodeSet::new();
        scanned.insert("X");
        let route = route();
        let ctx = FraudContext {
            scanned_code: Some("X"),
            scanned: &scanned,
            route: &route,
            current_station: 3,
            today: today(),
            current_coach: Some("S9"),
        };

        let w = engine().run_all_checks(None, &ctx);
        assert_eq!(kinds(&w), vec![WarningKind::NotFound]);
        assert!(w[0].is_critical());
    }

    #[test]
    fn test_all_rules_in_fixed_order() {
        let p = passenger().with_route("A", "B").verified();
        let mut scanned = ScannedCodeSet::new();
        scanned.insert(&p.qr_payload);
        let route = route();
        let ctx = FraudContext {
            scanned_code: Some(p.qr_payload.as_str()),
            scanned: &scanned,
            route: &route,
            current_station: 2,
            today: today().succ_opt().unwrap(),
            current_coach: Some("S4"),
        };

        let w = engine().run_all_checks(Some(&p), &ctx);
        assert_eq!(
            kinds(&w),
            vec![
                WarningKind::DuplicateQr,
                WarningKind::AlreadyVerified,
                WarningKind::ExpiredJourney,
                WarningKind::WrongDate,
                WarningKind::Blacklisted,
                WarningKind::CoachMismatch,
            ]
        );
    }

    #[test]
    fn test_clean_ticket_has_no_warnings() {
        let p = Passenger { name: "Clean Traveller".to_string(), ..passenger() };
        let scanned = ScannedCodeSet::new();
        let route = route();
        let ctx = FraudContext {
            scanned_code: None,
            scanned: &scanned,
            route: &route,
            current_station: 0,
            today: today(),
            current_coach: Some("S3"),
        };

        assert!(engine().run_all_checks(Some(&p), &ctx).is_empty());
    }
}
