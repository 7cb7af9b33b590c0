//! Passenger registry - sole owner of the chart
//!
//! Every mutation builds the next collection and swaps it in whole, so a
//! failed operation leaves the chart exactly as it was.

use crate::domain::error::{EngineError, Result};
use crate::domain::passenger::{Passenger, PassengerId};
use crate::domain::qr::QrPayload;
use crate::domain::records::{new_record_id, NoShowRecord, SeatHolding, SwapRecord};
use crate::services::rac_allocator::SEATS_PER_COACH;
use chrono::{DateTime, Utc};
use rustc_hash::{FxHashMap, FxHashSet};
use tracing::{debug, info, warn};

/// Passengers sharing one booking reference
#[derive(Debug, Clone)]
pub struct PnrGroup<'a> {
    pub pnr: &'a str,
    pub members: Vec<&'a Passenger>,
}

impl PnrGroup<'_> {
    pub fn all_verified(&self) -> bool {
        self.members.iter().all(|p| p.verified)
    }
}

#[derive(Debug, Clone, Default)]
pub struct PassengerRegistry {
    passengers: Vec<Passenger>,
    no_shows: Vec<NoShowRecord>,
    swaps: Vec<SwapRecord>,
}

impl PassengerRegistry {
    /// Take ownership of a prepared chart.
    ///
    /// Rejects duplicate passenger ids and RAC passengers that already hold a
    /// seat; every lookup and mutation relies on both.
    pub fn new(passengers: Vec<Passenger>) -> Result<Self> {
        let mut seen = FxHashSet::default();
        for p in &passengers {
            if !seen.insert(p.id) {
                return Err(EngineError::validation(format!("duplicate passenger id {}", p.id)));
            }
            if p.is_rac() && p.seat.is_some() {
                return Err(EngineError::validation(format!(
                    "RAC passenger {} must not hold a seat",
                    p.id
                )));
            }
        }

        Ok(Self { passengers, no_shows: Vec::new(), swaps: Vec::new() })
    }

    #[inline]
    pub fn passengers(&self) -> &[Passenger] {
        &self.passengers
    }

    #[inline]
    pub fn no_shows(&self) -> &[NoShowRecord] {
        &self.no_shows
    }

    #[inline]
    pub fn swaps(&self) -> &[SwapRecord] {
        &self.swaps
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.passengers.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.passengers.is_empty()
    }

    pub fn find_by_id(&self, id: PassengerId) -> Option<&Passenger> {
        self.passengers.iter().find(|p| p.id == id)
    }

    fn require(&self, id: PassengerId) -> Result<&Passenger> {
        self.find_by_id(id).ok_or_else(|| EngineError::not_found(format!("passenger {id}")))
    }

    /// Resolve a scanned QR string to a passenger.
    ///
    /// Accepts structured and bare-id payloads; anything else is simply not
    /// found.
    pub fn find_by_qr(&self, raw: &str) -> Option<&Passenger> {
        let payload = QrPayload::parse(raw);
        let found = payload.passenger_id().and_then(|id| self.find_by_id(id));
        if found.is_none() {
            debug!(payload = ?payload, "qr_unresolved");
        }
        found
    }

    /// Mark a passenger verified.
    ///
    /// Returns `Ok(false)` when the passenger was already verified; the chart
    /// is untouched in that case.
    pub fn verify(&mut self, id: PassengerId) -> Result<bool> {
        if self.require(id)?.verified {
            debug!(passenger_id = %id, "verify_already_verified");
            return Ok(false);
        }

        let next = self
            .passengers
            .iter()
            .map(|p| if p.id == id { Passenger { verified: true, ..p.clone() } } else { p.clone() })
            .collect();
        self.passengers = next;

        info!(passenger_id = %id, "passenger_verified");
        Ok(true)
    }

    /// Verify every member of a PNR group in one replacement.
    ///
    /// Returns how many passengers changed state.
    pub fn verify_pnr_group(&mut self, pnr: &str) -> Result<usize> {
        if !self.passengers.iter().any(|p| p.pnr == pnr) {
            return Err(EngineError::not_found(format!("pnr {pnr}")));
        }

        let mut changed = 0;
        let next = self
            .passengers
            .iter()
            .map(|p| {
                if p.pnr == pnr && !p.verified {
                    changed += 1;
                    Passenger { verified: true, ..p.clone() }
                } else {
                    p.clone()
                }
            })
            .collect();
        self.passengers = next;

        info!(pnr = %pnr, changed = %changed, "pnr_group_verified");
        Ok(changed)
    }

    /// Remove a passenger from the active chart and book them as a no-show
    pub fn mark_no_show(
        &mut self,
        id: PassengerId,
        station: &str,
        at: DateTime<Utc>,
    ) -> Result<&NoShowRecord> {
        let passenger = self.require(id)?.clone();

        let next = self.passengers.iter().filter(|p| p.id != id).cloned().collect();
        self.passengers = next;

        info!(
            passenger_id = %id,
            coach = %passenger.coach,
            seat = ?passenger.seat,
            station = %station,
            "passenger_no_show"
        );

        self.no_shows.push(NoShowRecord {
            record_id: new_record_id(),
            passenger,
            station: station.to_string(),
            at,
        });
        Ok(&self.no_shows[self.no_shows.len() - 1])
    }

    /// Exchange seat and berth between two seated passengers
    pub fn swap_seats(
        &mut self,
        first: PassengerId,
        second: PassengerId,
        at: DateTime<Utc>,
    ) -> Result<&SwapRecord> {
        if first == second {
            return Err(EngineError::validation(format!("cannot swap passenger {first} with itself")));
        }

        let a = self.require(first)?;
        let b = self.require(second)?;
        if !a.holds_seat() || !b.holds_seat() {
            warn!(first = %first, second = %second, "swap_rejected_no_seat");
            return Err(EngineError::validation("both passengers must hold an assigned seat"));
        }

        let first_holding = SeatHolding { passenger_id: first, seat: a.seat, berth: a.berth };
        let second_holding = SeatHolding { passenger_id: second, seat: b.seat, berth: b.berth };

        let next = self
            .passengers
            .iter()
            .map(|p| {
                if p.id == first {
                    Passenger { seat: second_holding.seat, berth: second_holding.berth, ..p.clone() }
                } else if p.id == second {
                    Passenger { seat: first_holding.seat, berth: first_holding.berth, ..p.clone() }
                } else {
                    p.clone()
                }
            })
            .collect();
        self.passengers = next;

        info!(
            first = %first,
            second = %second,
            first_seat = ?first_holding.seat,
            second_seat = ?second_holding.seat,
            "seats_swapped"
        );

        self.swaps.push(SwapRecord {
            record_id: new_record_id(),
            first: first_holding,
            second: second_holding,
            at,
        });
        Ok(&self.swaps[self.swaps.len() - 1])
    }

    /// Swap in a whole new chart, e.g. the result of an RAC allocation
    pub fn replace_all(&mut self, next: Vec<Passenger>) {
        self.passengers = next;
    }

    /// PNR groups in chart order
    pub fn pnr_groups(&self) -> Vec<PnrGroup<'_>> {
        let mut index: FxHashMap<&str, usize> = FxHashMap::default();
        let mut groups: Vec<PnrGroup<'_>> = Vec::new();

        for p in &self.passengers {
            match index.get(p.pnr.as_str()) {
                Some(&i) => groups[i].members.push(p),
                None => {
                    index.insert(p.pnr.as_str(), groups.len());
                    groups.push(PnrGroup { pnr: p.pnr.as_str(), members: vec![p] });
                }
            }
        }
        groups
    }

    pub fn pnr_group(&self, pnr: &str) -> Option<PnrGroup<'_>> {
        let members: Vec<&Passenger> = self.passengers.iter().filter(|p| p.pnr == pnr).collect();
        if members.is_empty() {
            return None;
        }
        Some(PnrGroup { pnr: members[0].pnr.as_str(), members })
    }

    /// Distinct coach codes in chart order
    pub fn coaches(&self) -> Vec<&str> {
        let mut coaches: Vec<&str> = Vec::new();
        for p in &self.passengers {
            if !coaches.contains(&p.coach.as_str()) {
                coaches.push(p.coach.as_str());
            }
        }
        coaches
    }

    /// Seats in `coach` not held by a confirmed passenger
    pub fn vacant_seats(&self, coach: &str) -> usize {
        let occupied = self
            .passengers
            .iter()
            .filter(|p| p.coach == coach)
            .filter_map(|p| p.confirmed_seat())
            .filter(|s| (1..=SEATS_PER_COACH).contains(s))
            .count();
        usize::from(SEATS_PER_COACH).saturating_sub(occupied)
    }

    pub fn total_vacant_seats(&self) -> usize {
        self.coaches().iter().map(|c| self.vacant_seats(c)).sum()
    }

    pub fn verified_count(&self) -> usize {
        self.passengers.iter().filter(|p| p.verified).count()
    }

    pub fn pending_count(&self) -> usize {
        self.passengers.len() - self.verified_count()
    }

    pub fn rac_pending_count(&self) -> usize {
        self.passengers.iter().filter(|p| p.is_rac()).count()
    }
}
