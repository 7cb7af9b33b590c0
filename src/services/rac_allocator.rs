//! RAC allocation
//!
//! Moves the first waitlisted passenger of a coach into the lowest free seat.
//! Pure: fees and notifications are the caller's business, detected by
//! diffing the chart before and after.

use crate::domain::passenger::{Passenger, TicketStatus};
use tracing::debug;

/// Seats numbered 1..=40 in every coach
pub const SEATS_PER_COACH: u16 = 40;

/// Lowest seat in `coach` not held by a confirmed passenger
pub fn first_free_seat(passengers: &[Passenger], coach: &str) -> Option<u16> {
    let mut occupied = [false; SEATS_PER_COACH as usize + 1];
    for seat in passengers.iter().filter(|p| p.coach == coach).filter_map(|p| p.confirmed_seat()) {
        if let Some(slot) = occupied.get_mut(usize::from(seat)) {
            *slot = true;
        }
    }
    (1..=SEATS_PER_COACH).find(|&s| !occupied[usize::from(s)])
}

/// Upgrade at most one RAC passenger in `coach`.
///
/// Returns the chart unchanged when the coach has no RAC passenger or no free
/// seat.
pub fn allocate_rac(passengers: &[Passenger], coach: &str) -> Vec<Passenger> {
    let candidate = passengers.iter().position(|p| p.coach == coach && p.is_rac());
    let seat = first_free_seat(passengers, coach);

    let (Some(idx), Some(seat)) = (candidate, seat) else {
        debug!(
            coach = %coach,
            has_rac = %candidate.is_some(),
            has_seat = %seat.is_some(),
            "rac_allocation_noop"
        );
        return passengers.to_vec();
    };

    passengers
        .iter()
        .enumerate()
        .map(|(i, p)| {
            if i == idx {
                Passenger { status: TicketStatus::Confirmed, seat: Some(seat), ..p.clone() }
            } else {
                p.clone()
            }
        })
        .collect()
}

/// The passenger that an allocation upgraded, if any
pub fn find_upgrade<'a>(before: &[Passenger], after: &'a [Passenger]) -> Option<&'a Passenger> {
    after.iter().find(|p| {
        p.status == TicketStatus::Confirmed
            && before.iter().any(|old| old.id == p.id && old.status == TicketStatus::Rac)
    })
}
