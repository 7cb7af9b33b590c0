//! Station progression queries
//!
//! Read-only views derived from the chart and the ordered station list.
//! Nothing here removes or mutates passengers.

use crate::domain::passenger::Passenger;
use crate::domain::station::index_of;
use serde::Serialize;

/// Default number of stations before the segment end that counts as "near"
pub const DEFAULT_NEAR_END_THRESHOLD: usize = 1;

/// Advance the station cursor, stopping at the terminal station
#[inline]
pub fn move_to_next(index: usize, stations: &[String]) -> usize {
    let last = stations.len().saturating_sub(1);
    index.saturating_add(1).min(last)
}

/// Unverified passengers due to board at `station`
pub fn expected_boarding(passengers: &[Passenger], station: &str) -> Vec<Passenger> {
    passengers.iter().filter(|p| !p.verified && p.boarding == station).cloned().collect()
}

/// Unverified passengers whose boarding station is already behind the train
pub fn boarding_missed(passengers: &[Passenger], current: &str, stations: &[String]) -> Vec<Passenger> {
    let Some(current_idx) = index_of(stations, current) else {
        return Vec::new();
    };
    passengers
        .iter()
        .filter(|p| !p.verified)
        .filter(|p| index_of(stations, &p.boarding).is_some_and(|b| b < current_idx))
        .cloned()
        .collect()
}

/// Passengers whose destination is `station`
pub fn alighting(passengers: &[Passenger], station: &str) -> Vec<Passenger> {
    passengers.iter().filter(|p| p.destination == station).cloned().collect()
}

/// True when `end` is between zero and `threshold` stations ahead of `current`
pub fn is_near_segment_end(current: &str, end: &str, stations: &[String], threshold: usize) -> bool {
    let (Some(current_idx), Some(end_idx)) = (index_of(stations, current), index_of(stations, end))
    else {
        return false;
    };
    end_idx >= current_idx && end_idx - current_idx <= threshold
}

/// Snapshot of what the TT should expect at a station
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationSummary {
    pub station: String,
    pub station_index: usize,
    pub expected_boarding: Vec<Passenger>,
    pub boarding_missed: Vec<Passenger>,
    pub alighting: Vec<Passenger>,
    pub expected_boarding_count: usize,
    pub boarding_missed_count: usize,
    pub alighting_count: usize,
    pub near_segment_end: bool,
}

pub fn station_summary(
    passengers: &[Passenger],
    stations: &[String],
    current_index: usize,
    segment_end: &str,
    threshold: usize,
) -> StationSummary {
    let station = stations.get(current_index).cloned().unwrap_or_default();
    let expected_boarding = expected_boarding(passengers, &station);
    let boarding_missed = boarding_missed(passengers, &station, stations);
    let alighting = alighting(passengers, &station);

    StationSummary {
        station_index: current_index,
        expected_boarding_count: expected_boarding.len(),
        boarding_missed_count: boarding_missed.len(),
        alighting_count: alighting.len(),
        near_segment_end: is_near_segment_end(&station, segment_end, stations, threshold),
        station,
        expected_boarding,
        boarding_missed,
        alighting,
    }
}
