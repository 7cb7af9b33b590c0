//! Ordered station sequence for the journey

use crate::domain::error::{EngineError, Result};
use rustc_hash::FxHashSet;

/// Fixed, ordered list of stations plus the end of the TT's segment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Route {
    stations: Vec<String>,
    segment_end: String,
}

impl Route {
    /// Build a route, rejecting empty or duplicated station lists.
    ///
    /// An empty `segment_end` means the TT covers the whole journey.
    pub fn new(stations: Vec<String>, segment_end: &str) -> Result<Self> {
        if stations.is_empty() {
            return Err(EngineError::validation("route has no stations"));
        }

        let mut seen = FxHashSet::default();
        for station in &stations {
            if !seen.insert(station.as_str()) {
                return Err(EngineError::validation(format!("duplicate station {station}")));
            }
        }

        let segment_end = if segment_end.is_empty() {
            stations[stations.len() - 1].clone()
        } else if seen.contains(segment_end) {
            segment_end.to_string()
        } else {
            return Err(EngineError::validation(format!(
                "segment end {segment_end} is not on the route"
            )));
        };

        Ok(Self { stations, segment_end })
    }

    #[inline]
    pub fn stations(&self) -> &[String] {
        &self.stations
    }

    #[inline]
    pub fn segment_end(&self) -> &str {
        &self.segment_end
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.stations.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    #[inline]
    pub fn last_index(&self) -> usize {
        self.stations.len().saturating_sub(1)
    }

    pub fn index_of(&self, station: &str) -> Option<usize> {
        index_of(&self.stations, station)
    }

    /// Station name at `index`, clamped to the terminal station
    pub fn name_at(&self, index: usize) -> &str {
        &self.stations[index.min(self.last_index())]
    }
}

/// Position of `station` in `stations`
#[inline]
pub fn index_of(stations: &[String], station: &str) -> Option<usize> {
    stations.iter().position(|s| s == station)
}
