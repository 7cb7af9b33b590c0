//! Chart and script loading
//!
//! The passenger chart is a JSON array of passengers. A session script is
//! JSONL: one tagged `SessionEvent` per line, blank lines and `#` comments
//! skipped.

use crate::domain::passenger::Passenger;
use crate::services::session::SessionEvent;
use anyhow::Context;
use std::fs;
use std::path::Path;
use tracing::info;

pub fn parse_passengers(content: &str) -> anyhow::Result<Vec<Passenger>> {
    let passengers: Vec<Passenger> =
        serde_json::from_str(content).context("chart is not a JSON array of passengers")?;
    Ok(passengers)
}

/// Load the reservation chart prepared for this train
pub fn load_passengers<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<Passenger>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read chart {}", path.display()))?;
    let passengers = parse_passengers(&content)
        .with_context(|| format!("Failed to parse chart {}", path.display()))?;

    info!(file = %path.display(), passengers = %passengers.len(), "chart_loaded");
    Ok(passengers)
}

pub fn parse_script(content: &str) -> anyhow::Result<Vec<SessionEvent>> {
    let mut events = Vec::new();
    for (i, line) in content.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let event: SessionEvent =
            serde_json::from_str(line).with_context(|| format!("line {}: bad event", i + 1))?;
        events.push(event);
    }
    Ok(events)
}

pub fn load_script<P: AsRef<Path>>(path: P) -> anyhow::Result<Vec<SessionEvent>> {
    let path = path.as_ref();
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read script {}", path.display()))?;
    let events = parse_script(&content)
        .with_context(|| format!("Failed to parse script {}", path.display()))?;

    info!(file = %path.display(), events = %events.len(), "script_loaded");
    Ok(events)
}
