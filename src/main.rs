//! tt-session - replay a duty session against the onboard engine
//!
//! Loads the train configuration and the reservation chart, then applies a
//! scripted sequence of TT actions (JSONL) through the session reducer.
//! Notifications and duty-log lines go to the tracing output.
//!
//! Module structure:
//! - `domain/` - Core types (Passenger, QR payload, Route, warnings, records)
//! - `services/` - Registry, fraud rules, RAC allocation, stations, handover, session
//! - `io/` - Sinks and chart/script loading
//! - `infra/` - Config and metrics

use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use time::format_description::well_known::Rfc3339;
use time::OffsetDateTime;
use tracing::{error, info};
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::EnvFilter;
use tt_onboard::infra::{Config, Metrics};
use tt_onboard::io::{load_passengers, load_script, TracingSink};
use tt_onboard::services::{Outcome, Session};

/// Replay a TT duty session from a chart and an action script
#[derive(Parser, Debug)]
#[command(name = "tt-session", version, about)]
struct Args {
    /// Path to TOML configuration file
    #[arg(short, long, env = "CONFIG_FILE", default_value = "config/dev.toml")]
    config: String,

    /// Reservation chart (JSON array of passengers)
    #[arg(short, long, default_value = "demos/chart.json")]
    manifest: String,

    /// Session script (JSONL, one event per line)
    #[arg(short, long, default_value = "demos/session.jsonl")]
    script: String,

    /// Emit logs as JSON lines
    #[arg(long)]
    json: bool,

    /// Stop at the first rejected event
    #[arg(long)]
    strict: bool,
}

fn init_tracing(json: bool) {
    // Default: INFO, use RUST_LOG=debug for full event visibility
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_timer(UtcTime::rfc_3339())
        .with_target(false);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.json);

    let started_at = OffsetDateTime::now_local()
        .unwrap_or_else(|_| OffsetDateTime::now_utc())
        .format(&Rfc3339)
        .unwrap_or_default();
    info!(started_at = %started_at, "tt-session starting");

    let config = Config::load_from_path(&args.config);
    info!(
        config_file = %config.config_file(),
        train = %config.train_number(),
        train_name = %config.train_name(),
        journey_date = %config.journey_date(),
        stations = %config.stations().len(),
        segment_end = %config.segment_end(),
        tt_id = %config.tt_id(),
        blacklist = %config.blacklist().len(),
        "config_loaded"
    );

    let passengers = load_passengers(&args.manifest)?;
    let script = load_script(&args.script)?;

    let metrics = Arc::new(Metrics::new());
    let mut session = Session::from_config(&config, passengers, Arc::new(TracingSink), metrics.clone())
        .context("invalid route or chart")?;

    let report_every = config.report_every_events();
    let mut rejected = 0usize;

    for (i, event) in script.into_iter().enumerate() {
        let step = i + 1;
        let name = event.name();
        match session.apply(event) {
            Ok(outcome) => log_outcome(step, name, &outcome),
            Err(e) => {
                rejected += 1;
                if args.strict {
                    error!(step = %step, event = %name, error = %e, "script_aborted");
                    return Err(e).with_context(|| format!("step {step} ({name}) rejected"));
                }
            }
        }

        if report_every > 0 && metrics.events_total() % report_every == 0 {
            metrics.report().log();
        }
    }

    let state = session.state();
    let summary = state.summarize();
    info!(
        station = %summary.station,
        passengers = %summary.total_passengers,
        verified = %summary.verified,
        pending = %summary.pending,
        rac_pending = %summary.rac_pending,
        vacant_seats = %summary.vacant_seats,
        revenue_inr = %summary.revenue_inr,
        handover = %state.handover.phase().as_str(),
        rejected = %rejected,
        "session_finished"
    );
    metrics.report().log();

    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(())
}

fn log_outcome(step: usize, event: &str, outcome: &Outcome) {
    match outcome {
        Outcome::Checked { passenger, warnings } => info!(
            step = %step,
            event = %event,
            passenger = ?passenger.as_ref().map(|p| p.id),
            warnings = ?warnings.iter().map(|w| w.kind.as_str()).collect::<Vec<_>>(),
            "step_applied"
        ),
        Outcome::Arrived(summary) => info!(
            step = %step,
            event = %event,
            station = %summary.station,
            near_segment_end = %summary.near_segment_end,
            "step_applied"
        ),
        other => info!(step = %step, event = %event, outcome = %other.label(), "step_applied"),
    }
}
