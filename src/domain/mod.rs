//! Domain models - core onboard types
//!
//! This module contains the canonical data types used throughout the engine:
//! - `Passenger` - a chart entry and its reservation state
//! - `QrPayload` - decoded ticket QR content
//! - `Route` - ordered station sequence and TT segment
//! - `FraudWarning` - ephemeral anomaly produced by the rule engine
//! - session books (no-shows, swaps, penalties, incidents, revenue)
//! - `EngineError` - typed failures surfaced to the UI layer

pub mod error;
pub mod passenger;
pub mod qr;
pub mod records;
pub mod station;
pub mod warning;

pub use error::EngineError;
pub use passenger::{BerthType, Passenger, PassengerId, TicketStatus};
pub use qr::QrPayload;
pub use station::Route;
pub use warning::{FraudWarning, Severity, WarningKind};
