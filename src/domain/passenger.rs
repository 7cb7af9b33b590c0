//! Passenger records as carried on the onboard chart

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Newtype wrapper for passenger IDs to provide type safety
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct PassengerId(pub u64);

impl std::fmt::Display for PassengerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Reservation status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TicketStatus {
    /// Confirmed seat
    #[serde(rename = "CNF")]
    Confirmed,
    /// Reservation Against Cancellation, waiting for a seat
    #[serde(rename = "RAC")]
    Rac,
}

impl TicketStatus {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            TicketStatus::Confirmed => "CNF",
            TicketStatus::Rac => "RAC",
        }
    }
}

/// Sleeping position within a bay
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BerthType {
    #[serde(rename = "LB")]
    Lower,
    #[serde(rename = "MB")]
    Middle,
    #[serde(rename = "UB")]
    Upper,
    #[serde(rename = "SL")]
    SideLower,
    #[serde(rename = "SU")]
    SideUpper,
}

impl BerthType {
    pub fn as_str(&self) -> &'static str {
        match self {
            BerthType::Lower => "LB",
            BerthType::Middle => "MB",
            BerthType::Upper => "UB",
            BerthType::SideLower => "SL",
            BerthType::SideUpper => "SU",
        }
    }
}

impl std::str::FromStr for BerthType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LB" => Ok(BerthType::Lower),
            "MB" => Ok(BerthType::Middle),
            "UB" => Ok(BerthType::Upper),
            "SL" => Ok(BerthType::SideLower),
            "SU" => Ok(BerthType::SideUpper),
            other => Err(format!("unknown berth type {other}")),
        }
    }
}

/// Kind of identity document presented with the ticket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IdDocumentKind {
    Aadhaar,
    Pan,
    Passport,
    VoterId,
    DrivingLicence,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdDocument {
    pub kind: IdDocumentKind,
    pub number: String,
}

/// A passenger on the reservation chart
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passenger {
    pub id: PassengerId,
    pub coach: String,
    pub name: String,
    /// Unset for RAC passengers until upgraded
    #[serde(default)]
    pub seat: Option<u16>,
    pub status: TicketStatus,
    #[serde(default)]
    pub verified: bool,
    pub id_document: IdDocument,
    pub pnr: String,
    pub ticket_date: NaiveDate,
    pub qr_payload: String,
    #[serde(default)]
    pub berth: Option<BerthType>,
    pub age: u8,
    pub boarding: String,
    pub destination: String,
}

impl Passenger {
    /// Create a confirmed passenger holding `seat` in `coach`.
    ///
    /// Route, PNR and document default to placeholders; use the `with_*`
    /// builders to fill them in.
    ///
    /// # Example
    ///
    /// ```
    /// use chrono::NaiveDate;
    /// use tt_onboard::domain::passenger::{Passenger, PassengerId, TicketStatus};
    ///
    /// let date = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
    /// let p = Passenger::confirmed(PassengerId(7), "A. Rao", "S3", 12, date)
    ///     .with_route("NDLS", "BCT");
    /// assert_eq!(p.status, TicketStatus::Confirmed);
    /// assert_eq!(p.seat, Some(12));
    /// assert_eq!(p.qr_payload, "SMARTRAIL|7|A. Rao|S3|12");
    /// ```
    pub fn confirmed(
        id: PassengerId,
        name: &str,
        coach: &str,
        seat: u16,
        ticket_date: NaiveDate,
    ) -> Self {
        Self::base(id, name, coach, Some(seat), TicketStatus::Confirmed, ticket_date)
    }

    /// Create an RAC passenger in `coach` with no seat yet
    pub fn rac(id: PassengerId, name: &str, coach: &str, ticket_date: NaiveDate) -> Self {
        Self::base(id, name, coach, None, TicketStatus::Rac, ticket_date)
    }

    fn base(
        id: PassengerId,
        name: &str,
        coach: &str,
        seat: Option<u16>,
        status: TicketStatus,
        ticket_date: NaiveDate,
    ) -> Self {
        let seat_field = seat.map(|s| s.to_string()).unwrap_or_else(|| "RAC".to_string());
        Self {
            id,
            coach: coach.to_string(),
            name: name.to_string(),
            seat,
            status,
            verified: false,
            id_document: IdDocument { kind: IdDocumentKind::Aadhaar, number: String::new() },
            pnr: format!("PNR{}", id.0),
            ticket_date,
            qr_payload: format!("SMARTRAIL|{}|{}|{}|{}", id, name, coach, seat_field),
            berth: None,
            age: 30,
            boarding: String::new(),
            destination: String::new(),
        }
    }

    pub fn with_route(mut self, boarding: &str, destination: &str) -> Self {
        self.boarding = boarding.to_string();
        self.destination = destination.to_string();
        self
    }

    pub fn with_pnr(mut self, pnr: &str) -> Self {
        self.pnr = pnr.to_string();
        self
    }

    pub fn with_berth(mut self, berth: BerthType) -> Self {
        self.berth = Some(berth);
        self
    }

    pub fn with_age(mut self, age: u8) -> Self {
        self.age = age;
        self
    }

    pub fn with_id_document(mut self, kind: IdDocumentKind, number: &str) -> Self {
        self.id_document = IdDocument { kind, number: number.to_string() };
        self
    }

    pub fn with_qr_payload(mut self, payload: &str) -> Self {
        self.qr_payload = payload.to_string();
        self
    }

    pub fn verified(mut self) -> Self {
        self.verified = true;
        self
    }

    #[inline]
    pub fn holds_seat(&self) -> bool {
        self.seat.is_some()
    }

    #[inline]
    pub fn is_rac(&self) -> bool {
        self.status == TicketStatus::Rac
    }

    /// Seat occupied by a confirmed passenger, if any
    #[inline]
    pub fn confirmed_seat(&self) -> Option<u16> {
        match self.status {
            TicketStatus::Confirmed => self.seat,
            TicketStatus::Rac => None,
        }
    }
}
