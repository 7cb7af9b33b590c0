//! QR payload parsing
//!
//! Tickets carry either a structured payload
//! `SMARTRAIL|<id>|<name>|<coach>|<seat>` or just the numeric passenger id.
//! Parsing never fails; anything unrecognised becomes `QrPayload::Invalid`.

use crate::domain::passenger::PassengerId;

pub const QR_PREFIX: &str = "SMARTRAIL";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QrPayload {
    Structured { id: PassengerId, name: String, coach: String, seat: Option<u16> },
    Bare { id: PassengerId },
    Invalid,
}

impl QrPayload {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();
        if raw.is_empty() {
            return QrPayload::Invalid;
        }

        if raw.contains('|') {
            let parts: Vec<&str> = raw.split('|').map(str::trim).collect();
            let [prefix, id, name, coach, seat] = parts.as_slice() else {
                return QrPayload::Invalid;
            };
            if *prefix != QR_PREFIX {
                return QrPayload::Invalid;
            }
            let Ok(id) = id.parse::<u64>() else {
                return QrPayload::Invalid;
            };
            // "RAC" or blank seat fields are legitimate for waitlisted tickets
            let seat = seat.parse::<u16>().ok();
            return QrPayload::Structured {
                id: PassengerId(id),
                name: name.to_string(),
                coach: coach.to_string(),
                seat,
            };
        }

        match raw.parse::<u64>() {
            Ok(id) => QrPayload::Bare { id: PassengerId(id) },
            Err(_) => QrPayload::Invalid,
        }
    }

    /// Passenger id carried by the payload, if it parsed
    #[inline]
    pub fn passenger_id(&self) -> Option<PassengerId> {
        match self {
            QrPayload::Structured { id, .. } | QrPayload::Bare { id } => Some(*id),
            QrPayload::Invalid => None,
        }
    }
}

impl std::str::FromStr for QrPayload {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(QrPayload::parse(s))
    }
}
