//! Closed registry of approved rejection reasons.
//!
//! Codes are the stable wire identifiers; descriptions are presentation
//! only. Extending the set is a code change, not a runtime operation.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    CultureFit,
    TechnicalSkills,
    Experience,
    Salary,
    PositionClosed,
}

impl RejectReason {
    pub const ALL: [RejectReason; 5] = [
        RejectReason::CultureFit,
        RejectReason::TechnicalSkills,
        RejectReason::Experience,
        RejectReason::Salary,
        RejectReason::PositionClosed,
    ];

    pub const fn code(self) -> &'static str {
        match self {
            RejectReason::CultureFit => "culture_fit",
            RejectReason::TechnicalSkills => "technical_skills",
            RejectReason::Experience => "experience",
            RejectReason::Salary => "salary",
            RejectReason::PositionClosed => "position_closed",
        }
    }

    pub const fn description(self) -> &'static str {
        match self {
            RejectReason::CultureFit => "Not a culture fit",
            RejectReason::TechnicalSkills => "Insufficient technical skills",
            RejectReason::Experience => "Insufficient experience",
            RejectReason::Salary => "Salary expectations mismatch",
            RejectReason::PositionClosed => "Position closed",
        }
    }

    /// Looks a code up against the approved set.
    pub fn from_code(code: &str) -> Option<Self> {
        RejectReason::ALL
            .into_iter()
            .find(|reason| reason.code() == code)
    }
}
