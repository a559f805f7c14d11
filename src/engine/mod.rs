pub mod calculator;
pub mod classifier;
pub mod recommender;
pub mod validator;

use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::programme::ProgrammeRecord;
use crate::scores::ScoreMap;

use calculator::ScoreOutcome;

/// Admission likelihood band. `Error` is the sentinel for programmes that
/// cannot be scored at all (missing weighted subject or missing statistics),
/// distinct from `MissionImpossible` which means eligible but far below the
/// admission thresholds. Higher is a safer bet.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(into = "i8", try_from = "i8")]
pub enum Band {
    Error,
    MissionImpossible,
    Dangerous,
    VeryRisky,
    Risky,
    Moderate,
    Safe,
    VerySafe,
    Secure,
    GoldenTicket,
}

#[derive(Debug, Error)]
#[error("band out of range: {0} (expected -1..=8)")]
pub struct BandOutOfRange(pub i8);

impl Band {
    pub fn as_i8(self) -> i8 {
        match self {
            Self::Error => -1,
            Self::MissionImpossible => 0,
            Self::Dangerous => 1,
            Self::VeryRisky => 2,
            Self::Risky => 3,
            Self::Moderate => 4,
            Self::Safe => 5,
            Self::VerySafe => 6,
            Self::Secure => 7,
            Self::GoldenTicket => 8,
        }
    }

    /// Human-readable label, fixed 10-entry table.
    pub fn label(self) -> &'static str {
        match self {
            Self::Error => "Error",
            Self::MissionImpossible => "Mission Impossible",
            Self::Dangerous => "Dangerous",
            Self::VeryRisky => "Very Risky",
            Self::Risky => "Risky",
            Self::Moderate => "Moderate",
            Self::Safe => "Safe",
            Self::VerySafe => "Very Safe",
            Self::Secure => "Secure",
            Self::GoldenTicket => "Golden Ticket",
        }
    }

    /// Whether the band can appear in a ranked recommendation list or be
    /// requested as a ranking target.
    pub fn is_rankable(self) -> bool {
        self != Self::Error
    }
}

impl TryFrom<i8> for Band {
    type Error = BandOutOfRange;

    fn try_from(value: i8) -> Result<Self, BandOutOfRange> {
        let band = match value {
            -1 => Self::Error,
            0 => Self::MissionImpossible,
            1 => Self::Dangerous,
            2 => Self::VeryRisky,
            3 => Self::Risky,
            4 => Self::Moderate,
            5 => Self::Safe,
            6 => Self::VerySafe,
            7 => Self::Secure,
            8 => Self::GoldenTicket,
            other => return Err(BandOutOfRange(other)),
        };
        Ok(band)
    }
}

impl From<Band> for i8 {
    fn from(band: Band) -> Self {
        band.as_i8()
    }
}

impl Display for Band {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.as_i8(), self.label())
    }
}

/// Outcome of classifying one programme against one set of scores.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub band: Band,
    pub score: f64,
}

impl Classification {
    fn unscored(band: Band) -> Self {
        Self { band, score: 0.0 }
    }
}

/// Full single-programme pipeline: requirement gates, composite score,
/// quartile classification. Pure function of its inputs.
pub fn classify_programme(scores: &ScoreMap, programme: &ProgrammeRecord) -> Classification {
    if !programme.has_statistics() {
        return Classification::unscored(Band::Error);
    }
    if !validator::fulfils_requirements(scores, programme) {
        return Classification::unscored(Band::MissionImpossible);
    }
    match calculator::composite_score(scores, programme) {
        ScoreOutcome::Ineligible => Classification::unscored(Band::Error),
        ScoreOutcome::Score(total) => Classification {
            band: classifier::classify(
                total,
                programme.score_uq,
                programme.score_md,
                programme.score_lq,
            ),
            score: total,
        },
    }
}
