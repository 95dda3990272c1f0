use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Hiring stages in the order an application moves through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Stage {
    DateSubmitted,
    OnlineAssessment,
    FirstInterview,
    SecondInterview,
    ThirdInterview,
    OfferReceived,
    Rejected,
}

impl Stage {
    /// The full stage vocabulary in canonical order.
    pub const ALL: [Stage; 7] = [
        Self::DateSubmitted,
        Self::OnlineAssessment,
        Self::FirstInterview,
        Self::SecondInterview,
        Self::ThirdInterview,
        Self::OfferReceived,
        Self::Rejected,
    ];

    /// Returns the display name stored in a timeline entry's `activity`.
    pub const fn label(self) -> &'static str {
        match self {
            Self::DateSubmitted => "Date Submitted",
            Self::OnlineAssessment => "Online Assessment",
            Self::FirstInterview => "1st Interview",
            Self::SecondInterview => "2nd Interview",
            Self::ThirdInterview => "3rd Interview",
            Self::OfferReceived => "Offer Received",
            Self::Rejected => "Rejected",
        }
    }

    /// Position of the stage inside [`Stage::ALL`].
    pub const fn index(self) -> usize {
        self as usize
    }

    /// Resolves a stage from its display name.
    pub fn from_label(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|stage| stage.label() == value)
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One stage of an application's history together with the date it was reached.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub activity: String,
    #[serde(default)]
    pub date: Option<DateTime<Utc>>,
}

impl TimelineEntry {
    pub fn new(activity: impl Into<String>, date: Option<DateTime<Utc>>) -> Self {
        Self {
            activity: activity.into(),
            date,
        }
    }

    /// Returns the vocabulary stage this entry refers to, when it uses a canonical name.
    pub fn stage(&self) -> Option<Stage> {
        Stage::from_label(&self.activity)
    }
}

/// Pairs every stage with the date at the same position in `dates`.
///
/// The result always has one entry per stage. Stages past the end of `dates`
/// get no date and dates past the last stage are ignored.
pub fn build_timeline(dates: &[Option<DateTime<Utc>>]) -> Vec<TimelineEntry> {
    Stage::ALL
        .iter()
        .enumerate()
        .map(|(index, stage)| TimelineEntry {
            activity: stage.label().to_string(),
            date: dates.get(index).copied().flatten(),
        })
        .collect()
}
