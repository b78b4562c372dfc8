//! Workflow stages and stage derivation
//!
//! A lead's stage is never set directly: it is always derived from the
//! lead's checklist by [`derive_stage`]. The ten stages are globally
//! ordered and that order drives both display and derivation.

use crate::lead::{ChecklistItem, ItemStatus};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// One of the ten fixed workflow stages, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// New enquiry logged
    LeadIn,
    /// Site visit booked and carried out
    Survey,
    /// Quote prepared and sent
    Quote,
    /// Follow-up calls after the quote
    FollowUp,
    /// Customer accepted, job scheduled
    JobWon,
    /// Materials and crew prepared
    JobPrep,
    /// Works in progress
    JobLive,
    /// Customer sign-off
    Completion,
    /// Invoice and payment
    Payment,
    /// Post-job review and care
    Aftercare,
}

impl Stage {
    /// All stages in pipeline order.
    ///
    /// The order is significant: it defines display order and the scan
    /// order of [`derive_stage`].
    pub const ALL: [Stage; 10] = [
        Stage::LeadIn,
        Stage::Survey,
        Stage::Quote,
        Stage::FollowUp,
        Stage::JobWon,
        Stage::JobPrep,
        Stage::JobLive,
        Stage::Completion,
        Stage::Payment,
        Stage::Aftercare,
    ];

    /// The first stage in the pipeline.
    #[inline]
    #[must_use]
    pub const fn first() -> Self {
        Stage::LeadIn
    }

    /// The final stage in the pipeline, used as the derivation fallback.
    #[inline]
    #[must_use]
    pub const fn last() -> Self {
        Stage::Aftercare
    }

    /// Stable snake_case key, matching the persisted representation.
    #[must_use]
    pub fn key(&self) -> &'static str {
        match self {
            Stage::LeadIn => "lead_in",
            Stage::Survey => "survey",
            Stage::Quote => "quote",
            Stage::FollowUp => "follow_up",
            Stage::JobWon => "job_won",
            Stage::JobPrep => "job_prep",
            Stage::JobLive => "job_live",
            Stage::Completion => "completion",
            Stage::Payment => "payment",
            Stage::Aftercare => "aftercare",
        }
    }

    /// Human-readable label.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match self {
            Stage::LeadIn => "Lead In",
            Stage::Survey => "Survey",
            Stage::Quote => "Quote",
            Stage::FollowUp => "Follow-Up",
            Stage::JobWon => "Job Won",
            Stage::JobPrep => "Job Prep",
            Stage::JobLive => "Job Live",
            Stage::Completion => "Completion",
            Stage::Payment => "Payment",
            Stage::Aftercare => "Aftercare",
        }
    }
}

impl Default for Stage {
    fn default() -> Self {
        Stage::first()
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Error parsing a stage key.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown stage: {0}")]
pub struct UnknownStage(pub String);

impl FromStr for Stage {
    type Err = UnknownStage;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_ascii_lowercase();
        Stage::ALL
            .iter()
            .copied()
            .find(|stage| stage.key() == key)
            .ok_or_else(|| UnknownStage(s.to_string()))
    }
}

/// Derive a lead's current stage from its checklist.
///
/// Scans stages in pipeline order and returns the earliest stage that has
/// at least one item and not all of them done. Stages with zero items are
/// skipped. If every populated stage is complete (including the empty
/// checklist), the final stage is returned.
///
/// Total and pure: every checklist yields a stage, and re-deriving from an
/// unchanged checklist yields the same stage.
#[must_use]
pub fn derive_stage(items: &[ChecklistItem]) -> Stage {
    for stage in Stage::ALL {
        let mut any = false;
        let mut all_done = true;
        for item in items.iter().filter(|i| i.stage == stage) {
            any = true;
            if item.status != ItemStatus::Done {
                all_done = false;
                break;
            }
        }
        if any && !all_done {
            return stage;
        }
    }
    Stage::last()
}
