//! The standard workflow template
//!
//! Every lead gets its checklist stamped out from this template at creation
//! time. Items are never added or removed afterwards; only their status,
//! due date and notes mutate.

use crate::lead::{ChecklistItem, ItemId, ItemStatus};
use crate::stage::Stage;

/// One template entry: a task owed at a given stage by a given role.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkflowEntry {
    /// Stage the task belongs to
    pub stage: Stage,
    /// Responsible role label
    pub responsible: &'static str,
    /// Task name
    pub task: &'static str,
    /// Step description
    pub steps: &'static str,
}

/// The standard 14-entry template, covering all ten stages.
pub const STANDARD_WORKFLOW: [WorkflowEntry; 14] = [
    WorkflowEntry {
        stage: Stage::LeadIn,
        responsible: "Admin",
        task: "Log new enquiry",
        steps: "Record name, address, phone, source",
    },
    WorkflowEntry {
        stage: Stage::LeadIn,
        responsible: "Admin",
        task: "Initial response",
        steps: "Call or email customer",
    },
    WorkflowEntry {
        stage: Stage::Survey,
        responsible: "Owner",
        task: "Book site visit",
        steps: "Confirm date/time",
    },
    WorkflowEntry {
        stage: Stage::Survey,
        responsible: "Owner",
        task: "Site inspection",
        steps: "Assess roof, take photos, note risks",
    },
    WorkflowEntry {
        stage: Stage::Quote,
        responsible: "Owner",
        task: "Prepare quote",
        steps: "Labour, materials, timescale, warranty",
    },
    WorkflowEntry {
        stage: Stage::Quote,
        responsible: "Admin",
        task: "Send quote",
        steps: "Email quote",
    },
    WorkflowEntry {
        stage: Stage::FollowUp,
        responsible: "Admin",
        task: "Follow-up call 1",
        steps: "Confirm receipt, answer questions",
    },
    WorkflowEntry {
        stage: Stage::FollowUp,
        responsible: "Admin",
        task: "Follow-up call 2",
        steps: "Decision prompt",
    },
    WorkflowEntry {
        stage: Stage::JobWon,
        responsible: "Owner",
        task: "Schedule job",
        steps: "Allocate van & team",
    },
    WorkflowEntry {
        stage: Stage::JobPrep,
        responsible: "Owner",
        task: "Materials ordered",
        steps: "Confirm delivery date",
    },
    WorkflowEntry {
        stage: Stage::JobLive,
        responsible: "Team Lead",
        task: "Complete works",
        steps: "Quality check on completion",
    },
    WorkflowEntry {
        stage: Stage::Completion,
        responsible: "Owner",
        task: "Customer sign-off",
        steps: "Photos + satisfaction check",
    },
    WorkflowEntry {
        stage: Stage::Payment,
        responsible: "Admin",
        task: "Invoice & collect payment",
        steps: "Send invoice, confirm payment",
    },
    WorkflowEntry {
        stage: Stage::Aftercare,
        responsible: "Admin",
        task: "Request review",
        steps: "Send review link",
    },
];

/// Build a fresh checklist from the standard template.
///
/// Every item gets a new id, status `not_started`, and empty due date and
/// notes.
#[must_use]
pub fn build_checklist() -> Vec<ChecklistItem> {
    STANDARD_WORKFLOW
        .iter()
        .map(|entry| ChecklistItem {
            id: ItemId::new(),
            stage: entry.stage,
            responsible: entry.responsible.to_string(),
            task: entry.task.to_string(),
            steps: entry.steps.to_string(),
            status: ItemStatus::NotStarted,
            due_iso: String::new(),
            notes: String::new(),
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn template_covers_all_ten_stages() {
        let stages: HashSet<Stage> = STANDARD_WORKFLOW.iter().map(|e| e.stage).collect();
        assert_eq!(stages.len(), Stage::ALL.len());
    }

    #[test]
    fn template_entries_are_stage_ordered() {
        let positions: Vec<usize> = STANDARD_WORKFLOW
            .iter()
            .map(|e| Stage::ALL.iter().position(|s| *s == e.stage).unwrap())
            .collect();
        let mut sorted = positions.clone();
        sorted.sort_unstable();
        assert_eq!(positions, sorted);
    }

    #[test]
    fn build_checklist_stamps_fresh_ids_and_default_fields() {
        let a = build_checklist();
        let b = build_checklist();
        assert_eq!(a.len(), STANDARD_WORKFLOW.len());

        let ids: HashSet<_> = a.iter().chain(b.iter()).map(|i| i.id).collect();
        assert_eq!(ids.len(), a.len() + b.len());

        for item in &a {
            assert_eq!(item.status, ItemStatus::NotStarted);
            assert!(item.due_iso.is_empty());
            assert!(item.notes.is_empty());
        }
    }
}
