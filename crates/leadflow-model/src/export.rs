//! Flattening leads for CSV export
//!
//! One row per (lead, checklist item) pair, plus the header. Only the
//! flattening and escaping live here; file naming and delivery are the
//! caller's concern.

use crate::lead::Lead;

/// Column headers for the flattened export.
pub const EXPORT_HEADER: [&str; 20] = [
    "Lead ID",
    "Customer",
    "Phone",
    "Address",
    "Source",
    "Created",
    "Stage",
    "Assigned To",
    "Team",
    "Van",
    "Next Action",
    "Next Due",
    "Lead Notes",
    "Item Stage",
    "Responsible",
    "Task",
    "Steps",
    "Status",
    "Due",
    "Item Notes",
];

/// Flatten leads into export rows, header first.
#[must_use]
pub fn export_rows(leads: &[Lead]) -> Vec<Vec<String>> {
    let mut rows = Vec::with_capacity(1 + leads.iter().map(|l| l.checklist.len()).sum::<usize>());
    rows.push(EXPORT_HEADER.iter().map(|h| (*h).to_string()).collect());
    for lead in leads {
        for item in &lead.checklist {
            rows.push(vec![
                lead.id.to_string(),
                lead.customer_name.clone(),
                lead.phone.clone(),
                lead.address.clone(),
                lead.source.clone(),
                lead.created_iso.clone(),
                lead.stage.label().to_string(),
                lead.assigned_to.clone(),
                lead.team.clone(),
                lead.van.clone(),
                lead.next_action_label.clone(),
                lead.next_action_due_iso.clone(),
                lead.notes.clone(),
                item.stage.label().to_string(),
                item.responsible.clone(),
                item.task.clone(),
                item.steps.clone(),
                item.status.to_string(),
                item.due_iso.clone(),
                item.notes.clone(),
            ]);
        }
    }
    rows
}

/// Render rows as CSV with RFC-4180 quoting.
///
/// Fields containing a comma, quote, carriage return or newline are quoted,
/// with embedded quotes doubled.
#[must_use]
pub fn to_csv(rows: &[Vec<String>]) -> String {
    rows.iter()
        .map(|row| {
            row.iter()
                .map(|field| escape(field))
                .collect::<Vec<_>>()
                .join(",")
        })
        .collect::<Vec<_>>()
        .join("\n")
}

fn escape(field: &str) -> String {
    if field.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", field.replace('"', "\"\""))
    } else {
        field.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn one_row_per_checklist_item_plus_header() {
        let leads = vec![Lead::new(), Lead::new()];
        let rows = export_rows(&leads);
        assert_eq!(rows.len(), 1 + 2 * 14);
        assert_eq!(rows[0].len(), EXPORT_HEADER.len());
        for row in &rows[1..] {
            assert_eq!(row.len(), EXPORT_HEADER.len());
        }
    }

    #[test]
    fn csv_quotes_fields_with_separators() {
        let rows = vec![
            vec!["plain".to_string(), "with,comma".to_string()],
            vec!["with \"quote\"".to_string(), "multi\nline".to_string()],
        ];
        let csv = to_csv(&rows);
        let lines: Vec<&str> = csv.splitn(2, '\n').collect();
        assert_eq!(lines[0], "plain,\"with,comma\"");
        assert_eq!(lines[1], "\"with \"\"quote\"\"\",\"multi\nline\"");
    }

    #[test]
    fn empty_lead_list_still_has_a_header() {
        let rows = export_rows(&[]);
        assert_eq!(rows.len(), 1);
        assert_eq!(to_csv(&rows).lines().count(), 1);
    }
}
