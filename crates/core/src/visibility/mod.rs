//! Role-based visibility filtering.
//!
//! Two independent rule sets share this module: a generic scope filter over
//! geographically tagged records (`filter_entries`), and the workflow-specific
//! visibility rule (`visible_workflows`). Both are pure subsequence
//! selections: no record is duplicated or reordered, and filtering a result a
//! second time yields the same result. Visibility never implies authority to
//! act; that is the approval gate's job.

use crate::domain::liquidation::LiquidationEntry;
use crate::domain::role::{codes_match, hierarchy_level_for_code, scope_for_code, Role, Scope};
use crate::domain::user::UserContext;
use crate::domain::workflow::{ApprovalWorkflow, WorkflowStatus};

/// A record that can be narrowed by organizational scope.
pub trait ScopedRecord {
    fn territory(&self) -> Option<&str>;
    fn state(&self) -> Option<&str>;
    fn zone(&self) -> Option<&str>;
    fn submitted_by(&self) -> &str;
    fn submitted_by_role(&self) -> &str;
}

impl ScopedRecord for LiquidationEntry {
    fn territory(&self) -> Option<&str> {
        self.territory.as_deref()
    }

    fn state(&self) -> Option<&str> {
        self.state.as_deref()
    }

    fn zone(&self) -> Option<&str> {
        self.zone.as_deref()
    }

    fn submitted_by(&self) -> &str {
        &self.submitted_by
    }

    fn submitted_by_role(&self) -> &str {
        &self.submitted_by_role
    }
}

/// Narrow `entries` to what `viewer` may see, by the viewer's resolved scope.
///
/// A viewer always sees records they submitted themselves, whatever the
/// scope. Beyond that: territory scope matches on territory; state scope
/// matches on state, except that a TSM additionally requires a territory
/// match and may instead see records submitted by listed subordinates; zone
/// scope matches on zone; `All` keeps everything.
pub fn filter_entries<T: ScopedRecord + Clone>(
    entries: &[T],
    viewer: &UserContext,
    subordinate_ids: &[String],
) -> Vec<T> {
    entries
        .iter()
        .filter(|entry| entry_visible(*entry, viewer, subordinate_ids))
        .cloned()
        .collect()
}

fn entry_visible<T: ScopedRecord>(
    entry: &T,
    viewer: &UserContext,
    subordinate_ids: &[String],
) -> bool {
    if entry.submitted_by() == viewer.id {
        return true;
    }

    match scope_for_code(&viewer.role_code) {
        Scope::Territory => field_matches(entry.territory(), viewer.territory.as_deref()),
        Scope::State => {
            if Role::from_code(&viewer.role_code) == Some(Role::Tsm) {
                let in_patch = field_matches(entry.state(), viewer.state.as_deref())
                    && field_matches(entry.territory(), viewer.territory.as_deref());
                in_patch || subordinate_ids.iter().any(|id| id == entry.submitted_by())
            } else {
                field_matches(entry.state(), viewer.state.as_deref())
            }
        }
        Scope::Zone => field_matches(entry.zone(), viewer.zone.as_deref()),
        Scope::All => true,
    }
}

/// Both sides present, non-blank, and equal after trimming.
fn field_matches(entry_field: Option<&str>, viewer_field: Option<&str>) -> bool {
    match (entry_field, viewer_field) {
        (Some(entry_value), Some(viewer_value)) => {
            let entry_value = entry_value.trim();
            let viewer_value = viewer_value.trim();
            !entry_value.is_empty() && entry_value == viewer_value
        }
        _ => false,
    }
}

/// Narrow `workflows` to what `viewer` may see.
///
/// A workflow is visible when it is awaiting the viewer's role, when the
/// viewer submitted it (same role or exact id), when the viewer already
/// signed one of its chain steps, or when the viewer's hierarchy level
/// strictly exceeds the submitter's. Unknown role codes rank at level 0, so
/// they outrank nobody.
pub fn visible_workflows(
    workflows: &[ApprovalWorkflow],
    viewer: &UserContext,
) -> Vec<ApprovalWorkflow> {
    workflows
        .iter()
        .filter(|workflow| workflow_visible(workflow, viewer))
        .cloned()
        .collect()
}

fn workflow_visible(workflow: &ApprovalWorkflow, viewer: &UserContext) -> bool {
    if workflow.status == WorkflowStatus::Pending
        && codes_match(&workflow.current_approver_role, &viewer.role_code)
    {
        return true;
    }

    if codes_match(&workflow.submitted_by_role, &viewer.role_code)
        || workflow.submitted_by == viewer.id
    {
        return true;
    }

    if workflow
        .chain
        .iter()
        .any(|step| step.approver_user_id.as_deref() == Some(viewer.id.as_str()))
    {
        return true;
    }

    hierarchy_level_for_code(&viewer.role_code)
        > hierarchy_level_for_code(&workflow.submitted_by_role)
}
