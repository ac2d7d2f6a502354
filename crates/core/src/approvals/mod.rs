use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::role::{codes_match, hierarchy_level_for_code, normalize_code, Role};
use crate::domain::workflow::{
    ApprovalStep, ApprovalWorkflow, StepStatus, WorkflowStatus, WorkflowType,
};

/// Whether `actor` may decide `workflow` right now.
///
/// True only while the workflow is pending, the actor is not the submitter,
/// and the actor's role is the chain's current approver role. Every other
/// case, including blank or malformed fields, answers false; this function
/// never panics and never reports why.
pub fn can_approve(workflow: &ApprovalWorkflow, actor_role: &str, actor_id: &str) -> bool {
    if workflow.status != WorkflowStatus::Pending {
        return false;
    }

    let actor_id = actor_id.trim();
    if actor_id.is_empty() || workflow.submitted_by.trim() == actor_id {
        return false;
    }

    let current_role = normalize_code(&workflow.current_approver_role);
    if current_role.is_empty() {
        return false;
    }

    current_role == normalize_code(actor_role)
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalDecision {
    Approve,
    Reject,
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum ApprovalError {
    #[error("workflow `{workflow_id}` is already closed")]
    WorkflowClosed { workflow_id: String },
    #[error("submitters cannot decide their own workflow `{workflow_id}`")]
    SelfApproval { workflow_id: String },
    #[error("actor role `{actor_role}` is not the current approver for workflow `{workflow_id}`")]
    NotCurrentApprover { workflow_id: String, actor_role: String },
    #[error("workflow `{workflow_id}` has no step matching its current approver role")]
    InconsistentChain { workflow_id: String },
}

/// Apply one decision and advance the chain.
///
/// Approving a non-final step closes it and hands the workflow to the next
/// pending step's role. Approving the final step closes the workflow as
/// approved. Rejecting closes the workflow as rejected and marks every
/// remaining pending step skipped. Steps that already carry a decision are
/// never rewritten.
pub fn apply_decision(
    mut workflow: ApprovalWorkflow,
    actor_role: &str,
    actor_id: &str,
    decision: ApprovalDecision,
    comments: Option<String>,
    now: DateTime<Utc>,
) -> Result<ApprovalWorkflow, ApprovalError> {
    if !can_approve(&workflow, actor_role, actor_id) {
        let workflow_id = workflow.id.0.clone();
        if workflow.status != WorkflowStatus::Pending {
            return Err(ApprovalError::WorkflowClosed { workflow_id });
        }
        if workflow.submitted_by.trim() == actor_id.trim() {
            return Err(ApprovalError::SelfApproval { workflow_id });
        }
        return Err(ApprovalError::NotCurrentApprover {
            workflow_id,
            actor_role: actor_role.to_string(),
        });
    }

    let current_index = workflow
        .chain
        .iter()
        .position(|step| {
            step.status == StepStatus::Pending
                && codes_match(&step.approver_role, &workflow.current_approver_role)
        })
        .ok_or_else(|| ApprovalError::InconsistentChain { workflow_id: workflow.id.0.clone() })?;

    {
        let step = &mut workflow.chain[current_index];
        step.status = match decision {
            ApprovalDecision::Approve => StepStatus::Approved,
            ApprovalDecision::Reject => StepStatus::Rejected,
        };
        step.approver_user_id = Some(actor_id.trim().to_string());
        step.decided_at = Some(now);
        step.comments = comments;
    }

    match decision {
        ApprovalDecision::Approve => {
            let next_role = workflow.chain[current_index + 1..]
                .iter()
                .find(|step| step.status == StepStatus::Pending)
                .map(|step| step.approver_role.clone());

            match next_role {
                Some(role) => {
                    workflow.current_approver_role = role;
                    workflow.current_approver = None;
                }
                None => {
                    workflow.status = WorkflowStatus::Approved;
                    workflow.current_approver = Some(actor_id.trim().to_string());
                    workflow.decided_at = Some(now);
                }
            }
        }
        ApprovalDecision::Reject => {
            for step in &mut workflow.chain {
                if step.status == StepStatus::Pending {
                    step.status = StepStatus::Skipped;
                }
            }
            workflow.status = WorkflowStatus::Rejected;
            workflow.current_approver = Some(actor_id.trim().to_string());
            workflow.decided_at = Some(now);
        }
    }

    Ok(workflow)
}

/// Canonical escalation ladder, one role per hierarchy level.
const LADDER: [Role; 8] =
    [Role::Mdo, Role::Tsm, Role::Rbh, Role::Zbh, Role::Mh, Role::Vp, Role::Md, Role::Admin];

fn terminal_level(workflow_type: WorkflowType) -> u8 {
    match workflow_type {
        WorkflowType::MonthlyPlan | WorkflowType::ActivityClaim => Role::Tsm.hierarchy_level(),
        WorkflowType::TravelClaim | WorkflowType::StockVerification => Role::Rbh.hierarchy_level(),
        WorkflowType::StockRectification => Role::Zbh.hierarchy_level(),
        WorkflowType::BudgetApproval | WorkflowType::TargetRevision => Role::Vp.hierarchy_level(),
    }
}

/// Default approval chain for a fresh submission: every ladder role strictly
/// above the submitter, up to the workflow type's terminal level. Submitters
/// at or above the terminal level still get one sign-off from the next level
/// up; ADMIN submissions fall back to an ADMIN self-review step.
pub fn default_chain(workflow_type: WorkflowType, submitted_by_role: &str) -> Vec<ApprovalStep> {
    let submitter_level = hierarchy_level_for_code(submitted_by_role);
    let terminal = terminal_level(workflow_type);

    let mut roles: Vec<Role> = LADDER
        .iter()
        .copied()
        .filter(|role| {
            role.hierarchy_level() > submitter_level && role.hierarchy_level() <= terminal
        })
        .collect();

    if roles.is_empty() {
        roles = LADDER
            .iter()
            .copied()
            .find(|role| role.hierarchy_level() > submitter_level)
            .into_iter()
            .collect();
    }
    if roles.is_empty() {
        roles.push(Role::Admin);
    }

    roles.into_iter().map(|role| ApprovalStep::pending(role.code())).collect()
}
