use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::role::codes_match;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct WorkflowId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowType {
    MonthlyPlan,
    TravelClaim,
    ActivityClaim,
    BudgetApproval,
    StockVerification,
    StockRectification,
    TargetRevision,
}

impl WorkflowType {
    pub const ALL: [WorkflowType; 7] = [
        WorkflowType::MonthlyPlan,
        WorkflowType::TravelClaim,
        WorkflowType::ActivityClaim,
        WorkflowType::BudgetApproval,
        WorkflowType::StockVerification,
        WorkflowType::StockRectification,
        WorkflowType::TargetRevision,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowType::MonthlyPlan => "monthly_plan",
            WorkflowType::TravelClaim => "travel_claim",
            WorkflowType::ActivityClaim => "activity_claim",
            WorkflowType::BudgetApproval => "budget_approval",
            WorkflowType::StockVerification => "stock_verification",
            WorkflowType::StockRectification => "stock_rectification",
            WorkflowType::TargetRevision => "target_revision",
        }
    }

    pub fn parse(raw: &str) -> Option<WorkflowType> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "monthly_plan" => Some(WorkflowType::MonthlyPlan),
            "travel_claim" => Some(WorkflowType::TravelClaim),
            "activity_claim" => Some(WorkflowType::ActivityClaim),
            "budget_approval" => Some(WorkflowType::BudgetApproval),
            "stock_verification" => Some(WorkflowType::StockVerification),
            "stock_rectification" => Some(WorkflowType::StockRectification),
            "target_revision" => Some(WorkflowType::TargetRevision),
            _ => None,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Pending,
    Approved,
    Rejected,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Approved,
    Rejected,
    Skipped,
}

/// One sign-off slot in a workflow's approval chain. Once a step leaves
/// `Pending` it is never rewritten; the chain is an append-only audit trail.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalStep {
    pub approver_role: String,
    pub approver_user_id: Option<String>,
    pub status: StepStatus,
    pub decided_at: Option<DateTime<Utc>>,
    pub comments: Option<String>,
}

impl ApprovalStep {
    pub fn pending(approver_role: impl Into<String>) -> Self {
        Self {
            approver_role: approver_role.into(),
            approver_user_id: None,
            status: StepStatus::Pending,
            decided_at: None,
            comments: None,
        }
    }
}

/// One payload shape per workflow type; consumers pattern-match instead of
/// reaching into untyped maps.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WorkflowPayload {
    MonthlyPlan {
        month: String,
        planned_visits: u32,
        focus_products: Vec<String>,
    },
    TravelClaim {
        from_date: NaiveDate,
        to_date: NaiveDate,
        distance_km: Decimal,
        amount: Decimal,
    },
    ActivityClaim {
        activity: String,
        activity_date: NaiveDate,
        amount: Decimal,
    },
    BudgetApproval {
        purpose: String,
        amount: Decimal,
    },
    StockVerification {
        distributor_id: String,
        verified_volume: Decimal,
        verified_value: Decimal,
    },
    StockRectification {
        distributor_id: String,
        reason: String,
        adjustment_volume: Decimal,
        adjustment_value: Decimal,
    },
    TargetRevision {
        metric: String,
        current_target: Decimal,
        proposed_target: Decimal,
    },
}

impl WorkflowPayload {
    pub fn workflow_type(&self) -> WorkflowType {
        match self {
            WorkflowPayload::MonthlyPlan { .. } => WorkflowType::MonthlyPlan,
            WorkflowPayload::TravelClaim { .. } => WorkflowType::TravelClaim,
            WorkflowPayload::ActivityClaim { .. } => WorkflowType::ActivityClaim,
            WorkflowPayload::BudgetApproval { .. } => WorkflowType::BudgetApproval,
            WorkflowPayload::StockVerification { .. } => WorkflowType::StockVerification,
            WorkflowPayload::StockRectification { .. } => WorkflowType::StockRectification,
            WorkflowPayload::TargetRevision { .. } => WorkflowType::TargetRevision,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ApprovalWorkflow {
    pub id: WorkflowId,
    pub workflow_type: WorkflowType,
    pub submitted_by: String,
    pub submitted_by_role: String,
    pub current_approver: Option<String>,
    pub current_approver_role: String,
    pub status: WorkflowStatus,
    pub submitted_at: DateTime<Utc>,
    pub decided_at: Option<DateTime<Utc>>,
    pub payload: WorkflowPayload,
    pub chain: Vec<ApprovalStep>,
}

impl ApprovalWorkflow {
    /// The single step awaiting the current approver, while pending.
    pub fn current_step(&self) -> Option<&ApprovalStep> {
        if self.status != WorkflowStatus::Pending {
            return None;
        }
        self.chain.iter().find(|step| {
            step.status == StepStatus::Pending
                && codes_match(&step.approver_role, &self.current_approver_role)
        })
    }

    /// Chain invariant: the workflow is pending iff no step closed it, and
    /// while pending exactly one step is current.
    pub fn chain_is_consistent(&self) -> bool {
        let closed =
            self.chain.iter().any(|step| step.status == StepStatus::Rejected)
                || (!self.chain.is_empty()
                    && self.chain.iter().all(|step| step.status != StepStatus::Pending));

        match self.status {
            WorkflowStatus::Pending => {
                if closed {
                    return false;
                }
                let current = self
                    .chain
                    .iter()
                    .filter(|step| {
                        step.status == StepStatus::Pending
                            && codes_match(&step.approver_role, &self.current_approver_role)
                    })
                    .count();
                current == 1
            }
            WorkflowStatus::Approved => {
                !self.chain.is_empty()
                    && self.chain.iter().all(|step| {
                        matches!(step.status, StepStatus::Approved | StepStatus::Skipped)
                    })
            }
            WorkflowStatus::Rejected => {
                self.chain.iter().any(|step| step.status == StepStatus::Rejected)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use super::{
        ApprovalStep, ApprovalWorkflow, StepStatus, WorkflowId, WorkflowPayload, WorkflowStatus,
        WorkflowType,
    };

    fn pending_workflow() -> ApprovalWorkflow {
        ApprovalWorkflow {
            id: WorkflowId("WF-001".to_string()),
            workflow_type: WorkflowType::BudgetApproval,
            submitted_by: "U-100".to_string(),
            submitted_by_role: "TSM".to_string(),
            current_approver: None,
            current_approver_role: "RBH".to_string(),
            status: WorkflowStatus::Pending,
            submitted_at: Utc::now(),
            decided_at: None,
            payload: WorkflowPayload::BudgetApproval {
                purpose: "Dealer meet, Q3".to_string(),
                amount: Decimal::new(45_000_00, 2),
            },
            chain: vec![ApprovalStep::pending("RBH"), ApprovalStep::pending("ZBH")],
        }
    }

    #[test]
    fn workflow_type_strings_round_trip() {
        for workflow_type in WorkflowType::ALL {
            assert_eq!(WorkflowType::parse(workflow_type.as_str()), Some(workflow_type));
        }
        assert_eq!(WorkflowType::parse("expense_note"), None);
    }

    #[test]
    fn payload_tag_matches_workflow_type() {
        let payload = WorkflowPayload::TravelClaim {
            from_date: chrono::NaiveDate::from_ymd_opt(2025, 7, 1).expect("date"),
            to_date: chrono::NaiveDate::from_ymd_opt(2025, 7, 3).expect("date"),
            distance_km: Decimal::new(182, 0),
            amount: Decimal::new(2_730_00, 2),
        };
        assert_eq!(payload.workflow_type(), WorkflowType::TravelClaim);

        let json = serde_json::to_value(&payload).expect("serialize payload");
        assert_eq!(json["type"], "travel_claim");
    }

    #[test]
    fn current_step_is_the_single_pending_match() {
        let workflow = pending_workflow();
        let step = workflow.current_step().expect("current step");
        assert_eq!(step.approver_role, "RBH");
        assert!(workflow.chain_is_consistent());
    }

    #[test]
    fn closed_workflow_has_no_current_step() {
        let mut workflow = pending_workflow();
        workflow.status = WorkflowStatus::Rejected;
        workflow.chain[0].status = StepStatus::Rejected;
        workflow.chain[1].status = StepStatus::Skipped;

        assert!(workflow.current_step().is_none());
        assert!(workflow.chain_is_consistent());
    }

    #[test]
    fn pending_status_with_fully_decided_chain_is_inconsistent() {
        let mut workflow = pending_workflow();
        workflow.chain[0].status = StepStatus::Approved;
        workflow.chain[1].status = StepStatus::Approved;

        assert!(!workflow.chain_is_consistent());
    }

    #[test]
    fn approved_status_requires_every_step_closed_cleanly() {
        let mut workflow = pending_workflow();
        workflow.status = WorkflowStatus::Approved;
        workflow.chain[0].status = StepStatus::Approved;

        assert!(!workflow.chain_is_consistent());

        workflow.chain[1].status = StepStatus::Approved;
        assert!(workflow.chain_is_consistent());
    }
}
