pub mod approvals;
pub mod audit;
pub mod cache;
pub mod config;
pub mod domain;
pub mod errors;
pub mod reporting;
pub mod visibility;

pub use approvals::{apply_decision, can_approve, default_chain, ApprovalDecision, ApprovalError};
pub use cache::{Clock, SnapshotCache, SystemClock, DEFAULT_TTL_MS};
pub use domain::liquidation::{LiquidationEntry, StockMetric};
pub use domain::role::{
    hierarchy_level_for_code, permits, scope_for_code, Permission, Role, Scope,
};
pub use domain::user::{User, UserContext};
pub use domain::workflow::{
    ApprovalStep, ApprovalWorkflow, StepStatus, WorkflowId, WorkflowPayload, WorkflowStatus,
    WorkflowType,
};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use reporting::{summarize, LiquidationSummary};
pub use visibility::{filter_entries, visible_workflows, ScopedRecord};
