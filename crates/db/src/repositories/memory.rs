use std::collections::HashMap;

use tokio::sync::RwLock;

use fieldline_core::domain::liquidation::LiquidationEntry;
use fieldline_core::domain::user::User;
use fieldline_core::domain::workflow::{ApprovalWorkflow, WorkflowId, WorkflowStatus};

use super::{
    LiquidationRepository, RepositoryError, UserRepository, WorkflowRepository,
};

#[derive(Default)]
pub struct InMemoryUserRepository {
    users: RwLock<HashMap<String, User>>,
}

#[async_trait::async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, RepositoryError> {
        let users = self.users.read().await;
        Ok(users.get(id).cloned())
    }

    async fn save(&self, user: User) -> Result<(), RepositoryError> {
        let mut users = self.users.write().await;
        users.insert(user.id.clone(), user);
        Ok(())
    }

    async fn list_subordinate_ids(&self, manager_id: &str) -> Result<Vec<String>, RepositoryError> {
        let users = self.users.read().await;
        let mut ids: Vec<String> = users
            .values()
            .filter(|user| user.reports_to.as_deref() == Some(manager_id))
            .map(|user| user.id.clone())
            .collect();
        ids.sort();
        Ok(ids)
    }
}

#[derive(Default)]
pub struct InMemoryWorkflowRepository {
    workflows: RwLock<HashMap<String, ApprovalWorkflow>>,
}

#[async_trait::async_trait]
impl WorkflowRepository for InMemoryWorkflowRepository {
    async fn find_by_id(
        &self,
        id: &WorkflowId,
    ) -> Result<Option<ApprovalWorkflow>, RepositoryError> {
        let workflows = self.workflows.read().await;
        Ok(workflows.get(&id.0).cloned())
    }

    async fn save(&self, workflow: ApprovalWorkflow) -> Result<(), RepositoryError> {
        let mut workflows = self.workflows.write().await;
        workflows.insert(workflow.id.0.clone(), workflow);
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<ApprovalWorkflow>, RepositoryError> {
        let workflows = self.workflows.read().await;
        let mut all: Vec<ApprovalWorkflow> = workflows.values().cloned().collect();
        all.sort_by(|left, right| {
            right.submitted_at.cmp(&left.submitted_at).then_with(|| left.id.0.cmp(&right.id.0))
        });
        Ok(all)
    }

    async fn list_by_status(
        &self,
        status: WorkflowStatus,
    ) -> Result<Vec<ApprovalWorkflow>, RepositoryError> {
        let workflows = self.workflows.read().await;
        let mut matching: Vec<ApprovalWorkflow> =
            workflows.values().filter(|workflow| workflow.status == status).cloned().collect();
        matching.sort_by(|left, right| {
            left.submitted_at.cmp(&right.submitted_at).then_with(|| left.id.0.cmp(&right.id.0))
        });
        Ok(matching)
    }
}

#[derive(Default)]
pub struct InMemoryLiquidationRepository {
    entries: RwLock<Vec<LiquidationEntry>>,
}

#[async_trait::async_trait]
impl LiquidationRepository for InMemoryLiquidationRepository {
    async fn list_current(&self) -> Result<Vec<LiquidationEntry>, RepositoryError> {
        let entries = self.entries.read().await;
        Ok(entries.clone())
    }

    async fn replace_snapshot(
        &self,
        entries: Vec<LiquidationEntry>,
    ) -> Result<usize, RepositoryError> {
        let mut current = self.entries.write().await;
        let inserted = entries.len();
        *current = entries;
        Ok(inserted)
    }
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use rust_decimal::Decimal;

    use fieldline_core::approvals::default_chain;
    use fieldline_core::domain::liquidation::{LiquidationEntry, StockMetric};
    use fieldline_core::domain::user::User;
    use fieldline_core::domain::workflow::{
        ApprovalWorkflow, WorkflowId, WorkflowPayload, WorkflowStatus, WorkflowType,
    };

    use crate::repositories::{
        InMemoryLiquidationRepository, InMemoryUserRepository, InMemoryWorkflowRepository,
        LiquidationRepository, UserRepository, WorkflowRepository,
    };

    #[tokio::test]
    async fn in_memory_user_repo_round_trip_and_reports() {
        let repo = InMemoryUserRepository::default();
        let user = User {
            id: "U-001".to_string(),
            name: "Ravi Kumar".to_string(),
            role_code: "MDO".to_string(),
            territory: Some("North Delhi".to_string()),
            region: None,
            zone: Some("North".to_string()),
            state: Some("Delhi".to_string()),
            reports_to: Some("U-100".to_string()),
        };

        repo.save(user.clone()).await.expect("save user");
        let found = repo.find_by_id("U-001").await.expect("find user");
        assert_eq!(found, Some(user));

        let reports = repo.list_subordinate_ids("U-100").await.expect("reports");
        assert_eq!(reports, vec!["U-001".to_string()]);
    }

    #[tokio::test]
    async fn in_memory_workflow_repo_round_trip() {
        let repo = InMemoryWorkflowRepository::default();
        let chain = default_chain(WorkflowType::MonthlyPlan, "MDO");
        let workflow = ApprovalWorkflow {
            id: WorkflowId("WF-1".to_string()),
            workflow_type: WorkflowType::MonthlyPlan,
            submitted_by: "U-001".to_string(),
            submitted_by_role: "MDO".to_string(),
            current_approver: None,
            current_approver_role: chain[0].approver_role.clone(),
            status: WorkflowStatus::Pending,
            submitted_at: Utc::now(),
            decided_at: None,
            payload: WorkflowPayload::MonthlyPlan {
                month: "2025-08".to_string(),
                planned_visits: 20,
                focus_products: vec![],
            },
            chain,
        };

        repo.save(workflow.clone()).await.expect("save workflow");
        let found = repo.find_by_id(&workflow.id).await.expect("find workflow");
        assert_eq!(found, Some(workflow));

        let pending = repo.list_by_status(WorkflowStatus::Pending).await.expect("pending");
        assert_eq!(pending.len(), 1);
        let rejected = repo.list_by_status(WorkflowStatus::Rejected).await.expect("rejected");
        assert!(rejected.is_empty());
    }

    #[tokio::test]
    async fn in_memory_liquidation_repo_swaps_snapshots() {
        let repo = InMemoryLiquidationRepository::default();
        let entry = LiquidationEntry {
            id: "L-1".to_string(),
            distributor_id: Some("D-1".to_string()),
            distributor_name: None,
            retailer_id: None,
            territory: Some("North Delhi".to_string()),
            region: None,
            zone: Some("North".to_string()),
            state: Some("Delhi".to_string()),
            submitted_by: "U-001".to_string(),
            submitted_by_role: "MDO".to_string(),
            opening_stock: StockMetric::new(Decimal::new(100, 0), Decimal::new(8_000, 0)),
            ytd_net_sales: StockMetric::default(),
            liquidated: StockMetric::default(),
            balance_stock: StockMetric::default(),
            total_value: None,
            quantity: None,
            recorded_at: Utc::now(),
        };

        repo.replace_snapshot(vec![entry.clone()]).await.expect("first snapshot");
        let mut replacement = entry.clone();
        replacement.id = "L-2".to_string();
        repo.replace_snapshot(vec![replacement]).await.expect("second snapshot");

        let listed = repo.list_current().await.expect("list");
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, "L-2");
    }
}
