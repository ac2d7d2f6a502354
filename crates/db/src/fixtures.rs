use crate::connection::DbPool;
use crate::repositories::RepositoryError;
use sqlx::Executor;

/// Canonical demo seeds and verification contract: one reporting line of
/// users plus three workflows in distinct lifecycle states.
const SEED_WORKFLOWS: &[SeedWorkflowContract] = &[
    SeedWorkflowContract {
        workflow_type: "travel_claim",
        workflow_id: "WF-TRAVEL-001",
        status: "pending",
        current_approver_role: "TSM",
        expected_step_count: 2,
        description: "MDO travel claim awaiting TSM sign-off",
    },
    SeedWorkflowContract {
        workflow_type: "monthly_plan",
        workflow_id: "WF-PLAN-001",
        status: "pending",
        current_approver_role: "TSM",
        expected_step_count: 1,
        description: "August beat plan awaiting TSM sign-off",
    },
    SeedWorkflowContract {
        workflow_type: "budget_approval",
        workflow_id: "WF-BUDGET-001",
        status: "rejected",
        current_approver_role: "RBH",
        expected_step_count: 4,
        description: "Q3 dealer-meet budget rejected at RBH",
    },
];

const SEED_USER_IDS: &[&str] = &[
    "U-ADMIN-01",
    "U-VP-01",
    "U-ZBH-01",
    "U-RBH-01",
    "U-TSM-01",
    "U-MDO-01",
    "U-MDO-02",
];

const SEED_LIQUIDATION_IDS: &[&str] = &["LQ-0001", "LQ-0002", "LQ-0003"];

struct SeedWorkflowContract {
    workflow_type: &'static str,
    workflow_id: &'static str,
    status: &'static str,
    current_approver_role: &'static str,
    expected_step_count: i64,
    description: &'static str,
}

impl SeedWorkflowContract {
    fn step_count_label(&self) -> &'static str {
        match self.workflow_id {
            "WF-TRAVEL-001" => "WF-TRAVEL-001-steps",
            "WF-PLAN-001" => "WF-PLAN-001-steps",
            _ => "WF-BUDGET-001-steps",
        }
    }
}

#[derive(Clone, Debug)]
pub struct SeedWorkflowInfo {
    pub workflow_type: &'static str,
    pub workflow_id: &'static str,
    pub description: &'static str,
}

#[derive(Clone, Debug)]
pub struct SeedResult {
    pub workflows_seeded: Vec<SeedWorkflowInfo>,
    pub users_seeded: usize,
    pub liquidation_entries_seeded: usize,
}

#[derive(Clone, Debug)]
pub struct VerificationResult {
    pub all_present: bool,
    pub checks: Vec<(&'static str, bool)>,
}

/// Demo seed dataset for local runs and smoke checks.
pub struct DemoSeedDataset;

impl DemoSeedDataset {
    /// SQL fixture content for the demo seed data.
    pub const SQL: &str = include_str!("../../../config/fixtures/demo_seed_data.sql");

    /// Load the demo dataset into the database. Idempotent: reseeding an
    /// already seeded database is a no-op.
    pub async fn load(pool: &DbPool) -> Result<SeedResult, RepositoryError> {
        let mut tx = pool.begin().await?;

        tx.execute(sqlx::query(Self::SQL)).await?;
        tx.commit().await?;

        let workflows_seeded = SEED_WORKFLOWS
            .iter()
            .map(|workflow| SeedWorkflowInfo {
                workflow_type: workflow.workflow_type,
                workflow_id: workflow.workflow_id,
                description: workflow.description,
            })
            .collect::<Vec<_>>();

        Ok(SeedResult {
            workflows_seeded,
            users_seeded: SEED_USER_IDS.len(),
            liquidation_entries_seeded: SEED_LIQUIDATION_IDS.len(),
        })
    }

    /// Verify that seed data exists and matches the contract.
    pub async fn verify(pool: &DbPool) -> Result<VerificationResult, RepositoryError> {
        let mut checks = Vec::new();

        let quoted_users = sql_array_from_ids(SEED_USER_IDS);
        let expected_user_total = SEED_USER_IDS.len() as i64;
        let existing_user_count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(1) FROM app_user WHERE id IN {quoted_users}"
        ))
        .fetch_one(pool)
        .await?;
        checks.push(("users", existing_user_count == expected_user_total));

        let quoted_entries = sql_array_from_ids(SEED_LIQUIDATION_IDS);
        let expected_entry_total = SEED_LIQUIDATION_IDS.len() as i64;
        let existing_entry_count: i64 = sqlx::query_scalar(&format!(
            "SELECT COUNT(1) FROM liquidation_entry WHERE id IN {quoted_entries}"
        ))
        .fetch_one(pool)
        .await?;
        checks.push(("liquidation-entries", existing_entry_count == expected_entry_total));

        for workflow in SEED_WORKFLOWS {
            let workflow_ok: i64 = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM approval_workflow \
                 WHERE id = ?1 AND status = ?2 AND current_approver_role = ?3)",
            )
            .bind(workflow.workflow_id)
            .bind(workflow.status)
            .bind(workflow.current_approver_role)
            .fetch_one(pool)
            .await?;
            checks.push((workflow.workflow_id, workflow_ok == 1));

            let step_count: i64 =
                sqlx::query_scalar("SELECT COUNT(1) FROM workflow_step WHERE workflow_id = ?1")
                    .bind(workflow.workflow_id)
                    .fetch_one(pool)
                    .await?;
            checks.push((workflow.step_count_label(), step_count == workflow.expected_step_count));
        }

        let all_present = checks.iter().all(|(_, passed)| *passed);
        Ok(VerificationResult { all_present, checks })
    }
}

fn sql_array_from_ids(ids: &[&str]) -> String {
    let quoted: Vec<String> = ids.iter().map(|id| format!("'{id}'")).collect();
    format!("({})", quoted.join(", "))
}

#[cfg(test)]
mod tests {
    use fieldline_core::domain::workflow::{WorkflowId, WorkflowStatus};

    use super::DemoSeedDataset;
    use crate::repositories::{SqlWorkflowRepository, WorkflowRepository};
    use crate::{connect_with_settings, migrations};

    async fn setup() -> sqlx::SqlitePool {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        migrations::run_pending(&pool).await.expect("migrations");
        pool
    }

    #[tokio::test]
    async fn load_then_verify_passes_the_contract() {
        let pool = setup().await;

        let result = DemoSeedDataset::load(&pool).await.expect("load seeds");
        assert_eq!(result.workflows_seeded.len(), 3);
        assert_eq!(result.users_seeded, 7);

        let verification = DemoSeedDataset::verify(&pool).await.expect("verify seeds");
        assert!(
            verification.all_present,
            "failed checks: {:?}",
            verification
                .checks
                .iter()
                .filter(|(_, passed)| !passed)
                .map(|(check, _)| *check)
                .collect::<Vec<_>>()
        );
    }

    #[tokio::test]
    async fn reseeding_is_idempotent() {
        let pool = setup().await;

        DemoSeedDataset::load(&pool).await.expect("first load");
        DemoSeedDataset::load(&pool).await.expect("second load");

        let user_count: i64 = sqlx::query_scalar("SELECT COUNT(1) FROM app_user")
            .fetch_one(&pool)
            .await
            .expect("count users");
        assert_eq!(user_count, 7);
    }

    #[tokio::test]
    async fn seeded_workflows_decode_through_the_repository() {
        let pool = setup().await;
        DemoSeedDataset::load(&pool).await.expect("load seeds");

        let repo = SqlWorkflowRepository::new(pool);
        let travel = repo
            .find_by_id(&WorkflowId("WF-TRAVEL-001".to_string()))
            .await
            .expect("find travel claim")
            .expect("travel claim should exist");

        assert_eq!(travel.status, WorkflowStatus::Pending);
        assert_eq!(travel.current_approver_role, "TSM");
        assert_eq!(travel.chain.len(), 2);
        assert!(travel.chain_is_consistent());

        let budget = repo
            .find_by_id(&WorkflowId("WF-BUDGET-001".to_string()))
            .await
            .expect("find budget workflow")
            .expect("budget workflow should exist");
        assert_eq!(budget.status, WorkflowStatus::Rejected);
        assert!(budget.chain_is_consistent());
    }
}
