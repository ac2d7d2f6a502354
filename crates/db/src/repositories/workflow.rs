use chrono::{DateTime, Utc};
use sqlx::Row;

use fieldline_core::domain::workflow::{
    ApprovalStep, ApprovalWorkflow, StepStatus, WorkflowId, WorkflowPayload, WorkflowStatus,
    WorkflowType,
};

use super::{RepositoryError, WorkflowRepository};
use crate::DbPool;

pub struct SqlWorkflowRepository {
    pool: DbPool,
}

impl SqlWorkflowRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    async fn load_chain(&self, workflow_id: &str) -> Result<Vec<ApprovalStep>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(
            "SELECT approver_role, approver_user_id, status, decided_at, comments
             FROM workflow_step WHERE workflow_id = ? ORDER BY position ASC",
        )
        .bind(workflow_id)
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(row_to_step).collect()
    }
}

fn parse_status(s: &str) -> WorkflowStatus {
    match s {
        "approved" => WorkflowStatus::Approved,
        "rejected" => WorkflowStatus::Rejected,
        _ => WorkflowStatus::Pending,
    }
}

pub fn workflow_status_as_str(status: &WorkflowStatus) -> &'static str {
    match status {
        WorkflowStatus::Pending => "pending",
        WorkflowStatus::Approved => "approved",
        WorkflowStatus::Rejected => "rejected",
    }
}

fn parse_step_status(s: &str) -> StepStatus {
    match s {
        "approved" => StepStatus::Approved,
        "rejected" => StepStatus::Rejected,
        "skipped" => StepStatus::Skipped,
        _ => StepStatus::Pending,
    }
}

pub fn step_status_as_str(status: &StepStatus) -> &'static str {
    match status {
        StepStatus::Pending => "pending",
        StepStatus::Approved => "approved",
        StepStatus::Rejected => "rejected",
        StepStatus::Skipped => "skipped",
    }
}

fn parse_timestamp(raw: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

fn row_to_step(row: &sqlx::sqlite::SqliteRow) -> Result<ApprovalStep, RepositoryError> {
    let approver_role: String =
        row.try_get("approver_role").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let approver_user_id: Option<String> =
        row.try_get("approver_user_id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let status_str: String =
        row.try_get("status").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let decided_at_str: Option<String> =
        row.try_get("decided_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let comments: Option<String> =
        row.try_get("comments").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    Ok(ApprovalStep {
        approver_role,
        approver_user_id,
        status: parse_step_status(&status_str),
        decided_at: decided_at_str.as_deref().map(parse_timestamp),
        comments,
    })
}

fn row_to_workflow(
    row: &sqlx::sqlite::SqliteRow,
    chain: Vec<ApprovalStep>,
) -> Result<ApprovalWorkflow, RepositoryError> {
    let id: String = row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let workflow_type_str: String =
        row.try_get("workflow_type").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let submitted_by: String =
        row.try_get("submitted_by").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let submitted_by_role: String =
        row.try_get("submitted_by_role").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let current_approver: Option<String> =
        row.try_get("current_approver").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let current_approver_role: String =
        row.try_get("current_approver_role").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let status_str: String =
        row.try_get("status").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let submitted_at_str: String =
        row.try_get("submitted_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let decided_at_str: Option<String> =
        row.try_get("decided_at").map_err(|e| RepositoryError::Decode(e.to_string()))?;
    let payload_str: String =
        row.try_get("payload").map_err(|e| RepositoryError::Decode(e.to_string()))?;

    let workflow_type = WorkflowType::parse(&workflow_type_str).ok_or_else(|| {
        RepositoryError::Decode(format!("unknown workflow type `{workflow_type_str}`"))
    })?;
    let payload: WorkflowPayload = serde_json::from_str(&payload_str)
        .map_err(|e| RepositoryError::Decode(format!("workflow payload: {e}")))?;

    Ok(ApprovalWorkflow {
        id: WorkflowId(id),
        workflow_type,
        submitted_by,
        submitted_by_role,
        current_approver,
        current_approver_role,
        status: parse_status(&status_str),
        submitted_at: parse_timestamp(&submitted_at_str),
        decided_at: decided_at_str.as_deref().map(parse_timestamp),
        payload,
        chain,
    })
}

const WORKFLOW_COLUMNS: &str = "id, workflow_type, submitted_by, submitted_by_role, \
     current_approver, current_approver_role, status, submitted_at, decided_at, payload";

#[async_trait::async_trait]
impl WorkflowRepository for SqlWorkflowRepository {
    async fn find_by_id(
        &self,
        id: &WorkflowId,
    ) -> Result<Option<ApprovalWorkflow>, RepositoryError> {
        let row = sqlx::query(&format!(
            "SELECT {WORKFLOW_COLUMNS} FROM approval_workflow WHERE id = ?"
        ))
        .bind(&id.0)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(ref r) => {
                let chain = self.load_chain(&id.0).await?;
                Ok(Some(row_to_workflow(r, chain)?))
            }
            None => Ok(None),
        }
    }

    async fn save(&self, workflow: ApprovalWorkflow) -> Result<(), RepositoryError> {
        let payload = serde_json::to_string(&workflow.payload)
            .map_err(|e| RepositoryError::Decode(format!("workflow payload: {e}")))?;
        let decided_at = workflow.decided_at.map(|dt| dt.to_rfc3339());

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            "INSERT INTO approval_workflow (id, workflow_type, submitted_by, submitted_by_role,
                                            current_approver, current_approver_role, status,
                                            submitted_at, decided_at, payload)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                 current_approver = excluded.current_approver,
                 current_approver_role = excluded.current_approver_role,
                 status = excluded.status,
                 decided_at = excluded.decided_at,
                 payload = excluded.payload",
        )
        .bind(&workflow.id.0)
        .bind(workflow.workflow_type.as_str())
        .bind(&workflow.submitted_by)
        .bind(&workflow.submitted_by_role)
        .bind(&workflow.current_approver)
        .bind(&workflow.current_approver_role)
        .bind(workflow_status_as_str(&workflow.status))
        .bind(workflow.submitted_at.to_rfc3339())
        .bind(&decided_at)
        .bind(&payload)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM workflow_step WHERE workflow_id = ?")
            .bind(&workflow.id.0)
            .execute(&mut *tx)
            .await?;

        for (position, step) in workflow.chain.iter().enumerate() {
            sqlx::query(
                "INSERT INTO workflow_step (workflow_id, position, approver_role,
                                            approver_user_id, status, decided_at, comments)
                 VALUES (?, ?, ?, ?, ?, ?, ?)",
            )
            .bind(&workflow.id.0)
            .bind(position as i64)
            .bind(&step.approver_role)
            .bind(&step.approver_user_id)
            .bind(step_status_as_str(&step.status))
            .bind(step.decided_at.map(|dt| dt.to_rfc3339()))
            .bind(&step.comments)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await?;
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<ApprovalWorkflow>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(&format!(
            "SELECT {WORKFLOW_COLUMNS} FROM approval_workflow ORDER BY submitted_at DESC, id ASC"
        ))
        .fetch_all(&self.pool)
        .await?;

        let mut workflows = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: String =
                row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
            let chain = self.load_chain(&id).await?;
            workflows.push(row_to_workflow(row, chain)?);
        }
        Ok(workflows)
    }

    async fn list_by_status(
        &self,
        status: WorkflowStatus,
    ) -> Result<Vec<ApprovalWorkflow>, RepositoryError> {
        let rows: Vec<sqlx::sqlite::SqliteRow> = sqlx::query(&format!(
            "SELECT {WORKFLOW_COLUMNS} FROM approval_workflow \
             WHERE status = ? ORDER BY submitted_at ASC, id ASC"
        ))
        .bind(workflow_status_as_str(&status))
        .fetch_all(&self.pool)
        .await?;

        let mut workflows = Vec::with_capacity(rows.len());
        for row in &rows {
            let id: String =
                row.try_get("id").map_err(|e| RepositoryError::Decode(e.to_string()))?;
            let chain = self.load_chain(&id).await?;
            workflows.push(row_to_workflow(row, chain)?);
        }
        Ok(workflows)
    }
}
