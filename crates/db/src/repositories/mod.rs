use async_trait::async_trait;
use thiserror::Error;

use fieldline_core::domain::liquidation::LiquidationEntry;
use fieldline_core::domain::user::User;
use fieldline_core::domain::workflow::{ApprovalWorkflow, WorkflowId, WorkflowStatus};

pub mod liquidation;
pub mod memory;
pub mod user;
pub mod workflow;

pub use liquidation::SqlLiquidationRepository;
pub use memory::{InMemoryLiquidationRepository, InMemoryUserRepository, InMemoryWorkflowRepository};
pub use user::SqlUserRepository;
pub use workflow::SqlWorkflowRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: &str) -> Result<Option<User>, RepositoryError>;
    async fn save(&self, user: User) -> Result<(), RepositoryError>;
    async fn list_subordinate_ids(&self, manager_id: &str) -> Result<Vec<String>, RepositoryError>;
}

#[async_trait]
pub trait WorkflowRepository: Send + Sync {
    async fn find_by_id(
        &self,
        id: &WorkflowId,
    ) -> Result<Option<ApprovalWorkflow>, RepositoryError>;
    async fn save(&self, workflow: ApprovalWorkflow) -> Result<(), RepositoryError>;
    async fn list_all(&self) -> Result<Vec<ApprovalWorkflow>, RepositoryError>;
    async fn list_by_status(
        &self,
        status: WorkflowStatus,
    ) -> Result<Vec<ApprovalWorkflow>, RepositoryError>;
}

#[async_trait]
pub trait LiquidationRepository: Send + Sync {
    async fn list_current(&self) -> Result<Vec<LiquidationEntry>, RepositoryError>;
    async fn replace_snapshot(
        &self,
        entries: Vec<LiquidationEntry>,
    ) -> Result<usize, RepositoryError>;
}
