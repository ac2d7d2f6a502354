//! REST surface enforcing visibility and the approval gate server-side.
//!
//! Endpoints (all JSON):
//! - `GET  /api/v1/workflows`               — workflows visible to the caller
//! - `GET  /api/v1/workflows/{id}`          — one workflow, 404 when not visible
//! - `POST /api/v1/workflows`               — submit a workflow (chain built here)
//! - `POST /api/v1/workflows/{id}/approve`  — decide, gate enforced
//! - `POST /api/v1/workflows/{id}/reject`   — decide, gate enforced
//! - `GET  /api/v1/liquidation`             — entries narrowed to the caller's scope
//! - `GET  /api/v1/liquidation/summary`     — cached per-viewer aggregate
//! - `PUT  /api/v1/liquidation`             — replace the snapshot (leadership roles)
//!
//! Caller identity arrives in the `x-user-id` header (identity provisioning is
//! external); an optional static bearer token guards the whole surface.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use chrono::Utc;
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{info, warn};
use uuid::Uuid;

use fieldline_core::audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink};
use fieldline_core::config::AppConfig;
use fieldline_core::domain::role::{permits, Permission, Role};
use fieldline_core::domain::user::UserContext;
use fieldline_core::domain::workflow::{
    ApprovalWorkflow, WorkflowId, WorkflowPayload, WorkflowStatus,
};
use fieldline_core::errors::{ApplicationError, DomainError, InterfaceError};
use fieldline_core::{
    apply_decision, default_chain, filter_entries, summarize, visible_workflows,
    ApprovalDecision, LiquidationEntry, LiquidationSummary, SnapshotCache,
};
use fieldline_db::repositories::{
    LiquidationRepository, SqlLiquidationRepository, SqlUserRepository, SqlWorkflowRepository,
    UserRepository, WorkflowRepository,
};
use fieldline_db::DbPool;

#[derive(Clone)]
pub struct ApiState {
    db_pool: DbPool,
    summary_cache: Arc<Mutex<SnapshotCache<LiquidationSummary>>>,
    audit: Arc<dyn AuditSink>,
    api_token: Option<String>,
    cache_ttl_ms: u64,
}

impl ApiState {
    pub fn new(db_pool: DbPool, config: &AppConfig, audit: Arc<dyn AuditSink>) -> Self {
        Self {
            db_pool,
            summary_cache: Arc::new(Mutex::new(SnapshotCache::new())),
            audit,
            api_token: config
                .server
                .api_token
                .as_ref()
                .map(|token| token.expose_secret().to_string()),
            cache_ttl_ms: config.cache.ttl_ms,
        }
    }
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/v1/workflows", get(list_workflows).post(submit_workflow))
        .route("/api/v1/workflows/{id}", get(get_workflow))
        .route("/api/v1/workflows/{id}/approve", post(approve_workflow))
        .route("/api/v1/workflows/{id}/reject", post(reject_workflow))
        .route("/api/v1/liquidation", get(list_liquidation).put(replace_liquidation))
        .route("/api/v1/liquidation/summary", get(liquidation_summary))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / Response types
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct SubmitWorkflowRequest {
    pub payload: WorkflowPayload,
}

#[derive(Debug, Default, Deserialize)]
pub struct DecisionRequest {
    pub comments: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ReplaceSnapshotResponse {
    pub replaced: usize,
}

#[derive(Debug, Serialize)]
pub struct ApiError {
    pub error: String,
    pub correlation_id: String,
}

type ApiResult<T> = Result<T, (StatusCode, Json<ApiError>)>;

fn reject(interface: InterfaceError) -> (StatusCode, Json<ApiError>) {
    let (status, correlation_id) = match &interface {
        InterfaceError::BadRequest { correlation_id, .. } => {
            (StatusCode::BAD_REQUEST, correlation_id.clone())
        }
        InterfaceError::Unauthorized { correlation_id, .. } => {
            (StatusCode::UNAUTHORIZED, correlation_id.clone())
        }
        InterfaceError::Forbidden { correlation_id, .. } => {
            (StatusCode::FORBIDDEN, correlation_id.clone())
        }
        InterfaceError::NotFound { correlation_id, .. } => {
            (StatusCode::NOT_FOUND, correlation_id.clone())
        }
        InterfaceError::ServiceUnavailable { correlation_id, .. } => {
            (StatusCode::SERVICE_UNAVAILABLE, correlation_id.clone())
        }
        InterfaceError::Internal { correlation_id, .. } => {
            (StatusCode::INTERNAL_SERVER_ERROR, correlation_id.clone())
        }
    };

    (status, Json(ApiError { error: interface.user_message().to_string(), correlation_id }))
}

fn persistence(error: impl std::fmt::Display, correlation_id: &str) -> (StatusCode, Json<ApiError>) {
    reject(ApplicationError::Persistence(error.to_string()).into_interface(correlation_id))
}

fn not_found(correlation_id: &str) -> (StatusCode, Json<ApiError>) {
    reject(InterfaceError::NotFound {
        message: "record not found".to_string(),
        correlation_id: correlation_id.to_string(),
    })
}

// ---------------------------------------------------------------------------
// Caller identity
// ---------------------------------------------------------------------------

struct Viewer {
    context: UserContext,
    subordinate_ids: Vec<String>,
}

async fn authenticate(
    state: &ApiState,
    headers: &HeaderMap,
    correlation_id: &str,
) -> ApiResult<Viewer> {
    if let Some(expected) = &state.api_token {
        let presented = headers
            .get("authorization")
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "));
        if presented != Some(expected.as_str()) {
            return Err(reject(InterfaceError::Unauthorized {
                message: "missing or invalid bearer token".to_string(),
                correlation_id: correlation_id.to_string(),
            }));
        }
    }

    let user_id = headers
        .get("x-user-id")
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| {
            reject(InterfaceError::Unauthorized {
                message: "x-user-id header is required".to_string(),
                correlation_id: correlation_id.to_string(),
            })
        })?;

    let users = SqlUserRepository::new(state.db_pool.clone());
    let user = users
        .find_by_id(user_id)
        .await
        .map_err(|error| persistence(error, correlation_id))?
        .ok_or_else(|| {
            reject(InterfaceError::Unauthorized {
                message: format!("unknown user `{user_id}`"),
                correlation_id: correlation_id.to_string(),
            })
        })?;

    if Role::from_code(&user.role_code).is_none() {
        warn!(
            event_name = "api.ingress.unknown_role_code",
            correlation_id = %correlation_id,
            user_id = %user.id,
            role_code = %user.role_code,
            "caller carries an unrecognized role code; narrowest scope applies"
        );
    }

    let subordinate_ids = users
        .list_subordinate_ids(&user.id)
        .await
        .map_err(|error| persistence(error, correlation_id))?;

    Ok(Viewer { context: user.context(), subordinate_ids })
}

// ---------------------------------------------------------------------------
// Workflow handlers
// ---------------------------------------------------------------------------

pub async fn list_workflows(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<ApprovalWorkflow>>> {
    let correlation_id = Uuid::new_v4().to_string();
    let viewer = authenticate(&state, &headers, &correlation_id).await?;

    let repo = SqlWorkflowRepository::new(state.db_pool.clone());
    let workflows =
        repo.list_all().await.map_err(|error| persistence(error, &correlation_id))?;

    Ok(Json(visible_workflows(&workflows, &viewer.context)))
}

pub async fn get_workflow(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    headers: HeaderMap,
) -> ApiResult<Json<ApprovalWorkflow>> {
    let correlation_id = Uuid::new_v4().to_string();
    let viewer = authenticate(&state, &headers, &correlation_id).await?;

    let repo = SqlWorkflowRepository::new(state.db_pool.clone());
    let workflow = repo
        .find_by_id(&WorkflowId(id))
        .await
        .map_err(|error| persistence(error, &correlation_id))?
        .ok_or_else(|| not_found(&correlation_id))?;

    // Absent and not-visible are deliberately indistinguishable.
    let mut visible = visible_workflows(&[workflow], &viewer.context);
    match visible.pop() {
        Some(workflow) => Ok(Json(workflow)),
        None => Err(not_found(&correlation_id)),
    }
}

pub async fn submit_workflow(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(request): Json<SubmitWorkflowRequest>,
) -> ApiResult<(StatusCode, Json<ApprovalWorkflow>)> {
    let correlation_id = Uuid::new_v4().to_string();
    let viewer = authenticate(&state, &headers, &correlation_id).await?;

    let workflow_type = request.payload.workflow_type();
    let chain = default_chain(workflow_type, &viewer.context.role_code);
    let current_approver_role = chain
        .first()
        .map(|step| step.approver_role.clone())
        .ok_or_else(|| {
            reject(
                ApplicationError::Domain(DomainError::InvariantViolation(
                    "empty approval chain".to_string(),
                ))
                .into_interface(&correlation_id),
            )
        })?;

    let workflow = ApprovalWorkflow {
        id: WorkflowId(format!("WF-{}", Uuid::new_v4())),
        workflow_type,
        submitted_by: viewer.context.id.clone(),
        submitted_by_role: viewer.context.role_code.clone(),
        current_approver: None,
        current_approver_role,
        status: WorkflowStatus::Pending,
        submitted_at: Utc::now(),
        decided_at: None,
        payload: request.payload,
        chain,
    };

    let repo = SqlWorkflowRepository::new(state.db_pool.clone());
    repo.save(workflow.clone())
        .await
        .map_err(|error| persistence(error, &correlation_id))?;

    state.audit.emit(
        AuditEvent::new(
            Some(workflow.id.clone()),
            correlation_id.clone(),
            "workflow.submitted",
            AuditCategory::Ingress,
            viewer.context.id.clone(),
            AuditOutcome::Success,
        )
        .with_metadata("workflow_type", workflow_type.as_str())
        .with_metadata("first_approver_role", workflow.current_approver_role.clone()),
    );
    info!(
        event_name = "api.workflow.submitted",
        correlation_id = %correlation_id,
        workflow_id = %workflow.id.0,
        workflow_type = workflow_type.as_str(),
        "workflow submitted"
    );

    Ok((StatusCode::CREATED, Json(workflow)))
}

pub async fn approve_workflow(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<DecisionRequest>,
) -> ApiResult<Json<ApprovalWorkflow>> {
    decide_workflow(state, id, headers, ApprovalDecision::Approve, request).await
}

pub async fn reject_workflow(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(request): Json<DecisionRequest>,
) -> ApiResult<Json<ApprovalWorkflow>> {
    decide_workflow(state, id, headers, ApprovalDecision::Reject, request).await
}

async fn decide_workflow(
    state: ApiState,
    id: String,
    headers: HeaderMap,
    decision: ApprovalDecision,
    request: DecisionRequest,
) -> ApiResult<Json<ApprovalWorkflow>> {
    let correlation_id = Uuid::new_v4().to_string();
    let viewer = authenticate(&state, &headers, &correlation_id).await?;
    let comments = request.comments;

    let repo = SqlWorkflowRepository::new(state.db_pool.clone());
    let workflow = repo
        .find_by_id(&WorkflowId(id))
        .await
        .map_err(|error| persistence(error, &correlation_id))?
        .ok_or_else(|| not_found(&correlation_id))?;

    if visible_workflows(&[workflow.clone()], &viewer.context).is_empty() {
        return Err(not_found(&correlation_id));
    }

    let decision_label = match decision {
        ApprovalDecision::Approve => "approve",
        ApprovalDecision::Reject => "reject",
    };

    let updated = match apply_decision(
        workflow,
        &viewer.context.role_code,
        &viewer.context.id,
        decision,
        comments,
        Utc::now(),
    ) {
        Ok(updated) => updated,
        Err(error) => {
            state.audit.emit(
                AuditEvent::new(
                    Some(WorkflowId(error_workflow_id(&error))),
                    correlation_id.clone(),
                    "approval.decision_denied",
                    AuditCategory::Approval,
                    viewer.context.id.clone(),
                    AuditOutcome::Rejected,
                )
                .with_metadata("decision", decision_label),
            );
            // One opaque refusal for every denial reason.
            return Err(reject(
                ApplicationError::Domain(DomainError::Approval(error))
                    .into_interface(&correlation_id),
            ));
        }
    };

    repo.save(updated.clone())
        .await
        .map_err(|error| persistence(error, &correlation_id))?;

    state.audit.emit(
        AuditEvent::new(
            Some(updated.id.clone()),
            correlation_id.clone(),
            "approval.decision_applied",
            AuditCategory::Approval,
            viewer.context.id.clone(),
            AuditOutcome::Success,
        )
        .with_metadata("decision", decision_label)
        .with_metadata("status", status_label(&updated.status)),
    );
    info!(
        event_name = "api.workflow.decision_applied",
        correlation_id = %correlation_id,
        workflow_id = %updated.id.0,
        decision = decision_label,
        status = status_label(&updated.status),
        "approval decision applied"
    );

    Ok(Json(updated))
}

fn status_label(status: &WorkflowStatus) -> &'static str {
    match status {
        WorkflowStatus::Pending => "pending",
        WorkflowStatus::Approved => "approved",
        WorkflowStatus::Rejected => "rejected",
    }
}

fn error_workflow_id(error: &fieldline_core::ApprovalError) -> String {
    match error {
        fieldline_core::ApprovalError::WorkflowClosed { workflow_id }
        | fieldline_core::ApprovalError::SelfApproval { workflow_id }
        | fieldline_core::ApprovalError::NotCurrentApprover { workflow_id, .. }
        | fieldline_core::ApprovalError::InconsistentChain { workflow_id } => workflow_id.clone(),
    }
}

// ---------------------------------------------------------------------------
// Liquidation handlers
// ---------------------------------------------------------------------------

pub async fn list_liquidation(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> ApiResult<Json<Vec<LiquidationEntry>>> {
    let correlation_id = Uuid::new_v4().to_string();
    let viewer = authenticate(&state, &headers, &correlation_id).await?;

    let repo = SqlLiquidationRepository::new(state.db_pool.clone());
    let entries =
        repo.list_current().await.map_err(|error| persistence(error, &correlation_id))?;

    Ok(Json(filter_entries(&entries, &viewer.context, &viewer.subordinate_ids)))
}

pub async fn liquidation_summary(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> ApiResult<Json<LiquidationSummary>> {
    let correlation_id = Uuid::new_v4().to_string();
    let viewer = authenticate(&state, &headers, &correlation_id).await?;

    // Per-viewer key: a shared slot would leak one viewer's scope to another.
    let cache_key = format!("liquidation:summary:{}", viewer.context.id);
    {
        let mut cache = state.summary_cache.lock().await;
        if let Some(summary) = cache.get(&cache_key) {
            return Ok(Json(summary.clone()));
        }
    }

    let repo = SqlLiquidationRepository::new(state.db_pool.clone());
    let entries =
        repo.list_current().await.map_err(|error| persistence(error, &correlation_id))?;
    let summary = summarize(&entries, &viewer.context, &viewer.subordinate_ids);

    let mut cache = state.summary_cache.lock().await;
    cache.set_with_ttl(cache_key, summary.clone(), state.cache_ttl_ms);

    Ok(Json(summary))
}

pub async fn replace_liquidation(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Json(entries): Json<Vec<LiquidationEntry>>,
) -> ApiResult<Json<ReplaceSnapshotResponse>> {
    let correlation_id = Uuid::new_v4().to_string();
    let viewer = authenticate(&state, &headers, &correlation_id).await?;

    // Snapshot replacement is an organization-wide write.
    if !permits(&viewer.context.role_code, Permission::ManageLiquidationSnapshots) {
        return Err(reject(InterfaceError::Forbidden {
            message: "snapshot replacement requires leadership permissions".to_string(),
            correlation_id,
        }));
    }

    let repo = SqlLiquidationRepository::new(state.db_pool.clone());
    let replaced = repo
        .replace_snapshot(entries)
        .await
        .map_err(|error| persistence(error, &correlation_id))?;

    let mut cache = state.summary_cache.lock().await;
    cache.invalidate(Some("liquidation:"));
    drop(cache);

    state.audit.emit(
        AuditEvent::new(
            None,
            correlation_id.clone(),
            "liquidation.snapshot_replaced",
            AuditCategory::Persistence,
            viewer.context.id.clone(),
            AuditOutcome::Success,
        )
        .with_metadata("entries", replaced.to_string()),
    );
    info!(
        event_name = "api.liquidation.snapshot_replaced",
        correlation_id = %correlation_id,
        entries = replaced,
        "liquidation snapshot replaced"
    );

    Ok(Json(ReplaceSnapshotResponse { replaced }))
}
