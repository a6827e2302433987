//! JSON API for the hiring workflow, mounted under `/api/v1`.
//!
//! Users and budgets:
//! - `POST /users`, `GET /users/{id}`
//! - `GET|PUT /users/{id}/team-cost`
//! - `GET /users/{id}/team-budget-breakdown`, `GET /users/{id}/consumed-budget`
//! - `GET /users/{id}/queues/{queue}`
//! - `GET /users/{id}/notifications/{feed}?limit=`
//!
//! Requests:
//! - `POST /requests`, `GET /requests`, `GET /requests/{id}`
//! - `PUT /requests/{id}/{approve|reject|tentative|final|join|details|resend}`
//! - `DELETE /requests/{id}?actor_id=`
//!
//! Dashboards:
//! - `GET /business-units/{bu}/metrics?actor_id=`
//! - `GET /business-units/{bu}/candidates/{category}`
//! - `GET /business-units/{bu}/cost`
//! - `GET /hr/business-unit-stats`, `GET /admin/{list}`

use std::str::FromStr;

use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post, put},
    Json, Router,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;
use uuid::Uuid;

use hireflow_core::domain::request::{
    ApprovalStatus, HiringRequest, JoinStatus, RequestId, RequestKind, Submission,
    WorkflowStatus,
};
use hireflow_core::domain::user::{User, UserId};
use hireflow_core::errors::{ApplicationError, DomainError};
use hireflow_core::ledger::{BudgetBreakdown, BusinessUnitCost};
use hireflow_core::metrics::{AdminList, BuMetrics, BusinessUnitStats, CandidateCategory};
use hireflow_core::notifications::{FeedItem, NotificationFeed};
use hireflow_core::workflow::{DetailsPatch, Queue, WorkflowCommand};
use hireflow_db::repositories::RequestFilter;
use hireflow_db::{HiringService, NewUser, TransitionReport};

pub const CORRELATION_HEADER: &str = "x-correlation-id";

#[derive(Clone)]
pub struct ApiState {
    service: HiringService,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApiError {
    pub error: String,
    pub error_class: String,
    pub message: String,
    #[serde(default)]
    pub field: Option<String>,
    pub correlation_id: String,
}

type ApiFailure = (StatusCode, Json<ApiError>);
type ApiResult<T> = Result<Json<T>, ApiFailure>;

pub fn router(service: HiringService) -> Router {
    let api = Router::new()
        .route("/users", post(create_user))
        .route("/users/{id}", get(get_user))
        .route("/users/{id}/team-cost", get(get_team_cost).put(set_team_cost))
        .route("/users/{id}/team-budget-breakdown", get(team_budget_breakdown))
        .route("/users/{id}/consumed-budget", get(consumed_budget))
        .route("/users/{id}/queues/{queue}", get(queue))
        .route("/users/{id}/notifications/{feed}", get(notifications))
        .route("/requests", post(submit_request).get(list_requests))
        .route("/requests/{id}", get(get_request).delete(delete_request))
        .route("/requests/{id}/approve", put(approve))
        .route("/requests/{id}/reject", put(reject))
        .route("/requests/{id}/tentative", put(enter_tentative))
        .route("/requests/{id}/final", put(enter_final))
        .route("/requests/{id}/join", put(confirm_join))
        .route("/requests/{id}/details", put(edit_details))
        .route("/requests/{id}/resend", put(resend))
        .route("/business-units/{bu}/metrics", get(bu_metrics))
        .route("/business-units/{bu}/candidates/{category}", get(bu_candidates))
        .route("/business-units/{bu}/cost", get(bu_cost))
        .route("/hr/business-unit-stats", get(business_unit_stats))
        .route("/admin/{list}", get(admin_list))
        .with_state(ApiState { service });

    Router::new().nest("/api/v1", api)
}

fn correlation_id(headers: &HeaderMap) -> String {
    headers
        .get(CORRELATION_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("req-{}", Uuid::new_v4().simple()))
}

fn failure(error: ApplicationError, correlation_id: &str) -> ApiFailure {
    let interface = error.into_interface(correlation_id);
    let status =
        StatusCode::from_u16(interface.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    if status.is_server_error() {
        warn!(
            event_name = "api.request.failed",
            correlation_id = %correlation_id,
            error_class = interface.error_class(),
            error = %interface,
            "request failed"
        );
    }
    (
        status,
        Json(ApiError {
            error: interface.user_message().to_string(),
            error_class: interface.error_class().to_string(),
            message: interface.message().to_string(),
            field: interface.field().map(str::to_string),
            correlation_id: interface.correlation_id().to_string(),
        }),
    )
}

fn invalid(field: &str, message: impl Into<String>, correlation_id: &str) -> ApiFailure {
    failure(DomainError::validation(field, message).into(), correlation_id)
}

fn body<T>(payload: Result<Json<T>, JsonRejection>, correlation_id: &str) -> Result<T, ApiFailure> {
    payload.map(|Json(value)| value).map_err(|rejection| {
        invalid("body", rejection.body_text(), correlation_id)
    })
}

fn parse_segment<T>(field: &str, raw: &str, correlation_id: &str) -> Result<T, ApiFailure>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.parse::<T>().map_err(|error| invalid(field, error.to_string(), correlation_id))
}

// ---------------------------------------------------------------------------
// Users and budgets
// ---------------------------------------------------------------------------

async fn create_user(
    State(state): State<ApiState>,
    headers: HeaderMap,
    payload: Result<Json<NewUser>, JsonRejection>,
) -> Result<(StatusCode, Json<User>), ApiFailure> {
    let correlation_id = correlation_id(&headers);
    let new_user = body(payload, &correlation_id)?;
    let user = state
        .service
        .create_user(new_user)
        .await
        .map_err(|error| failure(error, &correlation_id))?;
    Ok((StatusCode::CREATED, Json(user)))
}

async fn get_user(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<User> {
    let correlation_id = correlation_id(&headers);
    state
        .service
        .get_user(&UserId(id))
        .await
        .map(Json)
        .map_err(|error| failure(error, &correlation_id))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct TeamCost {
    pub user_id: UserId,
    pub team_cost: Decimal,
}

#[derive(Debug, Deserialize)]
pub struct TeamCostBody {
    #[serde(default)]
    pub team_cost: Option<Decimal>,
}

async fn get_team_cost(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<TeamCost> {
    let correlation_id = correlation_id(&headers);
    let user_id = UserId(id);
    let team_cost = state
        .service
        .team_cost(&user_id)
        .await
        .map_err(|error| failure(error, &correlation_id))?;
    Ok(Json(TeamCost { user_id, team_cost }))
}

async fn set_team_cost(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    payload: Result<Json<TeamCostBody>, JsonRejection>,
) -> ApiResult<TeamCost> {
    let correlation_id = correlation_id(&headers);
    let TeamCostBody { team_cost } = body(payload, &correlation_id)?;
    let user = state
        .service
        .set_team_cost(&UserId(id), team_cost)
        .await
        .map_err(|error| failure(error, &correlation_id))?;
    Ok(Json(TeamCost { user_id: user.id, team_cost: user.team_cost }))
}

async fn team_budget_breakdown(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<BudgetBreakdown> {
    let correlation_id = correlation_id(&headers);
    state
        .service
        .budget_breakdown(&UserId(id))
        .await
        .map(Json)
        .map_err(|error| failure(error, &correlation_id))
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ConsumedBudget {
    pub user_id: UserId,
    pub consumed: Decimal,
}

async fn consumed_budget(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<ConsumedBudget> {
    let correlation_id = correlation_id(&headers);
    let user_id = UserId(id);
    let consumed = state
        .service
        .consumed_budget(&user_id)
        .await
        .map_err(|error| failure(error, &correlation_id))?;
    Ok(Json(ConsumedBudget { user_id, consumed }))
}

async fn queue(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path((id, queue)): Path<(String, String)>,
) -> ApiResult<Vec<HiringRequest>> {
    let correlation_id = correlation_id(&headers);
    let queue: Queue = parse_segment("queue", &queue, &correlation_id)?;
    state
        .service
        .queue(&UserId(id), queue)
        .await
        .map(Json)
        .map_err(|error| failure(error, &correlation_id))
}

#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

async fn notifications(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path((id, feed)): Path<(String, String)>,
    Query(query): Query<LimitQuery>,
) -> ApiResult<Vec<FeedItem>> {
    let correlation_id = correlation_id(&headers);
    let feed: NotificationFeed = parse_segment("feed", &feed, &correlation_id)?;
    state
        .service
        .notifications(&UserId(id), feed, query.limit)
        .await
        .map(Json)
        .map_err(|error| failure(error, &correlation_id))
}

// ---------------------------------------------------------------------------
// Requests
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct SubmitBody {
    pub actor_id: String,
    #[serde(flatten)]
    pub submission: Submission,
}

async fn submit_request(
    State(state): State<ApiState>,
    headers: HeaderMap,
    payload: Result<Json<SubmitBody>, JsonRejection>,
) -> Result<(StatusCode, Json<HiringRequest>), ApiFailure> {
    let correlation_id = correlation_id(&headers);
    let SubmitBody { actor_id, submission } = body(payload, &correlation_id)?;
    let request = state
        .service
        .submit(&UserId(actor_id), submission, &correlation_id)
        .await
        .map_err(|error| failure(error, &correlation_id))?;
    Ok((StatusCode::CREATED, Json(request)))
}

async fn get_request(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> ApiResult<HiringRequest> {
    let correlation_id = correlation_id(&headers);
    state
        .service
        .get_request(&RequestId(id))
        .await
        .map(Json)
        .map_err(|error| failure(error, &correlation_id))
}

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub request_type: Option<RequestKind>,
    pub business_unit: Option<String>,
    pub hiring_manager_id: Option<String>,
    pub approval_status: Option<ApprovalStatus>,
    pub workflow_status: Option<WorkflowStatus>,
    pub join_status: Option<JoinStatus>,
}

async fn list_requests(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<HiringRequest>> {
    let correlation_id = correlation_id(&headers);
    let filter = RequestFilter {
        request_type: query.request_type,
        business_unit: query.business_unit,
        hiring_manager_id: query.hiring_manager_id.map(UserId),
        approval_status: query.approval_status,
        workflow_status: query.workflow_status,
        join_status: query.join_status,
    };
    state
        .service
        .list_requests(&filter)
        .await
        .map(Json)
        .map_err(|error| failure(error, &correlation_id))
}

async fn run_transition(
    state: &ApiState,
    correlation_id: &str,
    id: String,
    actor_id: String,
    command: WorkflowCommand,
    expected_kind: Option<RequestKind>,
) -> ApiResult<TransitionReport> {
    state
        .service
        .transition(&RequestId(id), &UserId(actor_id), command, expected_kind, correlation_id)
        .await
        .map(Json)
        .map_err(|error| failure(error, correlation_id))
}

/// Stage bodies carry the acting user and may restate the request type.
#[derive(Debug, Deserialize)]
pub struct ApproveBody {
    pub actor_id: String,
    #[serde(default)]
    pub request_type: Option<RequestKind>,
    #[serde(default)]
    pub comment: Option<String>,
}

async fn approve(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    payload: Result<Json<ApproveBody>, JsonRejection>,
) -> ApiResult<TransitionReport> {
    let correlation_id = correlation_id(&headers);
    let ApproveBody { actor_id, request_type, comment } = body(payload, &correlation_id)?;
    let command = WorkflowCommand::Approve { comment };
    run_transition(&state, &correlation_id, id, actor_id, command, request_type).await
}

#[derive(Debug, Deserialize)]
pub struct RejectBody {
    pub actor_id: String,
    #[serde(default)]
    pub request_type: Option<RequestKind>,
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub comment: Option<String>,
}

async fn reject(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    payload: Result<Json<RejectBody>, JsonRejection>,
) -> ApiResult<TransitionReport> {
    let correlation_id = correlation_id(&headers);
    let RejectBody { actor_id, request_type, reason, comment } = body(payload, &correlation_id)?;
    let command = WorkflowCommand::Reject { reason, comment };
    run_transition(&state, &correlation_id, id, actor_id, command, request_type).await
}

#[derive(Debug, Deserialize)]
pub struct TentativeBody {
    pub actor_id: String,
    #[serde(default)]
    pub request_type: Option<RequestKind>,
    #[serde(default)]
    pub candidate_name: Option<String>,
    #[serde(default)]
    pub join_date: Option<NaiveDate>,
}

async fn enter_tentative(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    payload: Result<Json<TentativeBody>, JsonRejection>,
) -> ApiResult<TransitionReport> {
    let correlation_id = correlation_id(&headers);
    let TentativeBody { actor_id, request_type, candidate_name, join_date } =
        body(payload, &correlation_id)?;
    let command = WorkflowCommand::EnterTentative { candidate_name, join_date };
    run_transition(&state, &correlation_id, id, actor_id, command, request_type).await
}

#[derive(Debug, Deserialize)]
pub struct FinalBody {
    pub actor_id: String,
    #[serde(default)]
    pub request_type: Option<RequestKind>,
    #[serde(default)]
    pub exact_join_date: Option<NaiveDate>,
    #[serde(default)]
    pub exact_salary: Option<Decimal>,
    #[serde(default)]
    pub employee_id: Option<String>,
}

async fn enter_final(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    payload: Result<Json<FinalBody>, JsonRejection>,
) -> ApiResult<TransitionReport> {
    let correlation_id = correlation_id(&headers);
    let FinalBody { actor_id, request_type, exact_join_date, exact_salary, employee_id } =
        body(payload, &correlation_id)?;
    let command = WorkflowCommand::EnterFinal { exact_join_date, exact_salary, employee_id };
    run_transition(&state, &correlation_id, id, actor_id, command, request_type).await
}

#[derive(Debug, Deserialize)]
pub struct JoinBody {
    pub actor_id: String,
    #[serde(default)]
    pub request_type: Option<RequestKind>,
    #[serde(default)]
    pub status: Option<JoinStatus>,
    #[serde(default)]
    pub notes: Option<String>,
}

async fn confirm_join(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    payload: Result<Json<JoinBody>, JsonRejection>,
) -> ApiResult<TransitionReport> {
    let correlation_id = correlation_id(&headers);
    let JoinBody { actor_id, request_type, status, notes } = body(payload, &correlation_id)?;
    let command = WorkflowCommand::ConfirmJoin { status, notes };
    run_transition(&state, &correlation_id, id, actor_id, command, request_type).await
}

#[derive(Debug, Deserialize)]
pub struct DetailsBody {
    pub actor_id: String,
    #[serde(default)]
    pub request_type: Option<RequestKind>,
    #[serde(flatten)]
    pub patch: DetailsPatch,
}

async fn edit_details(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    payload: Result<Json<DetailsBody>, JsonRejection>,
) -> ApiResult<TransitionReport> {
    let correlation_id = correlation_id(&headers);
    let DetailsBody { actor_id, request_type, patch } = body(payload, &correlation_id)?;
    let command = WorkflowCommand::EditDetails { patch };
    run_transition(&state, &correlation_id, id, actor_id, command, request_type).await
}

#[derive(Debug, Deserialize)]
pub struct ResendBody {
    pub actor_id: String,
    #[serde(default)]
    pub revision: Option<Submission>,
}

async fn resend(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    payload: Result<Json<ResendBody>, JsonRejection>,
) -> ApiResult<TransitionReport> {
    let correlation_id = correlation_id(&headers);
    let ResendBody { actor_id, revision } = body(payload, &correlation_id)?;
    let command = WorkflowCommand::Resend { revision };
    run_transition(&state, &correlation_id, id, actor_id, command, None).await
}

#[derive(Debug, Default, Deserialize)]
pub struct ActorQuery {
    pub actor_id: Option<String>,
}

async fn delete_request(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(id): Path<String>,
    Query(query): Query<ActorQuery>,
) -> ApiResult<TransitionReport> {
    let correlation_id = correlation_id(&headers);
    let actor_id = query
        .actor_id
        .filter(|actor| !actor.trim().is_empty())
        .ok_or_else(|| invalid("actor_id", "is required", &correlation_id))?;
    run_transition(&state, &correlation_id, id, actor_id, WorkflowCommand::Delete, None).await
}

// ---------------------------------------------------------------------------
// Dashboards
// ---------------------------------------------------------------------------

async fn bu_metrics(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(business_unit): Path<String>,
    Query(query): Query<ActorQuery>,
) -> ApiResult<BuMetrics> {
    let correlation_id = correlation_id(&headers);
    let actor_id = query.actor_id.map(UserId);
    state
        .service
        .bu_metrics(actor_id.as_ref(), &business_unit)
        .await
        .map(Json)
        .map_err(|error| failure(error, &correlation_id))
}

async fn bu_candidates(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path((business_unit, category)): Path<(String, String)>,
) -> ApiResult<Vec<HiringRequest>> {
    let correlation_id = correlation_id(&headers);
    let category: CandidateCategory = parse_segment("category", &category, &correlation_id)?;
    state
        .service
        .bu_candidates(&business_unit, category)
        .await
        .map(Json)
        .map_err(|error| failure(error, &correlation_id))
}

async fn bu_cost(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(business_unit): Path<String>,
) -> ApiResult<BusinessUnitCost> {
    let correlation_id = correlation_id(&headers);
    state
        .service
        .bu_cost(&business_unit)
        .await
        .map(Json)
        .map_err(|error| failure(error, &correlation_id))
}

async fn business_unit_stats(
    State(state): State<ApiState>,
    headers: HeaderMap,
) -> ApiResult<Vec<BusinessUnitStats>> {
    let correlation_id = correlation_id(&headers);
    state
        .service
        .business_unit_stats()
        .await
        .map(Json)
        .map_err(|error| failure(error, &correlation_id))
}

async fn admin_list(
    State(state): State<ApiState>,
    headers: HeaderMap,
    Path(list): Path<String>,
) -> ApiResult<Vec<HiringRequest>> {
    let correlation_id = correlation_id(&headers);
    let list: AdminList = parse_segment("list", &list, &correlation_id)?;
    state
        .service
        .admin_list(list)
        .await
        .map(Json)
        .map_err(|error| failure(error, &correlation_id))
}
