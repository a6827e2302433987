//! Application service over the repositories: loads the actor and request,
//! asks the workflow engine for the next record, and commits it under the
//! request's version guard.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use hireflow_core::audit::{
    AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink, NoopAuditSink,
};
use hireflow_core::domain::request::{
    HiringRequest, RequestId, RequestKind, Submission, WorkflowStatus,
};
use hireflow_core::domain::user::{Role, User, UserId};
use hireflow_core::errors::{ApplicationError, DomainError};
use hireflow_core::ledger::{BudgetBreakdown, BudgetLedger, BusinessUnitCost, DebitOutcome};
use hireflow_core::metrics::{
    self, AdminList, BuMetrics, BusinessUnitStats, CandidateCategory,
};
use hireflow_core::notifications::{self, FeedItem, NotificationFeed, DEFAULT_LIMIT};
use hireflow_core::workflow::{
    visible, Queue, RecordChange, TransitionOutcome, WorkflowCommand, WorkflowEngine,
    WorkflowEvent,
};

use crate::connection::DbPool;
use crate::repositories::{
    HiringRequestRepository, InMemoryStore, RepositoryError, RequestFilter,
    SqlHiringRequestRepository, SqlUserRepository, TransitionCommit, UserRepository,
};

/// Reload-and-redecide attempts when a commit loses a version race.
pub const MAX_COMMIT_ATTEMPTS: u32 = 3;

type Clock = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Clone, Debug, Deserialize)]
pub struct NewUser {
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub business_unit: String,
    #[serde(default)]
    pub team_cost: Option<Decimal>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct TransitionReport {
    pub event: WorkflowEvent,
    pub from: WorkflowStatus,
    pub to: WorkflowStatus,
    /// The stored record after the transition; absent after a delete.
    pub request: Option<HiringRequest>,
    /// Id removed by a resend.
    pub replaced_id: Option<RequestId>,
    pub debit: Option<DebitOutcome>,
}

#[derive(Clone)]
pub struct HiringService {
    users: Arc<dyn UserRepository>,
    requests: Arc<dyn HiringRequestRepository>,
    engine: WorkflowEngine,
    audit: Arc<dyn AuditSink>,
    clock: Clock,
}

impl HiringService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        requests: Arc<dyn HiringRequestRepository>,
        engine: WorkflowEngine,
    ) -> Self {
        Self { users, requests, engine, audit: Arc::new(NoopAuditSink), clock: Arc::new(Utc::now) }
    }

    pub fn sqlite(pool: DbPool, ledger: BudgetLedger) -> Self {
        Self::new(
            Arc::new(SqlUserRepository::new(pool.clone())),
            Arc::new(SqlHiringRequestRepository::new(pool)),
            WorkflowEngine::new(ledger),
        )
    }

    pub fn in_memory(ledger: BudgetLedger) -> Self {
        let store = Arc::new(InMemoryStore::default());
        Self::new(store.clone(), store, WorkflowEngine::new(ledger))
    }

    pub fn with_audit_sink(mut self, sink: Arc<dyn AuditSink>) -> Self {
        self.audit = sink;
        self
    }

    pub fn with_clock<F>(mut self, clock: F) -> Self
    where
        F: Fn() -> DateTime<Utc> + Send + Sync + 'static,
    {
        self.clock = Arc::new(clock);
        self
    }

    fn now(&self) -> DateTime<Utc> {
        (self.clock)()
    }

    fn today(&self) -> NaiveDate {
        self.now().date_naive()
    }

    pub async fn create_user(&self, new_user: NewUser) -> Result<User, ApplicationError> {
        let name = new_user.name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("name", "is required").into());
        }
        let email = new_user.email.trim();
        if !email.contains('@') {
            return Err(DomainError::validation("email", "must be an email address").into());
        }
        let business_unit = new_user.business_unit.trim();
        if new_user.role == Role::BuHead && business_unit.is_empty() {
            return Err(DomainError::validation("business_unit", "required for BU Heads").into());
        }
        let team_cost = new_user.team_cost.unwrap_or(Decimal::ZERO);
        if team_cost < Decimal::ZERO {
            return Err(DomainError::validation("team_cost", "must not be negative").into());
        }

        let now = self.now();
        let user = User {
            id: UserId(
                new_user
                    .id
                    .filter(|id| !id.trim().is_empty())
                    .unwrap_or_else(|| format!("USR-{}", Uuid::new_v4().simple())),
            ),
            name: name.to_string(),
            email: email.to_string(),
            role: new_user.role,
            business_unit: business_unit.to_string(),
            team_cost,
            created_at: now,
            updated_at: now,
        };
        self.users.create(user.clone()).await?;
        info!(
            event_name = "user.created",
            user_id = %user.id,
            role = user.role.as_str(),
            "user created"
        );
        Ok(user)
    }

    pub async fn get_user(&self, id: &UserId) -> Result<User, ApplicationError> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("user", id.0.clone()).into())
    }

    pub async fn get_request(&self, id: &RequestId) -> Result<HiringRequest, ApplicationError> {
        self.requests
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("hiring request", id.0.clone()).into())
    }

    pub async fn list_requests(
        &self,
        filter: &RequestFilter,
    ) -> Result<Vec<HiringRequest>, ApplicationError> {
        Ok(self.requests.list(filter).await?)
    }

    pub async fn submit(
        &self,
        actor_id: &UserId,
        submission: Submission,
        correlation_id: &str,
    ) -> Result<HiringRequest, ApplicationError> {
        let actor = self.get_user(actor_id).await?;
        let request = self.engine.submit(RequestId::generate(), &actor, submission, self.now())?;
        self.requests.create(request.clone()).await?;

        let context = AuditContext::new(Some(request.id.clone()), correlation_id, actor.id.0.clone());
        self.audit.emit(
            AuditEvent::new(
                &context,
                "workflow.request_submitted",
                AuditCategory::Workflow,
                AuditOutcome::Success,
            )
            .with_metadata("request_type", request.kind().as_str())
            .with_metadata("business_unit", request.business_unit.clone())
            .at(request.created_at),
        );
        info!(
            event_name = "workflow.request.submitted",
            correlation_id = %correlation_id,
            request_id = %request.id,
            actor_id = %actor.id,
            request_type = request.kind().as_str(),
            "hiring request submitted"
        );
        Ok(request)
    }

    /// Applies `command` to the stored request. `expected_kind`, when given,
    /// must match the stored request type.
    pub async fn transition(
        &self,
        request_id: &RequestId,
        actor_id: &UserId,
        command: WorkflowCommand,
        expected_kind: Option<RequestKind>,
        correlation_id: &str,
    ) -> Result<TransitionReport, ApplicationError> {
        let actor = self.get_user(actor_id).await?;
        let mut attempt = 0;
        loop {
            attempt += 1;
            let request = self.get_request(request_id).await?;
            if let Some(kind) = expected_kind {
                if kind != request.kind() {
                    return Err(DomainError::validation(
                        "request_type",
                        format!("request is {}, not {}", request.kind().as_str(), kind.as_str()),
                    )
                    .into());
                }
            }

            let now = self.now();
            let context =
                AuditContext::new(Some(request.id.clone()), correlation_id, actor.id.0.clone());
            let outcome = self
                .engine
                .apply_with_audit(&request, &actor, command.clone(), now, self.audit.as_ref(), &context)
                .map_err(|error| {
                    warn!(
                        event_name = "workflow.transition.rejected",
                        correlation_id = %correlation_id,
                        request_id = %request.id,
                        actor_id = %actor.id,
                        command = command.name(),
                        error = %error,
                        "workflow transition rejected"
                    );
                    error
                })?;

            match self.persist(&request, outcome, now).await {
                Ok(report) => {
                    info!(
                        event_name = "workflow.transition.applied",
                        correlation_id = %correlation_id,
                        request_id = %request.id,
                        actor_id = %actor.id,
                        command = command.name(),
                        from = report.from.as_str(),
                        to = report.to.as_str(),
                        "workflow transition applied"
                    );
                    if let Some(debit) = report.debit.as_ref().filter(|debit| debit.clamped) {
                        warn!(
                            event_name = "ledger.debit.clamped",
                            correlation_id = %correlation_id,
                            request_id = %request.id,
                            manager_id = %request.hiring_manager_id,
                            requested = %debit.requested,
                            debited = %debit.debited,
                            "team budget floored at zero"
                        );
                    }
                    return Ok(report);
                }
                Err(RepositoryError::VersionConflict { .. }) if attempt < MAX_COMMIT_ATTEMPTS => {
                    debug!(
                        event_name = "workflow.transition.retry",
                        correlation_id = %correlation_id,
                        request_id = %request.id,
                        attempt,
                        "request changed underneath transition, reloading"
                    );
                }
                Err(error) => return Err(error.into()),
            }
        }
    }

    async fn persist(
        &self,
        current: &HiringRequest,
        outcome: TransitionOutcome,
        now: DateTime<Utc>,
    ) -> Result<TransitionReport, RepositoryError> {
        let TransitionOutcome { from, to, event, change, debit } = outcome;
        let mut report =
            TransitionReport { event, from, to, request: None, replaced_id: None, debit: None };

        match change {
            RecordChange::Updated(next) => {
                let mut next = *next;
                let receipt = self
                    .requests
                    .commit(TransitionCommit {
                        request: next.clone(),
                        expected_version: current.version,
                        debit,
                        committed_at: now,
                    })
                    .await?;
                next.version = receipt.version;
                report.request = Some(next);
                report.debit = receipt.debit;
            }
            RecordChange::Unchanged => report.request = Some(current.clone()),
            RecordChange::Deleted => self.requests.delete(&current.id, current.version).await?,
            RecordChange::Replaced(fresh) => {
                let fresh = *fresh;
                self.requests.replace(&current.id, current.version, fresh.clone()).await?;
                report.replaced_id = Some(current.id.clone());
                report.request = Some(fresh);
            }
        }
        Ok(report)
    }

    /// Requests waiting in `queue` for `actor_id`, newest first.
    pub async fn queue(
        &self,
        actor_id: &UserId,
        queue: Queue,
    ) -> Result<Vec<HiringRequest>, ApplicationError> {
        let actor = self.get_user(actor_id).await?;
        let requests = self.requests.list(&RequestFilter::default()).await?;
        Ok(visible(queue, &actor, &requests, self.today()).into_iter().cloned().collect())
    }

    /// BU Heads may only read their own unit; other roles read any unit.
    pub async fn bu_metrics(
        &self,
        actor_id: Option<&UserId>,
        business_unit: &str,
    ) -> Result<BuMetrics, ApplicationError> {
        let business_unit = required_business_unit(business_unit)?;
        if let Some(actor_id) = actor_id {
            let actor = self.get_user(actor_id).await?;
            if actor.role == Role::BuHead && actor.business_unit != business_unit {
                return Err(DomainError::permission(
                    "view_metrics",
                    actor.role,
                    "BU Heads may only view their own business unit",
                )
                .into());
            }
        }
        let requests = self.requests.list(&RequestFilter::for_business_unit(business_unit)).await?;
        Ok(metrics::compute_bu_metrics(business_unit, &requests, self.today()))
    }

    pub async fn bu_candidates(
        &self,
        business_unit: &str,
        category: CandidateCategory,
    ) -> Result<Vec<HiringRequest>, ApplicationError> {
        let business_unit = required_business_unit(business_unit)?;
        let requests = self.requests.list(&RequestFilter::for_business_unit(business_unit)).await?;
        Ok(metrics::candidates(business_unit, category, &requests, self.today())
            .into_iter()
            .cloned()
            .collect())
    }

    pub async fn bu_cost(&self, business_unit: &str) -> Result<BusinessUnitCost, ApplicationError> {
        let business_unit = required_business_unit(business_unit)?;
        let managers = self.users.list_by_business_unit(business_unit).await?;
        let requests = self.requests.list(&RequestFilter::for_business_unit(business_unit)).await?;
        Ok(self.engine.ledger().business_unit_cost(business_unit, &managers, &requests))
    }

    pub async fn business_unit_stats(&self) -> Result<Vec<BusinessUnitStats>, ApplicationError> {
        let requests = self.requests.list(&RequestFilter::default()).await?;
        Ok(metrics::business_unit_stats(&requests))
    }

    pub async fn admin_list(&self, list: AdminList) -> Result<Vec<HiringRequest>, ApplicationError> {
        let requests = self.requests.list(&RequestFilter::default()).await?;
        Ok(metrics::admin_list(list, &requests).into_iter().cloned().collect())
    }

    pub async fn team_cost(&self, user_id: &UserId) -> Result<Decimal, ApplicationError> {
        Ok(self.get_user(user_id).await?.team_cost)
    }

    pub async fn set_team_cost(
        &self,
        user_id: &UserId,
        team_cost: Option<Decimal>,
    ) -> Result<User, ApplicationError> {
        let team_cost = match team_cost {
            None => return Err(DomainError::validation("team_cost", "is required").into()),
            Some(value) if value < Decimal::ZERO => {
                return Err(DomainError::validation("team_cost", "must not be negative").into());
            }
            Some(value) => value,
        };
        let user = self.users.set_team_cost(user_id, team_cost, self.now()).await?;
        info!(
            event_name = "ledger.team_cost.set",
            user_id = %user.id,
            team_cost = %user.team_cost,
            "team budget updated"
        );
        Ok(user)
    }

    pub async fn budget_breakdown(
        &self,
        user_id: &UserId,
    ) -> Result<BudgetBreakdown, ApplicationError> {
        let user = self.get_user(user_id).await?;
        let requests = self.requests.list(&RequestFilter::for_manager(user.id.clone())).await?;
        Ok(self.engine.ledger().breakdown(&user.id, &requests))
    }

    pub async fn consumed_budget(&self, user_id: &UserId) -> Result<Decimal, ApplicationError> {
        Ok(self.budget_breakdown(user_id).await?.total)
    }

    pub async fn notifications(
        &self,
        user_id: &UserId,
        feed: NotificationFeed,
        limit: Option<usize>,
    ) -> Result<Vec<FeedItem>, ApplicationError> {
        let limit = limit.unwrap_or(DEFAULT_LIMIT);
        if limit == 0 {
            return Err(DomainError::validation("limit", "must be at least 1").into());
        }
        let user = self.get_user(user_id).await?;
        let requests = self.requests.list(&RequestFilter::for_manager(user.id.clone())).await?;
        Ok(notifications::feed(feed, &user.id, &requests, limit))
    }
}

fn required_business_unit(business_unit: &str) -> Result<&str, ApplicationError> {
    let trimmed = business_unit.trim();
    if trimmed.is_empty() {
        return Err(DomainError::validation("business_unit", "is required").into());
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use chrono::{NaiveDate, TimeZone, Utc};
    use rust_decimal::Decimal;

    use hireflow_core::audit::InMemoryAuditSink;
    use hireflow_core::domain::request::{
        ApprovalStatus, CandidateProfile, JoinStatus, RequestDetails, RequestKind, Submission,
        WorkflowStatus,
    };
    use hireflow_core::domain::skills::Skills;
    use hireflow_core::domain::user::{Role, UserId};
    use hireflow_core::errors::{ApplicationError, DomainError};
    use hireflow_core::ledger::BudgetLedger;
    use hireflow_core::notifications::NotificationFeed;
    use hireflow_core::workflow::{Queue, WorkflowCommand, WorkflowError, WorkflowEvent};

    use super::{HiringService, NewUser};

    fn service() -> HiringService {
        HiringService::in_memory(BudgetLedger::default())
            .with_clock(|| Utc.with_ymd_and_hms(2025, 3, 10, 9, 0, 0).single().expect("valid clock"))
    }

    async fn user(service: &HiringService, id: &str, role: Role, business_unit: &str) -> UserId {
        service
            .create_user(NewUser {
                id: Some(id.to_string()),
                name: id.to_string(),
                email: format!("{id}@example.com"),
                role,
                business_unit: business_unit.to_string(),
                team_cost: Some(Decimal::from(1_000_000)),
            })
            .await
            .expect("create user")
            .id
    }

    fn submission() -> Submission {
        Submission {
            details: RequestDetails::NewHire { position_title: "Backend Engineer".to_string() },
            candidate: CandidateProfile {
                name: "Priya".to_string(),
                designation: "Engineer II".to_string(),
                experience_years: Some(4),
                skills: Skills::parse("[\"rust\", \"sql\"]"),
                ctc_offered: Decimal::from(1_000_000),
                proposed_joining_date: None,
            },
        }
    }

    #[tokio::test]
    async fn full_pipeline_debits_budget_once() {
        let service = service();
        let bu = user(&service, "bu-1", Role::BuHead, "Payments").await;
        let hr = user(&service, "hr-1", Role::HrHead, "People").await;
        let admin = user(&service, "admin-1", Role::Admin, "Ops").await;

        let request = service.submit(&bu, submission(), "corr-1").await.expect("submit");
        let id = request.id.clone();
        let approve = WorkflowCommand::Approve { comment: Some("ok".to_string()) };
        service.transition(&id, &hr, approve.clone(), None, "corr-2").await.expect("hr approve");
        service.transition(&id, &admin, approve, None, "corr-3").await.expect("admin approve");
        service
            .transition(
                &id,
                &bu,
                WorkflowCommand::EnterTentative {
                    candidate_name: Some("Priya".to_string()),
                    join_date: NaiveDate::from_ymd_opt(2025, 3, 1),
                },
                Some(RequestKind::NewHire),
                "corr-4",
            )
            .await
            .expect("tentative");
        service
            .transition(
                &id,
                &hr,
                WorkflowCommand::EnterFinal {
                    exact_join_date: NaiveDate::from_ymd_opt(2025, 3, 1),
                    exact_salary: Some(Decimal::from(1_200_000)),
                    employee_id: Some("E1".to_string()),
                },
                None,
                "corr-5",
            )
            .await
            .expect("final");

        let join = WorkflowCommand::ConfirmJoin { status: Some(JoinStatus::Joined), notes: None };
        let first = service.transition(&id, &bu, join.clone(), None, "corr-6").await.expect("join");
        assert_eq!(first.to, WorkflowStatus::Completed);
        assert_eq!(first.debit.as_ref().map(|debit| debit.debited), Some(Decimal::from(240_000)));

        let second = service.transition(&id, &hr, join, None, "corr-7").await.expect("join again");
        assert_eq!(second.event, WorkflowEvent::JoinAlreadyConfirmed);
        assert!(second.debit.is_none());

        assert_eq!(service.team_cost(&bu).await.expect("team cost"), Decimal::from(760_000));
        assert_eq!(service.consumed_budget(&bu).await.expect("consumed"), Decimal::from(240_000));
        let hired = service
            .notifications(&bu, NotificationFeed::Hired, None)
            .await
            .expect("hired feed");
        assert_eq!(hired.len(), 1);
    }

    #[tokio::test]
    async fn request_type_mismatch_is_a_field_error() {
        let service = service();
        let bu = user(&service, "bu-1", Role::BuHead, "Payments").await;
        let hr = user(&service, "hr-1", Role::HrHead, "People").await;
        let request = service.submit(&bu, submission(), "corr").await.expect("submit");

        let error = service
            .transition(
                &request.id,
                &hr,
                WorkflowCommand::Approve { comment: None },
                Some(RequestKind::Replacement),
                "corr",
            )
            .await
            .expect_err("kind mismatch");

        assert!(matches!(
            error,
            ApplicationError::Domain(DomainError::Workflow(WorkflowError::Validation { ref field, .. }))
                if field == "request_type"
        ));
    }

    #[tokio::test]
    async fn resend_replaces_rejected_request_and_audits() {
        let sink = InMemoryAuditSink::default();
        let service = service().with_audit_sink(Arc::new(sink.clone()));
        let bu = user(&service, "bu-1", Role::BuHead, "Payments").await;
        let hr = user(&service, "hr-1", Role::HrHead, "People").await;
        let request = service.submit(&bu, submission(), "corr").await.expect("submit");

        service
            .transition(
                &request.id,
                &hr,
                WorkflowCommand::Reject { reason: Some("budget freeze".to_string()), comment: None },
                None,
                "corr",
            )
            .await
            .expect("reject");
        let report = service
            .transition(&request.id, &bu, WorkflowCommand::Resend { revision: None }, None, "corr")
            .await
            .expect("resend");

        let fresh = report.request.expect("fresh request");
        assert_eq!(report.replaced_id.as_ref(), Some(&request.id));
        assert_eq!(fresh.approval_status, ApprovalStatus::Pending);
        assert!(fresh.bu_head.approved);
        assert!(matches!(
            service.get_request(&request.id).await,
            Err(ApplicationError::Domain(DomainError::NotFound { .. }))
        ));
        let trail: Vec<String> =
            sink.events_for(&request.id).into_iter().map(|event| event.event_type).collect();
        assert_eq!(
            trail,
            [
                "workflow.request_submitted",
                "workflow.transition_applied",
                "workflow.transition_applied",
            ]
        );
    }

    #[tokio::test]
    async fn queues_follow_role_and_business_unit() {
        let service = service();
        let bu = user(&service, "bu-1", Role::BuHead, "Payments").await;
        let other = user(&service, "bu-2", Role::BuHead, "Lending").await;
        let hr = user(&service, "hr-1", Role::HrHead, "People").await;
        let admin = user(&service, "admin-1", Role::Admin, "Ops").await;
        service.submit(&bu, submission(), "corr").await.expect("submit");

        assert_eq!(service.queue(&bu, Queue::Approvals).await.expect("bu queue").len(), 1);
        assert!(service.queue(&other, Queue::Approvals).await.expect("other queue").is_empty());
        assert_eq!(service.queue(&hr, Queue::Approvals).await.expect("hr queue").len(), 1);
        assert!(service.queue(&admin, Queue::Approvals).await.expect("admin queue").is_empty());
    }

    #[tokio::test]
    async fn metrics_are_scoped_for_bu_heads() {
        let service = service();
        let bu = user(&service, "bu-1", Role::BuHead, "Payments").await;
        let hr = user(&service, "hr-1", Role::HrHead, "People").await;
        service.submit(&bu, submission(), "corr").await.expect("submit");

        let own = service.bu_metrics(Some(&bu), "Payments").await.expect("own metrics");
        assert_eq!(own.hiring_ticket_raised, 1);

        let foreign = service.bu_metrics(Some(&bu), "Lending").await.expect_err("foreign unit");
        assert!(matches!(
            foreign,
            ApplicationError::Domain(DomainError::Workflow(WorkflowError::Permission { .. }))
        ));
        assert!(service.bu_metrics(Some(&hr), "Lending").await.is_ok());
    }

    #[tokio::test]
    async fn set_team_cost_requires_a_non_negative_value() {
        let service = service();
        let bu = user(&service, "bu-1", Role::BuHead, "Payments").await;

        let missing = service.set_team_cost(&bu, None).await.expect_err("missing value");
        let negative =
            service.set_team_cost(&bu, Some(Decimal::from(-5))).await.expect_err("negative");
        for error in [missing, negative] {
            assert!(matches!(
                error,
                ApplicationError::Domain(DomainError::Workflow(WorkflowError::Validation { ref field, .. }))
                    if field == "team_cost"
            ));
        }

        let updated = service.set_team_cost(&bu, Some(Decimal::from(50))).await.expect("set");
        assert_eq!(updated.team_cost, Decimal::from(50));
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let service = service();
        user(&service, "bu-1", Role::BuHead, "Payments").await;
        let error = service
            .create_user(NewUser {
                id: None,
                name: "Copy".to_string(),
                email: "bu-1@example.com".to_string(),
                role: Role::HrHead,
                business_unit: String::new(),
                team_cost: None,
            })
            .await
            .expect_err("duplicate");

        assert!(matches!(
            error,
            ApplicationError::Domain(DomainError::Workflow(WorkflowError::Validation { ref field, .. }))
                if field == "email"
        ));
    }
}
