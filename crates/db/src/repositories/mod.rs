use async_trait::async_trait;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use hireflow_core::domain::request::{
    ApprovalStatus, HiringRequest, JoinStatus, RequestId, RequestKind, WorkflowStatus,
};
use hireflow_core::domain::user::{User, UserId};
use hireflow_core::errors::{ApplicationError, DomainError};
use hireflow_core::ledger::DebitOutcome;
use hireflow_core::workflow::LedgerDebit;

pub mod memory;
pub mod request;
mod rows;
pub mod user;

pub use memory::InMemoryStore;
pub use request::SqlHiringRequestRepository;
pub use user::SqlUserRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("decode error: {0}")]
    Decode(String),
    #[error("{entity} `{id}` was not found")]
    NotFound { entity: &'static str, id: String },
    #[error("{entity} `{id}` was modified concurrently (expected version {expected})")]
    VersionConflict { entity: &'static str, id: String, expected: i64 },
    #[error("{entity} with {field} `{value}` already exists")]
    Duplicate { entity: &'static str, field: &'static str, value: String },
}

impl RepositoryError {
    /// Maps unique-constraint failures to `Duplicate`, everything else to `Database`.
    pub(crate) fn from_insert(
        error: sqlx::Error,
        entity: &'static str,
        field: &'static str,
        value: &str,
    ) -> Self {
        match &error {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                Self::Duplicate { entity, field, value: value.to_string() }
            }
            _ => Self::Database(error),
        }
    }
}

impl From<RepositoryError> for ApplicationError {
    fn from(value: RepositoryError) -> Self {
        match value {
            RepositoryError::NotFound { entity, id } => {
                ApplicationError::Domain(DomainError::not_found(entity, id))
            }
            RepositoryError::Duplicate { entity, field, value } => ApplicationError::Domain(
                DomainError::validation(field, format!("{entity} with {field} `{value}` already exists")),
            ),
            error @ RepositoryError::VersionConflict { .. } => {
                ApplicationError::Concurrency(error.to_string())
            }
            error @ (RepositoryError::Database(_) | RepositoryError::Decode(_)) => {
                ApplicationError::Persistence(error.to_string())
            }
        }
    }
}

/// Equality filters for request listings. Unset fields match everything.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RequestFilter {
    pub request_type: Option<RequestKind>,
    pub business_unit: Option<String>,
    pub hiring_manager_id: Option<UserId>,
    pub approval_status: Option<ApprovalStatus>,
    pub workflow_status: Option<WorkflowStatus>,
    pub join_status: Option<JoinStatus>,
}

impl RequestFilter {
    pub fn for_business_unit(business_unit: impl Into<String>) -> Self {
        Self { business_unit: Some(business_unit.into()), ..Self::default() }
    }

    pub fn for_manager(manager_id: UserId) -> Self {
        Self { hiring_manager_id: Some(manager_id), ..Self::default() }
    }

    pub fn matches(&self, request: &HiringRequest) -> bool {
        self.request_type.map_or(true, |kind| request.kind() == kind)
            && self.business_unit.as_ref().map_or(true, |bu| &request.business_unit == bu)
            && self.hiring_manager_id.as_ref().map_or(true, |id| request.is_owned_by(id))
            && self.approval_status.map_or(true, |status| request.approval_status == status)
            && self.workflow_status.map_or(true, |status| request.workflow_status == status)
            && self.join_status.map_or(true, |status| request.join_status == status)
    }
}

/// An updated request to persist if its stored version still equals
/// `expected_version`, together with the budget debit the update triggers.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TransitionCommit {
    pub request: HiringRequest,
    pub expected_version: i64,
    pub debit: Option<LedgerDebit>,
    pub committed_at: DateTime<Utc>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommitReceipt {
    pub version: i64,
    pub debit: Option<DebitOutcome>,
}

#[async_trait]
pub trait HiringRequestRepository: Send + Sync {
    async fn create(&self, request: HiringRequest) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: &RequestId) -> Result<Option<HiringRequest>, RepositoryError>;

    /// Newest first.
    async fn list(&self, filter: &RequestFilter) -> Result<Vec<HiringRequest>, RepositoryError>;

    /// Writes the request and applies its debit atomically.
    async fn commit(&self, commit: TransitionCommit) -> Result<CommitReceipt, RepositoryError>;

    async fn delete(&self, id: &RequestId, expected_version: i64) -> Result<(), RepositoryError>;

    /// Removes `old_id` and inserts `fresh` in one step.
    async fn replace(
        &self,
        old_id: &RequestId,
        expected_version: i64,
        fresh: HiringRequest,
    ) -> Result<(), RepositoryError>;
}

#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn create(&self, user: User) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError>;

    async fn list(&self) -> Result<Vec<User>, RepositoryError>;

    async fn list_by_business_unit(&self, business_unit: &str)
        -> Result<Vec<User>, RepositoryError>;

    async fn set_team_cost(
        &self,
        id: &UserId,
        team_cost: Decimal,
        updated_at: DateTime<Utc>,
    ) -> Result<User, RepositoryError>;
}
