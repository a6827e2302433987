pub mod audit;
pub mod config;
pub mod domain;
pub mod errors;
pub mod ledger;
pub mod metrics;
pub mod notifications;
pub mod workflow;

pub use audit::{AuditContext, AuditEvent, AuditSink, InMemoryAuditSink, NoopAuditSink};
pub use config::{AppConfig, ConfigError, ConfigOverrides, LoadOptions, LogFormat};
pub use domain::request::{
    ApprovalStatus, HiringRequest, JoinStatus, RequestId, RequestKind, Submission,
    WorkflowStatus,
};
pub use domain::user::{Role, User, UserId};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use ledger::{BudgetBreakdown, BudgetLedger, BusinessUnitCost, DebitOutcome};
pub use metrics::{AdminList, BuMetrics, BusinessUnitStats, CandidateCategory, PipelineStage};
pub use notifications::{FeedItem, NotificationFeed};
pub use workflow::{
    Queue, RecordChange, TransitionOutcome, WorkflowCommand, WorkflowEngine, WorkflowError,
};
