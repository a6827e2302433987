//! Role-scoped work queues.
//!
//! Each queue is a table of `(role, scope, predicate)` rules. A request is
//! visible to an actor when some rule for the actor's role matches the scope
//! and the predicate holds.

use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::domain::request::{
    ApprovalStatus, HiringRequest, JoinStatus, UnknownVariant, WorkflowStatus,
};
use crate::domain::user::{Role, User};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Queue {
    Approvals,
    TentativeDetails,
    FinalDetails,
    JoinConfirmation,
    Candidates,
}

impl Queue {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approvals => "approvals",
            Self::TentativeDetails => "tentative_details",
            Self::FinalDetails => "final_details",
            Self::JoinConfirmation => "join_confirmation",
            Self::Candidates => "candidates",
        }
    }
}

impl FromStr for Queue {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "approvals" => Ok(Self::Approvals),
            "tentative_details" | "tentative" => Ok(Self::TentativeDetails),
            "final_details" | "final" => Ok(Self::FinalDetails),
            "join_confirmation" | "join" => Ok(Self::JoinConfirmation),
            "candidates" => Ok(Self::Candidates),
            _ => Err(UnknownVariant { kind: "queue", value: value.to_string() }),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Scope {
    /// Requests the actor raised.
    Own,
    /// Requests raised in the actor's business unit.
    BusinessUnit,
    All,
}

impl Scope {
    fn admits(self, actor: &User, request: &HiringRequest) -> bool {
        match self {
            Self::Own => request.is_owned_by(&actor.id),
            Self::BusinessUnit => request.business_unit == actor.business_unit,
            Self::All => true,
        }
    }
}

struct VisibilityRule {
    role: Role,
    queue: Queue,
    scope: Scope,
    predicate: fn(&HiringRequest, NaiveDate) -> bool,
}

const RULES: &[VisibilityRule] = &[
    VisibilityRule {
        role: Role::BuHead,
        queue: Queue::Approvals,
        scope: Scope::BusinessUnit,
        predicate: awaiting_decision,
    },
    VisibilityRule {
        role: Role::HrHead,
        queue: Queue::Approvals,
        scope: Scope::All,
        predicate: awaiting_hr,
    },
    VisibilityRule {
        role: Role::Admin,
        queue: Queue::Approvals,
        scope: Scope::All,
        predicate: awaiting_admin,
    },
    VisibilityRule {
        role: Role::BuHead,
        queue: Queue::TentativeDetails,
        scope: Scope::Own,
        predicate: awaiting_tentative,
    },
    VisibilityRule {
        role: Role::HrHead,
        queue: Queue::FinalDetails,
        scope: Scope::All,
        predicate: awaiting_final,
    },
    VisibilityRule {
        role: Role::BuHead,
        queue: Queue::JoinConfirmation,
        scope: Scope::Own,
        predicate: awaiting_join,
    },
    VisibilityRule {
        role: Role::HrHead,
        queue: Queue::JoinConfirmation,
        scope: Scope::All,
        predicate: awaiting_join,
    },
    VisibilityRule { role: Role::BuHead, queue: Queue::Candidates, scope: Scope::Own, predicate: any },
    VisibilityRule { role: Role::HrHead, queue: Queue::Candidates, scope: Scope::All, predicate: any },
    VisibilityRule { role: Role::Admin, queue: Queue::Candidates, scope: Scope::All, predicate: any },
    VisibilityRule {
        role: Role::HrExecutive,
        queue: Queue::Candidates,
        scope: Scope::All,
        predicate: any,
    },
];

fn awaiting_decision(request: &HiringRequest, _today: NaiveDate) -> bool {
    request.approval_status == ApprovalStatus::Pending
}

fn awaiting_hr(request: &HiringRequest, _today: NaiveDate) -> bool {
    request.approval_status == ApprovalStatus::Pending
        && request.bu_head.approved
        && !request.hr_head.approved
}

fn awaiting_admin(request: &HiringRequest, _today: NaiveDate) -> bool {
    request.approval_status == ApprovalStatus::Pending
        && request.hr_head.approved
        && !request.admin.approved
}

fn awaiting_tentative(request: &HiringRequest, _today: NaiveDate) -> bool {
    request.workflow_status == WorkflowStatus::AdminApproved && !request.tentative_entered
}

fn awaiting_final(request: &HiringRequest, _today: NaiveDate) -> bool {
    request.workflow_status == WorkflowStatus::BuTentativeEntered && !request.final_entered
}

/// Final details are in, joining is unconfirmed and the join date has arrived.
fn awaiting_join(request: &HiringRequest, today: NaiveDate) -> bool {
    request.workflow_status == WorkflowStatus::HrFinalEntered
        && request.join_status == JoinStatus::Pending
        && request.exact_join_date().is_some_and(|date| date <= today)
}

fn any(_request: &HiringRequest, _today: NaiveDate) -> bool {
    true
}

pub fn is_visible(queue: Queue, actor: &User, request: &HiringRequest, today: NaiveDate) -> bool {
    RULES.iter().any(|rule| {
        rule.role == actor.role
            && rule.queue == queue
            && rule.scope.admits(actor, request)
            && (rule.predicate)(request, today)
    })
}

/// Filters `requests` down to the given queue, newest first.
pub fn visible<'a, I>(
    queue: Queue,
    actor: &User,
    requests: I,
    today: NaiveDate,
) -> Vec<&'a HiringRequest>
where
    I: IntoIterator<Item = &'a HiringRequest>,
{
    let mut matched: Vec<&HiringRequest> = requests
        .into_iter()
        .filter(|request| is_visible(queue, actor, request, today))
        .collect();
    matched.sort_by(|left, right| right.created_at.cmp(&left.created_at));
    matched
}
