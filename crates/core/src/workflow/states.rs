use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::request::{HiringRequest, JoinStatus, RequestId, Submission, WorkflowStatus};
use crate::domain::skills::Skills;
use crate::domain::user::UserId;

/// A transition request against an existing hiring request. Fields are optional
/// so that missing input surfaces as a field-level validation error.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "snake_case")]
pub enum WorkflowCommand {
    Approve {
        comment: Option<String>,
    },
    Reject {
        reason: Option<String>,
        comment: Option<String>,
    },
    EnterTentative {
        candidate_name: Option<String>,
        join_date: Option<NaiveDate>,
    },
    EnterFinal {
        exact_join_date: Option<NaiveDate>,
        exact_salary: Option<Decimal>,
        employee_id: Option<String>,
    },
    ConfirmJoin {
        status: Option<JoinStatus>,
        notes: Option<String>,
    },
    EditDetails {
        patch: DetailsPatch,
    },
    Delete,
    Resend {
        revision: Option<Submission>,
    },
}

impl WorkflowCommand {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Approve { .. } => "approve",
            Self::Reject { .. } => "reject",
            Self::EnterTentative { .. } => "enter_tentative",
            Self::EnterFinal { .. } => "enter_final",
            Self::ConfirmJoin { .. } => "confirm_join",
            Self::EditDetails { .. } => "edit_details",
            Self::Delete => "delete",
            Self::Resend { .. } => "resend",
        }
    }
}

/// Descriptive fields HR Head or Admin may correct after submission.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetailsPatch {
    #[serde(default)]
    pub candidate_name: Option<String>,
    #[serde(default)]
    pub designation: Option<String>,
    #[serde(default)]
    pub position_title: Option<String>,
    #[serde(default)]
    pub experience_years: Option<u32>,
    #[serde(default)]
    pub skills: Option<Skills>,
    #[serde(default)]
    pub ctc_offered: Option<Decimal>,
    #[serde(default)]
    pub proposed_joining_date: Option<NaiveDate>,
}

impl DetailsPatch {
    pub fn is_empty(&self) -> bool {
        self.candidate_name.is_none()
            && self.designation.is_none()
            && self.position_title.is_none()
            && self.experience_years.is_none()
            && self.skills.is_none()
            && self.ctc_offered.is_none()
            && self.proposed_joining_date.is_none()
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowEvent {
    Submitted,
    HrApproved,
    AdminApproved,
    HrRejected,
    AdminRejected,
    TentativeEntered,
    FinalEntered,
    JoinConfirmed,
    JoinAlreadyConfirmed,
    DetailsEdited,
    Deleted,
    Resent,
}

impl WorkflowEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Submitted => "submitted",
            Self::HrApproved => "hr_approved",
            Self::AdminApproved => "admin_approved",
            Self::HrRejected => "hr_rejected",
            Self::AdminRejected => "admin_rejected",
            Self::TentativeEntered => "tentative_entered",
            Self::FinalEntered => "final_entered",
            Self::JoinConfirmed => "join_confirmed",
            Self::JoinAlreadyConfirmed => "join_already_confirmed",
            Self::DetailsEdited => "details_edited",
            Self::Deleted => "deleted",
            Self::Resent => "resent",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "change", content = "request", rename_all = "snake_case")]
pub enum RecordChange {
    Updated(Box<HiringRequest>),
    Unchanged,
    Deleted,
    Replaced(Box<HiringRequest>),
}

/// Budget charge produced by the first transition into Joined.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerDebit {
    pub manager_id: UserId,
    pub request_id: RequestId,
    pub hired_value: Decimal,
    pub amount: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TransitionOutcome {
    pub from: WorkflowStatus,
    pub to: WorkflowStatus,
    pub event: WorkflowEvent,
    pub change: RecordChange,
    pub debit: Option<LedgerDebit>,
}

impl TransitionOutcome {
    pub fn updated_request(&self) -> Option<&HiringRequest> {
        match &self.change {
            RecordChange::Updated(request) | RecordChange::Replaced(request) => Some(request),
            RecordChange::Unchanged | RecordChange::Deleted => None,
        }
    }
}
