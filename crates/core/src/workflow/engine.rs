use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::audit::{AuditCategory, AuditContext, AuditEvent, AuditOutcome, AuditSink};
use crate::domain::request::{
    ApprovalStamp, ApprovalStatus, FinalDetails, HiredStatus, HiringRequest, JoinStatus,
    RequestDetails, RequestId, Submission, TentativeDetails, WorkflowStatus,
};
use crate::domain::user::{Role, User};
use crate::ledger::BudgetLedger;
use crate::workflow::states::{
    DetailsPatch, LedgerDebit, RecordChange, TransitionOutcome, WorkflowCommand, WorkflowEvent,
};

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum WorkflowError {
    #[error("invalid `{field}`: {message}")]
    Validation { field: String, message: String },
    #[error("{role} is not permitted to {action}: {reason}")]
    Permission { action: &'static str, role: Role, reason: String },
    #[error("cannot {action} while request is {state}: {reason}")]
    StateConflict { action: &'static str, state: String, reason: String },
}

/// Pure transition logic for hiring requests.
///
/// Every check runs in the same order: actor permission, then the request's
/// current state, then the supplied fields. The engine never touches storage;
/// it returns the next record (and any budget debit) for the caller to commit.
#[derive(Clone, Debug, Default)]
pub struct WorkflowEngine {
    ledger: BudgetLedger,
}

impl WorkflowEngine {
    pub fn new(ledger: BudgetLedger) -> Self {
        Self { ledger }
    }

    pub fn ledger(&self) -> &BudgetLedger {
        &self.ledger
    }

    pub fn submit(
        &self,
        id: RequestId,
        actor: &User,
        submission: Submission,
        now: DateTime<Utc>,
    ) -> Result<HiringRequest, WorkflowError> {
        if actor.role != Role::BuHead {
            return Err(forbidden("submit", actor, "only a BU Head may raise hiring requests"));
        }
        if actor.business_unit.trim().is_empty() {
            return Err(invalid("business_unit", "submitting user has no business unit"));
        }
        let submission = validate_submission(submission)?;

        Ok(HiringRequest::raised(
            id,
            actor.id.clone(),
            actor.name.clone(),
            actor.business_unit.clone(),
            submission,
            now,
        ))
    }

    pub fn apply(
        &self,
        request: &HiringRequest,
        actor: &User,
        command: WorkflowCommand,
        now: DateTime<Utc>,
    ) -> Result<TransitionOutcome, WorkflowError> {
        match command {
            WorkflowCommand::Approve { comment } => approve(request, actor, comment, now),
            WorkflowCommand::Reject { reason, comment } => {
                reject(request, actor, reason, comment, now)
            }
            WorkflowCommand::EnterTentative { candidate_name, join_date } => {
                enter_tentative(request, actor, candidate_name, join_date, now)
            }
            WorkflowCommand::EnterFinal { exact_join_date, exact_salary, employee_id } => {
                enter_final(request, actor, exact_join_date, exact_salary, employee_id, now)
            }
            WorkflowCommand::ConfirmJoin { status, notes } => {
                self.confirm_join(request, actor, status, notes, now)
            }
            WorkflowCommand::EditDetails { patch } => edit_details(request, actor, patch, now),
            WorkflowCommand::Delete => delete(request, actor),
            WorkflowCommand::Resend { revision } => resend(request, actor, revision, now),
        }
    }

    pub fn apply_with_audit<S>(
        &self,
        request: &HiringRequest,
        actor: &User,
        command: WorkflowCommand,
        now: DateTime<Utc>,
        sink: &S,
        audit: &AuditContext,
    ) -> Result<TransitionOutcome, WorkflowError>
    where
        S: AuditSink + ?Sized,
    {
        let command_name = command.name();
        let result = self.apply(request, actor, command, now);
        match &result {
            Ok(outcome) => {
                let mut event = AuditEvent::new(
                    audit,
                    "workflow.transition_applied",
                    AuditCategory::Workflow,
                    AuditOutcome::Success,
                )
                .with_metadata("command", command_name)
                .with_metadata("from", outcome.from.as_str())
                .with_metadata("to", outcome.to.as_str())
                .with_metadata("event", outcome.event.as_str())
                .at(now);
                if let Some(debit) = &outcome.debit {
                    event = event.with_metadata("debit", debit.amount.to_string());
                }
                sink.emit(event);
            }
            Err(error) => {
                sink.emit(
                    AuditEvent::new(
                        audit,
                        "workflow.transition_rejected",
                        AuditCategory::Workflow,
                        AuditOutcome::Rejected,
                    )
                    .with_metadata("command", command_name)
                    .with_metadata("state", state_label(request))
                    .with_metadata("error", error.to_string())
                    .at(now),
                );
            }
        }
        result
    }

    fn confirm_join(
        &self,
        request: &HiringRequest,
        actor: &User,
        status: Option<JoinStatus>,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<TransitionOutcome, WorkflowError> {
        const ACTION: &str = "confirm_join";

        let permitted = match actor.role {
            Role::HrHead => true,
            Role::BuHead => request.is_owned_by(&actor.id),
            Role::Admin | Role::HrExecutive => false,
        };
        if !permitted {
            return Err(forbidden(
                ACTION,
                actor,
                "only the owning BU Head or an HR Head may confirm joining",
            ));
        }

        let completed = match request.workflow_status {
            WorkflowStatus::HrFinalEntered if request.final_entered => false,
            WorkflowStatus::Completed => true,
            _ => return Err(conflict(ACTION, request, "final details have not been entered")),
        };

        let status = required("join_status", status)?;
        if status == JoinStatus::Pending {
            return Err(invalid("join_status", "must be `joined` or `not_joined`"));
        }

        if completed {
            return match status {
                JoinStatus::Joined => Ok(TransitionOutcome {
                    from: request.workflow_status,
                    to: request.workflow_status,
                    event: WorkflowEvent::JoinAlreadyConfirmed,
                    change: RecordChange::Unchanged,
                    debit: None,
                }),
                _ => Err(conflict(ACTION, request, "candidate has already joined")),
            };
        }

        let newly_joined = status == JoinStatus::Joined && request.join_status != JoinStatus::Joined;

        let mut next = request.clone();
        next.join_confirmed = true;
        next.join_confirmed_at = Some(now);
        next.join_status = status;
        next.join_notes = optional_text(notes).or_else(|| request.join_notes.clone());
        next.updated_at = now;

        let debit = if newly_joined {
            next.workflow_status = WorkflowStatus::Completed;
            Some(LedgerDebit {
                manager_id: next.hiring_manager_id.clone(),
                request_id: next.id.clone(),
                hired_value: next.hired_value(),
                amount: self.ledger.debit_for(&next),
            })
        } else {
            None
        };

        let mut outcome = updated(request, next, WorkflowEvent::JoinConfirmed);
        outcome.debit = debit;
        Ok(outcome)
    }
}

fn approve(
    request: &HiringRequest,
    actor: &User,
    comment: Option<String>,
    now: DateTime<Utc>,
) -> Result<TransitionOutcome, WorkflowError> {
    const ACTION: &str = "approve";

    match actor.role {
        Role::BuHead => Err(invalid("role", "BU Head approval is automatic upon submission")),
        Role::HrHead => {
            ensure_pending(ACTION, request)?;
            if !request.bu_head.approved {
                return Err(conflict(ACTION, request, "BU Head approval is missing"));
            }
            if request.hr_head.approved {
                return Err(conflict(ACTION, request, "HR Head has already approved"));
            }

            let mut next = request.clone();
            next.hr_head = ApprovalStamp::granted(now, optional_text(comment));
            next.updated_at = now;
            Ok(updated(request, next, WorkflowEvent::HrApproved))
        }
        Role::Admin => {
            ensure_pending(ACTION, request)?;
            if !request.hr_head.approved {
                return Err(conflict(ACTION, request, "HR Head approval is still pending"));
            }
            if request.admin.approved {
                return Err(conflict(ACTION, request, "Admin has already approved"));
            }

            let mut next = request.clone();
            next.admin = ApprovalStamp::granted(now, optional_text(comment));
            next.workflow_status = WorkflowStatus::AdminApproved;
            next.updated_at = now;
            Ok(updated(request, next, WorkflowEvent::AdminApproved))
        }
        Role::HrExecutive => {
            Err(forbidden(ACTION, actor, "only HR Head or Admin may approve requests"))
        }
    }
}

fn reject(
    request: &HiringRequest,
    actor: &User,
    reason: Option<String>,
    comment: Option<String>,
    now: DateTime<Utc>,
) -> Result<TransitionOutcome, WorkflowError> {
    const ACTION: &str = "reject";

    let event = match actor.role {
        Role::HrHead => WorkflowEvent::HrRejected,
        Role::Admin => WorkflowEvent::AdminRejected,
        Role::BuHead | Role::HrExecutive => {
            return Err(forbidden(ACTION, actor, "only HR Head or Admin may reject requests"));
        }
    };
    ensure_pending(ACTION, request)?;
    if request.admin.approved {
        return Err(conflict(ACTION, request, "Admin has already approved"));
    }
    let reason = required_text("rejection_reason", reason)?;

    let mut next = request.clone();
    let comment = optional_text(comment).or_else(|| Some(reason.clone()));
    match event {
        WorkflowEvent::HrRejected => next.hr_head.comment = comment,
        _ => next.admin.comment = comment,
    }
    next.approval_status = ApprovalStatus::Rejected;
    next.rejection_reason = Some(reason);
    next.updated_at = now;
    Ok(updated(request, next, event))
}

fn enter_tentative(
    request: &HiringRequest,
    actor: &User,
    candidate_name: Option<String>,
    join_date: Option<chrono::NaiveDate>,
    now: DateTime<Utc>,
) -> Result<TransitionOutcome, WorkflowError> {
    const ACTION: &str = "enter_tentative";

    if actor.role != Role::BuHead || !request.is_owned_by(&actor.id) {
        return Err(forbidden(ACTION, actor, "only the owning BU Head may enter tentative details"));
    }
    if request.is_rejected() {
        return Err(conflict(ACTION, request, "request has been rejected"));
    }
    match request.workflow_status {
        WorkflowStatus::AdminApproved if request.admin.approved => {}
        WorkflowStatus::Pending | WorkflowStatus::AdminApproved => {
            return Err(conflict(ACTION, request, "Admin approval is still pending"));
        }
        _ => return Err(conflict(ACTION, request, "tentative details were already entered")),
    }

    let candidate_name = required_text("tentative_candidate_name", candidate_name)?;
    let join_date = required("tentative_join_date", join_date)?;

    let mut next = request.clone();
    next.tentative = Some(TentativeDetails { candidate_name, join_date });
    next.tentative_entered = true;
    next.tentative_entered_at = Some(now);
    next.workflow_status = WorkflowStatus::BuTentativeEntered;
    next.updated_at = now;
    Ok(updated(request, next, WorkflowEvent::TentativeEntered))
}

fn enter_final(
    request: &HiringRequest,
    actor: &User,
    exact_join_date: Option<chrono::NaiveDate>,
    exact_salary: Option<Decimal>,
    employee_id: Option<String>,
    now: DateTime<Utc>,
) -> Result<TransitionOutcome, WorkflowError> {
    const ACTION: &str = "enter_final";

    if actor.role != Role::HrHead {
        return Err(forbidden(ACTION, actor, "only an HR Head may enter final details"));
    }
    if request.is_rejected() {
        return Err(conflict(ACTION, request, "request has been rejected"));
    }
    match request.workflow_status {
        WorkflowStatus::BuTentativeEntered if request.tentative_entered => {}
        WorkflowStatus::Pending | WorkflowStatus::AdminApproved
        | WorkflowStatus::BuTentativeEntered => {
            return Err(conflict(ACTION, request, "tentative details have not been entered"));
        }
        _ => return Err(conflict(ACTION, request, "final details were already entered")),
    }

    let exact_join_date = required("exact_join_date", exact_join_date)?;
    let exact_salary = required("exact_salary", exact_salary)?;
    if exact_salary <= Decimal::ZERO {
        return Err(invalid("exact_salary", "must be greater than zero"));
    }
    let employee_id = required_text("employee_id", employee_id)?;

    let mut next = request.clone();
    next.final_details = Some(FinalDetails { exact_join_date, exact_salary, employee_id });
    next.final_entered = true;
    next.final_entered_at = Some(now);
    next.workflow_status = WorkflowStatus::HrFinalEntered;
    next.hired_status = HiredStatus::Hired;
    next.hired_at = Some(now);
    next.approval_status = ApprovalStatus::Approved;
    next.updated_at = now;
    Ok(updated(request, next, WorkflowEvent::FinalEntered))
}

fn edit_details(
    request: &HiringRequest,
    actor: &User,
    patch: DetailsPatch,
    now: DateTime<Utc>,
) -> Result<TransitionOutcome, WorkflowError> {
    const ACTION: &str = "edit_details";

    if !matches!(actor.role, Role::HrHead | Role::Admin) {
        return Err(forbidden(ACTION, actor, "only HR Head or Admin may edit candidate data"));
    }
    if patch.is_empty() {
        return Err(invalid("details", "no editable fields were supplied"));
    }

    let mut next = request.clone();
    if let Some(name) = patch.candidate_name {
        next.candidate.name = name.trim().to_string();
    }
    if let Some(designation) = patch.designation {
        next.candidate.designation = required_text("designation", Some(designation))?;
    }
    if let Some(title) = patch.position_title {
        let title = required_text("position_title", Some(title))?;
        match &mut next.details {
            RequestDetails::NewHire { position_title } => *position_title = title,
            RequestDetails::Replacement { .. } => {
                return Err(invalid("position_title", "only applies to new hire requests"));
            }
        }
    }
    if let Some(years) = patch.experience_years {
        next.candidate.experience_years = Some(years);
    }
    if let Some(skills) = patch.skills {
        next.candidate.skills = skills;
    }
    if let Some(ctc) = patch.ctc_offered {
        if ctc < Decimal::ZERO {
            return Err(invalid("ctc_offered", "must not be negative"));
        }
        next.candidate.ctc_offered = ctc;
    }
    if let Some(date) = patch.proposed_joining_date {
        next.candidate.proposed_joining_date = Some(date);
    }
    next.updated_at = now;
    Ok(updated(request, next, WorkflowEvent::DetailsEdited))
}

fn delete(request: &HiringRequest, actor: &User) -> Result<TransitionOutcome, WorkflowError> {
    const ACTION: &str = "delete";

    ensure_owner_of_rejected(ACTION, request, actor)?;
    Ok(TransitionOutcome {
        from: request.workflow_status,
        to: request.workflow_status,
        event: WorkflowEvent::Deleted,
        change: RecordChange::Deleted,
        debit: None,
    })
}

fn resend(
    request: &HiringRequest,
    actor: &User,
    revision: Option<Submission>,
    now: DateTime<Utc>,
) -> Result<TransitionOutcome, WorkflowError> {
    const ACTION: &str = "resend";

    ensure_owner_of_rejected(ACTION, request, actor)?;
    let submission = validate_submission(revision.unwrap_or_else(|| request.submission()))?;
    let fresh = HiringRequest::raised(
        RequestId::generate(),
        request.hiring_manager_id.clone(),
        request.hiring_manager_name.clone(),
        request.business_unit.clone(),
        submission,
        now,
    );

    Ok(TransitionOutcome {
        from: request.workflow_status,
        to: fresh.workflow_status,
        event: WorkflowEvent::Resent,
        change: RecordChange::Replaced(Box::new(fresh)),
        debit: None,
    })
}

fn ensure_owner_of_rejected(
    action: &'static str,
    request: &HiringRequest,
    actor: &User,
) -> Result<(), WorkflowError> {
    if !request.is_owned_by(&actor.id) {
        return Err(forbidden(action, actor, "only the owning manager may do this"));
    }
    if !request.is_rejected() {
        return Err(conflict(action, request, "only rejected requests can be deleted or resent"));
    }
    Ok(())
}

fn ensure_pending(action: &'static str, request: &HiringRequest) -> Result<(), WorkflowError> {
    match request.approval_status {
        ApprovalStatus::Pending => Ok(()),
        ApprovalStatus::Rejected => Err(conflict(action, request, "request has been rejected")),
        ApprovalStatus::Approved => {
            Err(conflict(action, request, "request has completed its approval chain"))
        }
    }
}

fn validate_submission(submission: Submission) -> Result<Submission, WorkflowError> {
    let Submission { details, mut candidate } = submission;

    candidate.name = candidate.name.trim().to_string();
    candidate.designation = required_text("designation", Some(candidate.designation))?;
    if candidate.ctc_offered < Decimal::ZERO {
        return Err(invalid("ctc_offered", "must not be negative"));
    }

    let details = match details {
        RequestDetails::NewHire { position_title } => RequestDetails::NewHire {
            position_title: required_text("position_title", Some(position_title))?,
        },
        RequestDetails::Replacement {
            outgoing_employee_name,
            outgoing_employee_id,
            last_working_date,
            leaving_reason,
        } => RequestDetails::Replacement {
            outgoing_employee_name: required_text(
                "outgoing_employee_name",
                Some(outgoing_employee_name),
            )?,
            outgoing_employee_id: optional_text(outgoing_employee_id),
            last_working_date,
            leaving_reason: optional_text(leaving_reason),
        },
    };

    Ok(Submission { details, candidate })
}

fn updated(
    current: &HiringRequest,
    next: HiringRequest,
    event: WorkflowEvent,
) -> TransitionOutcome {
    TransitionOutcome {
        from: current.workflow_status,
        to: next.workflow_status,
        event,
        change: RecordChange::Updated(Box::new(next)),
        debit: None,
    }
}

fn state_label(request: &HiringRequest) -> String {
    if request.is_rejected() {
        "rejected".to_string()
    } else {
        request.workflow_status.as_str().to_string()
    }
}

fn forbidden(action: &'static str, actor: &User, reason: &str) -> WorkflowError {
    WorkflowError::Permission { action, role: actor.role, reason: reason.to_string() }
}

fn conflict(action: &'static str, request: &HiringRequest, reason: &str) -> WorkflowError {
    WorkflowError::StateConflict { action, state: state_label(request), reason: reason.to_string() }
}

fn invalid(field: &str, message: &str) -> WorkflowError {
    WorkflowError::Validation { field: field.to_string(), message: message.to_string() }
}

fn required<T>(field: &str, value: Option<T>) -> Result<T, WorkflowError> {
    value.ok_or_else(|| invalid(field, "is required"))
}

fn required_text(field: &str, value: Option<String>) -> Result<String, WorkflowError> {
    optional_text(value).ok_or_else(|| invalid(field, "is required"))
}

fn optional_text(value: Option<String>) -> Option<String> {
    value.map(|text| text.trim().to_string()).filter(|text| !text.is_empty())
}
