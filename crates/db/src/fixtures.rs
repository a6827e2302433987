//! Demo data: one user per role and one request parked at each pipeline stage.

use chrono::{Duration, Utc};
use rust_decimal::Decimal;
use serde::Serialize;

use hireflow_core::domain::request::{
    CandidateProfile, JoinStatus, RequestDetails, RequestId, Submission,
};
use hireflow_core::domain::skills::Skills;
use hireflow_core::domain::user::{Role, UserId};
use hireflow_core::errors::{ApplicationError, DomainError};
use hireflow_core::workflow::WorkflowCommand;

use crate::service::{HiringService, NewUser};

const CORRELATION_ID: &str = "seed";

pub const DEMO_BU_HEAD: &str = "USR-demo-bu-payments";
pub const DEMO_SECOND_BU_HEAD: &str = "USR-demo-bu-lending";
pub const DEMO_HR_HEAD: &str = "USR-demo-hr-head";
pub const DEMO_HR_EXECUTIVE: &str = "USR-demo-hr-exec";
pub const DEMO_ADMIN: &str = "USR-demo-admin";

const DEMO_USERS: &[(&str, &str, Role, &str, i64)] = &[
    (DEMO_BU_HEAD, "Asha Rao", Role::BuHead, "Payments", 5_000_000),
    (DEMO_SECOND_BU_HEAD, "Vikram Shah", Role::BuHead, "Lending", 3_000_000),
    (DEMO_HR_HEAD, "Meera Iyer", Role::HrHead, "People", 0),
    (DEMO_HR_EXECUTIVE, "Rohan Das", Role::HrExecutive, "People", 0),
    (DEMO_ADMIN, "Farah Khan", Role::Admin, "Operations", 0),
];

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Stage {
    Raised,
    HrApproved,
    AdminApproved,
    Tentative,
    Final,
    Joined,
    Rejected,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct SeedSummary {
    pub users: usize,
    pub requests: usize,
    /// True when demo users already existed and nothing was written.
    pub skipped: bool,
}

/// Seeds the demo data set once; later runs are no-ops.
pub async fn seed_demo(service: &HiringService) -> Result<SeedSummary, ApplicationError> {
    match service.get_user(&UserId(DEMO_BU_HEAD.to_string())).await {
        Ok(_) => return Ok(SeedSummary { skipped: true, ..SeedSummary::default() }),
        Err(ApplicationError::Domain(DomainError::NotFound { .. })) => {}
        Err(error) => return Err(error),
    }

    for (id, name, role, business_unit, team_cost) in DEMO_USERS {
        service
            .create_user(NewUser {
                id: Some((*id).to_string()),
                name: (*name).to_string(),
                email: format!("{}@hireflow.example", id.to_ascii_lowercase()),
                role: *role,
                business_unit: (*business_unit).to_string(),
                team_cost: Some(Decimal::from(*team_cost)),
            })
            .await?;
    }

    let plan: &[(&str, &str, Stage)] = &[
        (DEMO_BU_HEAD, "Platform Engineer", Stage::Raised),
        (DEMO_BU_HEAD, "Data Analyst", Stage::HrApproved),
        (DEMO_BU_HEAD, "QA Engineer", Stage::AdminApproved),
        (DEMO_BU_HEAD, "Product Designer", Stage::Tentative),
        (DEMO_BU_HEAD, "Site Reliability Engineer", Stage::Final),
        (DEMO_BU_HEAD, "Backend Engineer", Stage::Joined),
        (DEMO_SECOND_BU_HEAD, "Credit Analyst", Stage::Rejected),
    ];

    let mut requests = 0;
    for (index, (owner, title, stage)) in plan.iter().enumerate() {
        let ctc = Decimal::from(800_000 + 100_000 * index as i64);
        let details = RequestDetails::NewHire { position_title: (*title).to_string() };
        advance(service, owner, submission(details, title, ctc), *stage).await?;
        requests += 1;
    }

    let replacement = RequestDetails::Replacement {
        outgoing_employee_name: "Nikhil Menon".to_string(),
        outgoing_employee_id: Some("EMP-0042".to_string()),
        last_working_date: Some((Utc::now() - Duration::days(14)).date_naive()),
        leaving_reason: Some("relocation".to_string()),
    };
    advance(
        service,
        DEMO_SECOND_BU_HEAD,
        submission(replacement, "Loan Officer", Decimal::from(900_000)),
        Stage::Raised,
    )
    .await?;
    requests += 1;

    Ok(SeedSummary { users: DEMO_USERS.len(), requests, skipped: false })
}

fn submission(details: RequestDetails, designation: &str, ctc: Decimal) -> Submission {
    Submission {
        details,
        candidate: CandidateProfile {
            name: format!("{designation} candidate"),
            designation: designation.to_string(),
            experience_years: Some(5),
            skills: Skills::parse("communication, ownership"),
            ctc_offered: ctc,
            proposed_joining_date: None,
        },
    }
}

async fn advance(
    service: &HiringService,
    owner: &str,
    submission: Submission,
    stage: Stage,
) -> Result<RequestId, ApplicationError> {
    let owner = UserId(owner.to_string());
    let hr = UserId(DEMO_HR_HEAD.to_string());
    let admin = UserId(DEMO_ADMIN.to_string());
    let candidate = submission.candidate.name.clone();
    let id = service.submit(&owner, submission, CORRELATION_ID).await?.id;

    if stage == Stage::Raised {
        return Ok(id);
    }
    if stage == Stage::Rejected {
        let reject = WorkflowCommand::Reject {
            reason: Some("headcount freeze".to_string()),
            comment: None,
        };
        service.transition(&id, &hr, reject, None, CORRELATION_ID).await?;
        return Ok(id);
    }

    let approve = WorkflowCommand::Approve { comment: Some("seeded".to_string()) };
    service.transition(&id, &hr, approve.clone(), None, CORRELATION_ID).await?;
    if stage == Stage::HrApproved {
        return Ok(id);
    }
    service.transition(&id, &admin, approve, None, CORRELATION_ID).await?;
    if stage == Stage::AdminApproved {
        return Ok(id);
    }

    let join_date = (Utc::now() - Duration::days(7)).date_naive();
    let tentative =
        WorkflowCommand::EnterTentative { candidate_name: Some(candidate), join_date: Some(join_date) };
    service.transition(&id, &owner, tentative, None, CORRELATION_ID).await?;
    if stage == Stage::Tentative {
        return Ok(id);
    }

    let employee_id = format!("EMP-{}", &id.0[id.0.len().saturating_sub(6)..]);
    let final_details = WorkflowCommand::EnterFinal {
        exact_join_date: Some(join_date),
        exact_salary: Some(Decimal::from(1_200_000)),
        employee_id: Some(employee_id),
    };
    service.transition(&id, &hr, final_details, None, CORRELATION_ID).await?;
    if stage == Stage::Final {
        return Ok(id);
    }

    let join = WorkflowCommand::ConfirmJoin {
        status: Some(JoinStatus::Joined),
        notes: Some("joined on schedule".to_string()),
    };
    service.transition(&id, &owner, join, None, CORRELATION_ID).await?;
    Ok(id)
}
