use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::{QueryBuilder, Sqlite, SqliteConnection};

use hireflow_core::domain::request::{
    ApprovalStamp, CandidateProfile, FinalDetails, HiringRequest, RequestDetails, RequestId,
    RequestKind, TentativeDetails,
};
use hireflow_core::domain::skills::Skills;
use hireflow_core::domain::user::UserId;
use hireflow_core::ledger::{BudgetLedger, DebitOutcome};
use hireflow_core::workflow::LedgerDebit;

use super::rows::{
    decimal, flag, format_date, integer, opt_date, opt_decimal, opt_integer, opt_text,
    opt_timestamp, parse_decimal, parsed, text, timestamp,
};
use super::{
    CommitReceipt, HiringRequestRepository, RepositoryError, RequestFilter, TransitionCommit,
};
use crate::DbPool;

const ENTITY: &str = "hiring request";

pub struct SqlHiringRequestRepository {
    pool: DbPool,
}

impl SqlHiringRequestRepository {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

enum Value {
    Text(Option<String>),
    Integer(Option<i64>),
}

fn text_value(value: impl Into<String>) -> Value {
    Value::Text(Some(value.into()))
}

fn flag_value(value: bool) -> Value {
    Value::Integer(Some(i64::from(value)))
}

fn stamp_values(prefix: &'static str, stamp: &ApprovalStamp) -> [(String, Value); 3] {
    [
        (format!("{prefix}_approved"), flag_value(stamp.approved)),
        (
            format!("{prefix}_approved_at"),
            Value::Text(stamp.approved_at.map(|at| at.to_rfc3339())),
        ),
        (format!("{prefix}_comment"), Value::Text(stamp.comment.clone())),
    ]
}

/// Every stored column except `version`, in schema order.
fn columns(request: &HiringRequest) -> Vec<(String, Value)> {
    let (position_title, outgoing_name, outgoing_id, last_working_date, leaving_reason) =
        match &request.details {
            RequestDetails::NewHire { position_title } => {
                (Some(position_title.clone()), None, None, None, None)
            }
            RequestDetails::Replacement {
                outgoing_employee_name,
                outgoing_employee_id,
                last_working_date,
                leaving_reason,
            } => (
                None,
                Some(outgoing_employee_name.clone()),
                outgoing_employee_id.clone(),
                last_working_date.map(format_date),
                leaving_reason.clone(),
            ),
        };
    let candidate = &request.candidate;
    let tentative = request.tentative.as_ref();
    let final_details = request.final_details.as_ref();

    let mut columns: Vec<(String, Value)> = vec![
        ("id".into(), text_value(&request.id.0)),
        ("request_type".into(), text_value(request.kind().as_str())),
        ("hiring_manager_id".into(), text_value(&request.hiring_manager_id.0)),
        ("hiring_manager_name".into(), text_value(&request.hiring_manager_name)),
        ("business_unit".into(), text_value(&request.business_unit)),
        ("position_title".into(), Value::Text(position_title)),
        ("outgoing_employee_name".into(), Value::Text(outgoing_name)),
        ("outgoing_employee_id".into(), Value::Text(outgoing_id)),
        ("last_working_date".into(), Value::Text(last_working_date)),
        ("leaving_reason".into(), Value::Text(leaving_reason)),
        ("candidate_name".into(), text_value(&candidate.name)),
        ("designation".into(), text_value(&candidate.designation)),
        ("experience_years".into(), Value::Integer(candidate.experience_years.map(i64::from))),
        ("skills".into(), text_value(candidate.skills.to_json())),
        ("ctc_offered".into(), text_value(candidate.ctc_offered.to_string())),
        (
            "proposed_joining_date".into(),
            Value::Text(candidate.proposed_joining_date.map(format_date)),
        ),
    ];
    columns.extend(stamp_values("bu_head", &request.bu_head));
    columns.extend(stamp_values("hr_head", &request.hr_head));
    columns.extend(stamp_values("admin", &request.admin));
    columns.extend([
        ("approval_status".into(), text_value(request.approval_status.as_str())),
        ("rejection_reason".into(), Value::Text(request.rejection_reason.clone())),
        ("workflow_status".into(), text_value(request.workflow_status.as_str())),
        (
            "tentative_candidate_name".into(),
            Value::Text(tentative.map(|details| details.candidate_name.clone())),
        ),
        (
            "tentative_join_date".into(),
            Value::Text(tentative.map(|details| format_date(details.join_date))),
        ),
        ("tentative_entered".into(), flag_value(request.tentative_entered)),
        (
            "tentative_entered_at".into(),
            Value::Text(request.tentative_entered_at.map(|at| at.to_rfc3339())),
        ),
        (
            "exact_join_date".into(),
            Value::Text(final_details.map(|details| format_date(details.exact_join_date))),
        ),
        (
            "exact_salary".into(),
            Value::Text(final_details.map(|details| details.exact_salary.to_string())),
        ),
        (
            "employee_id".into(),
            Value::Text(final_details.map(|details| details.employee_id.clone())),
        ),
        ("final_entered".into(), flag_value(request.final_entered)),
        (
            "final_entered_at".into(),
            Value::Text(request.final_entered_at.map(|at| at.to_rfc3339())),
        ),
        ("join_status".into(), text_value(request.join_status.as_str())),
        ("join_confirmed".into(), flag_value(request.join_confirmed)),
        (
            "join_confirmed_at".into(),
            Value::Text(request.join_confirmed_at.map(|at| at.to_rfc3339())),
        ),
        ("join_notes".into(), Value::Text(request.join_notes.clone())),
        ("hired_status".into(), text_value(request.hired_status.as_str())),
        ("hired_at".into(), Value::Text(request.hired_at.map(|at| at.to_rfc3339()))),
        ("created_at".into(), text_value(request.created_at.to_rfc3339())),
        ("updated_at".into(), text_value(request.updated_at.to_rfc3339())),
    ]);
    columns
}

fn stamp(row: &SqliteRow, prefix: &str) -> Result<ApprovalStamp, RepositoryError> {
    Ok(ApprovalStamp {
        approved: flag(row, &format!("{prefix}_approved"))?,
        approved_at: opt_timestamp(row, &format!("{prefix}_approved_at"))?,
        comment: opt_text(row, &format!("{prefix}_comment"))?,
    })
}

fn row_to_request(row: &SqliteRow) -> Result<HiringRequest, RepositoryError> {
    let details = match parsed::<RequestKind>(row, "request_type")? {
        RequestKind::NewHire => RequestDetails::NewHire {
            position_title: opt_text(row, "position_title")?.unwrap_or_default(),
        },
        RequestKind::Replacement => RequestDetails::Replacement {
            outgoing_employee_name: opt_text(row, "outgoing_employee_name")?.unwrap_or_default(),
            outgoing_employee_id: opt_text(row, "outgoing_employee_id")?,
            last_working_date: opt_date(row, "last_working_date")?,
            leaving_reason: opt_text(row, "leaving_reason")?,
        },
    };

    let experience_years = opt_integer(row, "experience_years")?
        .map(|years| {
            u32::try_from(years)
                .map_err(|e| RepositoryError::Decode(format!("experience_years: {e}")))
        })
        .transpose()?;

    let tentative = match (
        opt_text(row, "tentative_candidate_name")?,
        opt_date(row, "tentative_join_date")?,
    ) {
        (Some(candidate_name), Some(join_date)) => {
            Some(TentativeDetails { candidate_name, join_date })
        }
        _ => None,
    };

    let final_details = match (
        opt_date(row, "exact_join_date")?,
        opt_decimal(row, "exact_salary")?,
        opt_text(row, "employee_id")?,
    ) {
        (Some(exact_join_date), Some(exact_salary), Some(employee_id)) => {
            Some(FinalDetails { exact_join_date, exact_salary, employee_id })
        }
        _ => None,
    };

    Ok(HiringRequest {
        id: RequestId(text(row, "id")?),
        version: integer(row, "version")?,
        hiring_manager_id: UserId(text(row, "hiring_manager_id")?),
        hiring_manager_name: text(row, "hiring_manager_name")?,
        business_unit: text(row, "business_unit")?,
        details,
        candidate: CandidateProfile {
            name: text(row, "candidate_name")?,
            designation: text(row, "designation")?,
            experience_years,
            skills: Skills::from_json(&text(row, "skills")?)
                .map_err(|error| RepositoryError::Decode(format!("skills: {error}")))?,
            ctc_offered: decimal(row, "ctc_offered")?,
            proposed_joining_date: opt_date(row, "proposed_joining_date")?,
        },
        bu_head: stamp(row, "bu_head")?,
        hr_head: stamp(row, "hr_head")?,
        admin: stamp(row, "admin")?,
        approval_status: parsed(row, "approval_status")?,
        rejection_reason: opt_text(row, "rejection_reason")?,
        workflow_status: parsed(row, "workflow_status")?,
        tentative,
        tentative_entered: flag(row, "tentative_entered")?,
        tentative_entered_at: opt_timestamp(row, "tentative_entered_at")?,
        final_details,
        final_entered: flag(row, "final_entered")?,
        final_entered_at: opt_timestamp(row, "final_entered_at")?,
        join_status: parsed(row, "join_status")?,
        join_confirmed: flag(row, "join_confirmed")?,
        join_confirmed_at: opt_timestamp(row, "join_confirmed_at")?,
        join_notes: opt_text(row, "join_notes")?,
        hired_status: parsed(row, "hired_status")?,
        hired_at: opt_timestamp(row, "hired_at")?,
        created_at: timestamp(row, "created_at")?,
        updated_at: timestamp(row, "updated_at")?,
    })
}

async fn insert_request(
    conn: &mut SqliteConnection,
    request: &HiringRequest,
) -> Result<(), RepositoryError> {
    let columns = columns(request);
    let mut builder: QueryBuilder<'_, Sqlite> = QueryBuilder::new("INSERT INTO hiring_request (");
    let mut names = builder.separated(", ");
    for (name, _) in &columns {
        names.push(name.as_str());
    }
    names.push("version");
    builder.push(") VALUES (");
    let mut values = builder.separated(", ");
    for (_, value) in columns {
        match value {
            Value::Text(text) => values.push_bind(text),
            Value::Integer(number) => values.push_bind(number),
        };
    }
    values.push_bind(request.version);
    builder.push(")");

    builder
        .build()
        .execute(conn)
        .await
        .map_err(|e| RepositoryError::from_insert(e, ENTITY, "id", &request.id.0))?;
    Ok(())
}

/// Reports a zero-row guarded write as either a missing row or a stale version.
async fn guard_failure(
    conn: &mut SqliteConnection,
    id: &RequestId,
    expected_version: i64,
) -> RepositoryError {
    let exists = sqlx::query("SELECT 1 FROM hiring_request WHERE id = ?")
        .bind(&id.0)
        .fetch_optional(conn)
        .await;
    match exists {
        Ok(Some(_)) => RepositoryError::VersionConflict {
            entity: ENTITY,
            id: id.0.clone(),
            expected: expected_version,
        },
        Ok(None) => RepositoryError::NotFound { entity: ENTITY, id: id.0.clone() },
        Err(error) => RepositoryError::Database(error),
    }
}

async fn delete_guarded(
    conn: &mut SqliteConnection,
    id: &RequestId,
    expected_version: i64,
) -> Result<(), RepositoryError> {
    let result = sqlx::query("DELETE FROM hiring_request WHERE id = ? AND version = ?")
        .bind(&id.0)
        .bind(expected_version)
        .execute(&mut *conn)
        .await?;
    if result.rows_affected() == 0 {
        return Err(guard_failure(conn, id, expected_version).await);
    }
    Ok(())
}

async fn debit_team_budget(
    conn: &mut SqliteConnection,
    debit: &LedgerDebit,
    at: DateTime<Utc>,
) -> Result<DebitOutcome, RepositoryError> {
    let raw: Option<String> = sqlx::query_scalar("SELECT team_cost FROM app_user WHERE id = ?")
        .bind(&debit.manager_id.0)
        .fetch_optional(&mut *conn)
        .await?;
    let raw =
        raw.ok_or_else(|| RepositoryError::NotFound { entity: "user", id: debit.manager_id.0.clone() })?;
    let outcome = BudgetLedger::apply_debit(parse_decimal("team_cost", &raw)?, debit.amount);

    sqlx::query("UPDATE app_user SET team_cost = ?, updated_at = ? WHERE id = ?")
        .bind(outcome.balance.to_string())
        .bind(at.to_rfc3339())
        .bind(&debit.manager_id.0)
        .execute(&mut *conn)
        .await?;

    sqlx::query(
        "INSERT INTO team_budget_debit (request_id, manager_id, hired_value, requested, debited,
                                        balance_after, clamped, created_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?)",
    )
    .bind(&debit.request_id.0)
    .bind(&debit.manager_id.0)
    .bind(debit.hired_value.to_string())
    .bind(outcome.requested.to_string())
    .bind(outcome.debited.to_string())
    .bind(outcome.balance.to_string())
    .bind(outcome.clamped)
    .bind(at.to_rfc3339())
    .execute(&mut *conn)
    .await
    .map_err(|e| RepositoryError::from_insert(e, "budget debit", "request_id", &debit.request_id.0))?;

    Ok(outcome)
}

#[async_trait::async_trait]
impl HiringRequestRepository for SqlHiringRequestRepository {
    async fn create(&self, request: HiringRequest) -> Result<(), RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        insert_request(&mut conn, &request).await
    }

    async fn find_by_id(&self, id: &RequestId) -> Result<Option<HiringRequest>, RepositoryError> {
        let row = sqlx::query("SELECT * FROM hiring_request WHERE id = ?")
            .bind(&id.0)
            .fetch_optional(&self.pool)
            .await?;

        row.as_ref().map(row_to_request).transpose()
    }

    async fn list(&self, filter: &RequestFilter) -> Result<Vec<HiringRequest>, RepositoryError> {
        let mut builder: QueryBuilder<'_, Sqlite> =
            QueryBuilder::new("SELECT * FROM hiring_request WHERE 1=1");
        if let Some(kind) = filter.request_type {
            builder.push(" AND request_type = ").push_bind(kind.as_str());
        }
        if let Some(business_unit) = &filter.business_unit {
            builder.push(" AND business_unit = ").push_bind(business_unit.clone());
        }
        if let Some(manager_id) = &filter.hiring_manager_id {
            builder.push(" AND hiring_manager_id = ").push_bind(manager_id.0.clone());
        }
        if let Some(status) = filter.approval_status {
            builder.push(" AND approval_status = ").push_bind(status.as_str());
        }
        if let Some(status) = filter.workflow_status {
            builder.push(" AND workflow_status = ").push_bind(status.as_str());
        }
        if let Some(status) = filter.join_status {
            builder.push(" AND join_status = ").push_bind(status.as_str());
        }
        builder.push(" ORDER BY created_at DESC, id");

        let rows = builder.build().fetch_all(&self.pool).await?;
        rows.iter().map(row_to_request).collect()
    }

    async fn commit(&self, commit: TransitionCommit) -> Result<CommitReceipt, RepositoryError> {
        let TransitionCommit { request, expected_version, debit, committed_at } = commit;
        let next_version = expected_version + 1;
        let mut tx = self.pool.begin().await?;

        let mut builder: QueryBuilder<'_, Sqlite> = QueryBuilder::new("UPDATE hiring_request SET ");
        let mut assignments = builder.separated(", ");
        for (name, value) in columns(&request) {
            if name == "id" || name == "created_at" {
                continue;
            }
            assignments.push(format!("{name} = "));
            match value {
                Value::Text(text) => assignments.push_bind_unseparated(text),
                Value::Integer(number) => assignments.push_bind_unseparated(number),
            };
        }
        assignments.push("version = ");
        assignments.push_bind_unseparated(next_version);
        builder.push(" WHERE id = ").push_bind(request.id.0.clone());
        builder.push(" AND version = ").push_bind(expected_version);

        let result = builder.build().execute(&mut *tx).await?;
        if result.rows_affected() == 0 {
            let error = guard_failure(&mut tx, &request.id, expected_version).await;
            tx.rollback().await?;
            return Err(error);
        }

        let debit = match debit {
            Some(debit) => Some(debit_team_budget(&mut tx, &debit, committed_at).await?),
            None => None,
        };

        tx.commit().await?;
        Ok(CommitReceipt { version: next_version, debit })
    }

    async fn delete(&self, id: &RequestId, expected_version: i64) -> Result<(), RepositoryError> {
        let mut conn = self.pool.acquire().await?;
        delete_guarded(&mut conn, id, expected_version).await
    }

    async fn replace(
        &self,
        old_id: &RequestId,
        expected_version: i64,
        fresh: HiringRequest,
    ) -> Result<(), RepositoryError> {
        let mut tx = self.pool.begin().await?;
        delete_guarded(&mut tx, old_id, expected_version).await?;
        insert_request(&mut tx, &fresh).await?;
        tx.commit().await?;
        Ok(())
    }
}
