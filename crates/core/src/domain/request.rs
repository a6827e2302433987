use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::skills::Skills;
use crate::domain::user::UserId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RequestId(pub String);

impl RequestId {
    pub fn generate() -> Self {
        Self(format!("HR-{}", Uuid::new_v4().simple()))
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Error)]
#[error("unknown {kind} value `{value}`")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

impl UnknownVariant {
    fn new(kind: &'static str, value: &str) -> Self {
        Self { kind, value: value.to_string() }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestKind {
    NewHire,
    Replacement,
}

impl RequestKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NewHire => "new_hire",
            Self::Replacement => "replacement",
        }
    }
}

impl FromStr for RequestKind {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "new_hire" | "newhire" => Ok(Self::NewHire),
            "replacement" => Ok(Self::Replacement),
            _ => Err(UnknownVariant::new("request_type", value)),
        }
    }
}

/// Kind-specific payload. Both kinds share one lifecycle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "request_type", rename_all = "snake_case")]
pub enum RequestDetails {
    NewHire {
        position_title: String,
    },
    Replacement {
        outgoing_employee_name: String,
        #[serde(default)]
        outgoing_employee_id: Option<String>,
        #[serde(default)]
        last_working_date: Option<NaiveDate>,
        #[serde(default)]
        leaving_reason: Option<String>,
    },
}

impl RequestDetails {
    pub fn kind(&self) -> RequestKind {
        match self {
            Self::NewHire { .. } => RequestKind::NewHire,
            Self::Replacement { .. } => RequestKind::Replacement,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateProfile {
    #[serde(default)]
    pub name: String,
    pub designation: String,
    #[serde(default)]
    pub experience_years: Option<u32>,
    #[serde(default)]
    pub skills: Skills,
    pub ctc_offered: Decimal,
    #[serde(default)]
    pub proposed_joining_date: Option<NaiveDate>,
}

/// What a BU Head sends when raising (or re-raising) a request.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Submission {
    pub details: RequestDetails,
    pub candidate: CandidateProfile,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalStamp {
    pub approved: bool,
    pub approved_at: Option<DateTime<Utc>>,
    pub comment: Option<String>,
}

impl ApprovalStamp {
    pub fn granted(at: DateTime<Utc>, comment: Option<String>) -> Self {
        Self { approved: true, approved_at: Some(at), comment }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalStatus {
    Pending,
    Approved,
    Rejected,
}

impl ApprovalStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl FromStr for ApprovalStatus {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(UnknownVariant::new("approval_status", value)),
        }
    }
}

/// Fulfillment stage. Declaration order is progression order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkflowStatus {
    Pending,
    AdminApproved,
    BuTentativeEntered,
    HrFinalEntered,
    Completed,
}

impl WorkflowStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::AdminApproved => "admin_approved",
            Self::BuTentativeEntered => "bu_tentative_entered",
            Self::HrFinalEntered => "hr_final_entered",
            Self::Completed => "completed",
        }
    }
}

impl FromStr for WorkflowStatus {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "admin_approved" => Ok(Self::AdminApproved),
            "bu_tentative_entered" => Ok(Self::BuTentativeEntered),
            "hr_final_entered" => Ok(Self::HrFinalEntered),
            "completed" => Ok(Self::Completed),
            _ => Err(UnknownVariant::new("workflow_status", value)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JoinStatus {
    #[serde(alias = "Pending")]
    Pending,
    #[serde(alias = "Joined")]
    Joined,
    #[serde(alias = "Not_Joined")]
    NotJoined,
}

impl JoinStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Joined => "joined",
            Self::NotJoined => "not_joined",
        }
    }
}

impl FromStr for JoinStatus {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Ok(Self::Pending),
            "joined" => Ok(Self::Joined),
            "not_joined" => Ok(Self::NotJoined),
            _ => Err(UnknownVariant::new("join_status", value)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HiredStatus {
    NotHired,
    Hired,
}

impl HiredStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotHired => "not_hired",
            Self::Hired => "hired",
        }
    }
}

impl FromStr for HiredStatus {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "not_hired" => Ok(Self::NotHired),
            "hired" => Ok(Self::Hired),
            _ => Err(UnknownVariant::new("hired_status", value)),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TentativeDetails {
    pub candidate_name: String,
    pub join_date: NaiveDate,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FinalDetails {
    pub exact_join_date: NaiveDate,
    pub exact_salary: Decimal,
    pub employee_id: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HiringRequest {
    pub id: RequestId,
    pub version: i64,
    pub hiring_manager_id: UserId,
    pub hiring_manager_name: String,
    pub business_unit: String,
    pub details: RequestDetails,
    pub candidate: CandidateProfile,

    pub bu_head: ApprovalStamp,
    pub hr_head: ApprovalStamp,
    pub admin: ApprovalStamp,
    pub approval_status: ApprovalStatus,
    pub rejection_reason: Option<String>,

    pub workflow_status: WorkflowStatus,
    pub tentative: Option<TentativeDetails>,
    pub tentative_entered: bool,
    pub tentative_entered_at: Option<DateTime<Utc>>,
    pub final_details: Option<FinalDetails>,
    pub final_entered: bool,
    pub final_entered_at: Option<DateTime<Utc>>,

    pub join_status: JoinStatus,
    pub join_confirmed: bool,
    pub join_confirmed_at: Option<DateTime<Utc>>,
    pub join_notes: Option<String>,

    pub hired_status: HiredStatus,
    pub hired_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl HiringRequest {
    /// A freshly raised request: BU Head approval is implied by submission.
    pub fn raised(
        id: RequestId,
        manager_id: UserId,
        manager_name: impl Into<String>,
        business_unit: impl Into<String>,
        submission: Submission,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            version: 1,
            hiring_manager_id: manager_id,
            hiring_manager_name: manager_name.into(),
            business_unit: business_unit.into(),
            details: submission.details,
            candidate: submission.candidate,
            bu_head: ApprovalStamp::granted(now, None),
            hr_head: ApprovalStamp::default(),
            admin: ApprovalStamp::default(),
            approval_status: ApprovalStatus::Pending,
            rejection_reason: None,
            workflow_status: WorkflowStatus::Pending,
            tentative: None,
            tentative_entered: false,
            tentative_entered_at: None,
            final_details: None,
            final_entered: false,
            final_entered_at: None,
            join_status: JoinStatus::Pending,
            join_confirmed: false,
            join_confirmed_at: None,
            join_notes: None,
            hired_status: HiredStatus::NotHired,
            hired_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn kind(&self) -> RequestKind {
        self.details.kind()
    }

    pub fn is_rejected(&self) -> bool {
        self.approval_status == ApprovalStatus::Rejected
    }

    pub fn is_owned_by(&self, user_id: &UserId) -> bool {
        &self.hiring_manager_id == user_id
    }

    /// Title shown in lists: position title for new hires, designation otherwise.
    pub fn headline(&self) -> &str {
        match &self.details {
            RequestDetails::NewHire { position_title } if !position_title.is_empty() => {
                position_title
            }
            _ => &self.candidate.designation,
        }
    }

    /// Best-known candidate name, preferring the one entered at the tentative stage.
    pub fn candidate_name(&self) -> &str {
        self.tentative
            .as_ref()
            .map(|tentative| tentative.candidate_name.as_str())
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.candidate.name)
    }

    /// Compensation the team budget is charged against: exact salary when one
    /// was recorded, otherwise the offered CTC.
    pub fn hired_value(&self) -> Decimal {
        match &self.final_details {
            Some(details) if details.exact_salary > Decimal::ZERO => details.exact_salary,
            _ => self.candidate.ctc_offered.max(Decimal::ZERO),
        }
    }

    pub fn exact_join_date(&self) -> Option<NaiveDate> {
        self.final_details.as_ref().map(|details| details.exact_join_date)
    }

    pub fn submission(&self) -> Submission {
        Submission { details: self.details.clone(), candidate: self.candidate.clone() }
    }
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;

    use super::{
        ApprovalStatus, CandidateProfile, FinalDetails, HiringRequest, JoinStatus, RequestDetails,
        RequestId, RequestKind, Submission, WorkflowStatus,
    };
    use crate::domain::skills::Skills;
    use crate::domain::user::UserId;

    fn submission() -> Submission {
        Submission {
            details: RequestDetails::NewHire { position_title: "Data Engineer".to_string() },
            candidate: CandidateProfile {
                name: "Priya".to_string(),
                designation: "Engineer II".to_string(),
                experience_years: Some(4),
                skills: Skills::parse("rust, sql"),
                ctc_offered: Decimal::from(1_000_000),
                proposed_joining_date: None,
            },
        }
    }

    #[test]
    fn raised_request_starts_pending_with_bu_head_approval() {
        let request = HiringRequest::raised(
            RequestId::generate(),
            UserId("bu-1".to_string()),
            "Asha",
            "Payments",
            submission(),
            Utc::now(),
        );

        assert!(request.bu_head.approved);
        assert!(!request.hr_head.approved);
        assert_eq!(request.approval_status, ApprovalStatus::Pending);
        assert_eq!(request.workflow_status, WorkflowStatus::Pending);
        assert_eq!(request.join_status, JoinStatus::Pending);
        assert_eq!(request.kind(), RequestKind::NewHire);
        assert!(request.id.0.starts_with("HR-"));
    }

    #[test]
    fn hired_value_prefers_positive_exact_salary() {
        let mut request = HiringRequest::raised(
            RequestId::generate(),
            UserId("bu-1".to_string()),
            "Asha",
            "Payments",
            submission(),
            Utc::now(),
        );
        assert_eq!(request.hired_value(), Decimal::from(1_000_000));

        request.final_details = Some(FinalDetails {
            exact_join_date: NaiveDate::from_ymd_opt(2025, 2, 1).expect("date"),
            exact_salary: Decimal::ZERO,
            employee_id: "E1".to_string(),
        });
        assert_eq!(request.hired_value(), Decimal::from(1_000_000));

        if let Some(details) = request.final_details.as_mut() {
            details.exact_salary = Decimal::from(1_200_000);
        }
        assert_eq!(request.hired_value(), Decimal::from(1_200_000));
    }

    #[test]
    fn workflow_status_order_follows_progression() {
        assert!(WorkflowStatus::Pending < WorkflowStatus::AdminApproved);
        assert!(WorkflowStatus::AdminApproved < WorkflowStatus::BuTentativeEntered);
        assert!(WorkflowStatus::BuTentativeEntered < WorkflowStatus::HrFinalEntered);
        assert!(WorkflowStatus::HrFinalEntered < WorkflowStatus::Completed);
    }

    #[test]
    fn request_type_tag_selects_kind() {
        let details: RequestDetails = serde_json::from_str(
            r#"{"request_type":"replacement","outgoing_employee_name":"Ravi"}"#,
        )
        .expect("replacement details");
        assert_eq!(details.kind(), RequestKind::Replacement);
        assert_eq!("New-Hire".parse::<RequestKind>(), Ok(RequestKind::NewHire));
    }
}
