//! Business-unit pipeline metrics.
//!
//! Nothing here is stored. Every read classifies each request into exactly one
//! [`PipelineStage`] and counts stages, so counters always add up to a
//! partition of the unit's live requests.

use std::collections::BTreeMap;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::request::{
    ApprovalStatus, HiringRequest, JoinStatus, RequestKind, UnknownVariant,
};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStage {
    Rejected,
    HiringTicketRaised,
    ApprovedYetToHire,
    SelectedYetToOffer,
    OfferedYetToJoin,
    /// Offer made but the join date is still in the future.
    OfferedAwaitingJoinDate,
    ExistingTeam,
    NotJoined,
    ToBeRationalized,
}

impl PipelineStage {
    pub fn classify(request: &HiringRequest, today: NaiveDate) -> Self {
        if request.approval_status == ApprovalStatus::Rejected {
            return Self::Rejected;
        }
        if request.join_confirmed && request.join_status == JoinStatus::Joined {
            return Self::ExistingTeam;
        }
        if request.kind() == RequestKind::Replacement && !request.join_confirmed {
            return Self::ToBeRationalized;
        }
        if request.join_status == JoinStatus::NotJoined {
            return Self::NotJoined;
        }
        if !request.admin.approved {
            return Self::HiringTicketRaised;
        }
        if !request.tentative_entered {
            return Self::ApprovedYetToHire;
        }
        if !request.final_entered {
            return Self::SelectedYetToOffer;
        }
        match request.exact_join_date() {
            Some(date) if date <= today => Self::OfferedYetToJoin,
            _ => Self::OfferedAwaitingJoinDate,
        }
    }

    pub fn category(self) -> Option<CandidateCategory> {
        match self {
            Self::HiringTicketRaised => Some(CandidateCategory::HiringTicketRaised),
            Self::ApprovedYetToHire => Some(CandidateCategory::ApprovedYetToHire),
            Self::SelectedYetToOffer => Some(CandidateCategory::SelectedYetToOffer),
            Self::OfferedYetToJoin => Some(CandidateCategory::OfferedYetToJoin),
            Self::ExistingTeam => Some(CandidateCategory::ExistingTeam),
            Self::ToBeRationalized => Some(CandidateCategory::ToBeRationalized),
            Self::Rejected | Self::OfferedAwaitingJoinDate | Self::NotJoined => None,
        }
    }
}

/// The six counted stages, addressable as drill-down categories.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateCategory {
    HiringTicketRaised,
    ApprovedYetToHire,
    SelectedYetToOffer,
    OfferedYetToJoin,
    ExistingTeam,
    ToBeRationalized,
}

impl CandidateCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::HiringTicketRaised => "hiring_ticket_raised",
            Self::ApprovedYetToHire => "approved_yet_to_hire",
            Self::SelectedYetToOffer => "selected_yet_to_offer",
            Self::OfferedYetToJoin => "offered_yet_to_join",
            Self::ExistingTeam => "existing_team",
            Self::ToBeRationalized => "to_be_rationalized",
        }
    }
}

impl FromStr for CandidateCategory {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized: String = value
            .trim()
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .map(|c| c.to_ascii_lowercase())
            .collect();
        match normalized.as_str() {
            "hiringticketraised" => Ok(Self::HiringTicketRaised),
            "approvedyettohire" => Ok(Self::ApprovedYetToHire),
            "selectedyettooffer" => Ok(Self::SelectedYetToOffer),
            "offeredyettojoin" => Ok(Self::OfferedYetToJoin),
            "existingteam" => Ok(Self::ExistingTeam),
            "toberationalized" => Ok(Self::ToBeRationalized),
            _ => Err(UnknownVariant { kind: "candidate_category", value: value.to_string() }),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BuMetrics {
    pub hiring_ticket_raised: u32,
    pub approved_yet_to_hire: u32,
    pub selected_yet_to_offer: u32,
    pub offered_yet_to_join: u32,
    pub existing_team: u32,
    pub to_be_rationalized: u32,
    pub team_cost: Decimal,
}

impl BuMetrics {
    pub fn count(&self, category: CandidateCategory) -> u32 {
        match category {
            CandidateCategory::HiringTicketRaised => self.hiring_ticket_raised,
            CandidateCategory::ApprovedYetToHire => self.approved_yet_to_hire,
            CandidateCategory::SelectedYetToOffer => self.selected_yet_to_offer,
            CandidateCategory::OfferedYetToJoin => self.offered_yet_to_join,
            CandidateCategory::ExistingTeam => self.existing_team,
            CandidateCategory::ToBeRationalized => self.to_be_rationalized,
        }
    }
}

pub fn compute_bu_metrics<'a, I>(business_unit: &str, requests: I, today: NaiveDate) -> BuMetrics
where
    I: IntoIterator<Item = &'a HiringRequest>,
{
    let mut metrics = BuMetrics::default();
    for request in requests.into_iter().filter(|request| request.business_unit == business_unit) {
        let stage = PipelineStage::classify(request, today);
        match stage.category() {
            Some(CandidateCategory::HiringTicketRaised) => metrics.hiring_ticket_raised += 1,
            Some(CandidateCategory::ApprovedYetToHire) => metrics.approved_yet_to_hire += 1,
            Some(CandidateCategory::SelectedYetToOffer) => metrics.selected_yet_to_offer += 1,
            Some(CandidateCategory::OfferedYetToJoin) => metrics.offered_yet_to_join += 1,
            Some(CandidateCategory::ExistingTeam) => {
                metrics.existing_team += 1;
                metrics.team_cost += request.hired_value();
            }
            Some(CandidateCategory::ToBeRationalized) => metrics.to_be_rationalized += 1,
            None => {}
        }
    }
    metrics
}

/// Drill-down behind a metrics counter, newest first.
pub fn candidates<'a, I>(
    business_unit: &str,
    category: CandidateCategory,
    requests: I,
    today: NaiveDate,
) -> Vec<&'a HiringRequest>
where
    I: IntoIterator<Item = &'a HiringRequest>,
{
    let mut matched: Vec<&HiringRequest> = requests
        .into_iter()
        .filter(|request| request.business_unit == business_unit)
        .filter(|request| PipelineStage::classify(request, today).category() == Some(category))
        .collect();
    matched.sort_by(|left, right| right.created_at.cmp(&left.created_at));
    matched
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessUnitStats {
    pub business_unit: String,
    pub total_hires: u32,
    pub pending_requests: u32,
    pub confirmed_requests: u32,
}

/// Per-unit totals for the HR dashboard, ordered by business unit name.
pub fn business_unit_stats<'a, I>(requests: I) -> Vec<BusinessUnitStats>
where
    I: IntoIterator<Item = &'a HiringRequest>,
{
    let mut by_unit: BTreeMap<&str, BusinessUnitStats> = BTreeMap::new();
    for request in requests {
        let stats = by_unit.entry(request.business_unit.as_str()).or_insert_with(|| {
            BusinessUnitStats {
                business_unit: request.business_unit.clone(),
                ..BusinessUnitStats::default()
            }
        });
        if request.join_status == JoinStatus::Joined {
            stats.total_hires += 1;
            stats.confirmed_requests += 1;
        }
        if request.approval_status == ApprovalStatus::Pending {
            stats.pending_requests += 1;
        }
    }
    by_unit.into_values().collect()
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdminList {
    TotalHires,
    PendingRequests,
    PendingFromHr,
}

impl FromStr for AdminList {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "total_hires" => Ok(Self::TotalHires),
            "pending_requests" => Ok(Self::PendingRequests),
            "pending_from_hr" => Ok(Self::PendingFromHr),
            _ => Err(UnknownVariant { kind: "admin_list", value: value.to_string() }),
        }
    }
}

pub fn admin_list<'a, I>(list: AdminList, requests: I) -> Vec<&'a HiringRequest>
where
    I: IntoIterator<Item = &'a HiringRequest>,
{
    let mut matched: Vec<&HiringRequest> = requests
        .into_iter()
        .filter(|request| match list {
            AdminList::TotalHires => {
                request.join_confirmed && request.join_status == JoinStatus::Joined
            }
            AdminList::PendingRequests => request.approval_status == ApprovalStatus::Pending,
            AdminList::PendingFromHr => {
                request.approval_status == ApprovalStatus::Pending
                    && request.hr_head.approved
                    && !request.admin.approved
            }
        })
        .collect();
    matched.sort_by(|left, right| right.updated_at.cmp(&left.updated_at));
    matched
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;

    use super::{
        admin_list, business_unit_stats, candidates, compute_bu_metrics, AdminList,
        CandidateCategory, PipelineStage,
    };
    use crate::domain::request::{
        ApprovalStamp, ApprovalStatus, CandidateProfile, FinalDetails, HiringRequest,
        JoinStatus, RequestDetails, RequestId, Submission, TentativeDetails, WorkflowStatus,
    };
    use crate::domain::skills::Skills;
    use crate::domain::user::UserId;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).expect("valid date")
    }

    fn raised(business_unit: &str, replacement: bool, ctc: i64) -> HiringRequest {
        let details = if replacement {
            RequestDetails::Replacement {
                outgoing_employee_name: "Ravi".to_string(),
                outgoing_employee_id: None,
                last_working_date: None,
                leaving_reason: None,
            }
        } else {
            RequestDetails::NewHire { position_title: "Engineer".to_string() }
        };
        HiringRequest::raised(
            RequestId::generate(),
            UserId("bu-1".to_string()),
            "Asha",
            business_unit,
            Submission {
                details,
                candidate: CandidateProfile {
                    name: String::new(),
                    designation: "Engineer".to_string(),
                    experience_years: None,
                    skills: Skills::default(),
                    ctc_offered: Decimal::from(ctc),
                    proposed_joining_date: None,
                },
            },
            Utc::now(),
        )
    }

    fn hr_approved(mut request: HiringRequest) -> HiringRequest {
        request.hr_head = ApprovalStamp::granted(Utc::now(), None);
        request
    }

    fn admin_approved(request: HiringRequest) -> HiringRequest {
        let mut request = hr_approved(request);
        request.admin = ApprovalStamp::granted(Utc::now(), None);
        request.workflow_status = WorkflowStatus::AdminApproved;
        request
    }

    fn tentative(request: HiringRequest) -> HiringRequest {
        let mut request = admin_approved(request);
        request.tentative =
            Some(TentativeDetails { candidate_name: "A".to_string(), join_date: date(2025, 1, 1) });
        request.tentative_entered = true;
        request.workflow_status = WorkflowStatus::BuTentativeEntered;
        request
    }

    fn finalized(request: HiringRequest, join: NaiveDate, salary: i64) -> HiringRequest {
        let mut request = tentative(request);
        request.final_details = Some(FinalDetails {
            exact_join_date: join,
            exact_salary: Decimal::from(salary),
            employee_id: "E1".to_string(),
        });
        request.final_entered = true;
        request.workflow_status = WorkflowStatus::HrFinalEntered;
        request.approval_status = ApprovalStatus::Approved;
        request
    }

    fn joined(request: HiringRequest, status: JoinStatus) -> HiringRequest {
        let mut request = finalized(request, date(2025, 2, 1), 1_200_000);
        request.join_confirmed = true;
        request.join_status = status;
        if status == JoinStatus::Joined {
            request.workflow_status = WorkflowStatus::Completed;
        }
        request
    }

    fn rejected(mut request: HiringRequest) -> HiringRequest {
        request.approval_status = ApprovalStatus::Rejected;
        request
    }

    #[test]
    fn every_reachable_state_lands_in_exactly_one_stage() {
        let today = date(2025, 2, 1);
        let cases = vec![
            (raised("Payments", false, 1), PipelineStage::HiringTicketRaised),
            (hr_approved(raised("Payments", false, 1)), PipelineStage::HiringTicketRaised),
            (admin_approved(raised("Payments", false, 1)), PipelineStage::ApprovedYetToHire),
            (tentative(raised("Payments", false, 1)), PipelineStage::SelectedYetToOffer),
            (
                finalized(raised("Payments", false, 1), date(2025, 2, 1), 5),
                PipelineStage::OfferedYetToJoin,
            ),
            (
                finalized(raised("Payments", false, 1), date(2025, 3, 1), 5),
                PipelineStage::OfferedAwaitingJoinDate,
            ),
            (joined(raised("Payments", false, 1), JoinStatus::Joined), PipelineStage::ExistingTeam),
            (joined(raised("Payments", false, 1), JoinStatus::NotJoined), PipelineStage::NotJoined),
            (rejected(raised("Payments", false, 1)), PipelineStage::Rejected),
            (raised("Payments", true, 1), PipelineStage::ToBeRationalized),
            (tentative(raised("Payments", true, 1)), PipelineStage::ToBeRationalized),
            (joined(raised("Payments", true, 1), JoinStatus::Joined), PipelineStage::ExistingTeam),
            (joined(raised("Payments", true, 1), JoinStatus::NotJoined), PipelineStage::NotJoined),
            (rejected(raised("Payments", true, 1)), PipelineStage::Rejected),
        ];

        for (request, expected) in &cases {
            assert_eq!(PipelineStage::classify(request, today), *expected);
        }

        let requests: Vec<HiringRequest> = cases.into_iter().map(|(request, _)| request).collect();
        let metrics = compute_bu_metrics("Payments", &requests, today);
        let counted: u32 = [
            CandidateCategory::HiringTicketRaised,
            CandidateCategory::ApprovedYetToHire,
            CandidateCategory::SelectedYetToOffer,
            CandidateCategory::OfferedYetToJoin,
            CandidateCategory::ExistingTeam,
            CandidateCategory::ToBeRationalized,
        ]
        .into_iter()
        .map(|category| {
            assert_eq!(
                metrics.count(category) as usize,
                candidates("Payments", category, &requests, today).len()
            );
            metrics.count(category)
        })
        .sum();
        let uncounted = requests
            .iter()
            .filter(|request| PipelineStage::classify(request, today).category().is_none())
            .count() as u32;
        assert_eq!(counted + uncounted, requests.len() as u32);
    }

    #[test]
    fn team_cost_sums_hired_value_of_existing_team() {
        let today = date(2025, 2, 1);
        let requests = vec![
            joined(raised("Payments", false, 1_000_000), JoinStatus::Joined),
            joined(raised("Payments", true, 800_000), JoinStatus::Joined),
            joined(raised("Lending", false, 900_000), JoinStatus::Joined),
            raised("Payments", false, 700_000),
        ];

        let metrics = compute_bu_metrics("Payments", &requests, today);

        assert_eq!(metrics.existing_team, 2);
        assert_eq!(metrics.hiring_ticket_raised, 1);
        assert_eq!(metrics.team_cost, Decimal::from(2_400_000));
    }

    #[test]
    fn metrics_serialize_with_camel_case_keys() {
        let metrics = compute_bu_metrics("Payments", &Vec::<HiringRequest>::new(), date(2025, 1, 1));
        let json = serde_json::to_value(&metrics).expect("serialize metrics");
        assert_eq!(json["hiringTicketRaised"], 0);
        assert!(json.get("toBeRationalized").is_some());
        assert!(json.get("teamCost").is_some());
    }

    #[test]
    fn category_parses_url_and_camel_case_forms() {
        assert_eq!(
            "offered-yet-to-join".parse::<CandidateCategory>(),
            Ok(CandidateCategory::OfferedYetToJoin)
        );
        assert_eq!("existingTeam".parse::<CandidateCategory>(), Ok(CandidateCategory::ExistingTeam));
        assert!("rejected".parse::<CandidateCategory>().is_err());
    }

    #[test]
    fn business_unit_stats_and_admin_lists() {
        let requests = vec![
            raised("Payments", false, 1),
            hr_approved(raised("Payments", false, 1)),
            joined(raised("Lending", false, 1), JoinStatus::Joined),
            rejected(raised("Lending", true, 1)),
        ];

        let stats = business_unit_stats(&requests);
        assert_eq!(stats.len(), 2);
        assert_eq!(stats[0].business_unit, "Lending");
        assert_eq!(stats[0].total_hires, 1);
        assert_eq!(stats[0].pending_requests, 0);
        assert_eq!(stats[1].pending_requests, 2);

        assert_eq!(admin_list(AdminList::TotalHires, &requests).len(), 1);
        assert_eq!(admin_list(AdminList::PendingRequests, &requests).len(), 2);
        assert_eq!(admin_list(AdminList::PendingFromHr, &requests).len(), 1);
        assert_eq!("pending-from-hr".parse::<AdminList>(), Ok(AdminList::PendingFromHr));
    }
}
