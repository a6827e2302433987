use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::request::{
    ApprovalStatus, HiredStatus, HiringRequest, RequestId, RequestKind, UnknownVariant,
};
use crate::domain::user::UserId;

pub const DEFAULT_LIMIT: usize = 10;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationFeed {
    Approved,
    Hired,
    Rejected,
}

impl FromStr for NotificationFeed {
    type Err = UnknownVariant;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "approved" | "approvals" => Ok(Self::Approved),
            "hired" => Ok(Self::Hired),
            "rejected" | "rejections" => Ok(Self::Rejected),
            _ => Err(UnknownVariant { kind: "notification_feed", value: value.to_string() }),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeedItem {
    pub request_id: RequestId,
    pub request_type: RequestKind,
    pub title: String,
    pub candidate_name: String,
    pub employee_id: Option<String>,
    pub rejection_reason: Option<String>,
    pub occurred_at: DateTime<Utc>,
}

impl FeedItem {
    fn from_request(request: &HiringRequest, occurred_at: DateTime<Utc>) -> Self {
        Self {
            request_id: request.id.clone(),
            request_type: request.kind(),
            title: request.headline().to_string(),
            candidate_name: request.candidate_name().to_string(),
            employee_id: request.final_details.as_ref().map(|details| details.employee_id.clone()),
            rejection_reason: request.rejection_reason.clone(),
            occurred_at,
        }
    }
}

/// The most recent `limit` items of the `kind` feed for requests raised by `owner`.
pub fn feed<'a, I>(
    kind: NotificationFeed,
    owner: &UserId,
    requests: I,
    limit: usize,
) -> Vec<FeedItem>
where
    I: IntoIterator<Item = &'a HiringRequest>,
{
    let mut items: Vec<FeedItem> = requests
        .into_iter()
        .filter(|request| request.is_owned_by(owner))
        .filter_map(|request| {
            let occurred_at = match kind {
                NotificationFeed::Approved => {
                    (request.approval_status == ApprovalStatus::Approved)
                        .then_some(request.updated_at)
                }
                NotificationFeed::Hired => hired_at(request),
                NotificationFeed::Rejected => {
                    (request.approval_status == ApprovalStatus::Rejected)
                        .then_some(request.updated_at)
                }
            }?;
            Some(FeedItem::from_request(request, occurred_at))
        })
        .collect();

    items.sort_by(|left, right| right.occurred_at.cmp(&left.occurred_at));
    items.truncate(limit);
    items
}

pub fn recent_approvals<'a, I>(owner: &UserId, requests: I, limit: usize) -> Vec<FeedItem>
where
    I: IntoIterator<Item = &'a HiringRequest>,
{
    feed(NotificationFeed::Approved, owner, requests, limit)
}

pub fn hired_notifications<'a, I>(owner: &UserId, requests: I, limit: usize) -> Vec<FeedItem>
where
    I: IntoIterator<Item = &'a HiringRequest>,
{
    feed(NotificationFeed::Hired, owner, requests, limit)
}

pub fn rejection_notifications<'a, I>(owner: &UserId, requests: I, limit: usize) -> Vec<FeedItem>
where
    I: IntoIterator<Item = &'a HiringRequest>,
{
    feed(NotificationFeed::Rejected, owner, requests, limit)
}

/// Hired requests only count once an employee id has been issued.
fn hired_at(request: &HiringRequest) -> Option<DateTime<Utc>> {
    let has_employee_id = request
        .final_details
        .as_ref()
        .is_some_and(|details| !details.employee_id.trim().is_empty());
    if request.hired_status == HiredStatus::Hired && has_employee_id {
        request.hired_at.or(Some(request.updated_at))
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, NaiveDate, Utc};
    use rust_decimal::Decimal;

    use super::{hired_notifications, recent_approvals, rejection_notifications, DEFAULT_LIMIT};
    use crate::domain::request::{
        ApprovalStatus, CandidateProfile, FinalDetails, HiredStatus, HiringRequest,
        RequestDetails, RequestId, Submission,
    };
    use crate::domain::skills::Skills;
    use crate::domain::user::UserId;

    fn request(owner: &str, minutes_ago: i64) -> HiringRequest {
        let mut request = HiringRequest::raised(
            RequestId::generate(),
            UserId(owner.to_string()),
            owner,
            "Payments",
            Submission {
                details: RequestDetails::NewHire { position_title: "Engineer".to_string() },
                candidate: CandidateProfile {
                    name: "Candidate".to_string(),
                    designation: "Engineer".to_string(),
                    experience_years: None,
                    skills: Skills::default(),
                    ctc_offered: Decimal::from(1),
                    proposed_joining_date: None,
                },
            },
            Utc::now() - Duration::days(1),
        );
        request.updated_at = Utc::now() - Duration::minutes(minutes_ago);
        request
    }

    fn hired(owner: &str, minutes_ago: i64, employee_id: &str) -> HiringRequest {
        let mut request = request(owner, minutes_ago);
        request.approval_status = ApprovalStatus::Approved;
        request.hired_status = HiredStatus::Hired;
        request.hired_at = Some(request.updated_at);
        request.final_details = Some(FinalDetails {
            exact_join_date: NaiveDate::from_ymd_opt(2025, 2, 1).expect("date"),
            exact_salary: Decimal::from(1),
            employee_id: employee_id.to_string(),
        });
        request
    }

    #[test]
    fn approvals_are_owner_scoped_newest_first_and_limited() {
        let owner = UserId("bu-1".to_string());
        let mut requests: Vec<HiringRequest> =
            (0..12).map(|minutes| hired("bu-1", minutes, "E")).collect();
        requests.push(hired("bu-2", 0, "E"));
        requests.push(request("bu-1", 0));

        let items = recent_approvals(&owner, &requests, DEFAULT_LIMIT);

        assert_eq!(items.len(), DEFAULT_LIMIT);
        assert_eq!(items[0].request_id, requests[0].id);
        assert!(items.windows(2).all(|pair| pair[0].occurred_at >= pair[1].occurred_at));
    }

    #[test]
    fn hired_feed_requires_employee_id() {
        let owner = UserId("bu-1".to_string());
        let requests = vec![hired("bu-1", 5, "E42"), hired("bu-1", 1, " ")];

        let items = hired_notifications(&owner, &requests, DEFAULT_LIMIT);

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].employee_id.as_deref(), Some("E42"));
    }

    #[test]
    fn rejection_feed_carries_reason() {
        let owner = UserId("bu-1".to_string());
        let mut rejected = request("bu-1", 3);
        rejected.approval_status = ApprovalStatus::Rejected;
        rejected.rejection_reason = Some("budget freeze".to_string());
        let requests = vec![rejected, request("bu-1", 1)];

        let items = rejection_notifications(&owner, &requests, 5);

        assert_eq!(items.len(), 1);
        assert_eq!(items[0].rejection_reason.as_deref(), Some("budget freeze"));
        assert_eq!(items[0].title, "Engineer");
    }
}
