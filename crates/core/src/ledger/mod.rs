//! Team budget ledger.
//!
//! A manager's `team_cost` is a cached running balance: each request's first
//! transition into Joined debits `rate × hired_value` from it, floored at zero.
//! The breakdown recomputes the same amounts from Joined requests and is the
//! source of truth when the cached balance needs reconciling.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::request::{HiringRequest, JoinStatus};
use crate::domain::user::{User, UserId};

pub fn default_debit_rate() -> Decimal {
    Decimal::new(20, 2)
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct BudgetLedger {
    rate: Decimal,
}

impl Default for BudgetLedger {
    fn default() -> Self {
        Self { rate: default_debit_rate() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DebitOutcome {
    pub previous_balance: Decimal,
    pub requested: Decimal,
    pub debited: Decimal,
    pub balance: Decimal,
    /// True when the balance could not cover the full debit and was floored at zero.
    pub clamped: bool,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BreakdownLine {
    pub request_id: String,
    pub candidate_name: String,
    pub hired_value: Decimal,
    pub twenty_percent: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BudgetBreakdown {
    pub candidates: Vec<BreakdownLine>,
    pub total: Decimal,
    pub total_hired_value: Decimal,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BusinessUnitCost {
    pub business_unit: String,
    /// Sum of remaining budgets across the unit's managers.
    pub team_cost: Decimal,
    /// Sum of debits recomputed from the unit's Joined requests.
    pub total_consumed: Decimal,
}

impl BudgetLedger {
    pub fn new(rate: Decimal) -> Self {
        Self { rate }
    }

    pub fn rate(&self) -> Decimal {
        self.rate
    }

    pub fn debit_for(&self, request: &HiringRequest) -> Decimal {
        (self.rate * request.hired_value()).normalize()
    }

    /// Debits `amount` from `balance`, flooring the result at zero.
    pub fn apply_debit(balance: Decimal, amount: Decimal) -> DebitOutcome {
        let amount = amount.max(Decimal::ZERO);
        let remaining = balance - amount;
        let (balance_after, clamped) =
            if remaining < Decimal::ZERO { (Decimal::ZERO, true) } else { (remaining, false) };

        DebitOutcome {
            previous_balance: balance,
            requested: amount,
            debited: balance - balance_after,
            balance: balance_after,
            clamped,
        }
    }

    pub fn breakdown<'a, I>(&self, manager_id: &UserId, requests: I) -> BudgetBreakdown
    where
        I: IntoIterator<Item = &'a HiringRequest>,
    {
        let candidates: Vec<BreakdownLine> = requests
            .into_iter()
            .filter(|request| request.is_owned_by(manager_id) && counts_against_budget(request))
            .map(|request| BreakdownLine {
                request_id: request.id.0.clone(),
                candidate_name: request.candidate_name().to_string(),
                hired_value: request.hired_value(),
                twenty_percent: self.debit_for(request),
            })
            .collect();

        let total = candidates.iter().map(|line| line.twenty_percent).sum();
        let total_hired_value = candidates.iter().map(|line| line.hired_value).sum();

        BudgetBreakdown { candidates, total, total_hired_value }
    }

    pub fn consumed_total<'a, I>(&self, manager_id: &UserId, requests: I) -> Decimal
    where
        I: IntoIterator<Item = &'a HiringRequest>,
    {
        self.breakdown(manager_id, requests).total
    }

    pub fn business_unit_cost<'a, I>(
        &self,
        business_unit: &str,
        managers: &[User],
        requests: I,
    ) -> BusinessUnitCost
    where
        I: IntoIterator<Item = &'a HiringRequest>,
    {
        let team_cost = managers
            .iter()
            .filter(|user| user.business_unit == business_unit)
            .map(|user| user.team_cost)
            .sum();
        let total_consumed = requests
            .into_iter()
            .filter(|request| request.business_unit == business_unit)
            .filter(|request| counts_against_budget(request))
            .map(|request| self.debit_for(request))
            .sum();

        BusinessUnitCost { business_unit: business_unit.to_string(), team_cost, total_consumed }
    }
}

fn counts_against_budget(request: &HiringRequest) -> bool {
    request.join_confirmed && request.join_status == JoinStatus::Joined
}

/// Parses a budget amount, rejecting negatives.
pub fn parse_amount(raw: &str) -> Option<Decimal> {
    Decimal::from_str(raw.trim()).ok().filter(|value| *value >= Decimal::ZERO)
}

#[cfg(test)]
mod tests {
    use chrono::{NaiveDate, Utc};
    use rust_decimal::Decimal;

    use super::{parse_amount, BudgetLedger};
    use crate::domain::request::{
        CandidateProfile, FinalDetails, HiringRequest, JoinStatus, RequestDetails, RequestId,
        Submission,
    };
    use crate::domain::skills::Skills;
    use crate::domain::user::UserId;

    fn joined_request(manager: &str, ctc: i64, salary: Option<i64>) -> HiringRequest {
        let mut request = HiringRequest::raised(
            RequestId::generate(),
            UserId(manager.to_string()),
            "Manager",
            "Payments",
            Submission {
                details: RequestDetails::NewHire { position_title: "Analyst".to_string() },
                candidate: CandidateProfile {
                    name: "Candidate".to_string(),
                    designation: "Analyst".to_string(),
                    experience_years: None,
                    skills: Skills::default(),
                    ctc_offered: Decimal::from(ctc),
                    proposed_joining_date: None,
                },
            },
            Utc::now(),
        );
        request.final_details = salary.map(|salary| FinalDetails {
            exact_join_date: NaiveDate::from_ymd_opt(2025, 2, 1).expect("date"),
            exact_salary: Decimal::from(salary),
            employee_id: "E1".to_string(),
        });
        request.join_confirmed = true;
        request.join_status = JoinStatus::Joined;
        request
    }

    #[test]
    fn debit_is_twenty_percent_of_exact_salary() {
        let ledger = BudgetLedger::default();
        let request = joined_request("bu-1", 1_000_000, Some(1_200_000));
        assert_eq!(ledger.debit_for(&request), Decimal::from(240_000));
    }

    #[test]
    fn debit_falls_back_to_ctc_when_salary_missing() {
        let ledger = BudgetLedger::default();
        let request = joined_request("bu-1", 500_000, None);
        assert_eq!(ledger.debit_for(&request), Decimal::from(100_000));
    }

    #[test]
    fn apply_debit_floors_balance_at_zero() {
        let outcome = BudgetLedger::apply_debit(Decimal::from(50_000), Decimal::from(240_000));

        assert_eq!(outcome.balance, Decimal::ZERO);
        assert_eq!(outcome.debited, Decimal::from(50_000));
        assert_eq!(outcome.requested, Decimal::from(240_000));
        assert!(outcome.clamped);

        let outcome = BudgetLedger::apply_debit(Decimal::from(1_000_000), Decimal::from(240_000));
        assert_eq!(outcome.balance, Decimal::from(760_000));
        assert!(!outcome.clamped);
    }

    #[test]
    fn breakdown_recomputes_from_joined_requests_of_manager() {
        let ledger = BudgetLedger::default();
        let mut pending = joined_request("bu-1", 900_000, None);
        pending.join_status = JoinStatus::Pending;
        pending.join_confirmed = false;
        let requests = vec![
            joined_request("bu-1", 1_000_000, Some(1_200_000)),
            joined_request("bu-1", 500_000, None),
            joined_request("bu-2", 700_000, None),
            pending,
        ];

        let breakdown = ledger.breakdown(&UserId("bu-1".to_string()), &requests);

        assert_eq!(breakdown.candidates.len(), 2);
        assert_eq!(breakdown.total, Decimal::from(340_000));
        assert_eq!(breakdown.total_hired_value, Decimal::from(1_700_000));
        assert_eq!(
            ledger.consumed_total(&UserId("bu-2".to_string()), &requests),
            Decimal::from(140_000)
        );
    }

    #[test]
    fn parse_amount_rejects_negative_and_garbage() {
        assert_eq!(parse_amount(" 1500000 "), Some(Decimal::from(1_500_000)));
        assert_eq!(parse_amount("-1"), None);
        assert_eq!(parse_amount("NaN"), None);
    }
}
