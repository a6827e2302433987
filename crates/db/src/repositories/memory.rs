use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use tokio::sync::RwLock;

use hireflow_core::domain::request::{HiringRequest, RequestId};
use hireflow_core::domain::user::{User, UserId};
use hireflow_core::ledger::BudgetLedger;

use super::{
    CommitReceipt, HiringRequestRepository, RepositoryError, RequestFilter, TransitionCommit,
    UserRepository,
};

const REQUEST: &str = "hiring request";

#[derive(Default)]
struct MemoryState {
    users: HashMap<String, User>,
    requests: HashMap<String, HiringRequest>,
    debited: HashSet<String>,
}

impl MemoryState {
    fn guard(&self, id: &RequestId, expected_version: i64) -> Result<(), RepositoryError> {
        match self.requests.get(&id.0) {
            None => Err(RepositoryError::NotFound { entity: REQUEST, id: id.0.clone() }),
            Some(stored) if stored.version != expected_version => {
                Err(RepositoryError::VersionConflict {
                    entity: REQUEST,
                    id: id.0.clone(),
                    expected: expected_version,
                })
            }
            Some(_) => Ok(()),
        }
    }
}

/// Users and requests behind one lock so a commit and its debit land together.
/// Implements both repository traits; share it through an `Arc`.
#[derive(Default)]
pub struct InMemoryStore {
    state: RwLock<MemoryState>,
}

#[async_trait::async_trait]
impl UserRepository for InMemoryStore {
    async fn create(&self, user: User) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        if state.users.values().any(|existing| existing.email == user.email) {
            return Err(RepositoryError::Duplicate {
                entity: "user",
                field: "email",
                value: user.email,
            });
        }
        state.users.insert(user.id.0.clone(), user);
        Ok(())
    }

    async fn find_by_id(&self, id: &UserId) -> Result<Option<User>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.users.get(&id.0).cloned())
    }

    async fn list(&self) -> Result<Vec<User>, RepositoryError> {
        let state = self.state.read().await;
        let mut users: Vec<User> = state.users.values().cloned().collect();
        users.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.id.0.cmp(&b.id.0)));
        Ok(users)
    }

    async fn list_by_business_unit(
        &self,
        business_unit: &str,
    ) -> Result<Vec<User>, RepositoryError> {
        let mut users = UserRepository::list(self).await?;
        users.retain(|user| user.business_unit == business_unit);
        Ok(users)
    }

    async fn set_team_cost(
        &self,
        id: &UserId,
        team_cost: Decimal,
        updated_at: DateTime<Utc>,
    ) -> Result<User, RepositoryError> {
        let mut state = self.state.write().await;
        let user = state
            .users
            .get_mut(&id.0)
            .ok_or_else(|| RepositoryError::NotFound { entity: "user", id: id.0.clone() })?;
        user.team_cost = team_cost;
        user.updated_at = updated_at;
        Ok(user.clone())
    }
}

#[async_trait::async_trait]
impl HiringRequestRepository for InMemoryStore {
    async fn create(&self, request: HiringRequest) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        if state.requests.contains_key(&request.id.0) {
            return Err(RepositoryError::Duplicate {
                entity: REQUEST,
                field: "id",
                value: request.id.0,
            });
        }
        state.requests.insert(request.id.0.clone(), request);
        Ok(())
    }

    async fn find_by_id(&self, id: &RequestId) -> Result<Option<HiringRequest>, RepositoryError> {
        let state = self.state.read().await;
        Ok(state.requests.get(&id.0).cloned())
    }

    async fn list(&self, filter: &RequestFilter) -> Result<Vec<HiringRequest>, RepositoryError> {
        let state = self.state.read().await;
        let mut requests: Vec<HiringRequest> =
            state.requests.values().filter(|request| filter.matches(request)).cloned().collect();
        requests.sort_by(|a, b| b.created_at.cmp(&a.created_at).then_with(|| a.id.0.cmp(&b.id.0)));
        Ok(requests)
    }

    async fn commit(&self, commit: TransitionCommit) -> Result<CommitReceipt, RepositoryError> {
        let TransitionCommit { mut request, expected_version, debit, committed_at } = commit;
        let mut state = self.state.write().await;
        state.guard(&request.id, expected_version)?;

        let outcome = match debit {
            Some(debit) => {
                if state.debited.contains(&debit.request_id.0) {
                    return Err(RepositoryError::Duplicate {
                        entity: "budget debit",
                        field: "request_id",
                        value: debit.request_id.0,
                    });
                }
                let manager = state.users.get_mut(&debit.manager_id.0).ok_or_else(|| {
                    RepositoryError::NotFound { entity: "user", id: debit.manager_id.0.clone() }
                })?;
                let outcome = BudgetLedger::apply_debit(manager.team_cost, debit.amount);
                manager.team_cost = outcome.balance;
                manager.updated_at = committed_at;
                state.debited.insert(debit.request_id.0);
                Some(outcome)
            }
            None => None,
        };

        request.version = expected_version + 1;
        let version = request.version;
        state.requests.insert(request.id.0.clone(), request);
        Ok(CommitReceipt { version, debit: outcome })
    }

    async fn delete(&self, id: &RequestId, expected_version: i64) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        state.guard(id, expected_version)?;
        state.requests.remove(&id.0);
        Ok(())
    }

    async fn replace(
        &self,
        old_id: &RequestId,
        expected_version: i64,
        fresh: HiringRequest,
    ) -> Result<(), RepositoryError> {
        let mut state = self.state.write().await;
        state.guard(old_id, expected_version)?;
        if state.requests.contains_key(&fresh.id.0) {
            return Err(RepositoryError::Duplicate {
                entity: REQUEST,
                field: "id",
                value: fresh.id.0,
            });
        }
        state.requests.remove(&old_id.0);
        state.requests.insert(fresh.id.0.clone(), fresh);
        Ok(())
    }
}
