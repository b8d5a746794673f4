use std::collections::HashMap;
use std::sync::RwLock;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{Datelike, Utc};
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::engine::transition::TransitionPlan;
use crate::error::EngineError;
use crate::model::leave_balance::LeaveBalance;
use crate::model::leave_request::{LeaveRequest, LeaveStatus};
use crate::store::{LeaveStore, NewRequest, RequestFilter};

#[derive(Default)]
struct Inner {
    requests: HashMap<Uuid, LeaveRequest>,
    balances: HashMap<(u64, i32), LeaveBalance>,
}

/// In-memory backend. A single write lock spans every mutating
/// read-validate-write sequence, so transitions on the same request and on
/// the same person/year balance are serialized; the version check turns a
/// stale plan into `ConcurrencyConflict` instead of a double mutation.
#[derive(Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
    seq: AtomicU64,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock_poisoned() -> EngineError {
        EngineError::Storage("memory store lock poisoned".into())
    }
}

impl LeaveStore for MemoryStore {
    async fn insert_request(
        &self,
        new: NewRequest,
        reserve_days: Decimal,
        default_entitlement: Decimal,
    ) -> Result<LeaveRequest, EngineError> {
        let mut inner = self.inner.write().map_err(|_| Self::lock_poisoned())?;
        let seq = self.seq.fetch_add(1, Ordering::Relaxed) + 1;
        let now = Utc::now();
        let request = LeaveRequest {
            id: Uuid::new_v4(),
            request_no: format!("LR-{}-{:05}", new.start_date.year(), seq),
            person_id: new.person_id,
            unit_id: new.unit_id,
            leave_type: new.leave_type,
            start_date: new.start_date,
            start_part: new.start_part,
            end_date: new.end_date,
            end_part: new.end_part,
            total_days: new.total_days,
            description: new.description,
            attachment_url: new.attachment_url,
            status: LeaveStatus::Pending,
            approvals: vec![],
            rejection_reason: None,
            created_by_user_id: new.created_by_user_id,
            created_at: now,
            updated_at: now,
            version: 0,
        };

        let key = (request.person_id, request.balance_year());
        let balance = inner
            .balances
            .entry(key)
            .or_insert_with(|| LeaveBalance::new(key.0, key.1, default_entitlement));
        if reserve_days > Decimal::ZERO {
            balance.annual_reserved_days += reserve_days;
            balance.updated_at = now;
        }

        inner.requests.insert(request.id, request.clone());
        Ok(request)
    }

    async fn get_request(&self, id: Uuid) -> Result<LeaveRequest, EngineError> {
        let inner = self.inner.read().map_err(|_| Self::lock_poisoned())?;
        inner
            .requests
            .get(&id)
            .cloned()
            .ok_or_else(|| EngineError::NotFound(format!("leave request {id}")))
    }

    async fn list_requests(
        &self,
        filter: &RequestFilter,
    ) -> Result<(Vec<LeaveRequest>, i64), EngineError> {
        let inner = self.inner.read().map_err(|_| Self::lock_poisoned())?;
        let mut matched: Vec<LeaveRequest> = inner
            .requests
            .values()
            .filter(|r| filter.person_id.is_none_or(|p| r.person_id == p))
            .filter(|r| filter.unit_id.is_none_or(|u| r.unit_id == u))
            .filter(|r| filter.status.is_none_or(|s| r.status == s))
            .cloned()
            .collect();
        matched.sort_by(|a, b| {
            b.created_at
                .cmp(&a.created_at)
                .then_with(|| b.request_no.cmp(&a.request_no))
        });
        let total = matched.len() as i64;
        let page: Vec<LeaveRequest> = match filter.limit {
            Some(limit) => matched
                .into_iter()
                .skip(filter.offset as usize)
                .take(limit as usize)
                .collect(),
            None => matched,
        };
        Ok((page, total))
    }

    async fn apply_transition(&self, plan: TransitionPlan) -> Result<LeaveRequest, EngineError> {
        let mut inner = self.inner.write().map_err(|_| Self::lock_poisoned())?;
        let now = Utc::now();

        let request = inner
            .requests
            .get_mut(&plan.request_id)
            .ok_or_else(|| EngineError::NotFound(format!("leave request {}", plan.request_id)))?;
        if request.version != plan.expected_version {
            return Err(EngineError::ConcurrencyConflict);
        }

        request.status = plan.new_status;
        if plan.rejection_reason.is_some() {
            request.rejection_reason = plan.rejection_reason.clone();
        }
        request.approvals.push(plan.approval.clone());
        request.updated_at = now;
        request.version += 1;
        let updated = request.clone();

        let key = (plan.person_id, plan.year);
        let balance = inner
            .balances
            .entry(key)
            .or_insert_with(|| LeaveBalance::new(key.0, key.1, Decimal::ZERO));
        balance.annual_reserved_days += plan.reserved_delta;
        *balance.used_for_mut(plan.leave_type) += plan.used_delta;
        balance.updated_at = now;

        Ok(updated)
    }

    async fn get_or_create_balance(
        &self,
        person_id: u64,
        year: i32,
        default_entitlement: Decimal,
    ) -> Result<LeaveBalance, EngineError> {
        let mut inner = self.inner.write().map_err(|_| Self::lock_poisoned())?;
        Ok(inner
            .balances
            .entry((person_id, year))
            .or_insert_with(|| LeaveBalance::new(person_id, year, default_entitlement))
            .clone())
    }

    async fn adjust_entitlement(
        &self,
        person_id: u64,
        year: i32,
        delta: Decimal,
        default_entitlement: Decimal,
    ) -> Result<LeaveBalance, EngineError> {
        let mut inner = self.inner.write().map_err(|_| Self::lock_poisoned())?;
        let balance = inner
            .balances
            .entry((person_id, year))
            .or_insert_with(|| LeaveBalance::new(person_id, year, default_entitlement));
        balance.annual_entitled_days += delta;
        balance.updated_at = Utc::now();
        Ok(balance.clone())
    }

    async fn balances_for(
        &self,
        person_ids: &[u64],
        year: i32,
    ) -> Result<Vec<LeaveBalance>, EngineError> {
        let inner = self.inner.read().map_err(|_| Self::lock_poisoned())?;
        Ok(person_ids
            .iter()
            .filter_map(|p| inner.balances.get(&(*p, year)).cloned())
            .collect())
    }
}
