pub mod memory;
pub mod mysql;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::engine::transition::TransitionPlan;
use crate::error::EngineError;
use crate::model::leave_balance::LeaveBalance;
use crate::model::leave_request::{DayPart, LeaveRequest, LeaveStatus, LeaveType};

pub use memory::MemoryStore;
pub use mysql::MySqlStore;

/// A validated draft, ready to be persisted as PENDING.
#[derive(Debug, Clone)]
pub struct NewRequest {
    pub person_id: u64,
    pub unit_id: u64,
    pub leave_type: LeaveType,
    pub start_date: NaiveDate,
    pub start_part: DayPart,
    pub end_date: NaiveDate,
    pub end_part: DayPart,
    pub total_days: Decimal,
    pub description: String,
    pub attachment_url: Option<String>,
    pub created_by_user_id: u64,
}

#[derive(Debug, Clone, Default)]
pub struct RequestFilter {
    pub person_id: Option<u64>,
    pub unit_id: Option<u64>,
    pub status: Option<LeaveStatus>,
    /// None means no pagination (full scope reads for the overview).
    pub limit: Option<u64>,
    pub offset: u64,
}

/// Repository + ledger interface the lifecycle engine depends on. Each
/// mutating method is atomic with respect to the read it is based on:
/// `apply_transition` checks the caller's `expected_version` and fails with
/// `ConcurrencyConflict` on a lost race, applying nothing.
pub trait LeaveStore: Send + Sync + 'static {
    /// Persist a draft as PENDING, allocate its request number, and reserve
    /// `reserve_days` against the person/year annual balance (zero for
    /// non-annual types), creating the balance with `default_entitlement`
    /// if it does not exist yet.
    async fn insert_request(
        &self,
        new: NewRequest,
        reserve_days: Decimal,
        default_entitlement: Decimal,
    ) -> Result<LeaveRequest, EngineError>;

    async fn get_request(&self, id: Uuid) -> Result<LeaveRequest, EngineError>;

    /// Filtered list, newest first, plus the pre-pagination total.
    async fn list_requests(
        &self,
        filter: &RequestFilter,
    ) -> Result<(Vec<LeaveRequest>, i64), EngineError>;

    /// Apply a transition plan atomically: status + approval record +
    /// ledger deltas, all or nothing.
    async fn apply_transition(&self, plan: TransitionPlan) -> Result<LeaveRequest, EngineError>;

    async fn get_or_create_balance(
        &self,
        person_id: u64,
        year: i32,
        default_entitlement: Decimal,
    ) -> Result<LeaveBalance, EngineError>;

    /// Administrative entitlement override.
    async fn adjust_entitlement(
        &self,
        person_id: u64,
        year: i32,
        delta: Decimal,
        default_entitlement: Decimal,
    ) -> Result<LeaveBalance, EngineError>;

    /// Existing balances for the given persons in one year; missing
    /// person/year pairs are skipped, not created.
    async fn balances_for(
        &self,
        person_ids: &[u64],
        year: i32,
    ) -> Result<Vec<LeaveBalance>, EngineError>;
}

/// Runtime-selected backend: MySQL when DATABASE_URL is configured,
/// otherwise the in-memory store.
pub enum Store {
    Memory(MemoryStore),
    MySql(MySqlStore),
}

impl LeaveStore for Store {
    async fn insert_request(
        &self,
        new: NewRequest,
        reserve_days: Decimal,
        default_entitlement: Decimal,
    ) -> Result<LeaveRequest, EngineError> {
        match self {
            Store::Memory(s) => s.insert_request(new, reserve_days, default_entitlement).await,
            Store::MySql(s) => s.insert_request(new, reserve_days, default_entitlement).await,
        }
    }

    async fn get_request(&self, id: Uuid) -> Result<LeaveRequest, EngineError> {
        match self {
            Store::Memory(s) => s.get_request(id).await,
            Store::MySql(s) => s.get_request(id).await,
        }
    }

    async fn list_requests(
        &self,
        filter: &RequestFilter,
    ) -> Result<(Vec<LeaveRequest>, i64), EngineError> {
        match self {
            Store::Memory(s) => s.list_requests(filter).await,
            Store::MySql(s) => s.list_requests(filter).await,
        }
    }

    async fn apply_transition(&self, plan: TransitionPlan) -> Result<LeaveRequest, EngineError> {
        match self {
            Store::Memory(s) => s.apply_transition(plan).await,
            Store::MySql(s) => s.apply_transition(plan).await,
        }
    }

    async fn get_or_create_balance(
        &self,
        person_id: u64,
        year: i32,
        default_entitlement: Decimal,
    ) -> Result<LeaveBalance, EngineError> {
        match self {
            Store::Memory(s) => s.get_or_create_balance(person_id, year, default_entitlement).await,
            Store::MySql(s) => s.get_or_create_balance(person_id, year, default_entitlement).await,
        }
    }

    async fn adjust_entitlement(
        &self,
        person_id: u64,
        year: i32,
        delta: Decimal,
        default_entitlement: Decimal,
    ) -> Result<LeaveBalance, EngineError> {
        match self {
            Store::Memory(s) => {
                s.adjust_entitlement(person_id, year, delta, default_entitlement).await
            }
            Store::MySql(s) => {
                s.adjust_entitlement(person_id, year, delta, default_entitlement).await
            }
        }
    }

    async fn balances_for(
        &self,
        person_ids: &[u64],
        year: i32,
    ) -> Result<Vec<LeaveBalance>, EngineError> {
        match self {
            Store::Memory(s) => s.balances_for(person_ids, year).await,
            Store::MySql(s) => s.balances_for(person_ids, year).await,
        }
    }
}
