pub mod day_calc;
pub mod overview;
pub mod transition;

use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, NaiveDate, Utc};
use moka::sync::Cache;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::EngineError;
use crate::model::leave_balance::LeaveBalance;
use crate::model::leave_request::{DayPart, LeaveRequest, LeaveType};
use crate::store::{LeaveStore, NewRequest, RequestFilter, Store};

use overview::{Overview, OverviewScope};
use transition::{DecidedBy, Trigger};

/// Administrator-configured policy knobs.
#[derive(Debug, Clone)]
pub struct LeavePolicy {
    pub default_annual_entitlement: Decimal,
}

/// The authenticated caller, as the API layer resolved it.
#[derive(Debug, Clone)]
pub struct Actor {
    pub user_id: u64,
    pub name: String,
}

impl Actor {
    fn decided_by(&self) -> DecidedBy {
        DecidedBy {
            user_id: self.user_id,
            name: self.name.clone(),
        }
    }
}

/// Unvalidated creation input; the engine validates and computes the rest.
#[derive(Debug, Clone)]
pub struct NewLeave {
    pub person_id: u64,
    pub unit_id: u64,
    pub leave_type: LeaveType,
    pub start_date: NaiveDate,
    pub start_part: DayPart,
    pub end_date: NaiveDate,
    pub end_part: DayPart,
    pub description: String,
    pub attachment_url: Option<String>,
}

/// The lifecycle engine: validates input, runs the transition table, and
/// hands the store an atomic plan. Every mutation invalidates the overview
/// cache. Depends only on the `LeaveStore` interface.
pub struct LeaveEngine<S> {
    store: S,
    policy: LeavePolicy,
    overview_cache: Cache<OverviewScope, Arc<Overview>>,
}

pub type AppEngine = LeaveEngine<Store>;

impl<S: LeaveStore> LeaveEngine<S> {
    pub fn new(store: S, policy: LeavePolicy) -> Self {
        LeaveEngine {
            store,
            policy,
            overview_cache: Cache::builder()
                .max_capacity(256)
                .time_to_live(Duration::from_secs(30))
                .build(),
        }
    }

    pub async fn create_request(
        &self,
        new: NewLeave,
        created_by: &Actor,
    ) -> Result<LeaveRequest, EngineError> {
        if new.end_date < new.start_date {
            return Err(EngineError::Validation(
                "end_date cannot be before start_date".into(),
            ));
        }
        if new.description.trim().chars().count() < 10 {
            return Err(EngineError::Validation(
                "description must be at least 10 characters".into(),
            ));
        }

        let total_days =
            day_calc::calculate_days(new.start_date, new.end_date, new.start_part, new.end_part);
        // Non-annual leave is never reserved up front, only consumed on
        // approval.
        let reserve_days = if new.leave_type == LeaveType::Annual {
            total_days
        } else {
            Decimal::ZERO
        };

        let request = self
            .store
            .insert_request(
                NewRequest {
                    person_id: new.person_id,
                    unit_id: new.unit_id,
                    leave_type: new.leave_type,
                    start_date: new.start_date,
                    start_part: new.start_part,
                    end_date: new.end_date,
                    end_part: new.end_part,
                    total_days,
                    description: new.description,
                    attachment_url: new.attachment_url,
                    created_by_user_id: created_by.user_id,
                },
                reserve_days,
                self.policy.default_annual_entitlement,
            )
            .await?;

        self.overview_cache.invalidate_all();
        tracing::info!(
            target: "audit",
            request_no = %request.request_no,
            person_id = request.person_id,
            leave_type = %request.leave_type,
            total_days = %request.total_days,
            created_by = created_by.user_id,
            "leave request submitted"
        );
        Ok(request)
    }

    pub async fn approve(
        &self,
        id: Uuid,
        actor: &Actor,
        note: Option<String>,
    ) -> Result<LeaveRequest, EngineError> {
        self.transition(id, Trigger::Approve, actor, note).await
    }

    pub async fn reject(
        &self,
        id: Uuid,
        actor: &Actor,
        reason: String,
    ) -> Result<LeaveRequest, EngineError> {
        if reason.trim().chars().count() < 5 {
            return Err(EngineError::Validation(
                "rejection reason must be at least 5 characters".into(),
            ));
        }
        self.transition(id, Trigger::Reject, actor, Some(reason)).await
    }

    pub async fn request_changes(
        &self,
        id: Uuid,
        actor: &Actor,
        message: String,
    ) -> Result<LeaveRequest, EngineError> {
        if message.trim().is_empty() {
            return Err(EngineError::Validation(
                "a message describing the requested changes is required".into(),
            ));
        }
        self.transition(id, Trigger::RequestChanges, actor, Some(message))
            .await
    }

    pub async fn cancel(
        &self,
        id: Uuid,
        actor: &Actor,
        reason: Option<String>,
    ) -> Result<LeaveRequest, EngineError> {
        self.transition(id, Trigger::Cancel, actor, reason).await
    }

    async fn transition(
        &self,
        id: Uuid,
        trigger: Trigger,
        actor: &Actor,
        note: Option<String>,
    ) -> Result<LeaveRequest, EngineError> {
        let current = self.store.get_request(id).await?;
        let plan = transition::plan(&current, trigger, actor.decided_by(), note)?;
        let new_status = plan.new_status;
        let updated = self.store.apply_transition(plan).await?;

        self.overview_cache.invalidate_all();
        tracing::info!(
            target: "audit",
            request_no = %updated.request_no,
            person_id = updated.person_id,
            from = %current.status,
            to = %new_status,
            decided_by = actor.user_id,
            "leave transition applied"
        );
        Ok(updated)
    }

    pub async fn get_request(&self, id: Uuid) -> Result<LeaveRequest, EngineError> {
        self.store.get_request(id).await
    }

    pub async fn list_requests(
        &self,
        filter: &RequestFilter,
    ) -> Result<(Vec<LeaveRequest>, i64), EngineError> {
        self.store.list_requests(filter).await
    }

    pub async fn balance(&self, person_id: u64, year: i32) -> Result<LeaveBalance, EngineError> {
        self.store
            .get_or_create_balance(person_id, year, self.policy.default_annual_entitlement)
            .await
    }

    pub async fn adjust_balance(
        &self,
        person_id: u64,
        year: i32,
        delta_annual_entitled: Decimal,
        reason: String,
        actor: &Actor,
    ) -> Result<LeaveBalance, EngineError> {
        if reason.trim().is_empty() {
            return Err(EngineError::Validation(
                "an adjustment justification is required".into(),
            ));
        }
        let balance = self
            .store
            .adjust_entitlement(
                person_id,
                year,
                delta_annual_entitled,
                self.policy.default_annual_entitlement,
            )
            .await?;

        self.overview_cache.invalidate_all();
        tracing::info!(
            target: "audit",
            person_id,
            year,
            delta = %delta_annual_entitled,
            reason = %reason,
            adjusted_by = actor.user_id,
            "annual entitlement adjusted"
        );
        Ok(balance)
    }

    /// Read-side aggregation, cached per scope and invalidated on every
    /// mutation.
    pub async fn overview(&self, scope: OverviewScope) -> Result<Arc<Overview>, EngineError> {
        if let Some(hit) = self.overview_cache.get(&scope) {
            return Ok(hit);
        }

        let filter = match scope {
            OverviewScope::Person(person_id) => RequestFilter {
                person_id: Some(person_id),
                ..Default::default()
            },
            OverviewScope::Unit(unit_id) => RequestFilter {
                unit_id: Some(unit_id),
                ..Default::default()
            },
            OverviewScope::Global => RequestFilter::default(),
        };
        let (requests, _) = self.store.list_requests(&filter).await?;

        let today = Utc::now().date_naive();
        let kpi = overview::compute_kpi(&requests, today);

        let mut person_ids: Vec<u64> = requests.iter().map(|r| r.person_id).collect();
        if let OverviewScope::Person(person_id) = scope {
            person_ids.push(person_id);
        }
        person_ids.sort_unstable();
        person_ids.dedup();
        let balances = self.store.balances_for(&person_ids, today.year()).await?;

        let snapshot = Arc::new(Overview {
            kpi,
            requests,
            balances,
        });
        self.overview_cache.insert(scope, snapshot.clone());
        Ok(snapshot)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    use crate::model::leave_request::LeaveStatus;
    use crate::store::MemoryStore;

    fn engine() -> LeaveEngine<MemoryStore> {
        LeaveEngine::new(
            MemoryStore::new(),
            LeavePolicy {
                default_annual_entitlement: dec!(14),
            },
        )
    }

    fn requester() -> Actor {
        Actor {
            user_id: 7,
            name: "Riley".into(),
        }
    }

    fn approver() -> Actor {
        Actor {
            user_id: 50,
            name: "Sam".into(),
        }
    }

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn annual_leave(start: NaiveDate, end: NaiveDate) -> NewLeave {
        NewLeave {
            person_id: 7,
            unit_id: 2,
            leave_type: LeaveType::Annual,
            start_date: start,
            start_part: DayPart::Full,
            end_date: end,
            end_part: DayPart::Full,
            description: "three days by the sea".into(),
            attachment_url: None,
        }
    }

    /// Sum of total_days over the person's annual requests that should be
    /// reserved (pending / needs-changes) and used (approved).
    async fn expected_annual(
        engine: &LeaveEngine<MemoryStore>,
        person_id: u64,
    ) -> (Decimal, Decimal) {
        let (requests, _) = engine
            .list_requests(&RequestFilter {
                person_id: Some(person_id),
                ..Default::default()
            })
            .await
            .unwrap();
        let mut reserved = Decimal::ZERO;
        let mut used = Decimal::ZERO;
        for r in requests.iter().filter(|r| r.leave_type == LeaveType::Annual) {
            match r.status {
                LeaveStatus::Pending | LeaveStatus::NeedsChanges => reserved += r.total_days,
                LeaveStatus::Approved => used += r.total_days,
                LeaveStatus::Rejected | LeaveStatus::Cancelled => {}
            }
        }
        (reserved, used)
    }

    #[actix_web::test]
    async fn entitlement_scenario_annual_then_sick() {
        let engine = engine();

        // Annual 2024-02-10..12, full/full: 3 days reserved.
        let req = engine
            .create_request(annual_leave(d(2024, 2, 10), d(2024, 2, 12)), &requester())
            .await
            .unwrap();
        assert_eq!(req.total_days, dec!(3));
        assert_eq!(req.status, LeaveStatus::Pending);
        assert_eq!(req.request_no, "LR-2024-00001");

        let bal = engine.balance(7, 2024).await.unwrap();
        assert_eq!(bal.annual_entitled_days, dec!(14));
        assert_eq!(bal.annual_reserved_days, dec!(3));
        assert_eq!(bal.annual_used_days, dec!(0));

        // Approval moves the reservation to consumption.
        let approved = engine.approve(req.id, &approver(), None).await.unwrap();
        assert_eq!(approved.status, LeaveStatus::Approved);
        assert_eq!(approved.approvals.len(), 1);
        let bal = engine.balance(7, 2024).await.unwrap();
        assert_eq!(bal.annual_reserved_days, dec!(0));
        assert_eq!(bal.annual_used_days, dec!(3));
        assert_eq!(bal.annual_remaining(), dec!(11));

        // A sick request on the same day touches no annual counter and is
        // not reserved; it is consumed only once approved.
        let sick = engine
            .create_request(
                NewLeave {
                    leave_type: LeaveType::Sick,
                    description: "flu, doctor note attached".into(),
                    ..annual_leave(d(2024, 2, 12), d(2024, 2, 12))
                },
                &requester(),
            )
            .await
            .unwrap();
        let bal = engine.balance(7, 2024).await.unwrap();
        assert_eq!(bal.annual_reserved_days, dec!(0));
        assert_eq!(bal.annual_used_days, dec!(3));
        assert_eq!(bal.sick_used_days, dec!(0));

        engine.approve(sick.id, &approver(), None).await.unwrap();
        let bal = engine.balance(7, 2024).await.unwrap();
        assert_eq!(bal.used_for(LeaveType::Sick), dec!(1));
        assert_eq!(bal.annual_used_days, dec!(3));
        assert_eq!(bal.annual_remaining(), dec!(11));
    }

    #[actix_web::test]
    async fn double_approve_applies_the_balance_effect_once() {
        let engine = engine();
        let req = engine
            .create_request(annual_leave(d(2024, 2, 10), d(2024, 2, 12)), &requester())
            .await
            .unwrap();

        engine.approve(req.id, &approver(), None).await.unwrap();
        let err = engine.approve(req.id, &approver(), None).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidTransition { .. }));

        let bal = engine.balance(7, 2024).await.unwrap();
        assert_eq!(bal.annual_used_days, dec!(3));
        assert_eq!(bal.annual_reserved_days, dec!(0));
        // The failed call appended nothing.
        let after = engine.get_request(req.id).await.unwrap();
        assert_eq!(after.approvals.len(), 1);
    }

    #[actix_web::test]
    async fn approve_then_cancel_reverses_without_rereserving() {
        let engine = engine();
        let req = engine
            .create_request(annual_leave(d(2024, 2, 10), d(2024, 2, 12)), &requester())
            .await
            .unwrap();
        engine.approve(req.id, &approver(), None).await.unwrap();

        let cancelled = engine
            .cancel(req.id, &requester(), Some("plans changed".into()))
            .await
            .unwrap();
        assert_eq!(cancelled.status, LeaveStatus::Cancelled);

        let bal = engine.balance(7, 2024).await.unwrap();
        assert_eq!(bal.annual_used_days, dec!(0));
        assert_eq!(bal.annual_reserved_days, dec!(0));
    }

    #[actix_web::test]
    async fn reject_requires_a_real_reason() {
        let engine = engine();
        let req = engine
            .create_request(annual_leave(d(2024, 2, 10), d(2024, 2, 12)), &requester())
            .await
            .unwrap();

        for bad in ["", "abc"] {
            let err = engine
                .reject(req.id, &approver(), bad.to_string())
                .await
                .unwrap_err();
            assert!(matches!(err, EngineError::Validation(_)), "reason `{bad}`");
        }

        // The failed attempts released nothing.
        let bal = engine.balance(7, 2024).await.unwrap();
        assert_eq!(bal.annual_reserved_days, dec!(3));

        engine
            .reject(req.id, &approver(), "overlaps the release week".into())
            .await
            .unwrap();
        let bal = engine.balance(7, 2024).await.unwrap();
        assert_eq!(bal.annual_reserved_days, dec!(0));
        assert_eq!(bal.annual_used_days, dec!(0));
        let rejected = engine.get_request(req.id).await.unwrap();
        assert_eq!(
            rejected.rejection_reason.as_deref(),
            Some("overlaps the release week")
        );
    }

    #[actix_web::test]
    async fn create_validates_dates_and_description() {
        let engine = engine();

        let err = engine
            .create_request(annual_leave(d(2024, 2, 12), d(2024, 2, 10)), &requester())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));

        let err = engine
            .create_request(
                NewLeave {
                    description: "short".into(),
                    ..annual_leave(d(2024, 2, 10), d(2024, 2, 12))
                },
                &requester(),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));

        // Nothing was reserved by the failed attempts.
        let bal = engine.balance(7, 2024).await.unwrap();
        assert_eq!(bal.annual_reserved_days, dec!(0));
    }

    #[actix_web::test]
    async fn changes_requested_keeps_reservation_until_decided() {
        let engine = engine();
        let req = engine
            .create_request(annual_leave(d(2024, 2, 10), d(2024, 2, 12)), &requester())
            .await
            .unwrap();

        let changed = engine
            .request_changes(req.id, &approver(), "please shift by one week".into())
            .await
            .unwrap();
        assert_eq!(changed.status, LeaveStatus::NeedsChanges);
        let bal = engine.balance(7, 2024).await.unwrap();
        assert_eq!(bal.annual_reserved_days, dec!(3));

        engine.approve(req.id, &approver(), None).await.unwrap();
        let bal = engine.balance(7, 2024).await.unwrap();
        assert_eq!(bal.annual_reserved_days, dec!(0));
        assert_eq!(bal.annual_used_days, dec!(3));

        let decided = engine.get_request(req.id).await.unwrap();
        assert_eq!(decided.approvals.len(), 2);
    }

    #[actix_web::test]
    async fn ledger_matches_request_statuses_throughout() {
        let engine = engine();
        let a = engine
            .create_request(annual_leave(d(2024, 3, 4), d(2024, 3, 6)), &requester())
            .await
            .unwrap();
        let b = engine
            .create_request(annual_leave(d(2024, 4, 1), d(2024, 4, 1)), &requester())
            .await
            .unwrap();
        let c = engine
            .create_request(annual_leave(d(2024, 5, 13), d(2024, 5, 17)), &requester())
            .await
            .unwrap();

        let check = |label: &'static str| {
            let engine = &engine;
            async move {
                let (reserved, used) = expected_annual(engine, 7).await;
                let bal = engine.balance(7, 2024).await.unwrap();
                assert_eq!(bal.annual_reserved_days, reserved, "{label}: reserved");
                assert_eq!(bal.annual_used_days, used, "{label}: used");
            }
        };

        check("after submissions").await;
        engine.approve(a.id, &approver(), None).await.unwrap();
        check("after approving a").await;
        engine
            .request_changes(b.id, &approver(), "take the Friday instead".into())
            .await
            .unwrap();
        check("after changes on b").await;
        engine
            .reject(c.id, &approver(), "too close to the audit".into())
            .await
            .unwrap();
        check("after rejecting c").await;
        engine.cancel(b.id, &requester(), None).await.unwrap();
        check("after cancelling b").await;
        engine
            .reject(a.id, &approver(), "entered for the wrong person".into())
            .await
            .unwrap();
        check("after reversing a").await;

        // Everything ended terminal and released.
        let bal = engine.balance(7, 2024).await.unwrap();
        assert_eq!(bal.annual_reserved_days, dec!(0));
        assert_eq!(bal.annual_used_days, dec!(0));
    }

    #[actix_web::test]
    async fn adjust_balance_requires_justification() {
        let engine = engine();
        let err = engine
            .adjust_balance(7, 2024, dec!(5), "  ".into(), &approver())
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::Validation(_)));

        let bal = engine
            .adjust_balance(7, 2024, dec!(5), "seniority step".into(), &approver())
            .await
            .unwrap();
        assert_eq!(bal.annual_entitled_days, dec!(19));
    }

    #[actix_web::test]
    async fn unknown_request_is_not_found() {
        let engine = engine();
        let err = engine
            .approve(Uuid::new_v4(), &approver(), None)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFound(_)));
    }

    #[actix_web::test]
    async fn overview_reflects_mutations_despite_caching() {
        let engine = engine();
        let scope = OverviewScope::Person(7);

        let before = engine.overview(scope).await.unwrap();
        assert_eq!(before.kpi.pending_count, 0);

        let req = engine
            .create_request(annual_leave(d(2024, 2, 10), d(2024, 2, 12)), &requester())
            .await
            .unwrap();
        let after_submit = engine.overview(scope).await.unwrap();
        assert_eq!(after_submit.kpi.pending_count, 1);
        assert_eq!(after_submit.requests.len(), 1);

        engine.approve(req.id, &approver(), None).await.unwrap();
        let after_approve = engine.overview(scope).await.unwrap();
        assert_eq!(after_approve.kpi.pending_count, 0);
    }
}
