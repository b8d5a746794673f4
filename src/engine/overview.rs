use chrono::{Datelike, NaiveDate};
use rust_decimal::Decimal;
use serde::Serialize;
use utoipa::ToSchema;

use crate::model::leave_balance::LeaveBalance;
use crate::model::leave_request::{LeaveRequest, LeaveStatus};

/// Visibility scope of an overview read, resolved from the caller's role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OverviewScope {
    Person(u64),
    Unit(u64),
    Global,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct OverviewKpi {
    /// Requests currently awaiting an approver decision.
    pub pending_count: u64,
    /// Approved requests whose range covers today.
    pub out_today: u64,
    /// Sum of total_days over approved requests starting this month.
    #[schema(value_type = String, example = "7.5")]
    pub month_approved_days: Decimal,
    /// Approved/pending requests sharing a unit and at least one day
    /// with another such request.
    pub conflict_count: u64,
}

#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct Overview {
    pub kpi: OverviewKpi,
    pub requests: Vec<LeaveRequest>,
    pub balances: Vec<LeaveBalance>,
}

pub(crate) fn compute_kpi(requests: &[LeaveRequest], today: NaiveDate) -> OverviewKpi {
    let pending_count = requests
        .iter()
        .filter(|r| r.status == LeaveStatus::Pending)
        .count() as u64;

    let out_today = requests
        .iter()
        .filter(|r| r.status == LeaveStatus::Approved && r.covers(today))
        .count() as u64;

    let month_approved_days = requests
        .iter()
        .filter(|r| {
            r.status == LeaveStatus::Approved
                && r.start_date.year() == today.year()
                && r.start_date.month() == today.month()
        })
        .map(|r| r.total_days)
        .sum();

    let active: Vec<&LeaveRequest> = requests
        .iter()
        .filter(|r| matches!(r.status, LeaveStatus::Approved | LeaveStatus::Pending))
        .collect();
    let conflict_count = active
        .iter()
        .filter(|r| {
            active
                .iter()
                .any(|other| other.id != r.id && other.unit_id == r.unit_id && r.overlaps(other))
        })
        .count() as u64;

    OverviewKpi {
        pending_count,
        out_today,
        month_approved_days,
        conflict_count,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use uuid::Uuid;

    use crate::model::leave_request::{DayPart, LeaveType};

    fn d(y: i32, m: u32, day: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, day).unwrap()
    }

    fn request(
        person_id: u64,
        unit_id: u64,
        status: LeaveStatus,
        start: NaiveDate,
        end: NaiveDate,
        days: Decimal,
    ) -> LeaveRequest {
        LeaveRequest {
            id: Uuid::new_v4(),
            request_no: String::new(),
            person_id,
            unit_id,
            leave_type: LeaveType::Annual,
            start_date: start,
            start_part: DayPart::Full,
            end_date: end,
            end_part: DayPart::Full,
            total_days: days,
            description: "a description long enough".into(),
            attachment_url: None,
            status,
            approvals: vec![],
            rejection_reason: None,
            created_by_user_id: person_id,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            version: 0,
        }
    }

    #[test]
    fn counts_pending_and_out_today() {
        let today = d(2024, 6, 12);
        let requests = vec![
            request(1, 1, LeaveStatus::Pending, d(2024, 7, 1), d(2024, 7, 2), dec!(2)),
            request(2, 1, LeaveStatus::Approved, d(2024, 6, 10), d(2024, 6, 14), dec!(5)),
            request(3, 2, LeaveStatus::Approved, d(2024, 6, 20), d(2024, 6, 21), dec!(2)),
            request(4, 2, LeaveStatus::Rejected, d(2024, 6, 12), d(2024, 6, 12), dec!(1)),
        ];
        let kpi = compute_kpi(&requests, today);
        assert_eq!(kpi.pending_count, 1);
        assert_eq!(kpi.out_today, 1);
        assert_eq!(kpi.month_approved_days, dec!(7));
    }

    #[test]
    fn conflicts_require_same_unit_and_overlap() {
        let today = d(2024, 6, 12);
        let requests = vec![
            // Same unit, overlapping: both conflict.
            request(1, 1, LeaveStatus::Approved, d(2024, 6, 10), d(2024, 6, 14), dec!(5)),
            request(2, 1, LeaveStatus::Pending, d(2024, 6, 13), d(2024, 6, 15), dec!(3)),
            // Other unit, same dates: no partner there.
            request(3, 2, LeaveStatus::Approved, d(2024, 6, 13), d(2024, 6, 15), dec!(3)),
            // Same unit but disjoint dates.
            request(4, 1, LeaveStatus::Pending, d(2024, 8, 1), d(2024, 8, 2), dec!(2)),
            // Overlapping but cancelled, so out of the running.
            request(5, 1, LeaveStatus::Cancelled, d(2024, 6, 13), d(2024, 6, 14), dec!(2)),
        ];
        let kpi = compute_kpi(&requests, today);
        assert_eq!(kpi.conflict_count, 2);
    }

    #[test]
    fn needs_changes_is_not_counted_as_pending_approval() {
        let today = d(2024, 6, 12);
        let requests = vec![request(
            1,
            1,
            LeaveStatus::NeedsChanges,
            d(2024, 7, 1),
            d(2024, 7, 2),
            dec!(2),
        )];
        let kpi = compute_kpi(&requests, today);
        assert_eq!(kpi.pending_count, 0);
        assert_eq!(kpi.conflict_count, 0);
    }
}
