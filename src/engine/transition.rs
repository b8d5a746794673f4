use chrono::Utc;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::error::EngineError;
use crate::model::leave_request::{Decision, LeaveApproval, LeaveRequest, LeaveStatus, LeaveType};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    Approve,
    Reject,
    RequestChanges,
    Cancel,
}

impl Trigger {
    pub fn as_str(self) -> &'static str {
        match self {
            Trigger::Approve => "approve",
            Trigger::Reject => "reject",
            Trigger::RequestChanges => "request changes on",
            Trigger::Cancel => "cancel",
        }
    }

    fn decision(self) -> Decision {
        match self {
            Trigger::Approve => Decision::Approved,
            Trigger::Reject => Decision::Rejected,
            Trigger::RequestChanges => Decision::ChangesRequested,
            Trigger::Cancel => Decision::Cancelled,
        }
    }
}

/// How a transition touches the ledger for the request's person/year.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BalanceEffect {
    /// No ledger movement (request-changes keeps the reservation).
    Keep,
    /// Reservation becomes consumption (annual) or consumption starts (other types).
    Commit,
    /// Drop a reservation without consuming.
    Release,
    /// Undo a consumption that already happened.
    Reverse,
}

/// Everything a store needs to apply one transition atomically: the new
/// status, the signed ledger deltas, and the approval record to append.
#[derive(Debug, Clone)]
pub struct TransitionPlan {
    pub request_id: Uuid,
    pub expected_version: u64,
    pub new_status: LeaveStatus,
    pub person_id: u64,
    pub year: i32,
    pub leave_type: LeaveType,
    /// Applied to annual_reserved_days.
    pub reserved_delta: Decimal,
    /// Applied to the used counter of `leave_type`.
    pub used_delta: Decimal,
    pub approval: LeaveApproval,
    pub rejection_reason: Option<String>,
}

pub struct DecidedBy {
    pub user_id: u64,
    pub name: String,
}

/// The transition table. Any (trigger, status) pair not listed here fails
/// with InvalidTransition and must mutate nothing.
fn step(trigger: Trigger, from: LeaveStatus) -> Option<(LeaveStatus, BalanceEffect)> {
    use BalanceEffect::*;
    use LeaveStatus::*;
    match (trigger, from) {
        (Trigger::Approve, Pending | NeedsChanges) => Some((Approved, Commit)),
        (Trigger::Reject, Pending | NeedsChanges) => Some((Rejected, Release)),
        (Trigger::Reject, Approved) => Some((Rejected, Reverse)),
        (Trigger::RequestChanges, Pending) => Some((NeedsChanges, Keep)),
        (Trigger::Cancel, Pending | NeedsChanges) => Some((Cancelled, Release)),
        (Trigger::Cancel, Approved) => Some((Cancelled, Reverse)),
        _ => None,
    }
}

/// Build the atomic plan for applying `trigger` to `request`.
///
/// Only ANNUAL requests move the reserved counter; other types are never
/// reserved, so releasing their (non-existent) reservation is a no-op and
/// only commit/reverse touch their used counter.
pub fn plan(
    request: &LeaveRequest,
    trigger: Trigger,
    decided_by: DecidedBy,
    note: Option<String>,
) -> Result<TransitionPlan, EngineError> {
    let (new_status, effect) =
        step(trigger, request.status).ok_or(EngineError::InvalidTransition {
            trigger: trigger.as_str(),
            from: request.status,
        })?;

    let days = request.total_days;
    let annual = request.leave_type == LeaveType::Annual;
    let (reserved_delta, used_delta) = match effect {
        BalanceEffect::Keep => (Decimal::ZERO, Decimal::ZERO),
        BalanceEffect::Commit if annual => (-days, days),
        BalanceEffect::Commit => (Decimal::ZERO, days),
        BalanceEffect::Release if annual => (-days, Decimal::ZERO),
        BalanceEffect::Release => (Decimal::ZERO, Decimal::ZERO),
        BalanceEffect::Reverse => (Decimal::ZERO, -days),
    };

    let rejection_reason = if trigger == Trigger::Reject {
        note.clone()
    } else {
        None
    };

    Ok(TransitionPlan {
        request_id: request.id,
        expected_version: request.version,
        new_status,
        person_id: request.person_id,
        year: request.balance_year(),
        leave_type: request.leave_type,
        reserved_delta,
        used_delta,
        approval: LeaveApproval {
            id: Uuid::new_v4(),
            request_id: request.id,
            approver_user_id: decided_by.user_id,
            approver_name: decided_by.name,
            decision: trigger.decision(),
            note,
            decided_at: Utc::now(),
        },
        rejection_reason,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;

    use crate::model::leave_request::DayPart;

    fn request(leave_type: LeaveType, status: LeaveStatus) -> LeaveRequest {
        let day = NaiveDate::from_ymd_opt(2024, 2, 10).unwrap();
        LeaveRequest {
            id: Uuid::new_v4(),
            request_no: "LR-2024-00001".into(),
            person_id: 7,
            unit_id: 2,
            leave_type,
            start_date: day,
            start_part: DayPart::Full,
            end_date: day + chrono::Days::new(2),
            end_part: DayPart::Full,
            total_days: dec!(3),
            description: "family travel, long planned".into(),
            attachment_url: None,
            status,
            approvals: vec![],
            rejection_reason: None,
            created_by_user_id: 7,
            created_at: Utc::now(),
            updated_at: Utc::now(),
            version: 0,
        }
    }

    fn actor() -> DecidedBy {
        DecidedBy {
            user_id: 99,
            name: "Pat".into(),
        }
    }

    #[test]
    fn approve_annual_moves_reserved_to_used() {
        let p = plan(
            &request(LeaveType::Annual, LeaveStatus::Pending),
            Trigger::Approve,
            actor(),
            None,
        )
        .unwrap();
        assert_eq!(p.new_status, LeaveStatus::Approved);
        assert_eq!(p.reserved_delta, dec!(-3));
        assert_eq!(p.used_delta, dec!(3));
        assert_eq!(p.approval.decision, Decision::Approved);
    }

    #[test]
    fn approve_sick_commits_without_touching_reserved() {
        let p = plan(
            &request(LeaveType::Sick, LeaveStatus::Pending),
            Trigger::Approve,
            actor(),
            None,
        )
        .unwrap();
        assert_eq!(p.reserved_delta, Decimal::ZERO);
        assert_eq!(p.used_delta, dec!(3));
    }

    #[test]
    fn reject_pending_annual_releases_reservation_only() {
        let p = plan(
            &request(LeaveType::Annual, LeaveStatus::Pending),
            Trigger::Reject,
            actor(),
            Some("dates clash with audit week".into()),
        )
        .unwrap();
        assert_eq!(p.new_status, LeaveStatus::Rejected);
        assert_eq!(p.reserved_delta, dec!(-3));
        assert_eq!(p.used_delta, Decimal::ZERO);
        assert_eq!(p.rejection_reason.as_deref(), Some("dates clash with audit week"));
    }

    #[test]
    fn reject_pending_sick_moves_nothing() {
        let p = plan(
            &request(LeaveType::Sick, LeaveStatus::Pending),
            Trigger::Reject,
            actor(),
            Some("needs a certificate".into()),
        )
        .unwrap();
        assert_eq!(p.reserved_delta, Decimal::ZERO);
        assert_eq!(p.used_delta, Decimal::ZERO);
    }

    #[test]
    fn cancel_approved_reverses_consumption_without_rereserving() {
        let p = plan(
            &request(LeaveType::Annual, LeaveStatus::Approved),
            Trigger::Cancel,
            actor(),
            None,
        )
        .unwrap();
        assert_eq!(p.new_status, LeaveStatus::Cancelled);
        assert_eq!(p.reserved_delta, Decimal::ZERO);
        assert_eq!(p.used_delta, dec!(-3));
    }

    #[test]
    fn reject_approved_is_a_reversal() {
        let p = plan(
            &request(LeaveType::Annual, LeaveStatus::Approved),
            Trigger::Reject,
            actor(),
            Some("entered against the wrong week".into()),
        )
        .unwrap();
        assert_eq!(p.new_status, LeaveStatus::Rejected);
        assert_eq!(p.used_delta, dec!(-3));
    }

    #[test]
    fn request_changes_keeps_reservation() {
        let p = plan(
            &request(LeaveType::Annual, LeaveStatus::Pending),
            Trigger::RequestChanges,
            actor(),
            Some("please shorten to two days".into()),
        )
        .unwrap();
        assert_eq!(p.new_status, LeaveStatus::NeedsChanges);
        assert_eq!(p.reserved_delta, Decimal::ZERO);
        assert_eq!(p.used_delta, Decimal::ZERO);
    }

    #[test]
    fn approve_from_needs_changes_is_allowed() {
        let p = plan(
            &request(LeaveType::Annual, LeaveStatus::NeedsChanges),
            Trigger::Approve,
            actor(),
            None,
        )
        .unwrap();
        assert_eq!(p.new_status, LeaveStatus::Approved);
    }

    #[test]
    fn undeclared_transitions_are_rejected() {
        let cases = [
            (Trigger::Approve, LeaveStatus::Approved),
            (Trigger::Approve, LeaveStatus::Rejected),
            (Trigger::Approve, LeaveStatus::Cancelled),
            (Trigger::Reject, LeaveStatus::Rejected),
            (Trigger::Reject, LeaveStatus::Cancelled),
            (Trigger::RequestChanges, LeaveStatus::NeedsChanges),
            (Trigger::RequestChanges, LeaveStatus::Approved),
            (Trigger::Cancel, LeaveStatus::Rejected),
            (Trigger::Cancel, LeaveStatus::Cancelled),
        ];
        for (trigger, from) in cases {
            let err = plan(&request(LeaveType::Annual, from), trigger, actor(), None).unwrap_err();
            assert!(
                matches!(err, EngineError::InvalidTransition { .. }),
                "{trigger:?} from {from:?} should be invalid"
            );
        }
    }
}
