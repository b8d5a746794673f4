use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::model::leave_request::LeaveType;

/// Per-person, per-year ledger. Created lazily on first reference, mutated
/// only by the lifecycle engine, never deleted.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LeaveBalance {
    pub person_id: u64,
    pub year: i32,
    #[schema(value_type = String, example = "20")]
    pub annual_entitled_days: Decimal,
    #[schema(value_type = String, example = "3")]
    pub annual_used_days: Decimal,
    /// Sum of total_days over this person's ANNUAL requests currently
    /// pending or awaiting changes.
    #[schema(value_type = String, example = "1.5")]
    pub annual_reserved_days: Decimal,
    #[schema(value_type = String, example = "0")]
    pub sick_used_days: Decimal,
    #[schema(value_type = String, example = "0")]
    pub excuse_used_days: Decimal,
    #[schema(value_type = String, example = "0")]
    pub unpaid_used_days: Decimal,
    #[schema(value_type = String, example = "0")]
    pub other_used_days: Decimal,
    #[schema(value_type = String, format = "date-time")]
    pub updated_at: DateTime<Utc>,
}

impl LeaveBalance {
    pub fn new(person_id: u64, year: i32, annual_entitled_days: Decimal) -> Self {
        LeaveBalance {
            person_id,
            year,
            annual_entitled_days,
            annual_used_days: Decimal::ZERO,
            annual_reserved_days: Decimal::ZERO,
            sick_used_days: Decimal::ZERO,
            excuse_used_days: Decimal::ZERO,
            unpaid_used_days: Decimal::ZERO,
            other_used_days: Decimal::ZERO,
            updated_at: Utc::now(),
        }
    }

    pub fn annual_remaining(&self) -> Decimal {
        self.annual_entitled_days - self.annual_used_days - self.annual_reserved_days
    }

    pub fn used_for(&self, leave_type: LeaveType) -> Decimal {
        match leave_type {
            LeaveType::Annual => self.annual_used_days,
            LeaveType::Sick => self.sick_used_days,
            LeaveType::Excuse => self.excuse_used_days,
            LeaveType::Unpaid => self.unpaid_used_days,
            LeaveType::Other => self.other_used_days,
        }
    }

    pub(crate) fn used_for_mut(&mut self, leave_type: LeaveType) -> &mut Decimal {
        match leave_type {
            LeaveType::Annual => &mut self.annual_used_days,
            LeaveType::Sick => &mut self.sick_used_days,
            LeaveType::Excuse => &mut self.excuse_used_days,
            LeaveType::Unpaid => &mut self.unpaid_used_days,
            LeaveType::Other => &mut self.other_used_days,
        }
    }
}
