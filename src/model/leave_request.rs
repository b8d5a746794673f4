use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum_macros::{Display, EnumString};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LeaveType {
    Annual,
    Sick,
    Excuse,
    Unpaid,
    Other,
}

/// Which half of a boundary day is taken. FULL is the whole day.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum DayPart {
    Full,
    Am,
    Pm,
}

impl Default for DayPart {
    fn default() -> Self {
        DayPart::Full
    }
}

impl DayPart {
    pub fn is_half(self) -> bool {
        self != DayPart::Full
    }
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum LeaveStatus {
    Pending,
    Approved,
    Rejected,
    Cancelled,
    NeedsChanges,
}

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum Decision {
    Approved,
    Rejected,
    ChangesRequested,
    Cancelled,
}

/// One decision event. A request accumulates several across a
/// changes-requested -> resubmit -> approve cycle.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LeaveApproval {
    #[schema(value_type = String, format = "uuid")]
    pub id: Uuid,
    #[schema(value_type = String, format = "uuid")]
    pub request_id: Uuid,
    pub approver_user_id: u64,
    pub approver_name: String,
    pub decision: Decision,
    pub note: Option<String>,
    #[schema(value_type = String, format = "date-time")]
    pub decided_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct LeaveRequest {
    #[schema(value_type = String, format = "uuid")]
    pub id: Uuid,
    /// Human-readable sequence number, e.g. LR-2024-00042
    #[schema(example = "LR-2024-00042")]
    pub request_no: String,
    pub person_id: u64,
    pub unit_id: u64,
    pub leave_type: LeaveType,
    #[schema(value_type = String, format = "date")]
    pub start_date: NaiveDate,
    pub start_part: DayPart,
    #[schema(value_type = String, format = "date")]
    pub end_date: NaiveDate,
    pub end_part: DayPart,
    /// Computed at submission, immutable afterwards. 0.5-day granularity.
    #[schema(value_type = String, example = "2.5")]
    pub total_days: Decimal,
    pub description: String,
    pub attachment_url: Option<String>,
    pub status: LeaveStatus,
    pub approvals: Vec<LeaveApproval>,
    pub rejection_reason: Option<String>,
    pub created_by_user_id: u64,
    #[schema(value_type = String, format = "date-time")]
    pub created_at: DateTime<Utc>,
    #[schema(value_type = String, format = "date-time")]
    pub updated_at: DateTime<Utc>,
    /// Optimistic-locking counter, bumped on every transition.
    #[serde(skip_serializing)]
    #[serde(default)]
    pub version: u64,
}

impl LeaveRequest {
    /// Ledger year this request charges against.
    pub fn balance_year(&self) -> i32 {
        use chrono::Datelike;
        self.start_date.year()
    }

    pub fn covers(&self, day: NaiveDate) -> bool {
        self.start_date <= day && day <= self.end_date
    }

    pub fn overlaps(&self, other: &LeaveRequest) -> bool {
        self.start_date <= other.end_date && other.start_date <= self.end_date
    }
}
