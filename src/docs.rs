use crate::api::balance::AdjustBalance;
use crate::api::leave_request::{
    ApproveBody, CancelBody, ChangesBody, CreateLeave, LeaveFilter, LeaveListResponse, RejectBody,
};
use crate::engine::overview::{Overview, OverviewKpi};
use crate::model::leave_balance::LeaveBalance;
use crate::model::leave_request::{
    DayPart, Decision, LeaveApproval, LeaveRequest, LeaveStatus, LeaveType,
};
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Leave Ledger API",
        version = "1.0.0",
        description = r#"
## Leave-Request Lifecycle & Balance Ledger

This API tracks how many paid/unpaid/sick/annual days a person has consumed,
reserved, or may still use, and enforces the state transitions a leave
request may undergo while keeping the ledger consistent.

### 🔹 Key Features
- **Leave Requests**
  - Submit, approve, reject, request changes, and cancel leave
  - Post-hoc reversal of approved requests
- **Balance Ledger**
  - Per-person, per-year entitled/used/reserved counters
  - Administrative entitlement adjustments with audit logging
- **Overview**
  - Pending counts, out-today, month-to-date days, unit conflicts

### 🔐 Security
An upstream identity gateway authenticates callers and forwards
`X-Person-Id`, `X-Person-Name`, `X-Role` and `X-Unit-Id` headers.
Visibility and decision rights follow the forwarded role.

### 📦 Response Format
- JSON-based RESTful responses
- Pagination supported for list endpoints

---
Built with **Rust**, **Actix Web**, **SQLx**, and **Utoipa**.
"#,
    ),
    paths(
        crate::api::leave_request::leave_list,
        crate::api::leave_request::get_leave,
        crate::api::leave_request::create_leave,
        crate::api::leave_request::approve_leave,
        crate::api::leave_request::reject_leave,
        crate::api::leave_request::request_changes,
        crate::api::leave_request::cancel_leave,

        crate::api::balance::get_balance,
        crate::api::balance::adjust_balance,

        crate::api::overview::get_overview
    ),
    components(
        schemas(
            LeaveRequest,
            LeaveApproval,
            LeaveBalance,
            LeaveType,
            LeaveStatus,
            DayPart,
            Decision,
            CreateLeave,
            ApproveBody,
            RejectBody,
            ChangesBody,
            CancelBody,
            LeaveFilter,
            LeaveListResponse,
            AdjustBalance,
            Overview,
            OverviewKpi
        )
    ),
    tags(
        (name = "Leave", description = "Leave request lifecycle APIs"),
        (name = "Balance", description = "Balance ledger APIs"),
        (name = "Overview", description = "Read-side aggregation APIs"),
    )
)]
pub struct ApiDoc;
