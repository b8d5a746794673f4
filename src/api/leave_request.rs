use crate::auth::auth::AuthUser;
use crate::engine::{AppEngine, NewLeave};
use crate::model::leave_request::{DayPart, LeaveRequest, LeaveStatus, LeaveType};
use crate::model::role::Role;
use crate::store::RequestFilter;
use actix_web::{HttpResponse, Responder, web};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

#[derive(Deserialize, ToSchema)]
pub struct CreateLeave {
    /// Person the leave is for; defaults to the caller. Creating for
    /// someone else needs HR/Admin.
    #[schema(example = 1000)]
    pub person_id: Option<u64>,
    /// Unit the request is charged against; defaults to the caller's unit.
    #[schema(example = 3)]
    pub unit_id: Option<u64>,
    #[schema(example = "annual")]
    pub leave_type: LeaveType,
    #[schema(example = "2026-01-05", format = "date", value_type = String)]
    pub start_date: NaiveDate,
    #[serde(default)]
    #[schema(example = "full")]
    pub start_part: DayPart,
    #[schema(example = "2026-01-07", format = "date", value_type = String)]
    pub end_date: NaiveDate,
    #[serde(default)]
    #[schema(example = "full")]
    pub end_part: DayPart,
    #[schema(example = "Family visit over the long weekend")]
    pub description: String,
    pub attachment_url: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct ApproveBody {
    #[schema(example = "Enjoy!")]
    pub note: Option<String>,
}

#[derive(Deserialize, ToSchema)]
pub struct RejectBody {
    /// At least 5 characters.
    #[schema(example = "Overlaps the release week")]
    pub reason: String,
}

#[derive(Deserialize, ToSchema)]
pub struct ChangesBody {
    #[schema(example = "Please shift the range by one week")]
    pub message: String,
}

#[derive(Deserialize, ToSchema)]
pub struct CancelBody {
    pub reason: Option<String>,
}

#[derive(Deserialize, IntoParams, ToSchema)]
pub struct LeaveFilter {
    #[schema(example = 123)]
    /// Filter by person ID
    pub person_id: Option<u64>,
    #[schema(example = "pending", value_type = String)]
    /// Filter by leave status
    pub status: Option<LeaveStatus>,
    #[schema(example = 1)]
    /// Pagination page number (start with 1)
    pub page: Option<u64>, // 1-based
    #[schema(example = 10)]
    /// Pagination per page number
    pub per_page: Option<u64>, // items per page
}

#[derive(Serialize, ToSchema)]
pub struct LeaveListResponse {
    pub data: Vec<LeaveRequest>,
    #[schema(example = 1)]
    pub page: u32,
    #[schema(example = 10)]
    pub per_page: u32,
    #[schema(example = 1)]
    pub total: i64,
}

/* =========================
Create leave request
========================= */
#[utoipa::path(
    post,
    path = "/api/leave",
    request_body(
        content = CreateLeave,
        description = "Leave request payload",
        content_type = "application/json"
    ),
    responses(
        (status = 200, description = "Leave request submitted", body = LeaveRequest),
        (status = 400, description = "Validation failed"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    tag = "Leave"
)]
pub async fn create_leave(
    auth: AuthUser,
    engine: web::Data<AppEngine>,
    payload: web::Json<CreateLeave>,
) -> actix_web::Result<impl Responder> {
    let payload = payload.into_inner();
    let person_id = payload.person_id.unwrap_or(auth.person_id);
    if person_id != auth.person_id {
        auth.require_hr_or_admin()?;
    }

    let request = engine
        .create_request(
            NewLeave {
                person_id,
                unit_id: payload.unit_id.unwrap_or(auth.unit_id),
                leave_type: payload.leave_type,
                start_date: payload.start_date,
                start_part: payload.start_part,
                end_date: payload.end_date,
                end_part: payload.end_part,
                description: payload.description,
                attachment_url: payload.attachment_url,
            },
            &auth.actor(),
        )
        .await?;

    Ok(HttpResponse::Ok().json(request))
}

/* =========================
Approve leave (Manager/HR/Admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/approve",
    params(
        ("leave_id" = String, Path, description = "ID of the leave request to approve")
    ),
    request_body = ApproveBody,
    responses(
        (status = 200, description = "Leave approved", body = LeaveRequest),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Not approvable from its current status"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    tag = "Leave"
)]
pub async fn approve_leave(
    auth: AuthUser,
    engine: web::Data<AppEngine>,
    path: web::Path<Uuid>,
    payload: web::Json<ApproveBody>,
) -> actix_web::Result<impl Responder> {
    auth.require_approver()?;
    let request = engine
        .approve(path.into_inner(), &auth.actor(), payload.into_inner().note)
        .await?;
    Ok(HttpResponse::Ok().json(request))
}

/* =========================
Reject leave (Manager/HR/Admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/reject",
    params(
        ("leave_id" = String, Path, description = "ID of the leave request to reject")
    ),
    request_body = RejectBody,
    responses(
        (status = 200, description = "Leave rejected", body = LeaveRequest),
        (status = 400, description = "Reason too short"),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Not rejectable from its current status"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    tag = "Leave"
)]
pub async fn reject_leave(
    auth: AuthUser,
    engine: web::Data<AppEngine>,
    path: web::Path<Uuid>,
    payload: web::Json<RejectBody>,
) -> actix_web::Result<impl Responder> {
    auth.require_approver()?;
    let request = engine
        .reject(path.into_inner(), &auth.actor(), payload.into_inner().reason)
        .await?;
    Ok(HttpResponse::Ok().json(request))
}

/* =========================
Request changes (Manager/HR/Admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/request-changes",
    params(
        ("leave_id" = String, Path, description = "ID of the leave request")
    ),
    request_body = ChangesBody,
    responses(
        (status = 200, description = "Changes requested", body = LeaveRequest),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Only pending requests can be sent back"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    tag = "Leave"
)]
pub async fn request_changes(
    auth: AuthUser,
    engine: web::Data<AppEngine>,
    path: web::Path<Uuid>,
    payload: web::Json<ChangesBody>,
) -> actix_web::Result<impl Responder> {
    auth.require_approver()?;
    let request = engine
        .request_changes(path.into_inner(), &auth.actor(), payload.into_inner().message)
        .await?;
    Ok(HttpResponse::Ok().json(request))
}

/* =========================
Cancel leave (owner, or Manager/HR/Admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/leave/{leave_id}/cancel",
    params(
        ("leave_id" = String, Path, description = "ID of the leave request to cancel")
    ),
    request_body = CancelBody,
    responses(
        (status = 200, description = "Leave cancelled", body = LeaveRequest),
        (status = 404, description = "Leave request not found"),
        (status = 409, description = "Not cancellable from its current status"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    tag = "Leave"
)]
pub async fn cancel_leave(
    auth: AuthUser,
    engine: web::Data<AppEngine>,
    path: web::Path<Uuid>,
    payload: web::Json<CancelBody>,
) -> actix_web::Result<impl Responder> {
    let id = path.into_inner();
    let existing = engine.get_request(id).await?;
    if existing.person_id != auth.person_id {
        auth.require_approver()?;
    }
    let request = engine
        .cancel(id, &auth.actor(), payload.into_inner().reason)
        .await?;
    Ok(HttpResponse::Ok().json(request))
}

/// for getting a leave application details endpoint
#[utoipa::path(
    get,
    path = "/api/leave/{leave_id}",
    params(
        ("leave_id" = String, Path, description = "ID of the leave request to fetch")
    ),
    responses(
        (status = 200, description = "Leave request found", body = LeaveRequest),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden"),
        (status = 404, description = "Leave request not found")
    ),
    tag = "Leave"
)]
pub async fn get_leave(
    auth: AuthUser,
    engine: web::Data<AppEngine>,
    path: web::Path<Uuid>,
) -> actix_web::Result<impl Responder> {
    let request = engine.get_request(path.into_inner()).await?;

    let visible = request.person_id == auth.person_id
        || matches!(auth.role, Role::Admin | Role::Hr)
        || (auth.role == Role::Manager && request.unit_id == auth.unit_id);
    if !visible {
        return Err(actix_web::error::ErrorForbidden("Not visible to caller"));
    }

    Ok(HttpResponse::Ok().json(request))
}

/// for getting leave applications endpoint
#[utoipa::path(
    get,
    path = "/api/leave",
    params(LeaveFilter),
    responses(
        (status = 200, description = "Paginated leave list", body = LeaveListResponse),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Leave"
)]
pub async fn leave_list(
    auth: AuthUser,
    engine: web::Data<AppEngine>,
    query: web::Query<LeaveFilter>,
) -> actix_web::Result<impl Responder> {
    // -------------------------
    // Pagination
    // -------------------------
    let per_page = query.per_page.unwrap_or(10).min(100);
    let page = query.page.unwrap_or(1).max(1);
    let offset = (page - 1) * per_page;

    // -------------------------
    // Visibility: employees see themselves, managers their unit.
    // -------------------------
    let mut filter = RequestFilter {
        person_id: query.person_id,
        unit_id: None,
        status: query.status,
        limit: Some(per_page),
        offset,
    };
    if auth.is_employee() {
        filter.person_id = Some(auth.person_id);
    } else if auth.role == Role::Manager {
        filter.unit_id = Some(auth.unit_id);
    }

    let (data, total) = engine.list_requests(&filter).await?;

    Ok(HttpResponse::Ok().json(LeaveListResponse {
        data,
        page: page as u32,
        per_page: per_page as u32,
        total,
    }))
}
