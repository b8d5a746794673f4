use crate::auth::auth::AuthUser;
use crate::engine::AppEngine;
use crate::model::leave_balance::LeaveBalance;
use actix_web::{HttpResponse, Responder, web};
use rust_decimal::Decimal;
use serde::Deserialize;
use utoipa::ToSchema;

#[derive(Deserialize, ToSchema)]
pub struct AdjustBalance {
    /// Signed change to the annual entitlement, 0.5-day granularity.
    #[schema(value_type = String, example = "5")]
    pub delta_annual_entitled: Decimal,
    /// Non-empty justification, forwarded to the audit log.
    #[schema(example = "Seniority step after 5 years")]
    pub reason: String,
}

/// for reading one person/year ledger endpoint
#[utoipa::path(
    get,
    path = "/api/balance/{person_id}/{year}",
    params(
        ("person_id" = u64, Path, description = "Person the ledger belongs to"),
        ("year" = i32, Path, description = "Ledger year")
    ),
    responses(
        (status = 200, description = "Balance found or lazily created", body = LeaveBalance),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    tag = "Balance"
)]
pub async fn get_balance(
    auth: AuthUser,
    engine: web::Data<AppEngine>,
    path: web::Path<(u64, i32)>,
) -> actix_web::Result<impl Responder> {
    let (person_id, year) = path.into_inner();
    if person_id != auth.person_id {
        auth.require_hr_or_admin()?;
    }
    let balance = engine.balance(person_id, year).await?;
    Ok(HttpResponse::Ok().json(balance))
}

/* =========================
Adjust entitlement (HR/Admin)
========================= */
#[utoipa::path(
    put,
    path = "/api/balance/{person_id}/{year}",
    params(
        ("person_id" = u64, Path, description = "Person the ledger belongs to"),
        ("year" = i32, Path, description = "Ledger year")
    ),
    request_body = AdjustBalance,
    responses(
        (status = 200, description = "Entitlement adjusted", body = LeaveBalance),
        (status = 400, description = "Missing justification"),
        (status = 401, description = "Unauthorized"),
        (status = 403, description = "Forbidden")
    ),
    tag = "Balance"
)]
pub async fn adjust_balance(
    auth: AuthUser,
    engine: web::Data<AppEngine>,
    path: web::Path<(u64, i32)>,
    payload: web::Json<AdjustBalance>,
) -> actix_web::Result<impl Responder> {
    auth.require_hr_or_admin()?;
    let (person_id, year) = path.into_inner();
    let payload = payload.into_inner();
    let balance = engine
        .adjust_balance(
            person_id,
            year,
            payload.delta_annual_entitled,
            payload.reason,
            &auth.actor(),
        )
        .await?;
    Ok(HttpResponse::Ok().json(balance))
}
