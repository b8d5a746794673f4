use crate::auth::auth::AuthUser;
use crate::engine::AppEngine;
use crate::engine::overview::OverviewScope;
use crate::model::role::Role;
use actix_web::{HttpResponse, Responder, web};

/// Dashboard endpoint: KPIs, visible requests and balances, plus what the
/// caller is allowed to do. Scope follows the caller's role.
#[utoipa::path(
    get,
    path = "/api/overview",
    responses(
        (status = 200, description = "Role-scoped overview", body = Object, example = json!({
            "kpi": {
                "pending_count": 2,
                "out_today": 1,
                "month_approved_days": "7.5",
                "conflict_count": 0
            },
            "requests": [],
            "balances": [],
            "permissions": {
                "scope": "unit",
                "can_approve": true,
                "can_adjust_balance": false,
                "can_create_for_others": false
            }
        })),
        (status = 401, description = "Unauthorized")
    ),
    tag = "Overview"
)]
pub async fn get_overview(
    auth: AuthUser,
    engine: web::Data<AppEngine>,
) -> actix_web::Result<impl Responder> {
    let scope = match auth.role {
        Role::Admin | Role::Hr => OverviewScope::Global,
        Role::Manager => OverviewScope::Unit(auth.unit_id),
        Role::Employee => OverviewScope::Person(auth.person_id),
    };
    let snapshot = engine.overview(scope).await?;

    let scope_name = match scope {
        OverviewScope::Global => "global",
        OverviewScope::Unit(_) => "unit",
        OverviewScope::Person(_) => "person",
    };
    let can_decide = matches!(auth.role, Role::Admin | Role::Hr | Role::Manager);
    let can_administer = matches!(auth.role, Role::Admin | Role::Hr);

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "kpi": &snapshot.kpi,
        "requests": &snapshot.requests,
        "balances": &snapshot.balances,
        "permissions": {
            "role": auth.role.as_str(),
            "scope": scope_name,
            "can_approve": can_decide,
            "can_adjust_balance": can_administer,
            "can_create_for_others": can_administer,
        }
    })))
}
