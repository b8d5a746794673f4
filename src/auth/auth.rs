use actix_web::{FromRequest, HttpRequest, dev::Payload, error::ErrorUnauthorized};
use futures::future::{Ready, ready};

use crate::engine::Actor;
use crate::model::role::Role;

/// The caller as resolved by the upstream identity gateway, which
/// authenticates the session and forwards `X-Person-Id`, `X-Person-Name`,
/// `X-Role` and `X-Unit-Id`. This service trusts those headers; it never
/// sees credentials or tokens itself.
pub struct AuthUser {
    pub person_id: u64,
    pub name: String,
    pub role: Role,
    pub unit_id: u64,
}

fn header<'r>(req: &'r HttpRequest, name: &str) -> Option<&'r str> {
    req.headers().get(name).and_then(|h| h.to_str().ok())
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let person_id = match header(req, "X-Person-Id").and_then(|v| v.parse::<u64>().ok()) {
            Some(id) => id,
            None => return ready(Err(ErrorUnauthorized("Missing or invalid X-Person-Id"))),
        };

        let role = match header(req, "X-Role").and_then(Role::from_name) {
            Some(r) => r,
            None => return ready(Err(ErrorUnauthorized("Missing or invalid X-Role"))),
        };

        let unit_id = match header(req, "X-Unit-Id").and_then(|v| v.parse::<u64>().ok()) {
            Some(id) => id,
            None => return ready(Err(ErrorUnauthorized("Missing or invalid X-Unit-Id"))),
        };

        let name = header(req, "X-Person-Name").unwrap_or_default().to_string();

        ready(Ok(AuthUser {
            person_id,
            name,
            role,
            unit_id,
        }))
    }
}

impl AuthUser {
    pub fn require_hr_or_admin(&self) -> actix_web::Result<()> {
        if matches!(self.role, Role::Admin | Role::Hr) {
            Ok(())
        } else {
            Err(actix_web::error::ErrorForbidden("HR/Admin only"))
        }
    }

    /// Roles allowed to decide on requests.
    pub fn require_approver(&self) -> actix_web::Result<()> {
        if matches!(self.role, Role::Admin | Role::Hr | Role::Manager) {
            Ok(())
        } else {
            Err(actix_web::error::ErrorForbidden("Approver role only"))
        }
    }

    pub fn is_employee(&self) -> bool {
        self.role == Role::Employee
    }

    pub fn actor(&self) -> Actor {
        Actor {
            user_id: self.person_id,
            name: self.name.clone(),
        }
    }
}
