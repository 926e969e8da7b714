//! Caller identity.
//!
//! Authentication happens upstream; requests arrive with an `X-User-Id`
//! header naming the caller's account. Handlers take a `Caller` argument and
//! narrow it with `require`.

use std::future::{ready, Ready};
use std::sync::Arc;

use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use placement_core::{accounts, Account, Role, TrackerError};

use crate::api::{ApiError, AppState};

pub const USER_ID_HEADER: &str = "X-User-Id";

/// The authenticated account making the request.
#[derive(Debug, Clone)]
pub struct Caller(pub Account);

impl Caller {
    /// The caller's account if it has `role`, otherwise 403.
    pub fn require(self, role: Role) -> Result<Account, ApiError> {
        if self.0.role() == role {
            Ok(self.0)
        } else {
            Err(ApiError::Forbidden(format!(
                "this action requires the {} role",
                role
            )))
        }
    }
}

fn resolve(req: &HttpRequest) -> Result<Caller, ApiError> {
    let user_id = req
        .headers()
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| ApiError::Unauthorized(format!("missing {} header", USER_ID_HEADER)))?;

    let state = req
        .app_data::<web::Data<Arc<AppState>>>()
        .ok_or_else(|| ApiError::Internal("application state not configured".to_string()))?;

    match accounts::get_account(&state.store, user_id) {
        Ok(account) => Ok(Caller(account)),
        Err(TrackerError::NotFound(_)) => {
            log::warn!("[auth] Rejected unknown user id {}", user_id);
            Err(ApiError::Unauthorized("unknown user".to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

impl FromRequest for Caller {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(resolve(req))
    }
}
