use actix_web::{FromRequest, HttpMessage};
use common::{UserRole, UserType};
use std::future::{Ready, ready};
use uuid::Uuid;

use crate::error::{HttpApiError, forbidden};

/// Identity attached by the JWT middleware. Extracting it directly rejects
/// unauthenticated callers with 401; use `Option<AuthUser>` where auth is
/// optional.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: Uuid,
    pub user_type: String,
    pub role: Option<String>,
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &actix_web::HttpRequest, _: &mut actix_web::dev::Payload) -> Self::Future {
        if let Some(ext) = req.extensions().get::<AuthUser>() {
            return ready(Ok(ext.clone()));
        }
        ready(Err(crate::error::unauthorized().into()))
    }
}

impl AuthUser {
    pub fn is_donor(&self) -> bool {
        self.user_type == UserType::Individual.as_str()
            && self.role.as_deref() == Some(UserRole::Donor.as_str())
    }

    pub fn is_hospital(&self) -> bool {
        self.user_type == UserType::Hospital.as_str()
    }
}

/// Only individual donors may accept requests and schedule donations.
pub fn require_donor(user: &AuthUser) -> Result<(), HttpApiError> {
    if user.is_donor() { Ok(()) } else { Err(forbidden()) }
}

pub fn require_user_type(user: &AuthUser, user_type: UserType) -> Result<(), HttpApiError> {
    if user.user_type == user_type.as_str() {
        Ok(())
    } else {
        Err(forbidden())
    }
}

pub fn allow_user_types(user: &AuthUser, allowed: &[UserType]) -> Result<(), HttpApiError> {
    if allowed.iter().any(|t| user.user_type == t.as_str()) {
        Ok(())
    } else {
        Err(forbidden())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(user_type: &str, role: Option<&str>) -> AuthUser {
        AuthUser {
            user_id: Uuid::new_v4(),
            user_type: user_type.into(),
            role: role.map(Into::into),
        }
    }

    #[test]
    fn donor_guard() {
        assert!(require_donor(&user("individual", Some("donor"))).is_ok());
        assert!(require_donor(&user("individual", Some("seeker"))).is_err());
        assert!(require_donor(&user("hospital", None)).is_err());
    }

    #[test]
    fn user_type_guards() {
        let hospital = user("hospital", None);
        assert!(require_user_type(&hospital, UserType::Hospital).is_ok());
        assert!(require_user_type(&hospital, UserType::Individual).is_err());
        assert!(allow_user_types(&hospital, &[UserType::Individual, UserType::Hospital]).is_ok());
        assert!(allow_user_types(&hospital, &[UserType::Individual]).is_err());
    }
}
