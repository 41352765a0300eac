//! Request identity.
//!
//! Sessions are issued and checked upstream. By the time a request reaches this server, the session layer has
//! replaced any client-supplied identity headers with the authenticated user id in `X-Storefront-User` and their
//! roles in `X-Storefront-Roles` (comma separated). Requests without a user id are rejected with 401.
use std::{
    fmt::Display,
    future::{ready, Ready},
    str::FromStr,
};

use actix_web::{dev::Payload, http::header::HeaderMap, FromRequest, HttpRequest};
use log::*;
use serde::{Deserialize, Serialize};

use crate::errors::{AuthError, ServerError};

pub const USER_HEADER: &str = "X-Storefront-User";
pub const ROLES_HEADER: &str = "X-Storefront-Roles";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Admin,
}

impl FromStr for Role {
    type Err = AuthError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            other => Err(AuthError::InvalidIdentity(format!("Unknown role: {other}"))),
        }
    }
}

impl Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserClaims {
    pub user_id: String,
    pub roles: Vec<Role>,
}

impl UserClaims {
    pub fn new<S: Into<String>>(user_id: S, roles: &[Role]) -> Self {
        Self { user_id: user_id.into(), roles: roles.to_vec() }
    }

    /// Reads the identity headers. Every identified caller has at least the `user` role. Unknown roles are ignored.
    pub fn from_headers(headers: &HeaderMap) -> Result<Self, AuthError> {
        let user_id = headers
            .get(USER_HEADER)
            .ok_or(AuthError::MissingIdentity)?
            .to_str()
            .map_err(|e| AuthError::InvalidIdentity(e.to_string()))?
            .trim();
        if user_id.is_empty() {
            return Err(AuthError::MissingIdentity);
        }
        let mut roles = vec![Role::User];
        if let Some(value) = headers.get(ROLES_HEADER).and_then(|v| v.to_str().ok()) {
            for role in value.split(',').filter(|s| !s.trim().is_empty()) {
                match role.parse::<Role>() {
                    Ok(r) if !roles.contains(&r) => roles.push(r),
                    Ok(_) => {},
                    Err(e) => debug!("🔐️ Ignoring role for {user_id}. {e}"),
                }
            }
        }
        Ok(Self { user_id: user_id.to_string(), roles })
    }

    pub fn has_roles(&self, required: &[Role]) -> bool {
        required.iter().all(|r| self.roles.contains(r))
    }

    pub fn is_admin(&self) -> bool {
        self.roles.contains(&Role::Admin)
    }
}

impl FromRequest for UserClaims {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(UserClaims::from_headers(req.headers()).map_err(ServerError::from))
    }
}
