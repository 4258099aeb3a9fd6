//! Bearer-token role resolution and the explicit role check handlers call.
//!
//! [`resolve_caller_middleware`] maps the `Authorization` header to a
//! [`Caller`] stored in the request extensions. Handlers extract the `Caller`
//! and call [`Caller::require`] before touching a repository. With no tokens
//! configured every caller holds every role.

use std::sync::Arc;

use axum::{
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::config::AppConfig;
use crate::error::{AppError, AppResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Reader,
    Writer,
}

impl Role {
    fn as_str(self) -> &'static str {
        match self {
            Role::Reader => "Reader",
            Role::Writer => "Writer",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Caller {
    roles: Vec<Role>,
    authenticated: bool,
}

impl Caller {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn with_roles(roles: &[Role]) -> Self {
        Self { roles: roles.to_vec(), authenticated: true }
    }

    pub fn has(&self, role: Role) -> bool {
        self.roles.contains(&role)
    }

    /// 401 for anonymous callers, 403 when the role is missing.
    pub fn require(&self, role: Role) -> AppResult<()> {
        if !self.authenticated {
            return Err(AppError::Unauthorized("Bearer token required".to_string()));
        }
        if !self.has(role) {
            tracing::warn!(required = role.as_str(), "Authorization denied: missing role");
            return Err(AppError::Forbidden(format!("Requires {} role", role.as_str())));
        }
        Ok(())
    }
}

impl<S> FromRequestParts<S> for Caller
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(parts.extensions.get::<Caller>().cloned().unwrap_or_default())
    }
}

fn constant_time_eq(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.iter().zip(b).fold(0u8, |diff, (x, y)| diff | (x ^ y)) == 0
}

/// Maps a presented token to the caller it identifies, or `None` if it matches nothing.
pub fn caller_for_token(cfg: &AppConfig, token: &str) -> Option<Caller> {
    let matches = |configured: &Option<String>| {
        configured
            .as_deref()
            .filter(|t| !t.is_empty())
            .map(|t| constant_time_eq(t.as_bytes(), token.as_bytes()))
            .unwrap_or(false)
    };
    if matches(&cfg.auth.writer_token) {
        Some(Caller::with_roles(&[Role::Reader, Role::Writer]))
    } else if matches(&cfg.auth.reader_token) {
        Some(Caller::with_roles(&[Role::Reader]))
    } else {
        None
    }
}

pub async fn resolve_caller_middleware(State(cfg): State<Arc<AppConfig>>, mut req: Request, next: Next) -> Response {
    let caller = if !cfg.auth.is_enabled() {
        Caller::with_roles(&[Role::Reader, Role::Writer])
    } else {
        let header_value = req.headers().get(header::AUTHORIZATION).and_then(|h| h.to_str().ok());
        match header_value {
            None => Caller::anonymous(),
            Some(value) => match value.strip_prefix("Bearer ").and_then(|t| caller_for_token(&cfg, t.trim())) {
                Some(caller) => caller,
                None => return AppError::Unauthorized("Invalid bearer token".to_string()).into_response(),
            },
        }
    };
    req.extensions_mut().insert(caller);
    next.run(req).await
}
