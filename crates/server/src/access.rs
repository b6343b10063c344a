//! Who may use the control surface.
//!
//! With a configured token every control request needs
//! `Authorization: Bearer <token>`. Without one, only loopback peers are
//! let through. Handlers opt in by taking a [`ControlGrant`] argument.

use std::future::{Ready, ready};
use std::net::SocketAddr;

use actix_web::dev::Payload;
use actix_web::http::header;
use actix_web::{FromRequest, HttpRequest, web};

use crate::error::GatewayError;

#[derive(Debug, Clone, Default)]
pub struct ControlAccess {
    token: Option<String>,
}

impl ControlAccess {
    pub fn new(token: Option<String>) -> Self {
        Self { token: token.filter(|t| !t.trim().is_empty()) }
    }

    /// # Errors
    ///
    /// `GatewayError::Unauthorized` if the request may not use the control surface.
    pub fn check(&self, req: &HttpRequest) -> Result<(), GatewayError> {
        match &self.token {
            Some(token) => {
                let presented = req
                    .headers()
                    .get(header::AUTHORIZATION)
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.strip_prefix("Bearer "))
                    .ok_or_else(|| GatewayError::Unauthorized("bearer token required".into()))?;
                if !same_bytes(presented.trim().as_bytes(), token.as_bytes()) {
                    return Err(GatewayError::Unauthorized("bearer token rejected".into()));
                }
                Ok(())
            }
            None => match req.peer_addr() {
                Some(addr) if is_loopback(&addr) => Ok(()),
                peer => {
                    tracing::warn!(?peer, path = %req.path(), "control request from non-loopback peer");
                    Err(GatewayError::Unauthorized("control surface is limited to loopback peers".into()))
                }
            },
        }
    }
}

fn is_loopback(addr: &SocketAddr) -> bool {
    match addr {
        SocketAddr::V4(v4) => v4.ip().is_loopback(),
        SocketAddr::V6(v6) => v6.ip().is_loopback() || v6.ip().to_ipv4_mapped().is_some_and(|ip| ip.is_loopback()),
    }
}

/// Compare without stopping at the first differing byte.
fn same_bytes(a: &[u8], b: &[u8]) -> bool {
    a.len() == b.len() && a.iter().zip(b).fold(0u8, |acc, (x, y)| acc | (x ^ y)) == 0
}

/// Proof that the request passed [`ControlAccess::check`].
///
/// Falls back to loopback-only when no [`ControlAccess`] is registered.
#[derive(Debug)]
pub struct ControlGrant;

impl FromRequest for ControlGrant {
    type Error = GatewayError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let result = match req.app_data::<web::Data<ControlAccess>>() {
            Some(access) => access.check(req),
            None => ControlAccess::default().check(req),
        };
        ready(result.map(|()| ControlGrant))
    }
}
