//! Control surface under `/__sw`: status, control messages, installs, push
//! and notification clicks.
//!
//! Every handler takes a [`ControlGrant`], so a request that fails the
//! access check gets a 401 instead of reaching the proxy.

use actix_web::http::header;
use actix_web::{HttpResponse, get, post, web};
use serde::Deserialize;

use shellcache_client::Registration;
use shellcache_core::ControlMessage;

use crate::access::ControlGrant;
use crate::error::GatewayError;

pub const CONTROL_SCOPE: &str = "/__sw";

#[derive(Debug, Deserialize)]
struct InstallBody {
    version: String,
}

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope(CONTROL_SCOPE)
            .service(status)
            .service(message)
            .service(install)
            .service(push)
            .service(notifications)
            .service(notification_click),
    );
}

#[get("/status")]
async fn status(
    _grant: ControlGrant, registration: web::Data<Registration>,
) -> Result<HttpResponse, GatewayError> {
    Ok(HttpResponse::Ok().json(registration.status().await?))
}

/// Body is a control message such as `{"type":"SKIP_WAITING"}`.
#[post("/message")]
async fn message(
    _grant: ControlGrant, registration: web::Data<Registration>, body: web::Bytes,
) -> Result<HttpResponse, GatewayError> {
    let text = std::str::from_utf8(&body).map_err(|e| GatewayError::InvalidInput(e.to_string()))?;
    let outcome = registration.message(ControlMessage::parse(text)?).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

#[post("/install")]
async fn install(
    _grant: ControlGrant, registration: web::Data<Registration>, body: web::Bytes,
) -> Result<HttpResponse, GatewayError> {
    let InstallBody { version } =
        serde_json::from_slice(&body).map_err(|e| GatewayError::InvalidInput(format!("invalid install body: {e}")))?;
    let outcome = registration.install_version(&version).await?;
    Ok(HttpResponse::Ok().json(outcome))
}

/// Body is the raw push payload.
#[post("/push")]
async fn push(
    _grant: ControlGrant, registration: web::Data<Registration>, body: web::Bytes,
) -> Result<HttpResponse, GatewayError> {
    let shown = registration.push(&body).await?;
    Ok(HttpResponse::Created().json(shown))
}

#[get("/notifications")]
async fn notifications(_grant: ControlGrant, registration: web::Data<Registration>) -> HttpResponse {
    HttpResponse::Ok().json(registration.notifications().await)
}

#[post("/notifications/{id}/click")]
async fn notification_click(
    _grant: ControlGrant, registration: web::Data<Registration>, id: web::Path<u64>,
) -> Result<HttpResponse, GatewayError> {
    let url = registration.notification_click(id.into_inner()).await?;
    Ok(HttpResponse::SeeOther().insert_header((header::LOCATION, url)).finish())
}
