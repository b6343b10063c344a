//! Reverse-proxy handler: every request outside the control scope is routed
//! through the registration.
//!
//! The request mode comes from `Sec-Fetch-Mode`. Clients that do not send it
//! get a heuristic: a `GET` whose `Accept` starts with `text/html` is a
//! navigation, anything else is `same-origin`.

use actix_web::http::{Method, StatusCode, header};
use actix_web::{HttpRequest, HttpResponse, web};
use url::Url;

use shellcache_client::fetch::{is_forwardable_header, resolve};
use shellcache_client::{Outcome, Registration};
use shellcache_core::{Request, RequestMode};

use crate::error::GatewayError;

/// Response header naming where the body came from (`network`, `cache`, ...).
pub const SOURCE_HEADER: &str = "x-shellcache-source";

/// Response header naming the strategy that handled the request, when a worker did.
pub const STRATEGY_HEADER: &str = "x-shellcache-strategy";

pub async fn proxy(
    req: HttpRequest, body: web::Bytes, registration: web::Data<Registration>,
) -> Result<HttpResponse, GatewayError> {
    let request = to_request(&registration.config().origin, &req, body)?;
    let outcome = registration.fetch(&request).await?;
    tracing::debug!(
        method = %request.method,
        url = %request.url,
        status = outcome.response.status,
        source = %outcome.source,
        "proxied"
    );
    Ok(to_response(outcome))
}

fn header_str<'a>(req: &'a HttpRequest, name: header::HeaderName) -> Option<&'a str> {
    req.headers().get(name).and_then(|v| v.to_str().ok())
}

fn request_mode(req: &HttpRequest) -> RequestMode {
    if let Some(mode) = header_str(req, header::HeaderName::from_static("sec-fetch-mode")).and_then(RequestMode::from_header)
    {
        return mode;
    }

    let wants_html = header_str(req, header::ACCEPT).is_some_and(|accept| accept.trim_start().starts_with("text/html"));
    if req.method() == Method::GET && wants_html { RequestMode::Navigate } else { RequestMode::SameOrigin }
}

/// Build the engine request for an incoming gateway request.
pub fn to_request(origin: &Url, req: &HttpRequest, body: web::Bytes) -> Result<Request, GatewayError> {
    let path_and_query = req.uri().path_and_query().map_or("/", |pq| pq.as_str());
    let url = resolve(origin, path_and_query).map_err(|e| GatewayError::InvalidInput(e.to_string()))?;

    let mut request = Request::new(req.method().as_str(), url).with_mode(request_mode(req)).with_body(body);
    for (name, value) in req.headers() {
        if is_forwardable_header(name.as_str())
            && let Ok(value) = value.to_str()
        {
            request = request.with_header(name.as_str(), value);
        }
    }
    Ok(request)
}

pub fn to_response(outcome: Outcome) -> HttpResponse {
    let status = StatusCode::from_u16(outcome.response.status).unwrap_or(StatusCode::BAD_GATEWAY);
    let mut builder = HttpResponse::build(status);
    for (name, value) in &outcome.response.headers {
        if is_forwardable_header(name) {
            builder.append_header((name.as_str(), value.as_str()));
        }
    }
    builder.insert_header((SOURCE_HEADER, outcome.source.as_str()));
    if let Some(strategy) = outcome.strategy {
        builder.insert_header((STRATEGY_HEADER, strategy.as_str()));
    }
    builder.body(outcome.response.body)
}
