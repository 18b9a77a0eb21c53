//! Request filter middleware
//!
//! Runs every content request through the shield before it reaches the
//! static file service. Blocked requests get a bare 403 with no-cache
//! headers; detected bots that pass get `Vary: User-Agent`.

use std::net::SocketAddr;

use axum::{
    body::Body,
    extract::{ConnectInfo, Request, State},
    http::{header, HeaderName, HeaderValue, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};

use agent_shield_core::{Enforcement, RequestContext, BLOCK_HEADERS, BLOCK_STATUS};

use crate::AppState;

/// Middleware: classify, resolve and enforce
pub async fn shield_filter(State(state): State<AppState>, req: Request, next: Next) -> Response {
    let ctx = request_context(&req);
    let shield = state.shield.clone();

    // Diagnostic telemetry posts synchronously, keep it off the reactor
    let enforcement = match tokio::task::spawn_blocking(move || shield.inspect(&ctx)).await {
        Ok(outcome) => outcome.enforcement,
        Err(e) => {
            tracing::error!("Request filter task failed: {}", e);
            Enforcement::Proceed { vary_user_agent: false }
        }
    };

    match enforcement {
        Enforcement::Terminate => blocked_response(),
        Enforcement::Proceed { vary_user_agent } => {
            let mut response = next.run(req).await;
            if vary_user_agent {
                response
                    .headers_mut()
                    .append(header::VARY, HeaderValue::from_static("User-Agent"));
            }
            response
        }
    }
}

/// Host-neutral view of the axum request
pub fn request_context(req: &Request) -> RequestContext {
    let uri = req.uri();
    let mut ctx = RequestContext::new(req.method().as_str(), uri.path());

    if let Some(query) = uri.query() {
        ctx = ctx.with_query(query);
    }

    let forwarded_proto = req
        .headers()
        .get("x-forwarded-proto")
        .and_then(|v| v.to_str().ok());
    if let Some(scheme) = forwarded_proto.or_else(|| uri.scheme_str()) {
        ctx = ctx.with_scheme(scheme);
    }

    if let Some(authority) = uri.authority() {
        ctx = ctx.with_host(authority.as_str());
    }

    for (name, value) in req.headers() {
        // Non-UTF-8 values carry nothing the classifier can use
        if let Ok(value) = value.to_str() {
            ctx = ctx.with_header(name.as_str(), value);
        }
    }

    if let Some(ConnectInfo(addr)) = req.extensions().get::<ConnectInfo<SocketAddr>>() {
        ctx = ctx.with_remote_addr(&addr.ip().to_string());
    }

    ctx
}

fn blocked_response() -> Response {
    let status = StatusCode::from_u16(BLOCK_STATUS).unwrap_or(StatusCode::FORBIDDEN);
    let mut response = (status, Body::empty()).into_response();

    let headers = response.headers_mut();
    for (name, value) in BLOCK_HEADERS {
        if let Ok(name) = HeaderName::from_bytes(name.as_bytes()) {
            headers.insert(name, HeaderValue::from_static(value));
        }
    }
    response
}
