use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::error::AppError;
use crate::state::AppState;

pub async fn enforce_trusted_hosts(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let trusted = &state.config.trusted_hosts;
    if trusted.iter().any(|host| host.trim() == "*") {
        return next.run(request).await;
    }

    let host = request
        .headers()
        .get(axum::http::header::HOST)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.split(':').next().unwrap_or(value).trim().to_string())
        .unwrap_or_default();

    let allowed = trusted.iter().any(|candidate| {
        let candidate = candidate.trim();
        if let Some(suffix) = candidate.strip_prefix('.') {
            return host.ends_with(suffix);
        }
        host.eq_ignore_ascii_case(candidate)
    });

    if !allowed {
        return AppError::BadRequest("Untrusted host.".to_string()).into_response();
    }

    next.run(request).await
}
