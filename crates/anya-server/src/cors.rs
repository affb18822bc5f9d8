//! CORS allowlist middleware for the `/api` routes.

use axum::extract::{Request, State};
use axum::http::header::{self, HeaderValue};
use axum::http::{Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::routes::AppState;

const ALLOW_METHODS: &str = "GET, POST, OPTIONS";
const ALLOW_HEADERS: &str = "content-type";

/// Echo the request origin back only when it is allowlisted. Preflight
/// requests are answered here without reaching the handlers.
pub async fn allowlist(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let origin = request
        .headers()
        .get(header::ORIGIN)
        .and_then(|value| value.to_str().ok())
        .map(str::to_owned);

    let allowed = origin
        .as_deref()
        .is_some_and(|origin| origin_allowed(&state.cors_origins, origin));

    if request.method() == Method::OPTIONS {
        let mut response = StatusCode::NO_CONTENT.into_response();
        if allowed {
            apply_origin(&mut response, origin.as_deref().unwrap_or_default());
            apply_preflight(&mut response);
        }
        return response;
    }

    let mut response = next.run(request).await;
    if allowed {
        apply_origin(&mut response, origin.as_deref().unwrap_or_default());
    }
    response
}

pub(crate) fn origin_allowed(allowlist: &[String], origin: &str) -> bool {
    allowlist.iter().any(|allowed| allowed == origin)
}

fn apply_origin(response: &mut Response, origin: &str) {
    if let Ok(value) = HeaderValue::from_str(origin) {
        let headers = response.headers_mut();
        headers.insert(header::ACCESS_CONTROL_ALLOW_ORIGIN, value);
        headers.insert(header::VARY, HeaderValue::from_static("origin"));
    }
}

fn apply_preflight(response: &mut Response) {
    let headers = response.headers_mut();
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS),
    );
    headers.insert(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    );
}
