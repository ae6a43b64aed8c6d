//! Middleware for logging requests and responses.

use axum::{
    body::{Body, to_bytes},
    extract::Request,
    http::{StatusCode, header::CONTENT_TYPE},
    middleware::Next,
    response::{IntoResponse, Response},
};
use serde_json::Value;

/// Bodies longer than this many characters are truncated at the `info` level.
pub const LOG_BODY_LENGTH_LIMIT: usize = 64;

/// The largest request body the middleware will buffer.
const MAX_BODY_BYTES: usize = 1024 * 1024;

/// Log the request and response for each request.
///
/// Both the request and response are logged at the `info` level.
/// If a body is longer than [LOG_BODY_LENGTH_LIMIT] characters, it is
/// truncated and the full body is logged at the `debug` level.
/// `password` fields in JSON request bodies are redacted.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let body_text = match read_body_text(body, MAX_BODY_BYTES).await {
        Ok(text) => text,
        Err(error) => {
            tracing::warn!("could not read request body: {error}");
            return StatusCode::PAYLOAD_TOO_LARGE.into_response();
        }
    };

    let is_json = parts
        .headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"));

    if is_json {
        log_body("Received request", &parts, &redact_password(&body_text));
    } else {
        log_body("Received request", &parts, &body_text);
    }

    let request = Request::from_parts(parts, body_text.into());
    let response = next.run(request).await;

    let (parts, body) = response.into_parts();
    let body_text = match read_body_text(body, usize::MAX).await {
        Ok(text) => text,
        Err(error) => {
            tracing::error!("could not read response body: {error}");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };
    log_body("Sending response", &parts, &body_text);

    Response::from_parts(parts, body_text.into())
}

async fn read_body_text(body: Body, limit: usize) -> Result<String, axum::Error> {
    let body_bytes = to_bytes(body, limit).await?;

    Ok(String::from_utf8_lossy(&body_bytes).to_string())
}

/// Replace the value of a top-level `"password"` field in a JSON object.
///
/// Text that is not a JSON object is returned unchanged.
fn redact_password(body: &str) -> String {
    let Ok(Value::Object(mut object)) = serde_json::from_str::<Value>(body) else {
        return body.to_owned();
    };

    match object.get_mut("password") {
        Some(password) => {
            *password = Value::String("********".to_owned());
            Value::Object(object).to_string()
        }
        None => body.to_owned(),
    }
}

fn truncate(body: &str) -> Option<&str> {
    body.char_indices()
        .nth(LOG_BODY_LENGTH_LIMIT)
        .map(|(end, _)| &body[..end])
}

fn log_body(message: &str, headers: &impl std::fmt::Debug, body: &str) {
    match truncate(body) {
        Some(truncated) => {
            tracing::info!("{message}: {headers:#?}\nbody: {truncated}...");
            tracing::debug!("Full body: {body:?}");
        }
        None => tracing::info!("{message}: {headers:#?}\nbody: {body:?}"),
    }
}
