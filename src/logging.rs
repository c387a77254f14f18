//! Middleware for logging requests and responses.

use axum::{
    body::{Body, Bytes},
    extract::Request,
    http::{
        HeaderMap, HeaderName, HeaderValue, StatusCode,
        header::{AUTHORIZATION, CONTENT_TYPE, COOKIE, SET_COOKIE},
    },
    middleware::Next,
    response::{IntoResponse, Response},
};

/// Log the request and response for each request.
///
/// Both the request and response are logged at the `info` level with
/// credential headers redacted. If a body is longer than
/// [LOG_BODY_LENGTH_LIMIT] bytes, it is truncated and the full body is logged
/// at the `debug` level. Binary bodies, such as PDF downloads, are only
/// described by their length.
pub async fn logging_middleware(request: Request, next: Next) -> Response {
    let (parts, body) = request.into_parts();
    let Some(body_bytes) = read_body(body).await else {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };

    let headers = redact_headers(&parts.headers);
    let body_text = describe_body(&parts.headers, &body_bytes);
    log_message(
        &format!("Received request: {} {}\nheaders: {headers:#?}", parts.method, parts.uri),
        &body_text,
    );

    let response = next.run(Request::from_parts(parts, Body::from(body_bytes))).await;

    let (parts, body) = response.into_parts();
    let Some(body_bytes) = read_body(body).await else {
        return StatusCode::INTERNAL_SERVER_ERROR.into_response();
    };

    let headers = redact_headers(&parts.headers);
    let body_text = describe_body(&parts.headers, &body_bytes);
    log_message(
        &format!("Sending response: {}\nheaders: {headers:#?}", parts.status),
        &body_text,
    );

    Response::from_parts(parts, Body::from(body_bytes))
}

async fn read_body(body: Body) -> Option<Bytes> {
    axum::body::to_bytes(body, usize::MAX)
        .await
        .inspect_err(|error| tracing::error!("Could not read body for logging: {error}"))
        .ok()
}

const REDACTED_HEADERS: [HeaderName; 3] = [AUTHORIZATION, COOKIE, SET_COOKIE];

fn redact_headers(headers: &HeaderMap) -> HeaderMap {
    let mut headers = headers.clone();

    for name in REDACTED_HEADERS {
        if headers.contains_key(&name) {
            headers.insert(name, HeaderValue::from_static("********"));
        }
    }

    headers
}

fn describe_body(headers: &HeaderMap, body: &Bytes) -> String {
    let is_text = headers
        .get(CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_none_or(|content_type| {
            content_type.starts_with("text/")
                || content_type.starts_with("application/json")
                || content_type.starts_with("application/x-www-form-urlencoded")
        });

    if is_text {
        String::from_utf8_lossy(body).into_owned()
    } else {
        format!("<{} bytes>", body.len())
    }
}

const LOG_BODY_LENGTH_LIMIT: usize = 64;

fn log_message(message: &str, body: &str) {
    if body.len() > LOG_BODY_LENGTH_LIMIT {
        let mut end = LOG_BODY_LENGTH_LIMIT;
        while !body.is_char_boundary(end) {
            end -= 1;
        }

        tracing::info!("{message}\nbody: {:}...", &body[..end]);
        tracing::debug!("Full body: {body:?}");
    } else {
        tracing::info!("{message}\nbody: {body:?}");
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Bytes,
        http::{
            HeaderMap, HeaderValue,
            header::{AUTHORIZATION, CONTENT_TYPE, COOKIE},
        },
    };

    use super::{describe_body, redact_headers};

    #[test]
    fn redacts_credentials() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer secret"));
        headers.insert(COOKIE, HeaderValue::from_static("sessionid=abc"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("text/html"));

        let redacted = redact_headers(&headers);

        assert_eq!(redacted[AUTHORIZATION], "********");
        assert_eq!(redacted[COOKIE], "********");
        assert_eq!(redacted[CONTENT_TYPE], "text/html");
    }

    #[test]
    fn binary_bodies_are_summarised() {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/pdf"));

        let text = describe_body(&headers, &Bytes::from_static(b"%PDF-1.3 binary"));

        assert_eq!(text, "<15 bytes>");
    }

    #[test]
    fn form_bodies_are_logged() {
        let mut headers = HeaderMap::new();
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static("application/x-www-form-urlencoded"),
        );

        let text = describe_body(&headers, &Bytes::from_static(b"from=2024-01-01&to=2024-01-31"));

        assert_eq!(text, "from=2024-01-01&to=2024-01-31");
    }
}
