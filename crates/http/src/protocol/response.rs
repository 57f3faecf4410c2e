//! HTTP response head.

use bytes::Bytes;
use http::{Response, StatusCode, header};
use http_body_util::Full;

/// A response before its body is attached.
pub type ResponseHead = Response<()>;

/// Builds a response carrying only a status line and its canonical reason as body.
///
/// Used for protocol level refusals (bad request, unknown websocket host, ...).
pub fn status_response(status: StatusCode) -> Response<Full<Bytes>> {
    let reason = status.canonical_reason().unwrap_or_default();
    let mut response = Response::new(Full::new(Bytes::from_static(reason.as_bytes())));
    *response.status_mut() = status;
    response.headers_mut().insert(header::CONTENT_TYPE, header::HeaderValue::from_static("text/plain; charset=utf-8"));
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use http_body::Body;

    #[test]
    fn status_response_has_reason_body() {
        let response = status_response(StatusCode::NOT_FOUND);
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(response.body().size_hint().exact(), Some("Not Found".len() as u64));
    }
}
