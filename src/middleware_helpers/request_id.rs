use crate::tracing::RequestId;
use axum::{
    extract::Request,
    http::{header::HeaderName, HeaderValue},
    middleware::Next,
    response::Response,
};
use tracing::Instrument;

pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Accepts a caller-supplied `x-request-id` or mints one, then echoes it back.
pub async fn request_id_middleware(mut request: Request, next: Next) -> Response {
    let supplied = request
        .headers()
        .get(REQUEST_ID_HEADER)
        .and_then(|v| v.to_str().ok().map(|s| (RequestId::new(s), v.clone())));
    let (request_id, header_value) = match supplied {
        Some(found) => found,
        None => {
            let minted = RequestId::default();
            // uuid text is always a valid header value
            let value = HeaderValue::from_str(minted.as_str())
                .unwrap_or_else(|_| HeaderValue::from_static("invalid"));
            request
                .headers_mut()
                .insert(HeaderName::from_static(REQUEST_ID_HEADER), value.clone());
            (minted, value)
        }
    };

    request.extensions_mut().insert(request_id.clone());

    let span = tracing::debug_span!("request_id", request_id = %request_id);
    let mut response = crate::tracing::scope_request_id(request_id, next.run(request))
        .instrument(span)
        .await;

    response
        .headers_mut()
        .insert(HeaderName::from_static(REQUEST_ID_HEADER), header_value);
    response
}
