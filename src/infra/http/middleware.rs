use axum::extract::Request;
use axum::middleware::Next;
use axum::response::Response;
use tracing::{info, warn};
use uuid::Uuid;

use crate::application::error::ErrorReport;

/// Per-request metadata threaded through to the response log line.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub request_id: Uuid,
}

pub async fn log_responses(request: Request, next: Next) -> Response {
    let context = RequestContext {
        request_id: Uuid::new_v4(),
    };
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    let started = std::time::Instant::now();
    let response = next.run(request).await;
    let elapsed_ms = started.elapsed().as_millis();
    let status = response.status();

    match response.extensions().get::<ErrorReport>() {
        Some(report) => warn!(
            request_id = %context.request_id,
            %method,
            path,
            status = status.as_u16(),
            elapsed_ms,
            source = report.source,
            errors = ?report.messages,
            "request failed"
        ),
        None => info!(
            request_id = %context.request_id,
            %method,
            path,
            status = status.as_u16(),
            elapsed_ms,
            "request completed"
        ),
    }

    response
}
