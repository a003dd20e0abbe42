use crate::errors::ServerError;
use astra::{Body, Response, ResponseBuilder};
use serde_json::json;

pub type ResultResp = Result<Response, ServerError>;

/// Convert a ServerError into a JSON error response.
/// Storage details are logged, never sent to the client.
pub fn error_to_response(err: ServerError) -> Response {
    let status = err.status_code();
    let message = match &err {
        ServerError::DbError(_) | ServerError::XlsxError(_) | ServerError::Config(_) => {
            tracing::error!(error = %err, "request failed");
            "Internal Server Error".to_string()
        }
        ServerError::InternalError => {
            tracing::error!("request failed with internal error");
            err.to_string()
        }
        _ => {
            tracing::debug!(error = %err, status, "request rejected");
            err.to_string()
        }
    };

    let body = json!({ "error": message }).to_string();

    ResponseBuilder::new()
        .status(status)
        .header("Content-Type", "application/json")
        .body(Body::from(body))
        .unwrap_or_else(|_| Response::new(Body::from("Internal Server Error")))
}
