use std::path::PathBuf;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

/// Failures surfaced by the session, pointer and model stores.
///
/// Malformed log lines never show up here: they decode to
/// [`LogRecord::Unparseable`](crate::log_record::LogRecord::Unparseable) and are dropped locally.
#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    #[error("{0}")]
    NotFound(String),

    #[error("{0}")]
    BadRequest(String),

    /// A whole document (pointer map or runtime config) exists but does not decode.
    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

pub type Result<T> = std::result::Result<T, ViewerError>;

impl ViewerError {
    pub fn status(&self) -> StatusCode {
        match self {
            ViewerError::NotFound(_) => StatusCode::NOT_FOUND,
            ViewerError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ViewerError::Parse { .. } | ViewerError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ViewerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!("request failed: {self}");
        }
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;

    async fn body_json(resp: Response) -> serde_json::Value {
        let body = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn not_found_maps_to_404_with_message() {
        let resp = ViewerError::NotFound("Session not found".into()).into_response();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        assert_eq!(body_json(resp).await["error"], "Session not found");
    }

    #[tokio::test]
    async fn parse_failure_is_a_server_error_naming_the_document() {
        let source = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let err = ViewerError::Parse {
            path: PathBuf::from("/tmp/sessions.json"),
            source,
        };
        let resp = err.into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let json = body_json(resp).await;
        assert!(json["error"]
            .as_str()
            .unwrap()
            .starts_with("failed to parse /tmp/sessions.json"));
    }

    #[test]
    fn bad_request_status() {
        assert_eq!(
            ViewerError::BadRequest("modelId is required".into()).status(),
            StatusCode::BAD_REQUEST
        );
    }
}
