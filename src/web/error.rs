//! Erros visíveis ao cliente HTTP.
//!
//! | Variante | Status | Quando |
//! |----------|--------|--------|
//! | `Input` | 400 | corpo malformado, campo ausente ou vazio |
//! | `Session` | 401 | `session_id` inválido |
//! | `Internal` | 500 | falha não tratada no pipeline |
//!
//! Erros do cliente (4xx) trazem uma mensagem neutra pedindo para revisar o
//! pedido; só o 500 pede desculpas por uma falha nossa. O detalhe interno
//! só aparece com `debug` ligado.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

pub const APOLOGY: &str =
    "I'm sorry, something went wrong on my side. Please try again in a moment.";

pub const INVALID_REQUEST: &str =
    "I couldn't read that request. Please check the fields and try again.";

pub const INVALID_SESSION: &str = "This session isn't valid. Please start a new session.";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("campo inválido '{field}': {reason}")]
    Input { field: &'static str, reason: String },

    #[error("sessão inválida")]
    Session,

    #[error("erro interno")]
    Internal { detail: Option<String> },
}

impl ApiError {
    /// Erro 500; `detail` só é guardado em modo debug.
    pub fn internal(err: impl std::fmt::Display, debug: bool) -> Self {
        tracing::error!(error = %err, "Falha interna no processamento");
        Self::Internal {
            detail: debug.then(|| err.to_string()),
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Self::Input { .. } => StatusCode::BAD_REQUEST,
            Self::Session => StatusCode::UNAUTHORIZED,
            Self::Internal { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: String,
    message: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    field: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    detail: Option<String>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match self {
            Self::Input { field, ref reason } => ErrorBody {
                error: format!("invalid field '{field}': {reason}"),
                message: INVALID_REQUEST,
                field: Some(field),
                detail: None,
            },
            Self::Session => ErrorBody {
                error: "invalid session".to_string(),
                message: INVALID_SESSION,
                field: None,
                detail: None,
            },
            Self::Internal { detail } => ErrorBody {
                error: "internal error".to_string(),
                message: APOLOGY,
                field: None,
                detail,
            },
        };
        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variants_map_to_status_codes() {
        let input = ApiError::Input {
            field: "message",
            reason: "empty".into(),
        };
        assert_eq!(input.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ApiError::Session.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            ApiError::internal("boom", false).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    async fn body_of(err: ApiError) -> serde_json::Value {
        let res = err.into_response();
        let bytes = axum::body::to_bytes(res.into_body(), 1 << 16).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn only_server_errors_apologize() {
        let input = body_of(ApiError::Input {
            field: "message",
            reason: "empty".into(),
        })
        .await;
        assert_eq!(input["message"], INVALID_REQUEST);
        assert_eq!(input["field"], "message");

        let session = body_of(ApiError::Session).await;
        assert_eq!(session["message"], INVALID_SESSION);

        let internal = body_of(ApiError::internal("boom", false)).await;
        assert_eq!(internal["message"], APOLOGY);
        assert!(internal.get("detail").is_none());
    }

    #[test]
    fn internal_detail_only_in_debug() {
        assert!(matches!(
            ApiError::internal("boom", false),
            ApiError::Internal { detail: None }
        ));
        match ApiError::internal("boom", true) {
            ApiError::Internal { detail } => assert_eq!(detail.as_deref(), Some("boom")),
            other => panic!("unexpected {other:?}"),
        }
    }
}
