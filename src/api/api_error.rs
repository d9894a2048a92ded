use crate::error::Error;
use axum::extract::rejection::FormRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

pub(crate) struct APIError(anyhow::Error);

impl IntoResponse for APIError {
    fn into_response(self) -> Response {
        let any_err = self.0;
        let status = match any_err.downcast_ref::<FormRejection>() {
            Some(rejection) => form_rejection_status(rejection),
            None => error_status(any_err.downcast_ref::<Error>()),
        };
        if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("request failed: {any_err}");
        }
        let body = Json(json!({
            "result": false,
            "error": format!("{any_err}"),
        }));
        (status, body).into_response()
    }
}

fn error_status(err: Option<&Error>) -> StatusCode {
    match err {
        Some(Error::AuthorizationDenied) => StatusCode::FORBIDDEN,
        Some(Error::AuthorizationExists(_)) => StatusCode::CONFLICT,
        Some(Error::InvalidName(_) | Error::InvalidResponse | Error::InvalidDNS01) => {
            StatusCode::BAD_REQUEST
        }
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn form_rejection_status(rejection: &FormRejection) -> StatusCode {
    match rejection {
        FormRejection::FailedToDeserializeForm(_)
        | FormRejection::FailedToDeserializeFormBody(_) => StatusCode::BAD_REQUEST,
        FormRejection::InvalidFormContentType(_) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
        _ => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

impl<E> From<E> for APIError
where
    E: Into<anyhow::Error>,
{
    fn from(err: E) -> Self {
        Self(err.into())
    }
}
