use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use formdesk_core::errors::{Error, SyncError, ValidationError};
use serde::Serialize;
use tracing::error;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug)]
pub enum ApiError {
    /// Domain failure, tagged with the operation that raised it when known.
    Core {
        operation: Option<&'static str>,
        error: Error,
    },
    BadRequest(String),
}

impl ApiError {
    /// Tags domain errors with the failing operation: `.map_err(ApiError::during("push_to_cloud"))`.
    pub fn during(operation: &'static str) -> impl Fn(Error) -> ApiError {
        move |error| ApiError::Core {
            operation: Some(operation),
            error,
        }
    }

    fn status(&self) -> StatusCode {
        match self {
            ApiError::Core { error, .. } => match error {
                Error::TransitionConflict { .. } => StatusCode::CONFLICT,
                Error::Sync(SyncError::AlreadyInProgress(_)) => StatusCode::CONFLICT,
                Error::Sync(SyncError::Unauthenticated) => StatusCode::UNAUTHORIZED,
                Error::Sync(SyncError::RemoteUnavailable(_)) => StatusCode::BAD_GATEWAY,
                Error::Database(_) => StatusCode::SERVICE_UNAVAILABLE,
                Error::Validation(validation) => match validation {
                    ValidationError::ReadOnlyDocument(_)
                    | ValidationError::NoActiveDocument
                    | ValidationError::NoFormSelected
                    | ValidationError::NotInWorkspace { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                    ValidationError::TierExclusivity { .. } => StatusCode::CONFLICT,
                    _ => StatusCode::BAD_REQUEST,
                },
                Error::Serialization(_) | Error::Unexpected(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
            },
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        ApiError::Core {
            operation: None,
            error,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorBody {
    code: &'static str,
    message: String,
    operation: Option<&'static str>,
    requires_restart: bool,
}

impl ApiError {
    fn body(&self) -> ErrorBody {
        match self {
            ApiError::Core { operation, error } => ErrorBody {
                code: error.code(),
                message: error.to_string(),
                operation: *operation,
                requires_restart: error.requires_restart(),
            },
            ApiError::BadRequest(message) => ErrorBody {
                code: "BAD_REQUEST",
                message: message.clone(),
                operation: None,
                requires_restart: false,
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = self.body();
        if status.is_server_error() {
            error!("[Api] {} ({:?}): {}", body.code, body.operation, body.message);
        }
        (status, Json(body)).into_response()
    }
}
