use std::collections::BTreeMap;

use axum::{http::StatusCode, response::IntoResponse, Json};

use crate::JsonResponse;

pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Debug, thiserror::Error)]
pub enum RequestError {
    #[error("{0}")]
    NotFound(&'static str),
    #[error("{0}")]
    NotAuthorized(&'static str),
    #[error("{0}")]
    Forbidden(&'static str),
    #[error("{0}")]
    BadRequest(String),
    #[error("invalid fields: {0:?}")]
    Validation(FieldErrors),
    #[error("Internal Server Error")]
    ServerError,
    #[error(transparent)]
    DatabaseError(#[from] sqlx::Error),
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct RequestErrorJsonWrapper {
    pub errors: FieldErrors,
}

impl RequestErrorJsonWrapper {
    pub fn new(error: &str) -> RequestErrorJsonWrapper {
        RequestErrorJsonWrapper {
            errors: BTreeMap::from([("body".to_string(), vec![error.to_string()])]),
        }
    }
}

impl From<validator::ValidationErrors> for RequestError {
    fn from(value: validator::ValidationErrors) -> Self {
        let fields = value
            .field_errors()
            .into_iter()
            .map(|(field, errors)| {
                let messages = errors
                    .iter()
                    .map(|error| match &error.message {
                        Some(message) => message.to_string(),
                        None => format!("Invalid value ({}).", error.code),
                    })
                    .collect();
                (field.to_string(), messages)
            })
            .collect();
        Self::Validation(fields)
    }
}

impl IntoResponse for RequestError {
    fn into_response(self) -> axum::response::Response {
        self.to_json_response().into_response()
    }
}

impl RequestError {
    /// A 400 carrying a single message for one field.
    pub fn invalid_field(field: &str, message: impl Into<String>) -> Self {
        Self::Validation(BTreeMap::from([(field.to_string(), vec![message.into()])]))
    }

    pub fn is_unique_violation(&self) -> bool {
        matches!(
            self,
            RequestError::DatabaseError(sqlx::Error::Database(e))
                if e.message().contains("UNIQUE constraint failed")
        )
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            RequestError::NotFound(_) => StatusCode::NOT_FOUND,
            RequestError::NotAuthorized(_) => StatusCode::UNAUTHORIZED,
            RequestError::Forbidden(_) => StatusCode::FORBIDDEN,
            RequestError::BadRequest(_) | RequestError::Validation(_) => StatusCode::BAD_REQUEST,
            RequestError::ServerError
            | RequestError::DatabaseError(_)
            | RequestError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message suitable for showing to a person, e.g. in a page notice.
    pub fn user_message(&self) -> String {
        match self {
            RequestError::Validation(fields) => fields
                .values()
                .flatten()
                .cloned()
                .collect::<Vec<_>>()
                .join(" "),
            RequestError::DatabaseError(_) | RequestError::Internal(_) => {
                "Internal Server Error".to_string()
            }
            other => other.to_string(),
        }
    }

    pub fn to_json_response(&self) -> JsonResponse<RequestErrorJsonWrapper> {
        let json = match self {
            RequestError::Validation(fields) => RequestErrorJsonWrapper {
                errors: fields.clone(),
            },
            RequestError::DatabaseError(e) => {
                tracing::error!("Database error: {}", e);
                RequestErrorJsonWrapper::new("Internal Server Error")
            }
            RequestError::Internal(e) => {
                tracing::error!("Internal error: {:#}", e);
                RequestErrorJsonWrapper::new("Internal Server Error")
            }
            other => RequestErrorJsonWrapper::new(&other.to_string()),
        };
        (self.status_code(), Json(json))
    }
}
