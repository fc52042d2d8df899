use axum::extract::rejection::JsonRejection;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use shared::FulfillmentError;
use validator::{ValidationErrors, ValidationErrorsKind};

/// One invalid input field, e.g. `orderLines.0.price` in the request body.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub location: &'static str,
    pub messages: Vec<String>,
}

#[derive(Debug, Serialize)]
struct ErrorBody {
    code: u16,
    message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<FieldError>,
}

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Fulfillment(#[from] FulfillmentError),

    #[error("Validation Error")]
    Invalid { errors: Vec<FieldError> },

    #[error("{0}")]
    MalformedBody(String),
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Fulfillment(err) => match err {
                FulfillmentError::NotFound(_) => StatusCode::NOT_FOUND,
                FulfillmentError::Validation(_) => StatusCode::BAD_REQUEST,
                FulfillmentError::InsufficientInventory { .. }
                | FulfillmentError::QuantityOutOfRange { .. } => StatusCode::UNPROCESSABLE_ENTITY,
                FulfillmentError::StatusChanged { .. } => StatusCode::CONFLICT,
                FulfillmentError::Database(_)
                | FulfillmentError::Encoding(_)
                | FulfillmentError::Corrupt(_)
                | FulfillmentError::Unavailable(_) => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Invalid { .. } | Self::MalformedBody(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        let (message, errors) = match self {
            Self::Fulfillment(FulfillmentError::Validation(errors)) => {
                ("Validation Error".to_string(), field_errors(&errors, "body"))
            }
            Self::Fulfillment(
                err @ (FulfillmentError::Database(_)
                | FulfillmentError::Encoding(_)
                | FulfillmentError::Corrupt(_)
                | FulfillmentError::Unavailable(_)),
            ) => {
                // Store details stay in the logs.
                tracing::error!(error = %err, "Request failed");
                ("Internal Server Error".to_string(), Vec::new())
            }
            Self::Invalid { errors } => ("Validation Error".to_string(), errors),
            other => (other.to_string(), Vec::new()),
        };

        let body = ErrorBody {
            code: status.as_u16(),
            message,
            errors,
        };

        (status, Json(body)).into_response()
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(errors: ValidationErrors) -> Self {
        Self::Invalid {
            errors: field_errors(&errors, "body"),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::MalformedBody(rejection.body_text())
    }
}

/// Flattens nested validator output into dotted field paths, sorted by path.
pub fn field_errors(errors: &ValidationErrors, location: &'static str) -> Vec<FieldError> {
    let mut out = Vec::new();
    collect(errors, None, location, &mut out);
    out.sort_by(|a, b| a.field.cmp(&b.field));
    out
}

fn collect(
    errors: &ValidationErrors,
    prefix: Option<&str>,
    location: &'static str,
    out: &mut Vec<FieldError>,
) {
    for (name, kind) in errors.errors() {
        let leaf = camel_case(name);
        let field = match prefix {
            Some(prefix) => format!("{prefix}.{leaf}"),
            None => leaf.clone(),
        };

        match kind {
            ValidationErrorsKind::Field(failures) => out.push(FieldError {
                field,
                location,
                messages: failures
                    .iter()
                    .map(|failure| match &failure.message {
                        Some(message) => message.to_string(),
                        None => format!("\"{leaf}\" is invalid"),
                    })
                    .collect(),
            }),
            ValidationErrorsKind::Struct(inner) => collect(inner, Some(&field), location, out),
            ValidationErrorsKind::List(items) => {
                for (index, inner) in items {
                    collect(inner, Some(&format!("{field}.{index}")), location, out);
                }
            }
        }
    }
}

fn camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper = false;
    for c in name.chars() {
        if c == '_' {
            upper = true;
        } else if upper {
            out.extend(c.to_uppercase());
            upper = false;
        } else {
            out.push(c);
        }
    }
    out
}
