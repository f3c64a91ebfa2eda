use std::fmt;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;

/// A single rejected request field
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError
{   pub field: String
  , pub message: String
}

impl FieldError
{   pub fn new(field: &str, message: impl Into<String>) -> Self
    {   FieldError
        {   field: field.to_string()
          , message: message.into()
        }
    }
}

/// Custom error type for tokenprobe operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error
{   /// No upstream credential available for the call
    MissingApiKey(String)
  , /// Transport-level failure talking to the upstream
    HttpError(String)
  , /// Upstream answered with a non-success status
    Upstream
    {   status: Option<u16>
      , message: String
    }
  , /// Failed to parse API response
    ParseError(String)
  , /// No choices in API response
    NoChoicesInResponse
  , /// Request body could not be decoded
    InvalidRequest(String)
  , /// One or more request fields out of range
    Validation(Vec<FieldError>)
  , /// Passkey did not match
    Unauthorized
  , /// Invalid configuration
    InvalidConfiguration(String)
  , /// Generic error
    Other(String)
}

impl Error
{   /// HTTP status reported to the caller for this error
    pub fn status_code(&self) -> StatusCode
    {   match self
        {   Error::InvalidRequest(_)
          | Error::Validation(_) => StatusCode::BAD_REQUEST
          , Error::Unauthorized => StatusCode::UNAUTHORIZED
          , Error::Upstream { status: Some(code), .. } => {
              StatusCode::from_u16(*code)
                .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
            }
          , _ => StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

impl fmt::Display for Error
{   fn fmt(&self, f: &mut fmt::Formatter<'_>)
      -> fmt::Result
    {   match self
        {   Error::MissingApiKey(what) => {
              write!(f, "Missing API key for: {}", what)
            }
          , Error::HttpError(msg) => {
              write!(f, "HTTP error: {}", msg)
            }
          , Error::Upstream { status: Some(code), message } => {
              write!(f, "Upstream error ({}): {}", code, message)
            }
          , Error::Upstream { status: None, message } => {
              write!(f, "Upstream error: {}", message)
            }
          , Error::ParseError(msg) => {
              write!(f, "Parse error: {}", msg)
            }
          , Error::NoChoicesInResponse => {
              write!(f, "API response contained no choices")
            }
          , Error::InvalidRequest(msg) => {
              write!(f, "Invalid request: {}", msg)
            }
          , Error::Validation(fields) => {
              let names: Vec<&str>
                = fields.iter().map(|e| e.field.as_str()).collect();
              write!(f,
                "Validation failed: {}",
                names.join(", ")
              )
            }
          , Error::Unauthorized => {
              write!(f, "Invalid passkey")
            }
          , Error::InvalidConfiguration(msg) => {
              write!(f, "Invalid configuration: {}", msg)
            }
          , Error::Other(msg) => {
              write!(f, "Error: {}", msg)
            }
        }
    }
}

impl std::error::Error for Error {}

impl From<String> for Error
{   fn from(s: String) -> Self
    {   Error::Other(s)
    }
}

impl From<&str> for Error
{   fn from(s: &str) -> Self
    {   Error::Other(s.to_string())
    }
}

#[derive(Serialize)]
struct ErrorBody<'a>
{   error: String
  , #[serde(skip_serializing_if = "Option::is_none")]
    fields: Option<&'a [FieldError]>
}

impl IntoResponse for Error
{   fn into_response(self) -> Response
    {   let status = self.status_code();
        let fields = match &self
        {   Error::Validation(fields) => Some(fields.as_slice())
          , _ => None
        };
        let body = ErrorBody
        {   error: match &self
            {   Error::Upstream { message, .. } => message.clone()
              , Error::Validation(_) => "Validation failed".to_string()
              , other => other.to_string()
            }
          , fields
        };
        (status, Json(body)).into_response()
    }
}
