use serde::Serialize;
use serde_json::json;
use thiserror::Error;

use crate::event::{EventError, StringMap, INVALID_BODY};

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

pub const INTERNAL_SERVER_ERROR: &str = "Internal Server Error";

/// A well-formed response. `body` holds the JSON-serialized payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HttpSuccess {
    status_code: u16,
    body: String,
    headers: StringMap,
}

impl HttpSuccess {
    pub fn new<T>(status_code: u16, payload: &T) -> Result<Self, serde_json::Error>
    where
        T: Serialize + ?Sized,
    {
        Ok(Self {
            status_code,
            body: serde_json::to_string(payload)?,
            headers: StringMap::new(),
        })
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn with_headers(mut self, headers: StringMap) -> Self {
        self.headers.extend(headers);
        self
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn headers(&self) -> &StringMap {
        &self.headers
    }
}

/// An error response whose body is always `{"error": <message>}`.
///
/// Returned from handlers through [`HandlerError::Http`] and handed to the
/// platform unchanged. The message is kept next to the body for logging.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Error)]
#[serde(rename_all = "camelCase")]
#[error("{message}")]
pub struct HttpFailure {
    status_code: u16,
    body: String,
    headers: StringMap,
    #[serde(skip)]
    message: String,
}

impl HttpFailure {
    pub fn new(status_code: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        Self {
            status_code,
            body: json!({ "error": message }).to_string(),
            headers: StringMap::new(),
            message,
        }
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(400, message)
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(401, message)
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(403, message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(404, message)
    }

    /// The generic failure every unclassified error collapses into.
    pub fn internal() -> Self {
        Self::new(500, INTERNAL_SERVER_ERROR)
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name.into(), value.into());
        self
    }

    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn body(&self) -> &str {
        &self.body
    }

    pub fn headers(&self) -> &StringMap {
        &self.headers
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

/// Error returned by user handlers.
///
/// `Http` is a failure the handler chose deliberately and is returned as is.
/// `Internal` is anything else; its detail is logged but never reaches the
/// response.
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error(transparent)]
    Http(#[from] HttpFailure),

    #[error("{0}")]
    Internal(BoxError),
}

impl From<BoxError> for HandlerError {
    fn from(err: BoxError) -> Self {
        HandlerError::Internal(err)
    }
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        HandlerError::Internal(Box::new(err))
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        HandlerError::Internal(message.into())
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        HandlerError::Internal(message.into())
    }
}

impl From<EventError> for HandlerError {
    fn from(err: EventError) -> Self {
        match err {
            EventError::Body(_) => HandlerError::Http(HttpFailure::bad_request(INVALID_BODY)),
            other => HandlerError::Internal(Box::new(other)),
        }
    }
}

/// What the platform receives: `{statusCode, body, headers}` in both cases.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum Outcome {
    Success(HttpSuccess),
    Failure(HttpFailure),
}

impl Outcome {
    pub fn status_code(&self) -> u16 {
        match self {
            Outcome::Success(success) => success.status_code(),
            Outcome::Failure(failure) => failure.status_code(),
        }
    }

    pub fn body(&self) -> &str {
        match self {
            Outcome::Success(success) => success.body(),
            Outcome::Failure(failure) => failure.body(),
        }
    }

    pub fn headers(&self) -> &StringMap {
        match self {
            Outcome::Success(success) => success.headers(),
            Outcome::Failure(failure) => failure.headers(),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }
}

impl From<Result<HttpSuccess, HandlerError>> for Outcome {
    fn from(result: Result<HttpSuccess, HandlerError>) -> Self {
        match result {
            Ok(success) => Outcome::Success(success),
            Err(HandlerError::Http(failure)) => Outcome::Failure(failure),
            Err(HandlerError::Internal(_)) => Outcome::Failure(HttpFailure::internal()),
        }
    }
}
