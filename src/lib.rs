//! Request/response shim for API Gateway backed Lambda functions.
//!
//! [`wrap`] turns an async handler over a normalized [`Event`] into a
//! function that always answers with a well-formed [`Outcome`].

pub mod config;
pub mod event;
pub mod handler;
pub mod logging;
pub mod outcome;

pub use config::{get_log_format, LogFormat};
pub use event::{normalize, Event, EventError, RawEvent};
pub use handler::{wrap, Handler, HandlerResult};
pub use logging::init_logging;
pub use outcome::{BoxError, HandlerError, HttpFailure, HttpSuccess, Outcome};
