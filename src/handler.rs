use lambda_runtime::{service_fn, Error, LambdaEvent};
use serde_json::Value;
use std::future::Future;
use tracing::{debug, error, info, info_span, warn, Instrument};

use crate::event::{Event, RawEvent};
use crate::outcome::{HandlerError, HttpSuccess, Outcome};

pub type HandlerResult = Result<HttpSuccess, HandlerError>;

/// A user handler wrapped so every invocation ends in an [`Outcome`].
pub struct Handler<F> {
    handle: F,
}

pub fn wrap<F, Fut>(handle: F) -> Handler<F>
where
    F: Fn(Event) -> Fut,
    Fut: Future<Output = HandlerResult>,
{
    Handler { handle }
}

impl<F, Fut> Handler<F>
where
    F: Fn(Event) -> Fut,
    Fut: Future<Output = HandlerResult>,
{
    /// Normalizes the raw event, awaits the handler and settles the result.
    /// A raw event that fails to normalize never reaches the handler.
    pub async fn call(&self, raw: RawEvent) -> Outcome {
        let result = match raw.normalize() {
            Ok(event) => {
                debug!(method = %event.method, path = %event.path, "invoking handler");
                (self.handle)(event).await
            }
            Err(err) => {
                warn!(error = %err, "failed to normalize event");
                Err(err.into())
            }
        };
        settle(result)
    }

    /// Same as [`Handler::call`] for a payload still in platform JSON form.
    pub async fn call_json(&self, payload: Value) -> Outcome {
        match RawEvent::from_json(payload) {
            Ok(raw) => self.call(raw).await,
            Err(err) => settle(Err(err.into())),
        }
    }

    /// Serves invocations from the Lambda runtime until it shuts down.
    pub async fn run(self) -> Result<(), Error> {
        let handler = &self;

        lambda_runtime::run(service_fn(|event: LambdaEvent<Value>| async move {
            let span = info_span!("invocation", request_id = %event.context.request_id);
            Ok::<Outcome, Error>(handler.call_json(event.payload).instrument(span).await)
        }))
        .await
    }
}

fn settle(result: HandlerResult) -> Outcome {
    match &result {
        Ok(success) => info!(status_code = success.status_code(), "request succeeded"),
        Err(HandlerError::Http(failure)) => warn!(
            status_code = failure.status_code(),
            reason = failure.message(),
            "request failed"
        ),
        Err(HandlerError::Internal(err)) => error!(error = %err, "unhandled error, responding 500"),
    }
    Outcome::from(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::init_test_logging;
    use crate::outcome::HttpFailure;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    fn raw(value: Value) -> RawEvent {
        RawEvent::from_json(value).unwrap()
    }

    #[tokio::test]
    async fn test_handler_receives_normalized_event() {
        init_test_logging();
        let seen: Arc<Mutex<Option<Event>>> = Arc::new(Mutex::new(None));

        let handler = wrap({
            let seen = seen.clone();
            move |event: Event| {
                let seen = seen.clone();
                async move {
                    *seen.lock().unwrap() = Some(event);
                    Ok::<_, HandlerError>(HttpSuccess::new(200, &json!({ "ok": true }))?)
                }
            }
        });

        let outcome = handler
            .call(raw(json!({
                "path": "/v1/user",
                "httpMethod": "PUT",
                "queryStringParameters": { "teapot": "kettle" }
            })))
            .await;

        assert_eq!(
            serde_json::to_value(&outcome).unwrap(),
            json!({ "statusCode": 200, "body": "{\"ok\":true}", "headers": {} })
        );

        let event = seen.lock().unwrap().take().unwrap();
        assert_eq!(event.path, "/v1/user");
        assert_eq!(event.method, "PUT");
        assert_eq!(event.query.get("teapot").unwrap(), "kettle");
        assert_eq!(event.body, json!({}));
        assert_eq!(event.session, Value::Null);
    }

    #[tokio::test]
    async fn test_success_is_returned_unchanged() {
        init_test_logging();
        let expected = HttpSuccess::new(201, &json!({ "foo": "bar" }))
            .unwrap()
            .with_header("location", "/things/1");

        let handler = wrap({
            let expected = expected.clone();
            move |_event: Event| {
                let expected = expected.clone();
                async move { Ok::<_, HandlerError>(expected) }
            }
        });

        let outcome = handler.call(raw(json!({}))).await;
        assert_eq!(outcome, Outcome::Success(expected));
    }

    #[tokio::test]
    async fn test_known_failure_is_returned_unchanged() {
        init_test_logging();
        let handler = wrap(|_event: Event| async {
            Err::<HttpSuccess, _>(HandlerError::from(HttpFailure::unauthorized("Unauthorized")))
        });

        let outcome = handler.call(raw(json!({}))).await;

        assert!(!outcome.is_success());
        assert_eq!(outcome.status_code(), 401);
        assert_eq!(outcome.body(), r#"{"error":"Unauthorized"}"#);
    }

    #[tokio::test]
    async fn test_unknown_failure_becomes_generic_500() {
        init_test_logging();
        let handler = wrap(|_event: Event| async {
            Err::<HttpSuccess, _>(HandlerError::from("Unknown error"))
        });

        let outcome = handler.call(raw(json!({}))).await;

        assert_eq!(outcome.status_code(), 500);
        assert_eq!(outcome.body(), r#"{"error":"Internal Server Error"}"#);
        assert!(!outcome.body().contains("Unknown error"));
        assert!(outcome.headers().is_empty());
    }

    #[tokio::test]
    async fn test_serde_error_in_handler_becomes_generic_500() {
        init_test_logging();
        let handler = wrap(|event: Event| async move {
            let count: u32 = serde_json::from_value(event.body)?;
            Ok::<_, HandlerError>(HttpSuccess::new(200, &count)?)
        });

        let outcome = handler
            .call(raw(json!({ "httpMethod": "POST", "body": "\"seven\"" })))
            .await;

        assert_eq!(outcome.status_code(), 500);
        assert_eq!(outcome.body(), r#"{"error":"Internal Server Error"}"#);
    }

    #[tokio::test]
    async fn test_malformed_body_is_bad_request_and_skips_handler() {
        init_test_logging();
        let calls = Arc::new(AtomicUsize::new(0));

        let handler = wrap({
            let calls = calls.clone();
            move |_event: Event| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Ok::<_, HandlerError>(HttpSuccess::new(200, &json!({}))?) }
            }
        });

        let outcome = handler
            .call(raw(json!({ "httpMethod": "POST", "body": "{oops" })))
            .await;

        assert_eq!(outcome.status_code(), 400);
        assert_eq!(outcome.body(), r#"{"error":"Invalid JSON body"}"#);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_malformed_claim_is_generic_500() {
        init_test_logging();
        let handler = wrap(|_event: Event| async {
            Ok::<_, HandlerError>(HttpSuccess::new(200, &json!({}))?)
        });

        let outcome = handler
            .call(raw(json!({
                "requestContext": { "authorizer": { "principalId": "not-json" } }
            })))
            .await;

        assert_eq!(outcome.status_code(), 500);
        assert!(!outcome.body().contains("not-json"));
    }

    #[tokio::test]
    async fn test_call_json_rejects_non_object_payload() {
        init_test_logging();
        let handler = wrap(|_event: Event| async {
            Ok::<_, HandlerError>(HttpSuccess::new(200, &json!({}))?)
        });

        let outcome = handler.call_json(json!([1, 2, 3])).await;

        assert_eq!(outcome.status_code(), 500);
        assert_eq!(outcome.body(), r#"{"error":"Internal Server Error"}"#);
    }

    #[tokio::test]
    async fn test_call_json_rejects_wrongly_typed_fields() {
        init_test_logging();
        let handler = wrap(|_event: Event| async {
            Ok::<_, HandlerError>(HttpSuccess::new(200, &json!({}))?)
        });

        for payload in [
            json!({ "httpMethod": 1 }),
            json!({ "headers": { "X": 5 } }),
            json!({ "method": "GET", "query": ["a"] }),
        ] {
            let outcome = handler.call_json(payload).await;
            assert_eq!(outcome.status_code(), 500);
            assert_eq!(outcome.body(), r#"{"error":"Internal Server Error"}"#);
        }
    }

    #[tokio::test]
    async fn test_call_json_tolerates_null_entries_and_mappings() {
        init_test_logging();
        let handler = wrap(|event: Event| async move {
            let payload = json!({
                "headers": event.headers,
                "query": event.query,
                "params": event.params,
                "body": event.body
            });
            Ok::<_, HandlerError>(HttpSuccess::new(200, &payload)?)
        });

        let with_null_header = handler.call_json(json!({ "headers": { "X": null } })).await;
        let direct_nulls = handler
            .call_json(json!({
                "method": "POST",
                "headers": null,
                "query": null,
                "params": null,
                "body": ""
            }))
            .await;

        let expected = json!({ "headers": {}, "query": {}, "params": {}, "body": {} });
        for outcome in [with_null_header, direct_nulls] {
            assert_eq!(outcome.status_code(), 200);
            let body: Value = serde_json::from_str(outcome.body()).unwrap();
            assert_eq!(body, expected);
        }
    }

    #[tokio::test]
    async fn test_call_json_reads_direct_shape() {
        init_test_logging();
        let handler = wrap(|event: Event| async move {
            let payload = json!({ "method": event.method, "body": event.body });
            Ok::<_, HandlerError>(HttpSuccess::new(200, &payload)?)
        });

        let outcome = handler
            .call_json(json!({ "method": "POST", "body": { "n": 1 } }))
            .await;

        let body: Value = serde_json::from_str(outcome.body()).unwrap();
        assert_eq!(body, json!({ "method": "POST", "body": { "n": 1 } }));
    }

    #[tokio::test]
    async fn test_session_reaches_handler() {
        init_test_logging();
        let handler = wrap(|event: Event| async move {
            match event.session.get("role").and_then(Value::as_str) {
                Some("admin") => Ok::<_, HandlerError>(HttpSuccess::new(200, &json!({ "admin": true }))?),
                _ => Err(HttpFailure::forbidden("Forbidden").into()),
            }
        });

        let admin = handler
            .call(raw(json!({
                "requestContext": { "authorizer": { "principalId": "{\"role\":\"admin\"}" } }
            })))
            .await;
        let anonymous = handler.call(raw(json!({}))).await;

        assert_eq!(admin.status_code(), 200);
        assert_eq!(anonymous.status_code(), 403);
        assert_eq!(anonymous.body(), r#"{"error":"Forbidden"}"#);
    }
}
