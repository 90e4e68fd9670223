use http_shim::{get_log_format, init_logging, wrap, Event, HandlerResult, HttpFailure, HttpSuccess};
use lambda_runtime::Error;
use serde::Deserialize;
use serde_json::json;

#[derive(Deserialize)]
struct Session {
    name: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Error> {
    // Configure logging at cold start (once per container lifecycle)
    init_logging(get_log_format());

    wrap(hello).run().await
}

// Greets the `name` query parameter, or the caller's session name when absent
async fn hello(event: Event) -> HandlerResult {
    let name = match event.query.get("name") {
        Some(name) if !name.is_empty() => name.clone(),
        _ => event
            .session_as::<Session>()?
            .and_then(|session| session.name)
            .ok_or_else(|| HttpFailure::bad_request("name is required"))?,
    };

    Ok(HttpSuccess::new(200, &json!({ "message": format!("Hello, {}!", name) }))?
        .with_header("content-type", "application/json"))
}
