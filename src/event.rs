use serde::de::{self, DeserializeOwned, Deserializer};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use thiserror::Error;

use crate::outcome::{HandlerError, HttpFailure};

pub type StringMap = HashMap<String, String>;

#[derive(Debug, Error)]
pub enum EventError {
    #[error("request body is not valid JSON: {0}")]
    Body(#[source] serde_json::Error),

    #[error("authorizer claim is not valid JSON: {0}")]
    Claim(#[source] serde_json::Error),

    #[error("raw event does not match a known event shape: {0}")]
    Malformed(#[source] serde_json::Error),
}

/// The request record handed to user handlers.
///
/// Every field is populated after normalization, whatever the raw event
/// left out.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub path: String,
    pub method: String,
    pub headers: StringMap,
    pub query: StringMap,
    pub params: StringMap,
    pub body: Value,
    pub session: Value,
}

impl Event {
    /// Looks up a header ignoring ASCII case. `headers` itself keeps the
    /// names as received.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }

    // A body that doesn't fit `T` is the caller's fault, hence 400.
    pub fn body_as<T: DeserializeOwned>(&self) -> Result<T, HttpFailure> {
        T::deserialize(&self.body).map_err(|_| HttpFailure::bad_request(INVALID_BODY))
    }

    /// Decodes the session claim, `None` when the request carried no claim.
    pub fn session_as<T: DeserializeOwned>(&self) -> Result<Option<T>, HandlerError> {
        if self.session.is_null() {
            return Ok(None);
        }
        Ok(Some(T::deserialize(&self.session)?))
    }
}

pub(crate) const INVALID_BODY: &str = "Invalid JSON body";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestContext {
    pub authorizer: Option<Authorizer>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Authorizer {
    pub principal_id: Option<String>,
}

/// API Gateway REST proxy event.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxyEvent {
    pub path: Option<String>,
    pub http_method: Option<String>,
    #[serde(default, deserialize_with = "string_map")]
    pub headers: Option<StringMap>,
    #[serde(default, deserialize_with = "string_map")]
    pub query_string_parameters: Option<StringMap>,
    #[serde(default, deserialize_with = "string_map")]
    pub path_parameters: Option<StringMap>,
    pub body: Option<String>,
    pub request_context: Option<RequestContext>,
}

/// Event already laid out close to [`Event`]. The body may arrive either as
/// a JSON-encoded string or as an already decoded JSON value.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DirectEvent {
    pub path: Option<String>,
    pub method: Option<String>,
    #[serde(default, deserialize_with = "string_map")]
    pub headers: Option<StringMap>,
    #[serde(default, deserialize_with = "string_map")]
    pub query: Option<StringMap>,
    #[serde(default, deserialize_with = "string_map")]
    pub params: Option<StringMap>,
    pub body: Option<Value>,
    pub request_context: Option<RequestContext>,
}

#[derive(Debug, Clone)]
pub enum RawEvent {
    Proxy(ProxyEvent),
    Direct(DirectEvent),
}

const PROXY_KEYS: [&str; 4] = [
    "httpMethod",
    "queryStringParameters",
    "pathParameters",
    "resource",
];
const DIRECT_KEYS: [&str; 3] = ["method", "query", "params"];

impl<'de> Deserialize<'de> for RawEvent {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Value::deserialize(deserializer)?;
        let is_direct = match &value {
            Value::Object(fields) => {
                !PROXY_KEYS.iter().any(|key| fields.contains_key(*key))
                    && DIRECT_KEYS.iter().any(|key| fields.contains_key(*key))
            }
            other => {
                return Err(de::Error::invalid_type(
                    de::Unexpected::Other(json_kind(other)),
                    &"an event object",
                ))
            }
        };

        if is_direct {
            serde_json::from_value(value)
                .map(RawEvent::Direct)
                .map_err(de::Error::custom)
        } else {
            serde_json::from_value(value)
                .map(RawEvent::Proxy)
                .map_err(de::Error::custom)
        }
    }
}

// Entries whose value is null are dropped rather than failing the event
fn string_map<'de, D>(deserializer: D) -> Result<Option<StringMap>, D::Error>
where
    D: Deserializer<'de>,
{
    let map: Option<HashMap<String, Option<String>>> = Option::deserialize(deserializer)?;
    Ok(map.map(|map| {
        map.into_iter()
            .filter_map(|(key, value)| value.map(|value| (key, value)))
            .collect()
    }))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

impl RawEvent {
    pub fn from_json(payload: Value) -> Result<Self, EventError> {
        serde_json::from_value(payload).map_err(EventError::Malformed)
    }

    pub fn normalize(self) -> Result<Event, EventError> {
        match self {
            RawEvent::Proxy(event) => event.normalize(),
            RawEvent::Direct(event) => event.normalize(),
        }
    }
}

impl ProxyEvent {
    pub fn normalize(self) -> Result<Event, EventError> {
        Ok(Event {
            path: self.path.unwrap_or_else(default_path),
            method: self.http_method.unwrap_or_else(default_method),
            headers: self.headers.unwrap_or_default(),
            query: self.query_string_parameters.unwrap_or_default(),
            params: self.path_parameters.unwrap_or_default(),
            body: decode_body(self.body.as_deref())?,
            session: decode_claim(self.request_context)?,
        })
    }
}

impl DirectEvent {
    pub fn normalize(self) -> Result<Event, EventError> {
        let body = match self.body {
            None | Some(Value::Null) => empty_object(),
            Some(Value::String(raw)) => decode_body(Some(raw.as_str()))?,
            Some(decoded) => decoded,
        };

        Ok(Event {
            path: self.path.unwrap_or_else(default_path),
            method: self.method.unwrap_or_else(default_method),
            headers: self.headers.unwrap_or_default(),
            query: self.query.unwrap_or_default(),
            params: self.params.unwrap_or_default(),
            body,
            session: decode_claim(self.request_context)?,
        })
    }
}

/// Normalizes either raw event variant into an [`Event`].
pub fn normalize(raw: RawEvent) -> Result<Event, EventError> {
    raw.normalize()
}

fn default_path() -> String {
    "/".to_string()
}

fn default_method() -> String {
    "GET".to_string()
}

fn empty_object() -> Value {
    Value::Object(Map::new())
}

fn decode_body(body: Option<&str>) -> Result<Value, EventError> {
    match body {
        None | Some("") => Ok(empty_object()),
        Some(raw) => serde_json::from_str(raw).map_err(EventError::Body),
    }
}

fn decode_claim(context: Option<RequestContext>) -> Result<Value, EventError> {
    let claim = context
        .and_then(|context| context.authorizer)
        .and_then(|authorizer| authorizer.principal_id);

    match claim {
        Some(claim) => serde_json::from_str(&claim).map_err(EventError::Claim),
        None => Ok(Value::Null),
    }
}
