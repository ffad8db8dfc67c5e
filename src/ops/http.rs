// Copyright © 2025 Lukas Bower
// SPDX-License-Identifier: Apache-2.0
// Purpose: HTTP GET and POST operations summarised as status and headers.
// Author: Lukas Bower

//! HTTP client operations.
//!
//! Query parameters, headers and JSON bodies are passed as JSON objects on the
//! command line. Non-2xx responses are still summarised; only transport
//! failures are errors.

use std::time::{Duration, Instant};

use serde_json::{Map, Value};
use ureq::{Agent, AgentBuilder, Request, Response};

use super::arg;
use crate::engine::CancelToken;
use crate::error::{ArgError, OpError, OpResult};

/// Request timeout used when none is given.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

type Object = Map<String, Value>;

fn parse_object(text: &str, what: &str) -> Result<Object, ArgError> {
    match serde_json::from_str::<Value>(text) {
        Ok(Value::Object(map)) => Ok(map),
        _ => Err(ArgError::invalid(format!(
            "Invalid {what} format. Please provide valid JSON."
        ))),
    }
}

fn parse_timeout(text: Option<&str>) -> Result<u64, ArgError> {
    match text {
        None => Ok(DEFAULT_TIMEOUT_SECS),
        Some(text) => text
            .parse()
            .map_err(|_| ArgError::invalid("Timeout must be an integer value in seconds")),
    }
}

fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

fn agent(timeout_secs: u64) -> Agent {
    AgentBuilder::new()
        .timeout(Duration::from_secs(timeout_secs))
        .build()
}

fn with_headers(mut request: Request, headers: Option<&Object>) -> Request {
    for (name, value) in headers.into_iter().flatten() {
        request = request.set(name, &value_text(value));
    }
    request
}

/// Render status, elapsed time and headers.
fn summarize(response: &Response, elapsed: Duration) -> String {
    let mut lines = vec![
        format!("Status Code: {}", response.status()),
        format!("Response Time: {:.2} seconds", elapsed.as_secs_f64()),
        "\nResponse Headers:".to_owned(),
    ];
    for name in response.headers_names() {
        if let Some(value) = response.header(&name) {
            lines.push(format!("  {name}: {value}"));
        }
    }
    lines.join("\n")
}

fn complete(
    outcome: Result<Response, ureq::Error>,
    started: Instant,
    method: &str,
) -> OpResult {
    match outcome {
        Ok(response) | Err(ureq::Error::Status(_, response)) => {
            Ok(summarize(&response, started.elapsed()))
        }
        Err(ureq::Error::Transport(err)) => Err(OpError::Http(format!(
            "Error sending {method} request: {err}"
        ))),
    }
}

/// Typed arguments of `get`.
#[derive(Debug, Clone, PartialEq)]
pub struct GetRequest {
    /// Target URL.
    pub url: String,
    /// Query parameters.
    pub params: Option<Object>,
    /// Request headers.
    pub headers: Option<Object>,
    /// Timeout in seconds.
    pub timeout_secs: u64,
}

impl GetRequest {
    /// Bind `url [params] [headers] [timeout]`.
    pub fn from_args(args: &[String]) -> Result<Self, ArgError> {
        Ok(Self {
            url: arg(args, 0).unwrap_or_default().to_owned(),
            params: arg(args, 1).map(|text| parse_object(text, "params")).transpose()?,
            headers: arg(args, 2).map(|text| parse_object(text, "headers")).transpose()?,
            timeout_secs: parse_timeout(arg(args, 3))?,
        })
    }
}

/// Body of a POST request.
#[derive(Debug, Clone, PartialEq)]
pub enum PostBody {
    /// No body.
    Empty,
    /// A JSON object sent form-encoded.
    Form(Object),
    /// Any other text, sent verbatim.
    Raw(String),
    /// A JSON document sent as `application/json`.
    Json(Value),
}

/// Typed arguments of `post`.
#[derive(Debug, Clone, PartialEq)]
pub struct PostRequest {
    /// Target URL.
    pub url: String,
    /// Request body.
    pub body: PostBody,
    /// Request headers.
    pub headers: Option<Object>,
    /// Timeout in seconds.
    pub timeout_secs: u64,
}

impl PostRequest {
    /// Bind `url [data] [headers] [timeout]` or `url data headers json timeout`.
    ///
    /// With four fields the last one is the timeout; a JSON body needs all
    /// five. `data` that parses as a JSON object is form-encoded, anything
    /// else is sent as-is. A `json` argument takes precedence over `data`.
    pub fn from_args(args: &[String]) -> Result<Self, ArgError> {
        let url = arg(args, 0).unwrap_or_default().to_owned();
        let headers = arg(args, 2).map(|text| parse_object(text, "headers")).transpose()?;
        let (json, timeout) = if args.len() >= 5 {
            (arg(args, 3), arg(args, 4))
        } else {
            (None, arg(args, 3))
        };
        let json = json
            .map(|text| {
                serde_json::from_str::<Value>(text).map_err(|_| {
                    ArgError::invalid("Invalid JSON data format. Please provide valid JSON.")
                })
            })
            .transpose()?;
        let body = match (json, arg(args, 1)) {
            (Some(json), _) => PostBody::Json(json),
            (None, Some(data)) => match serde_json::from_str::<Value>(data) {
                Ok(Value::Object(map)) => PostBody::Form(map),
                _ => PostBody::Raw(data.to_owned()),
            },
            (None, None) => PostBody::Empty,
        };
        Ok(Self {
            url,
            body,
            headers,
            timeout_secs: parse_timeout(timeout)?,
        })
    }
}

/// `get url [params] [headers] [timeout]`.
pub fn get(args: &[String], _token: &CancelToken) -> OpResult {
    let request = GetRequest::from_args(args)?;
    let mut call = agent(request.timeout_secs).get(&request.url);
    for (name, value) in request.params.iter().flatten() {
        call = call.query(name, &value_text(value));
    }
    let call = with_headers(call, request.headers.as_ref());
    let started = Instant::now();
    complete(call.call(), started, "GET")
}

/// `post url [data] [headers] [timeout]` or `post url data headers json timeout`.
pub fn post(args: &[String], _token: &CancelToken) -> OpResult {
    let request = PostRequest::from_args(args)?;
    let call = with_headers(
        agent(request.timeout_secs).post(&request.url),
        request.headers.as_ref(),
    );
    let started = Instant::now();
    let outcome = match &request.body {
        PostBody::Empty => call.call(),
        PostBody::Raw(text) => call.send_string(text),
        PostBody::Json(json) => call
            .set("Content-Type", "application/json")
            .send_string(&json.to_string()),
        PostBody::Form(map) => {
            let pairs: Vec<(String, String)> = map
                .iter()
                .map(|(key, value)| (key.clone(), value_text(value)))
                .collect();
            let borrowed: Vec<(&str, &str)> = pairs
                .iter()
                .map(|(key, value)| (key.as_str(), value.as_str()))
                .collect();
            call.send_form(&borrowed)
        }
    };
    complete(outcome, started, "POST")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| (*value).to_owned()).collect()
    }

    #[test]
    fn get_rejects_malformed_json_and_timeout() {
        let err = GetRequest::from_args(&args(&["http://h", "{oops"])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Error: Invalid params format. Please provide valid JSON."
        );
        let err = GetRequest::from_args(&args(&["http://h", "{}", "[1]"])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Error: Invalid headers format. Please provide valid JSON."
        );
        let err = GetRequest::from_args(&args(&["http://h", "{}", "{}", "soon"])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Error: Timeout must be an integer value in seconds"
        );
        let ok = GetRequest::from_args(&args(&["http://h"])).unwrap();
        assert_eq!(ok.timeout_secs, DEFAULT_TIMEOUT_SECS);
    }

    #[test]
    fn post_body_classification() {
        let form = PostRequest::from_args(&args(&["u", r#"{"a":1}"#])).unwrap();
        assert!(matches!(form.body, PostBody::Form(_)));
        let raw = PostRequest::from_args(&args(&["u", "a=1&b=2"])).unwrap();
        assert_eq!(raw.body, PostBody::Raw("a=1&b=2".into()));
        let json = PostRequest::from_args(&args(&["u", "ignored", "{}", "[1,2]", "7"])).unwrap();
        assert_eq!(json.body, PostBody::Json(serde_json::json!([1, 2])));
        assert_eq!(json.timeout_secs, 7);
        let err = PostRequest::from_args(&args(&["u", "x", "{}", "{bad", "5"])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Error: Invalid JSON data format. Please provide valid JSON."
        );
    }

    #[test]
    fn post_fourth_field_is_the_timeout() {
        let request = PostRequest::from_args(&args(&["http://h", "a=1", "{}", "10"])).unwrap();
        assert_eq!(request.timeout_secs, 10);
        assert_eq!(request.body, PostBody::Raw("a=1".into()));

        let err = PostRequest::from_args(&args(&["http://h", "a=1", "{}", "[1]"])).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Error: Timeout must be an integer value in seconds"
        );

        let request =
            PostRequest::from_args(&args(&["http://h", "a=1", "{}", r#"{"k":1}"#, "3"])).unwrap();
        assert_eq!(request.timeout_secs, 3);
        assert_eq!(request.body, PostBody::Json(serde_json::json!({"k": 1})));
    }

    #[test]
    fn transport_failure_names_method() {
        let err = get(&args(&["http://127.0.0.1:1/", "{}", "{}", "2"]), &CancelToken::new())
            .unwrap_err();
        assert!(err.to_string().starts_with("Error sending GET request: "), "{err}");
    }
}
