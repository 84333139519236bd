//! Collector responses and the hook that receives them.

use serde_json::Value;

/// Receives the collector's payload after a successful request.
///
/// The collector's reply carries no defined contract yet; implementations
/// must tolerate any JSON value.
pub trait ResponseHandler: Send + Sync {
    fn on_response(&self, payload: &Value);
}

/// Default handler: the payload is accepted and dropped.
#[derive(Debug, Default, Clone, Copy)]
pub struct IgnoreResponse;

impl ResponseHandler for IgnoreResponse {
    fn on_response(&self, _payload: &Value) {}
}

/// Parse a plain JSON body. Empty or non-JSON bodies yield `None`.
pub fn decode_json(body: &str) -> Option<Value> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    serde_json::from_str(trimmed).ok()
}

/// Parse a callback-wrapped body of the form `callback({...});`.
///
/// The wrapper must name `callback`; anything else is treated as malformed.
pub fn decode_jsonp(body: &str, callback: &str) -> Option<Value> {
    let inner = unwrap_callback(body, callback)?;
    serde_json::from_str(inner).ok()
}

fn unwrap_callback<'a>(body: &'a str, callback: &str) -> Option<&'a str> {
    let mut rest = body.trim();
    if let Some(stripped) = rest.strip_prefix("/**/") {
        rest = stripped.trim_start();
    }
    let rest = rest.strip_prefix(callback)?.trim_start();
    let rest = rest.strip_prefix('(')?;
    let rest = rest.trim_end();
    let rest = rest.strip_suffix(';').unwrap_or(rest).trim_end();
    let inner = rest.strip_suffix(')')?;
    Some(inner.trim())
}
