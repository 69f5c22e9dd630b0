//! Human-readable dump of the last request, for the diagnostics panel.

use chrono::Local;
use serde_json::Value;
use std::fmt;

use crate::http::RequestTrace;

pub fn render(trace: &RequestTrace) -> String {
    let status = match trace.status {
        Some(status) => status.to_string(),
        None => "(no response)".to_string(),
    };
    let timestamp = trace.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S");

    format!(
        "Method: {}\nURL: {}\nStatus: {}\nTimestamp: {}\n\nData: {}",
        trace.method,
        trace.url,
        status,
        timestamp,
        pretty(&trace.body),
    )
}

fn pretty(body: &Value) -> String {
    serde_json::to_string_pretty(body).unwrap_or_else(|_| body.to_string())
}

impl fmt::Display for RequestTrace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&render(self))
    }
}
