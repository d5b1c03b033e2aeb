//! Line-oriented JSON protocol spoken with the worker process
//!
//! One JSON object per line on the worker's stdin, one JSON object per line
//! back on its stdout. A bare `exit` line asks the worker to terminate
//! itself. stderr is free-text diagnostics and never part of the structured
//! protocol.

use std::collections::HashMap;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::config::ProcessConfig;
use crate::types::{ImageFormat, RenderRequest};

/// Sentinel line requesting graceful worker self-termination.
pub const EXIT_SENTINEL: &str = "exit";

/// Request line sent to the worker.
#[derive(Debug, Serialize)]
pub struct WorkerRequest<'a> {
    pub url: &'a str,
    pub width: u32,
    pub height: u32,
    pub format: ImageFormat,

    /// Page-load budget in milliseconds.
    pub timeout: u64,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub html64: Option<String>,

    #[serde(rename = "userAgent", skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<&'a str>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub headers: Option<&'a HashMap<String, String>>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub cookies: Option<&'a HashMap<String, String>>,

    #[serde(rename = "httpProxy", skip_serializing_if = "Option::is_none")]
    pub http_proxy: Option<&'a str>,

    #[serde(rename = "resourceWait", skip_serializing_if = "Option::is_none")]
    pub resource_wait: Option<u64>,
}

impl<'a> WorkerRequest<'a> {
    /// Assemble the wire request for `request` with the effective page-load
    /// deadline already resolved by the session.
    pub fn assemble(
        request: &'a RenderRequest,
        page_load: Duration,
        config: &ProcessConfig,
    ) -> Self {
        Self {
            url: &request.url,
            width: request.width,
            height: request.height,
            format: request.format,
            timeout: page_load.as_millis() as u64,
            html64: request.html.as_deref().map(encode_html),
            user_agent: request.user_agent.as_deref(),
            headers: request.headers.as_ref(),
            cookies: request.cookies.as_ref(),
            http_proxy: request.http_proxy.as_deref(),
            resource_wait: config.resource_wait_ms,
        }
    }
}

/// Response line read back from the worker. Unknown fields are ignored;
/// every known field is optional so a bare `{"error": ...}` line parses.
#[derive(Debug, Default, Deserialize)]
pub struct WorkerResponse {
    #[serde(default)]
    pub status: Option<String>,

    #[serde(default, rename = "loadTime")]
    pub load_time: Option<u64>,

    #[serde(default, rename = "paintTime")]
    pub paint_time: Option<u64>,

    #[serde(default)]
    pub base64: Option<String>,

    #[serde(default)]
    pub error: Option<String>,
}

/// Exact already-base64 detection: `data` must decode strictly and re-encode
/// to the identical bytes. Canonical-form equality, not an alphabet
/// heuristic, so e.g. unpadded or whitespace-bearing input is not treated as
/// encoded.
pub fn is_base64(data: &[u8]) -> bool {
    match BASE64.decode(data) {
        Ok(decoded) => BASE64.encode(decoded).as_bytes() == data,
        Err(_) => false,
    }
}

/// Encode HTML bytes for the `html64` wire field. Input that is already
/// valid base64 passes through unchanged so callers holding pre-encoded
/// payloads are not double-encoded.
pub fn encode_html(html: &[u8]) -> String {
    if is_base64(html) {
        // the base64 alphabet is ASCII, so this is lossless
        String::from_utf8_lossy(html).into_owned()
    } else {
        BASE64.encode(html)
    }
}

/// Strict base64 decode used for image payloads and inbound HTML.
pub fn decode_base64(data: &str) -> Result<Vec<u8>, base64::DecodeError> {
    BASE64.decode(data)
}

/// Serde adapter: `Option<Vec<u8>>` as an optional base64 string field.
pub mod base64_bytes {
    use serde::{Deserialize, Deserializer, Serializer};

    use super::BASE64;
    use base64::Engine as _;

    pub fn serialize<S>(bytes: &Option<Vec<u8>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match bytes {
            Some(bytes) => serializer.serialize_str(&BASE64.encode(bytes)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<Vec<u8>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let encoded: Option<String> = Option::deserialize(deserializer)?;
        match encoded {
            Some(encoded) => BASE64
                .decode(encoded.as_bytes())
                .map(Some)
                .map_err(serde::de::Error::custom),
            None => Ok(None),
        }
    }
}
