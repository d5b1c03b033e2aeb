//! Render request and response types
//!
//! These are the transport-agnostic shapes exchanged with any renderer
//! implementation. Boundary layers (the HTTP front door, the remote-offload
//! client) serialize them to JSON; image bytes and raw HTML travel
//! base64-encoded on any wire form.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

pub const DEFAULT_WIDTH: u32 = 1280;
pub const DEFAULT_HEIGHT: u32 = 1024;

/// Image formats the worker process can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ImageFormat {
    #[serde(rename = "PNG")]
    Png,
    #[serde(rename = "JPEG")]
    Jpeg,
    #[serde(rename = "BMP")]
    Bmp,
    #[serde(rename = "PPM")]
    Ppm,
    #[serde(rename = "PDF")]
    Pdf,
}

impl ImageFormat {
    /// Lowercase file extension for persisted images.
    pub fn extension(&self) -> &'static str {
        match self {
            ImageFormat::Png => "png",
            ImageFormat::Jpeg => "jpeg",
            ImageFormat::Bmp => "bmp",
            ImageFormat::Ppm => "ppm",
            ImageFormat::Pdf => "pdf",
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ImageFormat::Png => "PNG",
            ImageFormat::Jpeg => "JPEG",
            ImageFormat::Bmp => "BMP",
            ImageFormat::Ppm => "PPM",
            ImageFormat::Pdf => "PDF",
        }
    }
}

impl Default for ImageFormat {
    fn default() -> Self {
        ImageFormat::Png
    }
}

impl fmt::Display for ImageFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome classification of a render call.
///
/// `Stopped` means the worker hit its page-load deadline and rendered
/// whatever had loaded by then; it still carries an image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenderStatus {
    Success,
    Stopped,
    Fail,
}

impl RenderStatus {
    /// Map the worker's free-form status string; anything unknown or
    /// missing is a failure.
    pub fn from_wire(status: Option<&str>) -> Self {
        match status {
            Some("success") => RenderStatus::Success,
            Some("stopped") => RenderStatus::Stopped,
            _ => RenderStatus::Fail,
        }
    }
}

/// A single render request. Immutable once constructed; owned solely by the
/// calling render invocation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderRequest {
    pub url: String,

    /// Raw page bytes, expected in `html_encoding`. When present they are
    /// rendered instead of navigating to `url`. Base64 on the wire.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::protocol::base64_bytes"
    )]
    pub html: Option<Vec<u8>>,

    #[serde(default)]
    pub format: ImageFormat,

    #[serde(default = "default_width")]
    pub width: u32,

    #[serde(default = "default_height")]
    pub height: u32,

    /// Page-load budget in seconds. Defaults to the session's configured
    /// phase value when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_load_timeout: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub headers: Option<HashMap<String, String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cookies: Option<HashMap<String, String>>,

    #[serde(default = "default_html_encoding")]
    pub html_encoding: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_proxy: Option<String>,
}

fn default_width() -> u32 {
    DEFAULT_WIDTH
}

fn default_height() -> u32 {
    DEFAULT_HEIGHT
}

fn default_html_encoding() -> String {
    "utf-8".to_string()
}

impl RenderRequest {
    /// Request with every optional field at its documented default.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            html: None,
            format: ImageFormat::default(),
            width: DEFAULT_WIDTH,
            height: DEFAULT_HEIGHT,
            page_load_timeout: None,
            user_agent: None,
            headers: None,
            cookies: None,
            html_encoding: default_html_encoding(),
            http_proxy: None,
        }
    }
}

/// The outcome of a render call. Produced exactly once per request;
/// ownership transfers to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenderResponse {
    pub url: String,
    pub status: RenderStatus,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_time_ms: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paint_time_ms: Option<u64>,

    /// Rendered image bytes; always `None` on failure. Base64 on the wire.
    #[serde(
        default,
        skip_serializing_if = "Option::is_none",
        with = "crate::protocol::base64_bytes"
    )]
    pub image: Option<Vec<u8>>,

    pub format: ImageFormat,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl RenderResponse {
    /// Failure response for `request` carrying `error` as the message.
    pub fn failure(request: &RenderRequest, error: impl fmt::Display) -> Self {
        Self {
            url: request.url.clone(),
            status: RenderStatus::Fail,
            load_time_ms: None,
            paint_time_ms: None,
            image: None,
            format: request.format,
            error: Some(error.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == RenderStatus::Success
    }
}
