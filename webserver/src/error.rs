//! WebServer-specific error types

use renderer::RendererError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum WebServerError {
    #[error("Invalid configuration: {message}")]
    Configuration { message: String },

    #[error("HTTP server startup failed: {message}")]
    ServerStartup { message: String },

    #[error("Renderer error: {0}")]
    Renderer(#[from] RendererError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl WebServerError {
    pub fn configuration(message: impl Into<String>) -> Self {
        WebServerError::Configuration {
            message: message.into(),
        }
    }

    pub fn startup(message: impl Into<String>) -> Self {
        WebServerError::ServerStartup {
            message: message.into(),
        }
    }
}

pub type WebServerResult<T> = Result<T, WebServerError>;
