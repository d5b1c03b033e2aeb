//! Renderer-specific error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum RendererError {
    #[error("Invalid renderer configuration: {message}")]
    Configuration { message: String },

    #[error("Worker process failed to start: {message}")]
    Startup { message: String },

    #[error("Render request has timed out.")]
    RenderTimeout,

    #[error("{message}\nWorker response: {line}")]
    Protocol { message: String, line: String },

    #[error("Remote render host error: {message}")]
    Remote { message: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl RendererError {
    pub fn configuration(message: impl Into<String>) -> Self {
        RendererError::Configuration {
            message: message.into(),
        }
    }

    pub fn startup(message: impl Into<String>) -> Self {
        RendererError::Startup {
            message: message.into(),
        }
    }

    pub fn protocol(message: impl Into<String>, line: impl Into<String>) -> Self {
        RendererError::Protocol {
            message: message.into(),
            line: line.into(),
        }
    }

    pub fn remote(message: impl Into<String>) -> Self {
        RendererError::Remote {
            message: message.into(),
        }
    }
}

pub type RendererResult<T> = Result<T, RendererError>;
