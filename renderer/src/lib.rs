//! Supervised rendering via an external worker process
//!
//! This library turns a long-lived external rendering process into a safe,
//! bounded, reusable service. A [`ProcessRenderer`] owns the worker and
//! speaks a line-oriented JSON protocol with it under hard per-phase
//! deadlines; a [`Lifetime`] supervisor retires the worker once it has been
//! idle too long or alive too long, so unbounded in-worker resource growth
//! never accumulates. A [`RemoteRenderer`] forwards the same calls to a
//! render host elsewhere, and both wrap identically because everything is
//! written against the [`Renderer`] trait.

pub mod config;
pub mod error;
pub mod imaging;
pub mod logging;
pub mod protocol;
pub mod services;
pub mod timed;
pub mod traits;
pub mod types;

// Re-export commonly used types
pub use config::{LifetimeConfig, ProcessConfig, RemoteConfig, TimeoutConfig};
pub use error::{RendererError, RendererResult};
pub use services::lifetime::Lifetime;
pub use services::process::ProcessRenderer;
pub use services::remote::RemoteRenderer;
pub use timed::{TimedCall, TimedCallError, TimedMutex};
pub use traits::Renderer;
pub use types::{ImageFormat, RenderRequest, RenderResponse, RenderStatus};
