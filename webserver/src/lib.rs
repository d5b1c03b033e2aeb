//! HTTP front door for the supervised renderer
//!
//! Thin boundary layer over the `renderer` crate: JSON (de)serialization,
//! request validation, and process-level concerns (CLI, signals, logging).
//! The core never sees an invalid request and never surfaces an internal
//! error as anything but a structured fail response.

pub mod error;
pub mod state;
pub mod web;

pub use error::{WebServerError, WebServerResult};
pub use state::AppState;
pub use web::router;
