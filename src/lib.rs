//! `plan-activity` - client for the outdoor activity planner
//!
//! This library turns form input or free JSON text into a request to the
//! planner's `/plan-activity` endpoint and renders what comes back.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod logging;
pub mod models;
pub mod payload;
pub mod render;
pub mod transport;

// Re-export core types for public API
pub use config::PlannerConfig;
pub use dispatcher::{Dispatch, Dispatcher};
pub use error::PlannerError;
pub use models::PlanActivityResponse;
pub use payload::{Payload, StructuredForm, StructuredPayload, parse_freeform};
pub use render::{RecordingTarget, RenderState, RenderTarget, TerminalRenderer};
pub use transport::{HttpReply, ReqwestTransport, Transport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, PlannerError>;
