//! Local HTTP backend for browsing OpenClaw session history and switching the
//! active session or default model.

pub mod config;
pub mod document;
pub mod error;
pub mod log_record;
pub mod models;
pub mod pointers;
pub mod routes;
pub mod sessions;
pub mod summary;

pub use config::{Args, ViewerPaths};
pub use error::{Result, ViewerError};
pub use routes::{build_router, AppState};
