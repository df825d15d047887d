//! Receives single-file form uploads over HTTP and stores them on disk under
//! timestamp-prefixed names.

pub mod app;
pub mod clock;
pub mod config;
pub mod error;
pub mod form;
pub mod handlers;
pub mod naming;
pub mod state;
pub mod storage;

pub use app::build_router;
pub use config::ServerConfig;
pub use state::AppState;
