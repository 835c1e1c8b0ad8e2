//! cotask - shared task registry for concurrent sessions
//!
//! The core is a concurrency-safe task/user store: authoritative in-memory
//! state behind one RwLock, with best-effort versioned JSON snapshots written
//! after each committed mutation. Session actors exercise the store from many
//! threads; the CLI is a thin shell over the store's public surface.

pub mod cli;
pub mod config;
pub mod error;
pub mod lock;
pub mod output;
pub mod session;
pub mod storage;
pub mod store;
pub mod task;
pub mod user;

pub use error::{Error, Result};
