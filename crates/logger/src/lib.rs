//! Tracing subscriber setup shared by the workspace.

mod tracing;

pub use self::tracing::{LogFormat, LogSettings, init, init_with, try_init};
