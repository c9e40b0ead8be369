// Library surface for headless/integration tests and reuse.
// Keep this lean to avoid coupling to bin-only types in main.rs.
pub mod app_dirs;
pub mod audio;
pub mod catalog;
pub mod code;
pub mod config;
pub mod error;
pub mod evaluator;
pub mod highscore;
pub mod mode;
pub mod runtime;
pub mod scene;
pub mod session;
pub mod timer;

pub use error::{GameError, Result};
pub use mode::GameMode;
pub use session::{GameSession, Verdict};
