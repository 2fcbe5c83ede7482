// Library surface for headless/integration tests and reuse.
// The binary only wires the terminal, logging and CLI around these.
pub mod app;
pub mod app_dirs;
pub mod clock;
pub mod config;
pub mod corpus;
pub mod diff;
pub mod error;
pub mod high_score;
pub mod metrics;
pub mod runtime;
pub mod session;
pub mod stats;
pub mod ui;
