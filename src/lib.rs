// Library surface for headless/integration tests and reuse.
// Keep this lean to avoid coupling to bin-only types in main.rs.
pub mod config;
pub mod phrase;
pub mod render;
pub mod runtime;
pub mod session;
pub mod stats;
pub mod supplier;
pub mod util;

/// Period of the statistics tick while a session is active.
pub const TICK_RATE_MS: u64 = 100;
