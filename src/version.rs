// Crate identity baked in at build time

/// Crate version, reported by GET /version and in the command client's user agent.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub const NAME: &str = env!("CARGO_PKG_NAME");
