/// Pitchcraft - Creative Agency Simulator (Core)
///
/// Core library driving a campaign through its lifecycle (team assembly,
/// concepting, deliverable generation, review, submission) and converting
/// finished campaigns into reputation and delayed bonus events.

pub mod config;
pub mod core;

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
