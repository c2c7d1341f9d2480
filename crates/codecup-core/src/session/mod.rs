mod console;
mod stats;
mod tab;

pub use console::{Console, ConsoleLevel, ConsoleLine};
pub use stats::{SelectionStats, TabStats};
pub use tab::{BoundTask, KeyDecision, SessionConfig, TabServices, TabSession};
