/*
[INPUT]:  Public API exports for pegwall-mm-strategy crate
[OUTPUT]: Module declarations and public re-exports
[POS]:    Crate root - library entry point
[UPDATE]: When adding new modules or public exports
*/

pub mod config;
pub mod coordination;
pub mod error;
pub mod keeper;
pub mod placement;
pub mod pricing;
pub mod reset;
pub mod strategy;
pub mod task;

#[cfg(test)]
mod testing;

// Re-export main types for convenience
pub use config::{BotConfig, Tuning};
pub use coordination::Coordinator;
pub use error::{BotError, Interrupted};
pub use keeper::{KeeperSettings, WallKeeper};
pub use placement::PlacementOutcome;
pub use reset::ResetSummary;
pub use strategy::{BotParts, LoopState, PegWallBot, TickOutcome, WorkerControl};
pub use task::{TaskManager, TaskRuntimeStatus};
