//! Signal aggregator: per-symbol fan-in over indicator, regime, sentiment,
//! and event-shock readings, emitting trading signals.

pub mod router;
pub mod slot;
pub mod worker;

pub use router::SymbolRouter;
pub use worker::{SymbolWorker, WorkerInput, WorkerState};
