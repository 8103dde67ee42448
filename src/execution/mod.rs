//! Pipeline execution engine

pub mod cancel;
pub mod engine;
pub mod executor;
pub mod scheduler;

pub use cancel::CancelHandle;
pub use engine::{EventEmitter, EventHandler, ExecutionEngine, ExecutionEvent};
pub use executor::{ExecutorSettings, JobExecutor, JobInputs};
pub use scheduler::{ExecutionScheduler, SchedulingStrategy};
