//! Application use cases / business logic

pub mod cycle;
pub mod render;
pub mod scheduler;

pub use cycle::{CycleConfig, PostingCycle};
pub use render::{render_for, truncate_chars};
pub use scheduler::{Scheduler, SchedulerConfig, SchedulerExit, SchedulerReport};
